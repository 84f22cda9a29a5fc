use super::{ColumnDef, Domain, Row, Span, COLUMNS};
use crate::sql::SqlValue;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Days covered by [`Span::Future`].
pub const FUTURE_SPAN_DAYS: i64 = 730;

fn epoch_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Produces synthetic rows on the client, for paths where the database
/// cannot generate them (single-row API inserts, Trino literal batches).
#[derive(Debug)]
pub struct RowGenerator<R: Rng = ThreadRng> {
    rng: R,
}

impl RowGenerator<ThreadRng> {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for RowGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RowGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self) -> Row {
        let now = Utc::now().naive_utc();
        let mut row = Row::default();
        for def in COLUMNS.iter() {
            let value = self.sample(def, now);
            row.set(def.name, value);
        }
        row
    }

    pub fn generate_batch(&mut self, count: usize) -> Vec<Row> {
        (0..count).map(|_| self.generate()).collect()
    }

    fn sample(&mut self, def: &ColumnDef, now: NaiveDateTime) -> SqlValue {
        if !def.required && self.rng.gen_bool(def.null_probability.clamp(0.0, 1.0)) {
            return SqlValue::Null;
        }
        match def.domain {
            Domain::Uuid => SqlValue::Text(self.uuid().to_string()),
            Domain::Choice(options) => options
                .choose(&mut self.rng)
                .map(|s| SqlValue::from(*s))
                .unwrap_or(SqlValue::Null),
            Domain::Text { min, max } => {
                let len = self.rng.gen_range(min..=max);
                SqlValue::Text(self.random_text(len))
            }
            Domain::Int { min, max } => SqlValue::Int(i64::from(self.rng.gen_range(min..=max))),
            Domain::Bool => SqlValue::Bool(self.rng.gen_bool(0.5)),
            Domain::Date(span) => SqlValue::Date(self.instant(span, now).date()),
            Domain::Timestamp(span) => SqlValue::Timestamp(self.instant(span, now)),
            Domain::Now => SqlValue::Timestamp(now),
        }
    }

    fn instant(&mut self, span: Span, now: NaiveDateTime) -> NaiveDateTime {
        let (from, to) = match span {
            Span::Past => (epoch_start(), now),
            Span::Future => (now, now + Duration::days(FUTURE_SPAN_DAYS)),
        };
        let seconds = (to - from).num_seconds().max(1);
        from + Duration::seconds(self.rng.gen_range(0..seconds))
    }

    /// Version 4 UUID drawn from the generator's own RNG.
    fn uuid(&mut self) -> uuid::Uuid {
        uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid()
    }

    fn random_text(&mut self, len: usize) -> String {
        let hex = self.uuid().simple().to_string();
        let mut s: String = hex.chars().take(len).collect();
        while s.len() < len {
            s.push('x');
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::SqlType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_required_fields_always_present() {
        let mut generator = RowGenerator::with_rng(StdRng::seed_from_u64(7));
        for row in generator.generate_batch(500) {
            assert!(!row.id.is_empty());
            assert!(!row.bs_profile_id.is_empty());
            assert!(!row.accounted_for_bs_profile_id.is_empty());
            assert!(!row.bonus_type_id.is_empty());
            assert!(!row.action_source_id.is_empty());
            assert!(!row.doc_to_track_type_id.is_empty());
            assert!(!row.doc_to_track_id.is_empty());
            assert!((-1000..=10000).contains(&row.amount));
        }
    }

    #[test]
    fn test_values_match_column_domains() {
        let mut generator = RowGenerator::with_rng(StdRng::seed_from_u64(11));
        for row in generator.generate_batch(500) {
            for (def, value) in COLUMNS.iter().zip(row.values()) {
                if def.required {
                    assert!(!value.is_null(), "{} must not be null", def.name);
                }
                match (def.domain, &value) {
                    (_, SqlValue::Null) => {}
                    (Domain::Choice(options), SqlValue::Text(s)) => {
                        assert!(options.contains(&s.as_str()), "{}={} outside vocabulary", def.name, s)
                    }
                    (Domain::Int { min, max }, SqlValue::Int(i)) => {
                        assert!((i64::from(min)..=i64::from(max)).contains(i), "{}={}", def.name, i)
                    }
                    (Domain::Text { min, max }, SqlValue::Text(s)) => {
                        assert!((min..=max).contains(&s.len()), "{} len {}", def.name, s.len())
                    }
                    _ => {}
                }
                let type_ok = matches!(
                    (def.sql_type, &value),
                    (_, SqlValue::Null)
                        | (SqlType::Text, SqlValue::Text(_))
                        | (SqlType::Int, SqlValue::Int(_))
                        | (SqlType::Bool, SqlValue::Bool(_))
                        | (SqlType::Date, SqlValue::Date(_))
                        | (SqlType::Timestamp, SqlValue::Timestamp(_))
                );
                assert!(type_ok, "{} has wrong type: {:?}", def.name, value);
            }
        }
    }

    #[test]
    fn test_nullable_fields_are_sometimes_null() {
        let mut generator = RowGenerator::with_rng(StdRng::seed_from_u64(3));
        let rows = generator.generate_batch(1000);
        let null_dates = rows.iter().filter(|r| r.date.is_none()).count();
        // null probability 0.2
        assert!(null_dates > 100 && null_dates < 300, "got {}", null_dates);
        assert!(rows.iter().all(|r| r.ingested_at.is_some()));
    }

    #[test]
    fn test_flags_are_never_null() {
        let mut generator = RowGenerator::with_rng(StdRng::seed_from_u64(13));
        for row in generator.generate_batch(1000) {
            for (def, value) in COLUMNS.iter().zip(row.values()) {
                if def.sql_type == SqlType::Bool {
                    assert!(!value.is_null(), "{} is null", def.name);
                }
            }
        }
    }

    #[test]
    fn test_seeded_generators_repeat_ids() {
        let first = RowGenerator::with_rng(StdRng::seed_from_u64(21)).generate();
        let second = RowGenerator::with_rng(StdRng::seed_from_u64(21)).generate();
        let other = RowGenerator::with_rng(StdRng::seed_from_u64(22)).generate();

        assert_eq!(first.id, second.id);
        assert_ne!(first.id, other.id);
        assert_eq!(uuid::Uuid::parse_str(&first.id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_future_dates_after_past_dates() {
        let mut generator = RowGenerator::with_rng(StdRng::seed_from_u64(5));
        let today = Utc::now().date_naive();
        for row in generator.generate_batch(200) {
            if let Some(d) = row.date_of_expire {
                assert!(d >= today);
            }
            if let Some(d) = row.departure_date {
                assert!(d <= today);
            }
        }
    }
}
