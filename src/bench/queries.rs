//! Query benchmark over ten production access patterns.
//!
//! Parameters come from the data itself: each shape first discovers up to
//! `discovery_limit` tuples that satisfy its predicate, then runs `runs` times
//! cycling through them.

use super::stats::LatencyStats;
use crate::backend::{BackendSession, QueryBackend, TextRows};
use crate::error::BenchError;
use crate::rows::{coerce, column};
use crate::runlog::RunLog;
use crate::sql::{quote_ident, SqlValue};
use crate::variant::TableVariant;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

/// Expiry cutoff used by the date-bounded shapes.
pub fn expiry_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

/// Stands for the expiry cutoff literal in discovery filters.
const CUTOFF: &str = "{cutoff}";

const PAGE_OFFSET: i64 = 0;
const PAGE_SIZE: i64 = 20;

/// Row update that makes a shape satisfiable.
#[derive(Debug, Clone, Copy)]
pub struct Repair {
    /// `SET` clause applied to one arbitrary row
    pub assignments: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryDef {
    pub id: u32,
    pub name: &'static str,
    /// Statement with `{table}` in place of the table name
    template: &'static str,
    /// Columns whose discovered values become `$1..$k`
    discover: &'static [&'static str],
    /// Extra discovery predicate, besides the discovered columns being non-null.
    /// `{cutoff}` is replaced by the expiry cutoff date.
    filter: Option<&'static str>,
    /// Appends the fixed trailing parameters
    tail: fn() -> Vec<SqlValue>,
    pub repair: Option<Repair>,
}

fn no_tail() -> Vec<SqlValue> {
    Vec::new()
}

fn page_tail() -> Vec<SqlValue> {
    vec![SqlValue::Int(PAGE_OFFSET), SqlValue::Int(PAGE_SIZE)]
}

fn cutoff_tail() -> Vec<SqlValue> {
    vec![SqlValue::Date(expiry_cutoff())]
}

pub const QUERIES: [QueryDef; 10] = [
    QueryDef {
        id: 1,
        name: "Charge by document",
        template: "SELECT amount FROM {table} WHERE doc_to_track_id = $1 AND doc_to_track_type_id = $2 AND accounted_for_bs_profile_id = $3 AND bonus_type_id = $4 AND amount < 0 AND cancelled = false AND (date_of_expire IS NULL OR date_of_expire >= $5)",
        discover: &[
            "doc_to_track_id",
            "doc_to_track_type_id",
            "accounted_for_bs_profile_id",
            "bonus_type_id",
        ],
        filter: Some("amount < 0 AND cancelled = false AND (date_of_expire IS NULL OR date_of_expire >= {cutoff})"),
        tail: cutoff_tail,
        repair: Some(Repair {
            assignments: "amount = -100, cancelled = false, date_of_expire = NULL",
        }),
    },
    QueryDef {
        id: 2,
        name: "Profile pagination",
        template: "SELECT * FROM {table} WHERE accounted_for_bs_profile_id = $1 ORDER BY \"date\" DESC OFFSET $2 LIMIT $3",
        discover: &["accounted_for_bs_profile_id"],
        filter: None,
        tail: page_tail,
        repair: None,
    },
    QueryDef {
        id: 3,
        name: "Profile, not cancelled",
        template: "SELECT * FROM {table} WHERE accounted_for_bs_profile_id = $1 AND cancelled = false",
        discover: &["accounted_for_bs_profile_id"],
        filter: Some("cancelled = false"),
        tail: no_tail,
        repair: None,
    },
    QueryDef {
        id: 4,
        name: "By bs_profile_id",
        template: "SELECT * FROM {table} WHERE bs_profile_id = $1 AND cancelled = false",
        discover: &["bs_profile_id"],
        filter: Some("cancelled = false"),
        tail: no_tail,
        repair: None,
    },
    QueryDef {
        id: 5,
        name: "Profile and bonus type",
        template: "SELECT * FROM {table} WHERE accounted_for_bs_profile_id = $1 AND cancelled = false AND bonus_type_id = $2",
        discover: &["accounted_for_bs_profile_id", "bonus_type_id"],
        filter: Some("cancelled = false"),
        tail: no_tail,
        repair: None,
    },
    QueryDef {
        id: 6,
        name: "Active by date",
        template: "SELECT * FROM {table} WHERE accounted_for_bs_profile_id = $1 AND date_of_expire >= $2",
        discover: &["accounted_for_bs_profile_id"],
        filter: Some("date_of_expire >= {cutoff}"),
        tail: cutoff_tail,
        repair: None,
    },
    QueryDef {
        id: 7,
        name: "GROUP BY bs_quota_id",
        template: "SELECT bs_quota_id, COUNT(bs_quota_id) FROM {table} WHERE registrar_type_id = $1 AND cancelled = false AND bs_quota_id IS NOT NULL AND \"row\" = 1 GROUP BY bs_quota_id",
        discover: &["registrar_type_id"],
        filter: Some("cancelled = false AND bs_quota_id IS NOT NULL AND \"row\" = 1"),
        tail: no_tail,
        repair: Some(Repair {
            assignments: "cancelled = false, bs_quota_id = 1, \"row\" = 1, registrar_type_id = 'bsBonusDocument'",
        }),
    },
    QueryDef {
        id: 8,
        name: "By registrar document",
        template: "SELECT * FROM {table} WHERE registrar_type_id = $1 AND registrar_id = $2",
        discover: &["registrar_type_id", "registrar_id"],
        filter: None,
        tail: no_tail,
        repair: None,
    },
    QueryDef {
        id: 9,
        name: "General pagination",
        template: "SELECT * FROM {table} ORDER BY \"date\" DESC OFFSET $1 LIMIT $2",
        discover: &[],
        filter: None,
        tail: page_tail,
        repair: None,
    },
    QueryDef {
        id: 10,
        name: "By id",
        template: "SELECT * FROM {table} WHERE id = $1 LIMIT 1",
        discover: &["id"],
        filter: None,
        tail: no_tail,
        repair: None,
    },
];

impl QueryDef {
    pub fn sql(&self, table: &str) -> String {
        self.template.replace("{table}", table)
    }

    fn predicate(&self) -> String {
        let mut parts: Vec<String> = self
            .discover
            .iter()
            .map(|c| format!("{} IS NOT NULL", quote_ident(c)))
            .collect();
        if let Some(filter) = self.filter {
            let cutoff = SqlValue::Date(expiry_cutoff()).to_literal();
            parts.push(filter.replace(CUTOFF, &cutoff));
        }
        parts.join(" AND ")
    }

    /// Probe for parameter tuples, or `None` for shapes that need none.
    pub fn discovery_sql(&self, table: &str, limit: u64) -> Option<String> {
        if self.discover.is_empty() {
            return None;
        }
        let cols = self
            .discover
            .iter()
            .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!(
            "SELECT {} FROM {} WHERE {} LIMIT {}",
            cols,
            table,
            self.predicate(),
            limit
        ))
    }

    /// Discovery narrowed to one row id, used after a repair.
    fn discovery_by_id_sql(&self, table: &str) -> Option<String> {
        self.discovery_sql(table, 1).map(|sql| {
            sql.replacen(
                " WHERE ",
                &format!(" WHERE {} = $1 AND ", quote_ident("id")),
                1,
            )
        })
    }

    fn repair_sql(&self, table: &str) -> Option<String> {
        self.repair.map(|r| {
            format!(
                "UPDATE {} SET {} WHERE {} = $1",
                table,
                r.assignments,
                quote_ident("id")
            )
        })
    }

    /// Turn discovered text rows into typed parameter tuples.
    fn to_params(&self, rows: TextRows) -> Result<Vec<Vec<SqlValue>>, BenchError> {
        let mut tuples = Vec::with_capacity(rows.len());
        'rows: for row in rows {
            let mut params = Vec::with_capacity(self.discover.len() + 2);
            for (name, cell) in self.discover.iter().zip(row) {
                let Some(text) = cell else {
                    continue 'rows;
                };
                let value = match column(name) {
                    Some(def) => coerce(def, &Value::String(text))?,
                    None => SqlValue::Text(text),
                };
                params.push(value);
            }
            params.extend((self.tail)());
            tuples.push(params);
        }
        Ok(tuples)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub id: u32,
    pub name: String,
    pub stats: LatencyStats,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub runs: u64,
    pub discovery_limit: u64,
    pub repair_fixtures: bool,
}

async fn discover(
    session: &mut dyn BackendSession,
    def: &QueryDef,
    table: &str,
    options: &QueryOptions,
    log: &RunLog,
) -> Result<Vec<Vec<SqlValue>>, BenchError> {
    let Some(sql) = def.discovery_sql(table, options.discovery_limit) else {
        return Ok(vec![(def.tail)()]);
    };
    let tuples = def.to_params(session.fetch_text(&sql, &[]).await?)?;
    if !tuples.is_empty() || !options.repair_fixtures {
        return Ok(tuples);
    }
    let (Some(repair), Some(by_id)) = (def.repair_sql(table), def.discovery_by_id_sql(table)) else {
        return Ok(tuples);
    };

    let ids = session
        .fetch_text(&format!("SELECT CAST(id AS VARCHAR) FROM {} LIMIT 1", table), &[])
        .await?;
    let Some(id) = ids.into_iter().next().and_then(|r| r.into_iter().next().flatten()) else {
        return Ok(tuples);
    };

    let id = SqlValue::Text(id);
    session.execute(&repair, std::slice::from_ref(&id)).await?;
    log.line(format!(
        "Query {} ({}): no matching rows, repaired row id={}",
        def.id,
        def.name,
        id.as_text().unwrap_or_default()
    ));

    def.to_params(session.fetch_text(&by_id, &[id]).await?)
}

/// Discover parameters for every shape, then time each `options.runs` times.
///
/// Shapes without a usable parameter tuple are skipped.
pub async fn run_queries(
    backend: &dyn QueryBackend,
    variant: TableVariant,
    options: &QueryOptions,
    log: &RunLog,
) -> Result<Vec<QueryResult>, BenchError> {
    let table = backend.qualified_table(variant);
    let mut session = backend.session().await?;
    let mut results = Vec::with_capacity(QUERIES.len());

    for def in QUERIES.iter() {
        let tuples = discover(session.as_mut(), def, &table, options, log).await?;
        if tuples.is_empty() {
            log.line(format!("Query {} ({}): no parameters found, skipped", def.id, def.name));
            continue;
        }

        let sql = def.sql(&table);
        let mut timings = Vec::with_capacity(options.runs as usize);
        for run in 0..options.runs as usize {
            let params = &tuples[run % tuples.len()];
            let started = Instant::now();
            session.fetch_discard(&sql, params).await?;
            timings.push(started.elapsed());
        }

        if let Some(stats) = LatencyStats::from_durations(&timings) {
            results.push(QueryResult {
                id: def.id,
                name: def.name.to_string(),
                stats,
            });
        }
    }
    session.close().await?;

    Ok(results)
}
