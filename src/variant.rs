use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of hash partitions created for partitioned variants.
pub const PARTITION_COUNT: u32 = 64;

/// Column used as hash partition key and as the secondary index key.
pub const PARTITION_COLUMN: &str = "accounted_for_bs_profile_id";

/// Physical layout of one `bonus_registry` table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TableVariant {
    /// No index, no partitioning
    Plain,
    /// Hash partitioned on the profile key
    Part,
    /// Secondary index on the profile key
    Idx,
    /// Index and hash partitioning
    IdxPart,
}

impl TableVariant {
    pub const ALL: [TableVariant; 4] = [
        TableVariant::Plain,
        TableVariant::Part,
        TableVariant::Idx,
        TableVariant::IdxPart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableVariant::Plain => "plain",
            TableVariant::Part => "part",
            TableVariant::Idx => "idx",
            TableVariant::IdxPart => "idx_part",
        }
    }

    pub fn table_name(&self) -> String {
        format!("bonus_registry_{}", self.as_str())
    }

    pub fn partition_name(&self, remainder: u32) -> String {
        format!("{}_{}", self.table_name(), remainder)
    }

    /// Name of the secondary index on the partition column, if this variant has one.
    pub fn index_name(&self) -> Option<String> {
        self.is_indexed()
            .then(|| format!("idx_{}_accounted", self.table_name()))
    }

    pub fn is_partitioned(&self) -> bool {
        matches!(self, TableVariant::Part | TableVariant::IdxPart)
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, TableVariant::Idx | TableVariant::IdxPart)
    }
}

impl fmt::Display for TableVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableVariant {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableVariant::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| BenchError::UnknownVariant(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for v in TableVariant::ALL {
            assert_eq!(v.as_str().parse::<TableVariant>().unwrap(), v);
        }
        assert!(matches!(
            "partitioned".parse::<TableVariant>(),
            Err(BenchError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_layout_flags() {
        assert!(!TableVariant::Plain.is_partitioned());
        assert!(!TableVariant::Plain.is_indexed());
        assert!(TableVariant::Part.is_partitioned());
        assert!(TableVariant::Idx.is_indexed());
        assert!(TableVariant::IdxPart.is_partitioned() && TableVariant::IdxPart.is_indexed());
    }

    #[test]
    fn test_names() {
        assert_eq!(TableVariant::IdxPart.table_name(), "bonus_registry_idx_part");
        assert_eq!(
            TableVariant::Part.partition_name(63),
            "bonus_registry_part_63"
        );
        assert_eq!(
            TableVariant::Idx.index_name().as_deref(),
            Some("idx_bonus_registry_idx_accounted")
        );
        assert_eq!(TableVariant::Part.index_name(), None);
    }
}
