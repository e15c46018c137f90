use log::debug;
use std::collections::BTreeMap;

use crate::config::{BlockingStrategy, RawRecord};
use crate::name_key::{normalize_part, NameKey};

/// The records of one sport, grouped into comparison buckets.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SportBlock {
    pub sport: String,
    /// Indexes into the record slice, in input order.
    pub records: Vec<usize>,
    /// Blocking key -> indexes of the records sharing it, in input order.
    pub buckets: BTreeMap<String, Vec<usize>>,
}

/// The blocking key of a record.
///
/// Two names that differ in the characters used for the key never end up in
/// the same bucket and are never compared.
pub fn blocking_key(record: &RawRecord, strategy: BlockingStrategy, prefix_length: usize) -> String {
    match strategy {
        BlockingStrategy::LastNamePrefix => {
            let last = normalize_part(&record.last_name);
            if last.is_empty() {
                NameKey::new(&record.first_name, "").prefix(prefix_length)
            } else {
                last.chars().take(prefix_length).collect()
            }
        }
        BlockingStrategy::FullNamePrefix => {
            NameKey::new(&record.first_name, &record.last_name).prefix(prefix_length)
        }
    }
}

/// Partitions the records by sport, then by blocking key. Deterministic.
pub fn block_records(
    records: &[RawRecord],
    strategy: BlockingStrategy,
    prefix_length: usize,
) -> Vec<SportBlock> {
    let mut by_sport: BTreeMap<String, SportBlock> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        let sport = record.sport.trim().to_string();
        let block = by_sport.entry(sport.clone()).or_insert_with(|| SportBlock {
            sport,
            records: Vec::new(),
            buckets: BTreeMap::new(),
        });
        block.records.push(idx);
        block
            .buckets
            .entry(blocking_key(record, strategy, prefix_length))
            .or_default()
            .push(idx);
    }
    for block in by_sport.values() {
        debug!(
            "block_records: sport {:?}: {} records in {} buckets",
            block.sport,
            block.records.len(),
            block.buckets.len()
        );
    }
    by_sport.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;

    fn rec(sport: &str, first: &str, last: &str) -> RawRecord {
        RawRecord {
            source: SourceKind::Conversion,
            sport: sport.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            gender: None,
            date_of_birth: None,
            year: 2020,
            program_level: None,
            css_flag: false,
        }
    }

    #[test]
    fn partitions_by_sport_then_prefix() {
        let records = vec![
            rec("Rowing", "Jon", "Smith"),
            rec("Rowing", "John", "Smith"),
            rec("Rowing", "Ana", "Lopez"),
            rec("Judo", "Jon", "Smith"),
        ];
        let blocks = block_records(&records, BlockingStrategy::LastNamePrefix, 3);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].sport, "Judo");
        let rowing = &blocks[1];
        assert_eq!(rowing.records, vec![0, 1, 2]);
        assert_eq!(rowing.buckets.get("smi"), Some(&vec![0, 1]));
        assert_eq!(rowing.buckets.get("lop"), Some(&vec![2]));
    }

    #[test]
    fn full_name_prefix_splits_on_first_name() {
        let records = vec![rec("Rowing", "Jon", "Smith"), rec("Rowing", "John", "Smith")];
        let blocks = block_records(&records, BlockingStrategy::FullNamePrefix, 3);
        assert_eq!(blocks[0].buckets.len(), 2);
        let blocks = block_records(&records, BlockingStrategy::FullNamePrefix, 2);
        assert_eq!(blocks[0].buckets.len(), 1);
    }

    #[test]
    fn missing_last_name_falls_back_to_first_name() {
        let r = rec("Rowing", "Madonna", " ");
        assert_eq!(blocking_key(&r, BlockingStrategy::LastNamePrefix, 4), "mado");
    }
}
