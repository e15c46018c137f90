use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::blocking::SportBlock;
use crate::config::{AmbiguousPair, MergeStats, PipelineRules, RawRecord};
use crate::name_key::{display_name, NameKey};
use crate::similarity::score;

/// Keys shorter than this carry too little signal to be compared.
const MIN_KEY_LEN: usize = 2;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct VariantId(usize);

/// A set of name variants judged to denote one athlete within a sport.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IdentityClass {
    pub canonical_name: String,
    pub member_names: BTreeSet<String>,
    pub records: usize,
}

/// The outcome of consolidating the names of one sport.
#[derive(PartialEq, Debug, Clone)]
pub struct SportIdentities {
    pub sport: String,
    /// Every variant of the sport maps to exactly one canonical name.
    pub canonical_of: HashMap<String, String>,
    pub classes: Vec<IdentityClass>,
    pub merges: Vec<MergeStats>,
    pub ambiguous_pairs: Vec<AmbiguousPair>,
    pub comparisons: usize,
}

impl SportIdentities {
    pub fn canonical_name(&self, variant: &str) -> Option<&String> {
        self.canonical_of.get(variant)
    }
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u32>,
}

impl UnionFind {
    fn new(size: usize) -> UnionFind {
        UnionFind {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Returns false if both elements were already in the same set.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

struct Variant {
    name: String,
    key: NameKey,
    records: usize,
}

/// Builds the identity classes of one sport.
///
/// Every pair of distinct variants sharing a bucket is scored. Pairs at or
/// above the threshold are unioned, so classes are transitive through shared
/// members: if A~B and B~C, then A, B and C form one class even if A and C
/// were not linked directly.
pub fn consolidate_sport(
    block: &SportBlock,
    records: &[RawRecord],
    rules: &PipelineRules,
) -> SportIdentities {
    // Count the records of every variant. The BTreeMap fixes the variant ids
    // in lexicographic order.
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for &idx in block.records.iter() {
        let r = &records[idx];
        *counts.entry(display_name(&r.first_name, &r.last_name)).or_insert(0) += 1;
    }
    let variants: Vec<Variant> = counts
        .into_iter()
        .map(|(name, count)| Variant {
            key: NameKey::from_display(&name),
            name,
            records: count,
        })
        .collect();
    let id_of: HashMap<&str, VariantId> = variants
        .iter()
        .enumerate()
        .map(|(idx, v)| (v.name.as_str(), VariantId(idx)))
        .collect();

    let mut uf = UnionFind::new(variants.len());
    let mut compared: HashSet<(VariantId, VariantId)> = HashSet::new();
    let mut ambiguous_pairs: Vec<AmbiguousPair> = Vec::new();
    let mut short_keys: BTreeSet<VariantId> = BTreeSet::new();
    let lower_bound = rules.similarity_threshold - rules.ambiguity_margin;

    // Variants with the same key are one name whatever their first/last
    // split, so they are unioned before any bucket is looked at.
    let mut first_with_key: HashMap<&NameKey, usize> = HashMap::new();
    for (idx, v) in variants.iter().enumerate() {
        if v.key.len() < MIN_KEY_LEN {
            continue;
        }
        match first_with_key.get(&v.key) {
            Some(&other) => {
                debug!(
                    "consolidate_sport: {:?}: {:?} and {:?} share a key, linked",
                    block.sport, variants[other].name, v.name
                );
                uf.union(other, idx);
            }
            None => {
                first_with_key.insert(&v.key, idx);
            }
        }
    }

    for (bucket_key, bucket) in block.buckets.iter() {
        let members: BTreeSet<VariantId> = bucket
            .iter()
            .filter_map(|&idx| {
                let r = &records[idx];
                id_of
                    .get(display_name(&r.first_name, &r.last_name).as_str())
                    .cloned()
            })
            .collect();
        let members: Vec<VariantId> = members.into_iter().collect();
        debug!(
            "consolidate_sport: {:?} bucket {:?}: {} variants",
            block.sport,
            bucket_key,
            members.len()
        );
        for (i, &a) in members.iter().enumerate() {
            if variants[a.0].key.len() < MIN_KEY_LEN {
                short_keys.insert(a);
                continue;
            }
            for &b in members[i + 1..].iter() {
                if variants[b.0].key.len() < MIN_KEY_LEN {
                    continue;
                }
                if !compared.insert((a, b)) {
                    continue;
                }
                let s = score(&variants[a.0].key, &variants[b.0].key);
                if s >= rules.similarity_threshold {
                    debug!(
                        "consolidate_sport: {:?}: linking {:?} and {:?} (score {:.3})",
                        block.sport, variants[a.0].name, variants[b.0].name, s
                    );
                    uf.union(a.0, b.0);
                } else if s >= lower_bound {
                    warn!(
                        "consolidate_sport: {:?}: ambiguous pair {:?} / {:?} (score {:.3}), left distinct",
                        block.sport, variants[a.0].name, variants[b.0].name, s
                    );
                    ambiguous_pairs.push(AmbiguousPair {
                        sport: block.sport.clone(),
                        first: variants[a.0].name.clone(),
                        second: variants[b.0].name.clone(),
                        score: s,
                    });
                }
            }
        }
    }
    for v in short_keys.iter() {
        debug!(
            "consolidate_sport: {:?}: name {:?} too short to be compared",
            block.sport, variants[v.0].name
        );
    }

    // Gather the classes by root, in variant order.
    let mut by_root: BTreeMap<usize, Vec<VariantId>> = BTreeMap::new();
    for idx in 0..variants.len() {
        let root = uf.find(idx);
        by_root.entry(root).or_default().push(VariantId(idx));
    }

    let mut classes: Vec<IdentityClass> = Vec::new();
    let mut canonical_of: HashMap<String, String> = HashMap::new();
    let mut merges: Vec<MergeStats> = Vec::new();
    for members in by_root.values() {
        let canonical = select_canonical(members, &variants);
        let canonical_name = variants[canonical.0].name.clone();
        for m in members.iter() {
            let v = &variants[m.0];
            if *m != canonical {
                info!(
                    "consolidate_sport: {:?}: {:?} ({} records) -> {:?}",
                    block.sport, v.name, v.records, canonical_name
                );
                merges.push(MergeStats {
                    sport: block.sport.clone(),
                    variant: v.name.clone(),
                    canonical_name: canonical_name.clone(),
                    records: v.records,
                });
            }
            canonical_of.insert(v.name.clone(), canonical_name.clone());
        }
        classes.push(IdentityClass {
            canonical_name,
            member_names: members.iter().map(|m| variants[m.0].name.clone()).collect(),
            records: members.iter().map(|m| variants[m.0].records).sum(),
        });
    }
    classes.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));

    info!(
        "consolidate_sport: {:?}: {} names -> {} identities ({} comparisons, {} ambiguous)",
        block.sport,
        variants.len(),
        classes.len(),
        compared.len(),
        ambiguous_pairs.len()
    );

    SportIdentities {
        sport: block.sport.clone(),
        canonical_of,
        classes,
        merges,
        ambiguous_pairs,
        comparisons: compared.len(),
    }
}

// The member with the most records. Ties go to the first name in lexicographic
// order, which is the lowest variant id.
fn select_canonical(members: &[VariantId], variants: &[Variant]) -> VariantId {
    let mut best = members[0];
    for &m in members[1..].iter() {
        if variants[m.0].records > variants[best.0].records {
            best = m;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::block_records;
    use crate::config::{BlockingStrategy, SourceKind};

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

    fn run(records: &[RawRecord], rules: &PipelineRules) -> Vec<SportIdentities> {
        block_records(records, rules.blocking_strategy, rules.blocking_prefix_length)
            .iter()
            .map(|b| consolidate_sport(b, records, rules))
            .collect()
    }

    #[test]
    fn majority_variant_is_canonical() {
        let mut records: Vec<RawRecord> = (0..5).map(|_| rec("Rowing", "Jon", "Smith")).collect();
        records.push(rec("Rowing", "John", "Smith"));
        let res = run(&records, &PipelineRules::DEFAULT_RULES);
        assert_eq!(res.len(), 1);
        let ids = &res[0];
        assert_eq!(ids.classes.len(), 1);
        assert_eq!(ids.canonical_name("John Smith"), Some(&"Jon Smith".to_string()));
        assert_eq!(ids.canonical_name("Jon Smith"), Some(&"Jon Smith".to_string()));
        assert_eq!(ids.classes[0].records, 6);
        assert_eq!(ids.merges.len(), 1);
        assert_eq!(ids.merges[0].variant, "John Smith");
    }

    #[test]
    fn ties_go_to_first_alphabetical() {
        let records = vec![rec("Rowing", "John", "Smith"), rec("Rowing", "Jon", "Smith")];
        let res = run(&records, &PipelineRules::DEFAULT_RULES);
        assert_eq!(res[0].classes[0].canonical_name, "John Smith");
    }

    #[test]
    fn transitive_bridge_forms_one_class() {
        // "abcdefghij" ~ "abcdefghik" ~ "abcdefghkk", but the ends differ by two edits.
        let rules = PipelineRules {
            similarity_threshold: 0.9,
            ambiguity_margin: 0.0,
            ..PipelineRules::DEFAULT_RULES
        };
        let records = vec![
            rec("Judo", "", "abcdefghij"),
            rec("Judo", "", "abcdefghik"),
            rec("Judo", "", "abcdefghkk"),
        ];
        let res = run(&records, &rules);
        assert_eq!(res[0].classes.len(), 1);
        assert_eq!(res[0].classes[0].member_names.len(), 3);
    }

    #[test]
    fn threshold_is_inclusive() {
        // One substitution over ten characters: exactly 0.9.
        let records = vec![rec("Judo", "", "abcdefghij"), rec("Judo", "", "abcdefghix")];
        let rules = PipelineRules {
            similarity_threshold: 0.9,
            ..PipelineRules::DEFAULT_RULES
        };
        assert_eq!(run(&records, &rules)[0].classes.len(), 1);
        let rules = PipelineRules {
            similarity_threshold: 0.91,
            ambiguity_margin: 0.05,
            ..PipelineRules::DEFAULT_RULES
        };
        let res = run(&records, &rules);
        assert_eq!(res[0].classes.len(), 2);
        assert_eq!(res[0].ambiguous_pairs.len(), 1);
    }

    #[test]
    fn short_names_are_never_merged() {
        let records = vec![rec("Judo", "A", ""), rec("Judo", "A.", "")];
        let rules = PipelineRules {
            blocking_strategy: BlockingStrategy::FullNamePrefix,
            ..PipelineRules::DEFAULT_RULES
        };
        let res = run(&records, &rules);
        assert_eq!(res[0].classes.len(), 2);
        assert_eq!(res[0].comparisons, 0);
    }

    #[test]
    fn no_cross_sport_leakage() {
        let records = vec![rec("Rowing", "Jon", "Smith"), rec("Judo", "Jon", "Smith")];
        let res = run(&records, &PipelineRules::DEFAULT_RULES);
        assert_eq!(res.len(), 2);
        assert!(res.iter().all(|ids| ids.merges.is_empty()));
    }

    #[test]
    fn same_key_with_another_split_is_one_identity() {
        // Last-name buckets "kat" and "smi" never meet.
        let records = vec![
            rec("Rowing", "Mary", "Kate-Smith"),
            rec("Rowing", "Mary Kate", "Smith"),
        ];
        let res = run(&records, &PipelineRules::DEFAULT_RULES);
        assert_eq!(res[0].classes.len(), 1);
        assert_eq!(res[0].classes[0].canonical_name, "Mary Kate Smith");
        assert_eq!(
            res[0].canonical_name("Mary Kate-Smith"),
            Some(&"Mary Kate Smith".to_string())
        );
        assert_eq!(res[0].merges.len(), 1);
    }

    #[test]
    fn distinct_names_stay_apart() {
        let records = vec![rec("Rowing", "Anna", "Smith"), rec("Rowing", "Peter", "Smith")];
        let res = run(&records, &PipelineRules::DEFAULT_RULES);
        assert_eq!(res[0].classes.len(), 2);
        assert!(res[0].ambiguous_pairs.is_empty());
    }
}
