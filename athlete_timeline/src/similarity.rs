use crate::name_key::NameKey;

/// Normalized edit similarity in [0, 1]: 1.0 for identical keys.
///
/// Symmetric, since the Levenshtein distance is.
pub fn score(a: &NameKey, b: &NameKey) -> f64 {
    strsim::normalized_levenshtein(a.as_str(), b.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(first: &str, last: &str) -> NameKey {
        NameKey::new(first, last)
    }

    #[test]
    fn identical_and_disjoint() {
        assert_eq!(score(&k("Jon", "Smith"), &k("jon", "smith")), 1.0);
        assert_eq!(score(&k("abc", ""), &k("xyz", "")), 0.0);
    }

    #[test]
    fn one_insertion() {
        let s = score(&k("Jon", "Smith"), &k("John", "Smith"));
        assert!(s >= 0.85, "score {}", s);
        assert!(s < 1.0);
    }

    #[test]
    fn symmetric_on_samples() {
        let names = [
            k("Jon", "Smith"),
            k("John", "Smith"),
            k("Jonathan", "Smyth"),
            k("Ana", "Lopez"),
            k("Anna", "Lopes"),
            k("", ""),
        ];
        for a in names.iter() {
            for b in names.iter() {
                assert_eq!(score(a, b), score(b, a), "{} / {}", a, b);
            }
        }
    }
}
