use std::fmt::Display;

/// A comparison key for a name: lower-cased, with whitespace and punctuation
/// removed. Never displayed.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(first_name: &str, last_name: &str) -> NameKey {
        let mut key = normalize_part(first_name);
        key.push_str(&normalize_part(last_name));
        NameKey(key)
    }

    /// Builds the key of a display name as returned by [display_name].
    pub fn from_display(full_name: &str) -> NameKey {
        NameKey(normalize_part(full_name))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `n` characters of the key, or the whole key if it is shorter.
    pub fn prefix(&self, n: usize) -> String {
        self.0.chars().take(n).collect()
    }
}

impl Display for NameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lower-cases and keeps alphanumeric characters only.
pub fn normalize_part(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// The displayed form of a name: both parts trimmed, inner whitespace collapsed.
pub fn display_name(first_name: &str, last_name: &str) -> String {
    first_name
        .split_whitespace()
        .chain(last_name.split_whitespace())
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ignores_case_whitespace_and_punctuation() {
        let a = NameKey::new(" Mary-Kate ", "O'Neil");
        let b = NameKey::new("mary kate", "ONEIL");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "marykateoneil");
    }

    #[test]
    fn display_key_matches_part_key() {
        let shown = display_name("  Jon ", "Smith  Jr");
        assert_eq!(shown, "Jon Smith Jr");
        assert_eq!(NameKey::from_display(&shown), NameKey::new("Jon", "Smith Jr"));
    }

    #[test]
    fn prefix_counts_characters() {
        let k = NameKey::new("Zoë", "Ng");
        assert_eq!(k.len(), 5);
        assert_eq!(k.prefix(3), "zoë");
        assert_eq!(k.prefix(10), "zoëng");
    }
}
