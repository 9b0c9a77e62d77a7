use serde::{Deserialize, Serialize};

/// Scientific tree species name, e.g. "pinus sylvestris".
///
/// Names are stored lower-cased with single spaces so that lookups in price
/// lists and taper tables are insensitive to capitalisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Species(String);

impl Species {
    pub fn new(name: impl AsRef<str>) -> Self {
        let normalized = name
            .as_ref()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        Self(normalized)
    }

    /// Full normalized name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Genus part of the name ("pinus" for "pinus sylvestris").
    pub fn genus(&self) -> &str {
        self.0.split(' ').next().unwrap_or("")
    }

    pub fn is_genus_only(&self) -> bool {
        !self.0.contains(' ')
    }
}

impl From<String> for Species {
    fn from(s: String) -> Self {
        Species::new(s)
    }
}

impl From<&str> for Species {
    fn from(s: &str) -> Self {
        Species::new(s)
    }
}

impl From<Species> for String {
    fn from(s: Species) -> Self {
        s.0
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let sp = Species::new("  Pinus   Sylvestris ");
        assert_eq!(sp.name(), "pinus sylvestris");
    }

    #[test]
    fn test_genus() {
        assert_eq!(Species::new("Picea abies").genus(), "picea");
        assert_eq!(Species::new("betula").genus(), "betula");
    }

    #[test]
    fn test_genus_only() {
        assert!(Species::new("betula").is_genus_only());
        assert!(!Species::new("betula pendula").is_genus_only());
    }

    #[test]
    fn test_equality_after_normalization() {
        assert_eq!(Species::new("PICEA ABIES"), Species::from("picea abies"));
    }

    #[test]
    fn test_json_roundtrip_is_plain_string() {
        let sp = Species::new("Fagus sylvatica");
        let json = serde_json::to_string(&sp).unwrap();
        assert_eq!(json, "\"fagus sylvatica\"");
        let back: Species = serde_json::from_str("\"Fagus Sylvatica\"").unwrap();
        assert_eq!(back, sp);
    }
}
