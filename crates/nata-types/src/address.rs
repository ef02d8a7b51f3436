use std::fmt;

use serde::{Deserialize, Serialize};

/// Wallet address supplied by the identity provider.
///
/// The engine never verifies signatures against an address; it only needs
/// equality, and equality ignores case (`0xABC` and `0xabc` are the same
/// member, as are `ÄLICE` and `älice`). The spelling as supplied is kept for
/// display.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The address exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unicode-lowercased form; equality and hashing both go through it.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 || self.normalized() == other.normalized()
    }
}

impl Eq for Address {}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_case() {
        assert_eq!(Address::from("0xAbC"), Address::from("0xabc"));
        assert_ne!(Address::from("0xabc"), Address::from("0xabd"));
    }

    #[test]
    fn equality_ignores_non_ascii_case() {
        assert_eq!(Address::from("ÄLICE"), Address::from("älice"));
        assert_eq!(Address::from("ÄLICE").normalized(), "älice");
        assert_ne!(Address::from("älice"), Address::from("alice"));
    }

    #[test]
    fn hash_agrees_with_eq() {
        let mut set = HashSet::new();
        set.insert(Address::from("0xDEAD"));
        set.insert(Address::from("ÉMILE"));
        assert!(set.contains(&Address::from("0xdead")));
        assert!(set.contains(&Address::from("émile")));
    }

    #[test]
    fn display_keeps_supplied_spelling() {
        let addr = Address::from("0xBeeF");
        assert_eq!(addr.to_string(), "0xBeeF");
        assert_eq!(addr.normalized(), "0xbeef");
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&Address::from("0xabc")).unwrap();
        assert_eq!(json, "\"0xabc\"");
    }

    #[test]
    fn blank_is_empty() {
        assert!(Address::from("  ").is_empty());
        assert!(!Address::from("0x1").is_empty());
    }

    proptest::proptest! {
        #[test]
        fn case_variants_are_the_same_member(raw in "0x[0-9a-fA-F]{1,40}") {
            let upper = Address::new(raw.to_ascii_uppercase());
            let lower = Address::new(raw.to_ascii_lowercase());
            proptest::prop_assert_eq!(upper, lower);
        }
    }
}
