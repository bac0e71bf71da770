//! Case-insensitive scope sets.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A set of scopes compared case-insensitively.
///
/// Scopes are stored lower-cased and sorted, so the space-joined form is a
/// canonical `target` for keys. Order and duplicates in the input are
/// irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    /// Creates an empty scope set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parses a space-separated scope string.
    #[must_use]
    pub fn parse(scopes: &str) -> Self {
        scopes.split_whitespace().collect()
    }

    /// Number of distinct scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set holds no scopes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `scope` is in the set (case-insensitive).
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(&scope.to_lowercase())
    }

    /// Returns true if every scope of `other` is in this set.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        self.0.is_superset(&other.0)
    }

    /// Returns true if the two sets share at least one scope.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    /// Iterates scopes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Space-joined canonical form.
    #[must_use]
    pub fn to_target(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

impl<S: AsRef<str>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl FromStr for ScopeSet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_target())
    }
}

impl Serialize for ScopeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_target())
    }
}

impl<'de> Deserialize<'de> for ScopeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_order_insensitive() {
        let a = ScopeSet::parse("R1/Scope2  r1/scope1 r1/SCOPE1");
        let b: ScopeSet = ["r1/scope1", "r1/scope2"].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_target(), "r1/scope1 r1/scope2");
        assert!(a.contains("R1/SCOPE2"));
    }

    #[test]
    fn test_superset_and_intersection() {
        let cached = ScopeSet::parse("r1/scope1 r1/scope2");
        assert!(cached.is_superset_of(&ScopeSet::parse("R1/SCOPE1")));
        assert!(cached.is_superset_of(&cached));
        assert!(!cached.is_superset_of(&ScopeSet::parse("r1/scope1 other")));
        assert!(cached.intersects(&ScopeSet::parse("r1/scope1 other")));
        assert!(!cached.intersects(&ScopeSet::parse("other")));
    }

    #[test]
    fn test_serde_as_target_string() {
        let scopes = ScopeSet::parse("b a");
        let json = serde_json::to_string(&scopes).unwrap();
        assert_eq!(json, "\"a b\"");
        let back: ScopeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scopes);
    }
}
