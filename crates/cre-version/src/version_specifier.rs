//! Version specifiers: `>=1.16,<2.0`, `==1.*`, and similar PEP 440 range
//! expressions, plus their conjunction, [`SpecifierSet`].

use std::fmt;
use std::ops::BitAnd;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// `~=` `==` `!=` `<=` `>=` `<` `>`, plus whether the right-hand side ends
/// in a `.*` wildcard (only meaningful for `==`/`!=`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Operator {
    /// `==`
    Equal,
    /// `== X.Y.*`
    EqualStar,
    /// `!=`
    NotEqual,
    /// `!= X.Y.*`
    NotEqualStar,
    /// `~=`
    TildeEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqual,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal | Self::EqualStar => "==",
            Self::NotEqual | Self::NotEqualStar => "!=",
            Self::TildeEqual => "~=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
        })
    }
}

/// One `OP version` clause, e.g. `>=1.16`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VersionSpecifier {
    operator: Operator,
    version: Version,
}

/// Error returned when a specifier clause can't be parsed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("`{0}` is not a valid version specifier")]
pub struct VersionSpecifierParseError(String);

impl FromStr for VersionSpecifier {
    type Err = VersionSpecifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (operator_str, rest) = split_operator(s).ok_or_else(|| invalid(s))?;
        let rest = rest.trim();
        let star = rest.ends_with(".*");
        let version_str = rest.strip_suffix(".*").unwrap_or(rest);
        let version = version_str
            .parse::<Version>()
            .map_err(|_| invalid(s))?;

        let operator = match (operator_str, star) {
            ("==", false) => Operator::Equal,
            ("==", true) => Operator::EqualStar,
            ("!=", false) => Operator::NotEqual,
            ("!=", true) => Operator::NotEqualStar,
            ("~=", false) => Operator::TildeEqual,
            ("~=", true) => return Err(invalid(s)),
            ("<", false) => Operator::LessThan,
            ("<=", false) => Operator::LessThanEqual,
            (">", false) => Operator::GreaterThan,
            (">=", false) => Operator::GreaterThanEqual,
            _ => return Err(invalid(s)),
        };

        if operator == Operator::TildeEqual && version.release().len() < 2 {
            return Err(invalid(s));
        }

        Ok(Self { operator, version })
    }
}

fn invalid(s: &str) -> VersionSpecifierParseError {
    VersionSpecifierParseError(s.to_string())
}

fn split_operator(s: &str) -> Option<(&str, &str)> {
    for op in ["~=", "==", "!=", "<=", ">=", "<", ">"] {
        if let Some(rest) = s.strip_prefix(op) {
            return Some((op, rest));
        }
    }
    None
}

impl VersionSpecifier {
    /// Build an exact-equality specifier, e.g. for pinning a resolved version.
    pub fn equals_version(version: Version) -> Self {
        Self {
            operator: Operator::Equal,
            version,
        }
    }

    /// The comparison operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The right-hand-side version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Whether `version` satisfies this clause. Pre-releases are always
    /// admissible (spec.md §3: "Pre-releases are always admissible"),
    /// unlike the real PEP 440 matching rule which hides them unless
    /// explicitly requested.
    pub fn contains(&self, version: &Version) -> bool {
        match self.operator {
            Operator::Equal => self.version == *version,
            Operator::NotEqual => self.version != *version,
            Operator::EqualStar => release_prefix_matches(&self.version, version),
            Operator::NotEqualStar => !release_prefix_matches(&self.version, version),
            Operator::LessThan => *version < self.version,
            Operator::LessThanEqual => *version <= self.version,
            Operator::GreaterThan => *version > self.version,
            Operator::GreaterThanEqual => *version >= self.version,
            Operator::TildeEqual => {
                let (lower, upper_prefix) = tilde_bounds(&self.version);
                *version >= lower && release_prefix_matches(&upper_prefix, version)
            }
        }
    }
}

/// `release_prefix_matches(pattern, version)`: does `version`'s release
/// start with `pattern`'s release segments (the segments named before the
/// `.*`)?
fn release_prefix_matches(pattern: &Version, version: &Version) -> bool {
    let prefix = pattern.release();
    let actual = version.release();
    if actual.len() < prefix.len() {
        return prefix.iter().zip(actual.iter().chain(std::iter::repeat(&0))).all(|(p, a)| p == a);
    }
    actual[..prefix.len()] == *prefix
}

/// `~=V.N` means `>=V.N, ==V.*` with the last release segment dropped from
/// the wildcard, e.g. `~=2.2.1` is `>=2.2.1, ==2.2.*`.
fn tilde_bounds(version: &Version) -> (Version, Version) {
    let mut prefix: Vec<u64> = version.release().to_vec();
    prefix.pop();
    (version.clone(), Version::new(prefix))
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)?;
        if matches!(self.operator, Operator::EqualStar | Operator::NotEqualStar) {
            write!(f, ".*")?;
        }
        Ok(())
    }
}

/// A conjunction of [`VersionSpecifier`] clauses, e.g. `>=1.16,<2.0`. An
/// empty set admits every version.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SpecifierSet(#[serde(with = "spec_serde")] Vec<VersionSpecifier>);

mod spec_serde {
    use super::VersionSpecifier;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(specs: &[VersionSpecifier], s: S) -> Result<S::Ok, S::Error> {
        let joined = specs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        joined.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<VersionSpecifier>, D::Error> {
        let raw = String::deserialize(d)?;
        super::SpecifierSet::from_str(&raw)
            .map(|set| set.0)
            .map_err(serde::de::Error::custom)
    }
}

impl FromStr for SpecifierSet {
    type Err = VersionSpecifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self(Vec::new()));
        }
        let specs = s
            .split(',')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(VersionSpecifier::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(specs))
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}

impl SpecifierSet {
    /// A set with no clauses, which admits every version.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Whether `version` satisfies every clause in the set.
    pub fn contains(&self, version: &Version) -> bool {
        self.0.iter().all(|spec| spec.contains(version))
    }

    /// The individual clauses.
    pub fn iter(&self) -> impl Iterator<Item = &VersionSpecifier> {
        self.0.iter()
    }

    /// Whether this set has no clauses.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl BitAnd for SpecifierSet {
    type Output = Self;

    /// The logical intersection: a version must satisfy every clause from
    /// either side. Identical clauses are deduplicated.
    fn bitand(self, rhs: Self) -> Self {
        let mut clauses = self.0;
        for clause in rhs.0 {
            if !clauses.contains(&clause) {
                clauses.push(clause);
            }
        }
        Self(clauses)
    }
}

impl BitAnd<&SpecifierSet> for &SpecifierSet {
    type Output = SpecifierSet;

    fn bitand(self, rhs: &SpecifierSet) -> SpecifierSet {
        self.clone() & rhs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_comparisons() {
        let v: Version = "1.21.0".parse().unwrap();
        assert!(">=1.16".parse::<VersionSpecifier>().unwrap().contains(&v));
        assert!("<2.0".parse::<VersionSpecifier>().unwrap().contains(&v));
        assert!(!">2.0".parse::<VersionSpecifier>().unwrap().contains(&v));
        assert!("!=1.20.0"
            .parse::<VersionSpecifier>()
            .unwrap()
            .contains(&v));
    }

    #[test]
    fn wildcard_matches_prefix() {
        let v: Version = "1.21.3".parse().unwrap();
        assert!("==1.21.*".parse::<VersionSpecifier>().unwrap().contains(&v));
        assert!(!"==1.20.*"
            .parse::<VersionSpecifier>()
            .unwrap()
            .contains(&v));
    }

    #[test]
    fn tilde_equal_is_bounded_wildcard() {
        let low: Version = "2.2.0".parse().unwrap();
        let in_range: Version = "2.2.9".parse().unwrap();
        let too_new: Version = "2.3.0".parse().unwrap();
        let spec: VersionSpecifier = "~=2.2.0".parse().unwrap();
        assert!(spec.contains(&low));
        assert!(spec.contains(&in_range));
        assert!(!spec.contains(&too_new));
    }

    #[test]
    fn prereleases_always_admissible() {
        let v: Version = "2.0.0a1".parse().unwrap();
        assert!(">=1.0".parse::<VersionSpecifier>().unwrap().contains(&v));
    }

    #[test]
    fn specifier_set_is_conjunctive() {
        let set: SpecifierSet = ">=1.16, <2.0".parse().unwrap();
        assert!(set.contains(&"1.21.0".parse().unwrap()));
        assert!(!set.contains(&"2.0.0".parse().unwrap()));
        assert!(!set.contains(&"1.0.0".parse().unwrap()));
    }

    #[test]
    fn intersection_unions_clauses() {
        let a: SpecifierSet = ">=1.0".parse().unwrap();
        let b: SpecifierSet = "<3.0".parse().unwrap();
        let combined = a & b;
        assert!(combined.contains(&"2.0".parse().unwrap()));
        assert!(!combined.contains(&"3.0".parse().unwrap()));
        assert!(!combined.contains(&"0.5".parse().unwrap()));
    }

    #[test]
    fn empty_set_admits_everything() {
        let set = SpecifierSet::empty();
        assert!(set.contains(&"0.0.1".parse().unwrap()));
    }
}
