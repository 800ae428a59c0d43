//! A version number such as `1.2.3` or `4!5.6.7-a8.post9.dev0`, following
//! [PEP 440](https://peps.python.org/pep-0440).
//!
//! Beware that the ordering implemented with [`Ord`] is not consistent with
//! the operators from a [`VersionSpecifier`](crate::VersionSpecifier):
//! comparing two versions in Rust with `>` is not the same as matching one
//! against a specifier with `>`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The `a`/`b`/`rc` part of a pre-release, e.g. the `b` in `1.2.3b4`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PrereleaseKind {
    /// `a`, `alpha`
    Alpha,
    /// `b`, `beta`
    Beta,
    /// `c`, `rc`, `pre`, `preview`
    ReleaseCandidate,
}

impl fmt::Display for PrereleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::ReleaseCandidate => "rc",
        })
    }
}

/// A pre-release segment, e.g. `a8` in `1.2.3a8`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Prerelease {
    /// `a`, `b`, or `rc`
    pub kind: PrereleaseKind,
    /// the number after the letter, `0` if omitted
    pub number: u64,
}

impl fmt::Display for Prerelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.number)
    }
}

/// One segment of a local version, e.g. `ubuntu` and `1` in `1.2.3+ubuntu.1`.
///
/// Segments are typed so that numeric segments sort as numbers and
/// alphanumeric segments sort as strings, with numeric segments always
/// sorting greater than string segments, matching PEP 440's local version
/// ordering rules.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum LocalSegment {
    /// A segment consisting entirely of ASCII digits.
    Number(u64),
    /// Any other alphanumeric segment, lowercased.
    String(String),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl PartialOrd for LocalSegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocalSegment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            // Numeric segments always sort greater than alphanumeric ones.
            (Self::Number(_), Self::String(_)) => Ordering::Greater,
            (Self::String(_), Self::Number(_)) => Ordering::Less,
        }
    }
}

/// A parsed PEP 440 version.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<Prerelease>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

/// Error returned when a version string does not follow PEP 440.
#[derive(Debug, Clone, thiserror::Error)]
#[error("`{0}` is not a valid PEP 440 version")]
pub struct VersionParseError(String);

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?xi)
        ^\s* v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?:
            [-_.]?
            (?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)
            [-_.]?
            (?P<pre_n>[0-9]+)?
        )?
        (?:
            (?:-(?P<post_n1>[0-9]+))
            |
            (?:[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?)
        )?
        (?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>[0-9]+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$
        ",
    )
    .expect("static regex is valid")
});

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = VERSION_RE
            .captures(s)
            .ok_or_else(|| VersionParseError(s.to_string()))?;

        let epoch = caps
            .name("epoch")
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0);

        let release = caps["release"]
            .split('.')
            .map(|segment| segment.parse().unwrap_or(0))
            .collect::<Vec<u64>>();

        let pre = caps.name("pre_l").map(|m| {
            let kind = match m.as_str().to_ascii_lowercase().as_str() {
                "a" | "alpha" => PrereleaseKind::Alpha,
                "b" | "beta" => PrereleaseKind::Beta,
                _ => PrereleaseKind::ReleaseCandidate,
            };
            let number = caps
                .name("pre_n")
                .map(|m| m.as_str().parse().unwrap_or(0))
                .unwrap_or(0);
            Prerelease { kind, number }
        });

        let post = if let Some(m) = caps.name("post_n1") {
            Some(m.as_str().parse().unwrap_or(0))
        } else {
            caps.name("post_l").map(|_| {
                caps.name("post_n2")
                    .map(|m| m.as_str().parse().unwrap_or(0))
                    .unwrap_or(0)
            })
        };

        let dev = caps.name("dev_l").map(|_| {
            caps.name("dev_n")
                .map(|m| m.as_str().parse().unwrap_or(0))
                .unwrap_or(0)
        });

        let local = caps
            .name("local")
            .map(|m| {
                m.as_str()
                    .split(['-', '_', '.'])
                    .map(|segment| {
                        if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                            LocalSegment::Number(segment.parse().unwrap_or(0))
                        } else {
                            LocalSegment::String(segment.to_ascii_lowercase())
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl Version {
    /// Construct a version directly from a release segment, e.g. for tests.
    pub fn new(release: impl IntoIterator<Item = u64>) -> Self {
        Self {
            epoch: 0,
            release: release.into_iter().collect(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    /// The epoch, normally `0`.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The release segments, e.g. `[1, 2, 3]` for `1.2.3`.
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// The pre-release segment, if any.
    pub fn pre(&self) -> Option<Prerelease> {
        self.pre
    }

    /// The post-release number, if any.
    pub fn post(&self) -> Option<u64> {
        self.post
    }

    /// The dev-release number, if any.
    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    /// The local version segments, if any.
    pub fn local(&self) -> &[LocalSegment] {
        &self.local
    }

    /// Whether this is an alpha/beta/rc or dev version.
    pub fn any_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Whether this is a local version, e.g. `1.2.3+local`.
    pub fn is_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// The part of the ordering key that applies once release segments
    /// (compared elementwise, with missing trailing segments treated as
    /// zero) have already tied.
    ///
    /// A stable release sorts after its own pre-releases (`PreKey` maps
    /// `None` above `Some`), a post release sorts above an absent post, and
    /// a dev release sorts below an absent dev of the same post — exactly
    /// PEP 440's rules. Post is compared before dev so that e.g.
    /// `1.0.post1` < `1.0.post2.dev1`.
    fn tail_key(&self) -> (PreKey, PostKey, DevKey, &[LocalSegment]) {
        (PreKey(self.pre), PostKey(self.post), DevKey(self.dev), &self.local)
    }
}

/// Wraps `Option<Prerelease>` so that `None` (final release) sorts after
/// `Some` (pre-release) for the same release segment, matching PEP 440.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct PreKey(Option<Prerelease>);

impl Ord for PreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }
}
impl PartialOrd for PreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Wraps `Option<u64>` so that an absent post sorts *below* any post number.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct PostKey(Option<u64>);

impl Ord for PostKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }
}

impl PartialOrd for PostKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Wraps `Option<u64>` so that a dev release sorts *below* an absent dev.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct DevKey(Option<u64>);

impl Ord for DevKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }
}

impl PartialOrd for DevKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| self.tail_key().cmp(&other.tail_key()))
    }
}

/// Compares release segments elementwise, e.g. `4.3.1` > `4.2`, `1.1.0` ==
/// `1.1`, `1.16` < `1.19`.
fn compare_release(lhs: &[u64], rhs: &[u64]) -> Ordering {
    let max_len = lhs.len().max(rhs.len());
    for i in 0..max_len {
        let a = lhs.get(i).copied().unwrap_or(0);
        let b = rhs.get(i).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Equal => continue,
            non_eq => return non_eq,
        }
    }
    Ordering::Equal
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        write!(
            f,
            "{}",
            self.release
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".")
        )?;
        if let Some(pre) = self.pre {
            write!(f, "{pre}")?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{post}")?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{dev}")?;
        }
        if !self.local.is_empty() {
            write!(
                f,
                "+{}",
                self.local
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(".")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_release() {
        let v: Version = "1.2.3".parse().unwrap();
        assert_eq!(v.release(), &[1, 2, 3]);
        assert_eq!(v.epoch(), 0);
        assert!(v.pre().is_none());
        assert!(!v.any_prerelease());
    }

    #[test]
    fn parses_epoch_pre_post_dev_local() {
        let v: Version = "1!1.0a1.post2.dev3+ubuntu.1".parse().unwrap();
        assert_eq!(v.epoch(), 1);
        assert_eq!(v.release(), &[1, 0]);
        assert_eq!(
            v.pre(),
            Some(Prerelease {
                kind: PrereleaseKind::Alpha,
                number: 1
            })
        );
        assert_eq!(v.post(), Some(2));
        assert_eq!(v.dev(), Some(3));
        assert_eq!(
            v.local(),
            &[
                LocalSegment::String("ubuntu".to_string()),
                LocalSegment::Number(1)
            ]
        );
    }

    #[test]
    fn bare_dash_number_is_post_release() {
        let v: Version = "1.0-1".parse().unwrap();
        assert_eq!(v.post(), Some(1));
    }

    #[test]
    fn release_ordering_ignores_trailing_zeros() {
        let a: Version = "1.1".parse().unwrap();
        let b: Version = "1.1.0".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn stable_release_sorts_after_prerelease() {
        let pre: Version = "1.0rc1".parse().unwrap();
        let stable: Version = "1.0".parse().unwrap();
        assert!(pre < stable);
    }

    #[test]
    fn dev_sorts_below_release_without_dev() {
        let dev: Version = "1.0.dev1".parse().unwrap();
        let stable: Version = "1.0".parse().unwrap();
        assert!(dev < stable);
    }

    #[test]
    fn post_sorts_above_release_without_post() {
        let stable: Version = "1.0".parse().unwrap();
        let post: Version = "1.0.post1".parse().unwrap();
        assert!(stable < post);
    }

    #[test]
    fn post_outranks_dev_of_a_later_post() {
        let post1: Version = "1.0.post1".parse().unwrap();
        let post2_dev1: Version = "1.0.post2.dev1".parse().unwrap();
        assert!(post1 < post2_dev1);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-version!!".parse::<Version>().is_err());
    }

    #[test]
    fn display_roundtrips_normalized_form() {
        let v: Version = "1.0a1".parse().unwrap();
        assert_eq!(v.to_string(), "1.0a1");
    }
}
