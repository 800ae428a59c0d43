//! Version ordering and specifier matching — component A of the dependency
//! inference engine.
//!
//! Parses version strings in the style of
//! [PEP 440](https://peps.python.org/pep-0440), gives them a total order,
//! and evaluates version-specifier sets (`>=1.16,<2.0`) against them. Also
//! owns package-name canonicalization, since every other component must
//! agree on one canonical spelling of a package name.

#![deny(missing_docs)]

mod canonicalize;
mod version;
mod version_specifier;

pub use canonicalize::canonicalize_name;
pub use version::{LocalSegment, Prerelease, PrereleaseKind, Version, VersionParseError};
pub use version_specifier::{
    Operator, SpecifierSet, VersionSpecifier, VersionSpecifierParseError,
};
