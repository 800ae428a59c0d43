//! Package name canonicalization, per [PEP 503](https://peps.python.org/pep-0503/#normalized-names):
//! lowercase, with runs of `-`, `_`, and `.` collapsed to a single `-`.

use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATOR_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_.]+").expect("valid regex"));

/// Canonicalize a package name. Idempotent: canonicalizing an already
/// canonical name returns it unchanged.
pub fn canonicalize_name(name: &str) -> String {
    SEPARATOR_RUN_RE
        .replace_all(&name.to_ascii_lowercase(), "-")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::canonicalize_name;

    #[test]
    fn lowercases_and_collapses_separators() {
        assert_eq!(canonicalize_name("Foo_Bar.Baz"), "foo-bar-baz");
        assert_eq!(canonicalize_name("foo--bar"), "foo-bar");
        assert_eq!(canonicalize_name("MyCorp_Widget"), "mycorp-widget");
    }

    #[test]
    fn is_idempotent() {
        let once = canonicalize_name("Foo__Bar");
        let twice = canonicalize_name(&once);
        assert_eq!(once, twice);
    }
}
