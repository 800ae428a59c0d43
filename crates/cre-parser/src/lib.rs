//! The parser adapter contract (spec.md §6.1) plus a lexical reference
//! implementation.
//!
//! Static analysis of the snippet — turning source text into the
//! `imports`/`resources`/`attrs` name sets — is explicitly out of scope for
//! the core (spec.md §1): production deployments plug in a real per-dialect
//! AST walker (the original system ran one inside a sandboxed interpreter
//! container per dialect). [`lexical::LexicalParser`] is a line-oriented
//! stand-in good enough to drive the orchestrator end to end in tests and
//! in `cre-cli`'s default mode, grounded in the same three name sets the
//! original's `ast.NodeVisitor` produced.

#![deny(missing_docs)]

mod lexical;

use std::collections::BTreeSet;
use std::fmt;

pub use lexical::LexicalParser;

/// Which of the two mutually-incompatible dialects a snippet targets.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, serde::Serialize)]
pub enum Dialect {
    /// The older, more permissive dialect.
    D2,
    /// The newer dialect.
    D3,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::D2 => "D2",
            Self::D3 => "D3",
        })
    }
}

/// The three name sets a dialect's parser extracts from a snippet
/// (spec.md §6.1).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ParsedSnippet {
    /// Fully qualified dotted names from `import X.Y` or `from X import …`,
    /// where `X` is not part of the dialect's standard library.
    pub imports: BTreeSet<String>,
    /// `module.alias` for each `from module import alias`; may turn out to
    /// be either a submodule or an attribute.
    pub resources: BTreeSet<String>,
    /// The longest dotted attribute-access path off an imported identifier,
    /// post-alias-resolution.
    pub attrs: BTreeSet<String>,
}

impl ParsedSnippet {
    /// Total count of observed imports plus resources — used to break ties
    /// between dialects that both fail to parse otherwise-parseable
    /// snippets (spec.md §15 / the original's dialect pre-filter).
    pub fn third_party_name_count(&self) -> usize {
        self.imports.len() + self.resources.len()
    }
}

/// Adapts a source-code analyzer for one dialect to the contract the
/// ranker consumes. Returns `None` if the snippet does not parse under this
/// dialect at all.
pub trait DialectParser {
    /// Which dialect this parser implements.
    fn dialect(&self) -> Dialect;

    /// Parse `source`, returning the three name sets, or `None` if `source`
    /// isn't valid under this dialect.
    fn parse(&self, source: &str) -> Option<ParsedSnippet>;
}
