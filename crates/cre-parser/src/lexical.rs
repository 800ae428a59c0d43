//! A line-oriented stand-in for a real per-dialect AST walker, grounded in
//! the import/resource/attribute extraction `ParserVisitor` performs over a
//! real syntax tree. This module never builds a tree; it pattern-matches
//! import statements and attribute chains directly against the source text,
//! which is sufficient to exercise the ranker and resolver without a full
//! front end for either dialect.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Dialect, DialectParser, ParsedSnippet};

/// Modules considered part of both dialects' standard library and therefore
/// never third-party. Not exhaustive — a real implementation resolves this
/// by asking the interpreter, as `ParserVisitor.is_standard_library` does.
const STD_LIB: &[&str] = &[
    "os", "sys", "re", "io", "json", "math", "time", "datetime", "itertools",
    "functools", "collections", "abc", "typing", "copy", "random", "string",
    "subprocess", "threading", "asyncio", "unittest", "logging", "argparse",
    "pathlib", "shutil", "socket", "struct", "enum", "dataclasses", "contextlib",
    "urllib", "http", "email", "csv", "sqlite3", "hashlib", "base64", "pickle",
    "queue", "traceback", "warnings", "inspect", "textwrap", "glob", "tempfile",
    "array", "bisect", "heapq", "operator", "weakref", "gc", "platform",
];

fn is_standard_library(top_module: &str) -> bool {
    STD_LIB.contains(&top_module)
}

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*import\s+([A-Za-z_][\w.]*)(?:\s+as\s+(\w+))?").unwrap()
});

static FROM_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*from\s+([A-Za-z_][\w.]*)\s+import\s+(.+)$").unwrap()
});

static FROM_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z_]\w*)(?:\s+as\s+(\w+))?").unwrap()
});

static ATTR_CHAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)+)\b").unwrap()
});

static LEGACY_PRINT_STMT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*print\s+[^(\s]"#).unwrap()
});

static LEGACY_EXCEPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*except\s+[\w.]+\s*,\s*\w+\s*:").unwrap()
});

static FSTRING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bf["']"#).unwrap());

static ASYNC_AWAIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(async\s+def|await\s)").unwrap()
});

/// Extracts `imports`, `resources`, `mappings` (used-name → full dotted
/// name) and `attrs` the same way for either dialect; only the
/// parseability gate in [`D2Parser`]/[`D3Parser`] differs.
fn scan(source: &str) -> ParsedSnippet {
    let mut imports = BTreeSet::new();
    let mut resources = BTreeSet::new();
    let mut mappings: Vec<(String, String)> = Vec::new();
    let mut used_names: Vec<String> = Vec::new();

    for caps in IMPORT_RE.captures_iter(source) {
        let full = caps.get(1).unwrap().as_str().to_string();
        let top = full.split('.').next().unwrap_or(&full).to_string();
        if is_standard_library(&top) {
            continue;
        }
        imports.insert(full.clone());
        if let Some(alias) = caps.get(2) {
            let alias = alias.as_str().to_string();
            mappings.push((alias.clone(), full));
            used_names.push(alias);
        } else {
            used_names.push(full);
        }
    }

    for caps in FROM_IMPORT_RE.captures_iter(source) {
        let module = caps.get(1).unwrap().as_str().to_string();
        let top = module.split('.').next().unwrap_or(&module).to_string();
        if is_standard_library(&top) {
            continue;
        }
        imports.insert(module.clone());
        let items = caps.get(2).unwrap().as_str();
        for item_caps in FROM_ITEM_RE.captures_iter(items) {
            let name = item_caps.get(1).unwrap().as_str();
            if name == "import" {
                continue;
            }
            let possible_module = format!("{module}.{name}");
            resources.insert(possible_module.clone());
            let used = item_caps
                .get(2)
                .map(|a| a.as_str().to_string())
                .unwrap_or_else(|| name.to_string());
            mappings.push((used.clone(), possible_module));
            used_names.push(used);
        }
    }

    let mut attrs: BTreeSet<String> = BTreeSet::new();
    for caps in ATTR_CHAIN_RE.captures_iter(source) {
        let chain = caps.get(1).unwrap().as_str();
        let head = chain.split('.').next().unwrap();
        let Some(used) = used_names.iter().find(|n| n.as_str() == head) else {
            continue;
        };
        let resolved = match mappings.iter().find(|(alias, _)| alias == used) {
            Some((_, full)) => format!("{full}{}", &chain[head.len()..]),
            None => chain.to_string(),
        };
        // Mirror the original's "has_exist" dedup: keep only the longest
        // chain along a given prefix, never both `a.b` and `a.b.c`.
        if attrs.iter().any(|existing: &String| {
            existing.starts_with(&format!("{resolved}."))
        }) {
            continue;
        }
        attrs.retain(|existing| !resolved.starts_with(&format!("{existing}.")));
        attrs.insert(resolved);
    }

    ParsedSnippet {
        imports,
        resources,
        attrs,
    }
}

/// A dialect-agnostic lexical scanner parameterized by a `gate` that rejects
/// source using syntax the dialect can't express.
pub struct LexicalParser {
    dialect: Dialect,
}

impl LexicalParser {
    /// Build a scanner for the older dialect: rejects f-strings and
    /// `async`/`await`, the clearest dialect-3-only markers.
    pub fn d2() -> Self {
        Self { dialect: Dialect::D2 }
    }

    /// Build a scanner for the newer dialect: rejects the bare `print`
    /// statement and the two-argument `except X, e:` form, the clearest
    /// dialect-2-only markers.
    pub fn d3() -> Self {
        Self { dialect: Dialect::D3 }
    }

    fn gate(&self, source: &str) -> bool {
        match self.dialect {
            Dialect::D2 => !FSTRING_RE.is_match(source) && !ASYNC_AWAIT_RE.is_match(source),
            Dialect::D3 => {
                !LEGACY_PRINT_STMT_RE.is_match(source) && !LEGACY_EXCEPT_RE.is_match(source)
            }
        }
    }
}

impl DialectParser for LexicalParser {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn parse(&self, source: &str) -> Option<ParsedSnippet> {
        if !self.gate(source) {
            return None;
        }
        Some(scan(source))
    }
}
