//! A serializable on-disk fixture format for [`MemoryKg`](crate::memory::MemoryKg) —
//! the seam `cre-cli`'s `--kg <path>` flag loads through (spec.md §13). The
//! real graph-database backend is out of scope; this is the JSON shape a
//! downstream integrator's offline fixtures, or this crate's own test data,
//! can take instead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::memory::{MemoryKg, MemoryKgBuilder};
use crate::types::{InstallStatus, ModuleId};

/// A `Module` node plus its `HAS_ATTRIBUTE` and nested `HAS_MODULE` edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleFixture {
    /// Dotted module name.
    pub name: String,
    /// Whether this module imports successfully.
    #[serde(default)]
    pub import_status: bool,
    /// Attribute names attached directly to this module.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Nested `Module` children.
    #[serde(default)]
    pub submodules: Vec<ModuleFixture>,
}

/// A requirement a version carries, mirroring one `REQUIRES` edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementFixture {
    /// The required package's name (canonicalized on load).
    pub package: String,
    /// A `SpecifierSet`-parseable requirement string, e.g. `">=1,<2"`.
    pub specifier: String,
}

/// A `Version` node under a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionFixture {
    /// A PEP 440-parseable version string.
    pub version: String,
    /// This release's install outcome.
    pub install_status: InstallStatus,
    /// Packages this version requires.
    #[serde(default)]
    pub requires: Vec<RequirementFixture>,
}

/// A `Package` node: its versions, and the single top-level module they all
/// expose via `HAS_MODULE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageFixture {
    /// The package's name (canonicalized on load).
    pub name: String,
    /// Name of the `Module` this package's versions expose — must match a
    /// [`ModuleFixture::name`] somewhere in the same fixture.
    pub top_module: String,
    /// This package's versions.
    pub versions: Vec<VersionFixture>,
}

/// The full on-disk shape of a [`MemoryKg`] fixture.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KgFixture {
    /// Top-level `Module` nodes (with their nested submodules).
    #[serde(default)]
    pub modules: Vec<ModuleFixture>,
    /// `Package` nodes.
    #[serde(default)]
    pub packages: Vec<PackageFixture>,
}

impl KgFixture {
    /// Parse a fixture from its JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Build the in-memory knowledge graph this fixture describes.
    ///
    /// # Panics
    ///
    /// Panics if a [`PackageFixture::top_module`] names no module in the
    /// fixture, or a version/requirement string fails to parse — this is a
    /// malformed fixture, not a runtime condition callers should recover
    /// from.
    pub fn build(&self) -> MemoryKg {
        let mut builder = MemoryKgBuilder::new();
        let mut module_ids: HashMap<String, ModuleId> = HashMap::new();
        for module in &self.modules {
            add_module_tree(&mut builder, None, module, &mut module_ids);
        }

        for package in &self.packages {
            let &top = module_ids.get(&package.top_module).unwrap_or_else(|| {
                panic!(
                    "fixture package `{}` names unknown top_module `{}`",
                    package.name, package.top_module
                )
            });
            for version in &package.versions {
                let vid = builder.add_version(&package.name, &version.version, version.install_status, top);
                for req in &version.requires {
                    builder.add_requirement(vid, &req.package, &req.specifier);
                }
            }
        }

        builder.build()
    }
}

fn add_module_tree(
    builder: &mut MemoryKgBuilder,
    parent: Option<ModuleId>,
    module: &ModuleFixture,
    ids: &mut HashMap<String, ModuleId>,
) {
    let id = match parent {
        Some(parent) => builder.add_submodule(parent, &module.name, module.import_status),
        None => builder.add_module(&module.name, module.import_status),
    };
    ids.insert(module.name.clone(), id);
    for attr in &module.attributes {
        builder.add_attribute(id, attr);
    }
    for sub in &module.submodules {
        add_module_tree(builder, Some(id), sub, ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KnowledgeGraph;

    #[test]
    fn round_trips_modules_packages_and_requirements() {
        let json = r#"{
            "modules": [
                {
                    "name": "numpy",
                    "import_status": true,
                    "attributes": ["array"],
                    "submodules": [
                        { "name": "numpy.linalg", "import_status": true, "attributes": ["norm"] }
                    ]
                },
                { "name": "corelib", "import_status": false }
            ],
            "packages": [
                {
                    "name": "numpy",
                    "top_module": "numpy",
                    "versions": [
                        { "version": "1.21.0", "install_status": "Success", "requires": [
                            { "package": "corelib", "specifier": ">=1" }
                        ] },
                        { "version": "1.22.0", "install_status": "Fail" }
                    ]
                },
                {
                    "name": "corelib",
                    "top_module": "corelib",
                    "versions": [
                        { "version": "2.0.0", "install_status": "Success" }
                    ]
                }
            ]
        }"#;

        let fixture = KgFixture::from_json(json).unwrap();
        let kg = fixture.build();

        let hits = kg.module_by_name("numpy").unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].1);

        let sub = kg.require_subgraph(&["numpy".to_string()]).unwrap();
        assert!(sub.packages.contains(&"numpy".to_string()));
        assert!(sub.packages.contains(&"corelib".to_string()));
        assert_eq!(sub.requires.len(), 1);
    }
}
