//! An in-memory `KnowledgeGraph` used as a fixture in tests and as the
//! backend behind `cre-cli`'s `--kg` flag. The real backend (a graph
//! database answering the same six queries) is out of scope per spec.md §1;
//! this is the seam a downstream integrator swaps it in at.

use rustc_hash::FxHashMap;

use crate::trait_def::{KgError, KnowledgeGraph};
use crate::types::{InstallStatus, ModuleId, ModuleInfo, PackageId, RequireSubgraph, VersionId, VersionInfo};

/// An in-memory knowledge graph, built incrementally with [`MemoryKgBuilder`].
#[derive(Debug, Clone, Default)]
pub struct MemoryKg {
    modules: Vec<ModuleInfo>,
    // Module -[:HAS_MODULE]-> Module (submodule containment).
    module_children: FxHashMap<ModuleId, Vec<ModuleId>>,
    // Module -[:HAS_ATTRIBUTE]-> Attribute.
    module_attributes: FxHashMap<ModuleId, Vec<String>>,
    versions: Vec<VersionInfo>,
    // Version -[:HAS_MODULE]-> Module (the top-level module a version exposes).
    version_top_module: FxHashMap<VersionId, ModuleId>,
    // Package -[:HAS_VERSION]-> Version.
    package_versions: FxHashMap<PackageId, Vec<VersionId>>,
    // Version -[:REQUIRES {requirement}]-> Package.
    requires: FxHashMap<VersionId, Vec<(PackageId, String)>>,
}

impl MemoryKg {
    fn module_id(&self, idx: usize) -> ModuleId {
        ModuleId(idx as u64)
    }

    fn version_id(&self, idx: usize) -> VersionId {
        VersionId(idx as u64)
    }
}

impl KnowledgeGraph for MemoryKg {
    fn module_by_name(&self, name: &str) -> Result<Vec<(ModuleId, bool)>, KgError> {
        Ok(self
            .modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == name)
            .map(|(i, m)| (self.module_id(i), m.import_status))
            .collect())
    }

    fn submodules_within(
        &self,
        top_id: ModuleId,
        max_hop: u32,
        acc: &mut FxHashMap<ModuleId, Vec<String>>,
    ) -> Result<(), KgError> {
        let entry = acc.entry(top_id).or_default();
        let mut frontier = vec![top_id];
        let mut hop = 0;
        while hop < max_hop && !frontier.is_empty() {
            let mut next = Vec::new();
            for node in frontier {
                if let Some(children) = self.module_children.get(&node) {
                    for &child in children {
                        let info = self.module_at(child)?;
                        if info.import_status {
                            entry.push(info.name.clone());
                        }
                        next.push(child);
                    }
                }
            }
            frontier = next;
            hop += 1;
        }
        Ok(())
    }

    fn attributes_of(
        &self,
        module_ids: &[ModuleId],
        submodule_names: &[String],
        acc: &mut FxHashMap<ModuleId, Vec<String>>,
    ) -> Result<(), KgError> {
        for &top in module_ids {
            // HAS_MODULE*0.. : the module itself plus every descendant.
            let mut stack = vec![top];
            let mut seen = vec![top];
            while let Some(node) = stack.pop() {
                let info = self.module_at(node)?;
                if submodule_names.iter().any(|n| n == &info.name) {
                    if let Some(attrs) = self.module_attributes.get(&node) {
                        let entry = acc.entry(top).or_default();
                        for attr in attrs {
                            entry.push(format!("{}.{attr}", info.name));
                        }
                    }
                }
                if let Some(children) = self.module_children.get(&node) {
                    for &child in children {
                        if !seen.contains(&child) {
                            seen.push(child);
                            stack.push(child);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn packages_versions_of(
        &self,
        module_ids: &[ModuleId],
    ) -> Result<FxHashMap<PackageId, Vec<VersionId>>, KgError> {
        let mut ret: FxHashMap<PackageId, Vec<VersionId>> = FxHashMap::default();
        for (&vid, &top) in &self.version_top_module {
            if module_ids.contains(&top) {
                let info = self.version_at(vid)?;
                ret.entry(info.package.clone()).or_default().push(vid);
            }
        }
        Ok(ret)
    }

    fn require_subgraph(&self, package_names: &[PackageId]) -> Result<RequireSubgraph, KgError> {
        let mut sub = RequireSubgraph::default();
        let mut seen_packages: Vec<PackageId> = Vec::new();
        let mut seen_versions: Vec<VersionId> = Vec::new();
        let mut frontier_packages = package_names.to_vec();

        while let Some(pkg) = frontier_packages.pop() {
            if seen_packages.contains(&pkg) {
                continue;
            }
            seen_packages.push(pkg.clone());

            // Mirrors `MATCH (startNode:Package) WHERE startNode.name in
            // package_list`: a name with no matching node simply isn't part
            // of the result, seed or not.
            let Some(version_ids) = self.package_versions.get(&pkg) else {
                continue;
            };
            sub.packages.push(pkg.clone());
            for &vid in version_ids {
                sub.has_version.push((pkg.clone(), vid));
                if seen_versions.contains(&vid) {
                    continue;
                }
                seen_versions.push(vid);
                let info = self.version_at(vid)?;
                sub.versions.push((vid, info.clone()));

                if let Some(reqs) = self.requires.get(&vid) {
                    for (req_pkg, requirement) in reqs {
                        sub.requires
                            .push((vid, req_pkg.clone(), requirement.clone()));
                        if !seen_packages.contains(req_pkg) {
                            frontier_packages.push(req_pkg.clone());
                        }
                    }
                }
            }
        }

        Ok(sub)
    }

    fn module_info(&self, id: ModuleId) -> Result<ModuleInfo, KgError> {
        self.module_at(id).map(Clone::clone)
    }

    fn version_info(&self, id: VersionId) -> Result<VersionInfo, KgError> {
        self.version_at(id).map(Clone::clone)
    }
}

impl MemoryKg {
    fn module_at(&self, id: ModuleId) -> Result<&ModuleInfo, KgError> {
        self.modules
            .get(id.0 as usize)
            .ok_or_else(|| KgError::UnknownId(id.to_string()))
    }

    fn version_at(&self, id: VersionId) -> Result<&VersionInfo, KgError> {
        self.versions
            .get(id.0 as usize)
            .ok_or_else(|| KgError::UnknownId(id.to_string()))
    }
}

/// Builds a [`MemoryKg`] fixture node by node.
#[derive(Debug, Clone, Default)]
pub struct MemoryKgBuilder {
    kg: MemoryKg,
}

impl MemoryKgBuilder {
    /// Start an empty fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level `Module` node (no parent).
    pub fn add_module(&mut self, name: &str, import_status: bool) -> ModuleId {
        self.kg.modules.push(ModuleInfo {
            name: name.to_string(),
            import_status,
        });
        ModuleId((self.kg.modules.len() - 1) as u64)
    }

    /// Register a `Module` node nested under `parent` via `HAS_MODULE`.
    pub fn add_submodule(&mut self, parent: ModuleId, name: &str, import_status: bool) -> ModuleId {
        let id = self.add_module(name, import_status);
        self.kg.module_children.entry(parent).or_default().push(id);
        id
    }

    /// Attach an `Attribute` to a module via `HAS_ATTRIBUTE`.
    pub fn add_attribute(&mut self, module: ModuleId, attr_name: &str) {
        self.kg
            .module_attributes
            .entry(module)
            .or_default()
            .push(attr_name.to_string());
    }

    /// Register a `Version` of `package` exposing `top_module` via
    /// `HAS_MODULE`, linked to its package via `HAS_VERSION`.
    pub fn add_version(
        &mut self,
        package: &str,
        version: &str,
        install_status: InstallStatus,
        top_module: ModuleId,
    ) -> VersionId {
        let package = cre_version::canonicalize_name(package);
        let parsed = version
            .parse()
            .unwrap_or_else(|_| panic!("fixture version `{version}` must be valid PEP 440"));
        self.kg.versions.push(VersionInfo {
            package: package.clone(),
            version: parsed,
            install_status,
        });
        let id = VersionId((self.kg.versions.len() - 1) as u64);
        self.kg
            .package_versions
            .entry(package)
            .or_default()
            .push(id);
        self.kg.version_top_module.insert(id, top_module);
        id
    }

    /// Record that `version` requires `package` under `requirement`
    /// (a `SpecifierSet`-parseable string, e.g. `">=3,<4"`) via `REQUIRES`.
    pub fn add_requirement(&mut self, version: VersionId, package: &str, requirement: &str) {
        let package = cre_version::canonicalize_name(package);
        self.kg
            .requires
            .entry(version)
            .or_default()
            .push((package, requirement.to_string()));
    }

    /// Finish building.
    pub fn build(self) -> MemoryKg {
        self.kg
    }
}
