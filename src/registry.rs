//! Part-type registry and the catalog of definitions found on disk.
//!
//! Constructors are registered in code under a factory key. Definitions are JSON manifests
//! discovered under the search paths; each names the factory that builds it, so a project can
//! ship retuned variants of a built-in part without code.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::foundation::config::{ProjectSettings, RigSettings};
use crate::foundation::error::{RigError, RigResult};
use crate::options::OptionValue;
use crate::part::Part;

/// Category given to definitions registered in code.
pub const BUILTIN_CATEGORY: &str = "builtin";

/// Constructor producing a fresh, unbuilt part.
pub type PartFactory = Arc<dyn Fn() -> anyhow::Result<Part> + Send + Sync>;

/// What a catalog entry defines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    /// An instantiable part type.
    Part,
    /// A replayable template.
    Template,
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Part => "part",
            Self::Template => "template",
        })
    }
}

/// One discovered or registered definition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogEntry {
    /// Type key, the manifest's file stem.
    pub part_type: String,
    /// Part or template.
    pub kind: DefinitionKind,
    /// Project name, parent directory name, or [`BUILTIN_CATEGORY`].
    pub category: String,
    /// Manifest location; `None` for code-registered parts.
    pub path: Option<PathBuf>,
    /// Registered constructor the entry instantiates through.
    pub factory: String,
    /// Option defaults applied over the constructor's.
    pub defaults: IndexMap<String, OptionValue>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    kind: Option<DefinitionKind>,
    #[serde(default)]
    factory: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    defaults: IndexMap<String, OptionValue>,
    #[serde(default)]
    template: Option<serde_json::Value>,
}

/// Discovered definitions keyed by type name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    entries: IndexMap<String, CatalogEntry>,
    project_category: Option<String>,
}

impl Catalog {
    /// Entry for a type name.
    pub fn get(&self, part_type: &str) -> Option<&CatalogEntry> {
        self.entries.get(part_type)
    }

    /// Every entry in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing was found or registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one kind.
    pub fn by_kind(&self, kind: DefinitionKind) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values().filter(move |e| e.kind == kind)
    }

    /// Distinct categories: the project's first, then alphabetical.
    pub fn categories(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .entries
            .values()
            .map(|e| e.category.clone())
            .filter(|c| Some(c) != self.project_category.as_ref())
            .collect();
        out.sort();
        out.dedup();
        if let Some(p) = &self.project_category
            && self.entries.values().any(|e| &e.category == p)
        {
            out.insert(0, p.clone());
        }
        out
    }

    /// Entries filed under `category`.
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a CatalogEntry> {
        self.entries.values().filter(move |e| e.category == category)
    }

    fn insert(&mut self, entry: CatalogEntry) {
        let project = self.project_category.as_deref();
        match self.entries.get(&entry.part_type) {
            // Project definitions shadow same-named definitions from other search paths.
            Some(existing)
                if Some(existing.category.as_str()) == project
                    && Some(entry.category.as_str()) != project =>
            {
                tracing::debug!(part_type = %entry.part_type, "keeping project definition");
            }
            Some(existing) => {
                tracing::warn!(
                    part_type = %entry.part_type,
                    previous = ?existing.path,
                    "duplicate definition, later one wins"
                );
                self.entries.insert(entry.part_type.clone(), entry);
            }
            None => {
                self.entries.insert(entry.part_type.clone(), entry);
            }
        }
    }

    /// Walk `search_paths` for JSON definitions.
    ///
    /// Unreadable or unrecognised files are skipped with a warning.
    #[tracing::instrument(skip_all, fields(paths = search_paths.len()))]
    pub fn scan(search_paths: &[PathBuf], project: Option<&ProjectSettings>) -> Self {
        let mut catalog = Catalog {
            entries: IndexMap::new(),
            project_category: project.map(|p| p.name.clone()),
        };
        for root in search_paths {
            if !root.is_dir() {
                tracing::warn!(path = %root.display(), "search path is not a directory");
                continue;
            }
            for entry in WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                    continue;
                }
                match read_manifest(path, project) {
                    Ok(Some(def)) => catalog.insert(def),
                    Ok(None) => {
                        tracing::debug!(path = %path.display(), "not a part or template definition");
                    }
                    Err(e) => tracing::warn!(path = %path.display(), "skipping definition: {e}"),
                }
            }
        }
        tracing::info!(entries = catalog.len(), "catalog scanned");
        catalog
    }
}

fn read_manifest(path: &Path, project: Option<&ProjectSettings>) -> RigResult<Option<CatalogEntry>> {
    let f = File::open(path)
        .map_err(|e| RigError::configuration(format!("open '{}': {e}", path.display())))?;
    let manifest: Manifest = serde_json::from_reader(BufReader::new(f))
        .map_err(|e| RigError::serde(format!("parse '{}': {e}", path.display())))?;

    let kind = match (&manifest.template, manifest.kind) {
        (Some(serde_json::Value::Array(_)), _) => DefinitionKind::Template,
        (_, Some(kind)) => kind,
        _ => return Ok(None),
    };
    let Some(part_type) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
        return Ok(None);
    };
    let category = match project {
        Some(p) if path.starts_with(&p.root) => p.name.clone(),
        _ => manifest.category.unwrap_or_else(|| {
            path.parent()
                .and_then(|d| d.file_name())
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_owned()
        }),
    };
    Ok(Some(CatalogEntry {
        factory: manifest.factory.unwrap_or_else(|| part_type.clone()),
        part_type,
        kind,
        category,
        path: Some(path.to_path_buf()),
        defaults: manifest.defaults,
    }))
}

/// Part constructors plus the catalog that names them.
#[derive(Clone, Default)]
pub struct PartRegistry {
    factories: HashMap<String, PartFactory>,
    catalog: Catalog,
}

impl std::fmt::Debug for PartRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.factories.keys().collect();
        keys.sort();
        f.debug_struct("PartRegistry")
            .field("factories", &keys)
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl PartRegistry {
    /// Registry without constructors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in parts.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::parts::register_builtins(&mut reg);
        reg
    }

    /// Built-in parts plus everything found under the configured search paths.
    pub fn from_settings(settings: &RigSettings) -> Self {
        let mut reg = Self::with_builtins();
        reg.reload(&settings.search_paths, settings.project.as_ref());
        reg
    }

    /// Register a constructor and list it under [`BUILTIN_CATEGORY`].
    pub fn register<F>(&mut self, part_type: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<Part> + Send + Sync + 'static,
    {
        let part_type = part_type.into();
        self.factories.insert(part_type.clone(), Arc::new(factory));
        self.catalog.insert(builtin_entry(&part_type));
    }

    /// Replace the catalog with a fresh scan; registered constructors stay listed.
    pub fn reload(&mut self, search_paths: &[PathBuf], project: Option<&ProjectSettings>) {
        let mut catalog = Catalog::scan(search_paths, project);
        let mut builtins: Vec<&String> = self.factories.keys().collect();
        builtins.sort();
        for name in builtins {
            if catalog.get(name).is_none() {
                catalog.insert(builtin_entry(name));
            }
        }
        self.catalog = catalog;
    }

    /// Current catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether `part_type` names an instantiable part.
    pub fn contains(&self, part_type: &str) -> bool {
        self.catalog
            .get(part_type)
            .is_some_and(|e| e.kind == DefinitionKind::Part)
    }

    /// Construct a fresh, unbuilt part of `part_type`.
    pub fn instantiate(&self, part_type: &str) -> RigResult<Part> {
        let entry = self
            .catalog
            .get(part_type)
            .ok_or_else(|| RigError::unknown_part_type(part_type))?;
        if entry.kind != DefinitionKind::Part {
            return Err(RigError::unknown_part_type(format!(
                "'{part_type}' is a template, not a part"
            )));
        }
        let factory = self.factories.get(&entry.factory).ok_or_else(|| {
            RigError::construction(
                part_type,
                anyhow::anyhow!("no constructor registered as '{}'", entry.factory),
            )
        })?;
        let mut part = factory().map_err(|e| RigError::construction(part_type, e))?;
        part.part_type = part_type.to_owned();
        for (key, value) in &entry.defaults {
            let value = part.options.check(key, value).map_err(|r| {
                RigError::construction(part_type, anyhow::anyhow!("default for '{key}': {r}"))
            })?;
            part.options.set_default(key, value);
        }
        Ok(part)
    }

    /// Manifest path of a template entry.
    pub fn template_path(&self, name: &str) -> RigResult<&Path> {
        self.catalog
            .get(name)
            .filter(|e| e.kind == DefinitionKind::Template)
            .and_then(|e| e.path.as_deref())
            .ok_or_else(|| RigError::configuration(format!("no template named '{name}'")))
    }
}

fn builtin_entry(part_type: &str) -> CatalogEntry {
    CatalogEntry {
        part_type: part_type.to_owned(),
        kind: DefinitionKind::Part,
        category: BUILTIN_CATEGORY.to_owned(),
        path: None,
        factory: part_type.to_owned(),
        defaults: IndexMap::new(),
    }
}

#[cfg(test)]
#[path = "../tests/unit/registry.rs"]
mod tests;
