use crate::classifier::PackageClassifier;
use crate::error::Result;
use crate::utils::parse_module;
use indexmap::IndexMap;
use log::debug;
use rustpython_ast::Stmt;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// The classification of one imported name. Tags are mutually exclusive;
/// resolution precedence is local, then pip, then system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// Resolves to a file reachable from the importing file's directory or
    /// an ancestor thereof.
    Local(PathBuf),
    /// An installable third-party package.
    Pip(String),
    /// A standard-library module (also the fallback classification).
    System(String),
}

/// A tree mirroring the transitive import graph of a file.
///
/// `Pip` and `System` keys map to empty sub-maps; `Local` keys map to the
/// imported file's own `ImportMap`. Insertion order is source order, which
/// keeps flattening reproducible.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportMap {
    entries: IndexMap<ImportKind, ImportMap>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Inserts an entry, keeping the first occurrence when a key repeats.
    pub fn insert(&mut self, kind: ImportKind, sub: ImportMap) {
        self.entries.entry(kind).or_insert(sub);
    }

    pub fn get(&self, kind: &ImportKind) -> Option<&ImportMap> {
        self.entries.get(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ImportKind, &ImportMap)> {
        self.entries.iter()
    }
}

/// Builds the transitive import map of a file.
///
/// Every import statement anywhere in the tree is collected in source
/// order and classified; `local` results recurse into the target file. A
/// visited set keyed by resolved path defuses circular imports: a file
/// already on the recursion path contributes an empty sub-map.
pub fn build_import_map(file: &Path, classifier: &PackageClassifier) -> Result<ImportMap> {
    let mut visited = HashSet::new();
    build_map_inner(file, classifier, &mut visited)
}

fn build_map_inner(
    file: &Path,
    classifier: &PackageClassifier,
    visited: &mut HashSet<PathBuf>,
) -> Result<ImportMap> {
    visited.insert(canonical(file));

    let source = fs::read_to_string(file)?;
    let module = parse_module(&source, file)?;

    let mut map = ImportMap::new();
    for name in collect_imports(&module.body) {
        let kind = classifier.classify_name(&name, file)?;
        debug!("{}: {:?} -> {:?}", file.display(), name, kind);
        let sub = match &kind {
            ImportKind::Local(path) => {
                if visited.contains(&canonical(path)) {
                    ImportMap::new()
                } else {
                    build_map_inner(path, classifier, visited)?
                }
            }
            _ => ImportMap::new(),
        };
        map.insert(kind, sub);
    }
    Ok(map)
}

/// Flattens an import map into the ordered, deduplicated list of
/// installable package names.
///
/// `pip` leaves append at first sight, `local` nodes recurse, `system`
/// leaves contribute nothing. The walk is stable: a package imported at
/// two nesting depths keeps its first-seen position.
pub fn extract_pip_packages(map: &ImportMap) -> Vec<String> {
    let mut packages = Vec::new();
    collect_pips(map, &mut packages);
    packages
}

fn collect_pips(map: &ImportMap, packages: &mut Vec<String>) {
    for (kind, sub) in map.iter() {
        match kind {
            ImportKind::Pip(name) => {
                if !packages.contains(name) {
                    packages.push(name.clone());
                }
            }
            ImportKind::Local(_) => collect_pips(sub, packages),
            ImportKind::System(_) => {}
        }
    }
}

/// Convenience composition: build the full import map of a file and
/// flatten it into pip package names.
pub fn pip_imports_recursive(file: &Path, classifier: &PackageClassifier) -> Result<Vec<String>> {
    let map = build_import_map(file, classifier)?;
    Ok(extract_pip_packages(&map))
}

/// Collects every imported name in the statement tree, in source order.
///
/// Plain imports contribute one name per alias; from-imports contribute
/// their module name. A relative `from . import x` carries no module name,
/// so each imported name counts as its own sibling-module candidate.
fn collect_imports(stmts: &[Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    collect_from_stmts(stmts, &mut names);
    names
}

fn collect_from_stmts(stmts: &[Stmt], names: &mut Vec<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Import(node) => {
                for alias in &node.names {
                    names.push(alias.name.trim().to_string());
                }
            }
            Stmt::ImportFrom(node) => match &node.module {
                Some(module) => names.push(module.to_string()),
                None => {
                    for alias in &node.names {
                        names.push(alias.name.trim().to_string());
                    }
                }
            },
            Stmt::FunctionDef(node) => collect_from_stmts(&node.body, names),
            Stmt::AsyncFunctionDef(node) => collect_from_stmts(&node.body, names),
            Stmt::ClassDef(node) => collect_from_stmts(&node.body, names),
            Stmt::If(node) => {
                collect_from_stmts(&node.body, names);
                collect_from_stmts(&node.orelse, names);
            }
            Stmt::For(node) => {
                collect_from_stmts(&node.body, names);
                collect_from_stmts(&node.orelse, names);
            }
            Stmt::AsyncFor(node) => {
                collect_from_stmts(&node.body, names);
                collect_from_stmts(&node.orelse, names);
            }
            Stmt::While(node) => {
                collect_from_stmts(&node.body, names);
                collect_from_stmts(&node.orelse, names);
            }
            Stmt::With(node) => collect_from_stmts(&node.body, names),
            Stmt::AsyncWith(node) => collect_from_stmts(&node.body, names),
            Stmt::Try(node) => {
                collect_from_stmts(&node.body, names);
                for handler in &node.handlers {
                    let rustpython_ast::ExceptHandler::ExceptHandler(handler_node) = handler;
                    collect_from_stmts(&handler_node.body, names);
                }
                collect_from_stmts(&node.orelse, names);
                collect_from_stmts(&node.finalbody, names);
            }
            Stmt::Match(node) => {
                for case in &node.cases {
                    collect_from_stmts(&case.body, names);
                }
            }
            _ => {}
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
