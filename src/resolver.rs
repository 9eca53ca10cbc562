use log::debug;
use std::path::{Path, PathBuf};

/// Finds the file defining a locally importable module.
///
/// The dotted name is split into parts. Starting in the directory of
/// `reference_file`, the first part resolves either as a same-named `.py`
/// file or as a package directory carrying an `__init__.py`, in which case
/// the remaining parts are resolved inside it. When the starting directory
/// fails, every ancestor directory is tried in turn up to the filesystem
/// root.
///
/// Resolution is lenient: once a `.py` file matches a part, any remaining
/// dotted parts are assumed to live inside it and the path is returned.
/// First match wins across ancestor levels; nothing detects a same-named
/// candidate at a different level, so nested-package layouts can resolve to
/// the wrong file. That sharp edge is inherited behavior, kept as-is.
pub fn find_local_module(dotted_name: &str, reference_file: &Path) -> Option<PathBuf> {
    let parts: Vec<&str> = dotted_name
        .split('.')
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }

    let mut base = reference_file
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .to_path_buf();

    if let Some(found) = search_module(&base, &parts) {
        return Some(found);
    }

    // Retry in each ancestor directory; a directory whose parent is itself
    // (or is absent) marks the filesystem root.
    while let Some(parent) = base.parent().map(Path::to_path_buf) {
        if parent == base {
            break;
        }
        debug!("searching for {:?} in ancestor {:?}", dotted_name, parent);
        if let Some(found) = search_module(&parent, &parts) {
            return Some(found);
        }
        base = parent;
    }

    None
}

/// Resolves the leading dotted part inside one directory.
fn search_module(dir: &Path, parts: &[&str]) -> Option<PathBuf> {
    let (first, rest) = parts.split_first()?;

    let module_file = dir.join(format!("{first}.py"));
    if module_file.is_file() {
        return Some(module_file);
    }

    let module_dir = dir.join(first);
    if module_dir.is_dir() && module_dir.join("__init__.py").is_file() && !rest.is_empty() {
        return search_module(&module_dir, rest);
    }

    None
}
