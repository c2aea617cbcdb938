//! Cross-file `Import` resolution.
//!
//! Paths are virtual, `/`-separated and relative to the importing file's
//! directory. Each file is read through a `ScriptSource`, so the same merge
//! works against an editor's in-memory file tree and against a directory on disk.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use crate::script::ast::Document;
use crate::script::parser::parse;

/// Extension tried when an import is written without one.
pub const SCRIPT_EXTENSION: &str = ".pxs";

/// Something that can hand out script text by normalized path.
pub trait ScriptSource {
    fn read(&self, path: &str) -> Option<String>;
}

/// Script files held in memory, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, text: impl Into<String>) {
        self.files.insert(normalize_path(path), text.into());
    }

    pub fn with_file(mut self, path: &str, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ScriptSource for MemorySource {
    fn read(&self, path: &str) -> Option<String> {
        self.files.get(&normalize_path(path)).cloned()
    }
}

/// Script files under a root directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ScriptSource for FsSource {
    fn read(&self, path: &str) -> Option<String> {
        let normalized = normalize_path(path);
        // `..` past the root normalizes to a leading `..`; never leave the root.
        if normalized.split('/').any(|part| part == "..") {
            return None;
        }
        fs::read_to_string(self.root.join(normalized)).ok()
    }
}

/// Collapse `.`, `..` and repeated separators. A leading `/` is dropped.
/// `..` that climbs above the root is kept so it cannot alias another file.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Directory part of a normalized path ("" for top-level files).
fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |at| &path[..at])
}

/// Resolve `import` as written in the file at `from`.
pub fn resolve_import(from: &str, import: &str) -> String {
    let dir = parent_dir(from);
    if dir.is_empty() {
        normalize_path(import)
    } else {
        normalize_path(&format!("{}/{}", dir, import))
    }
}

/// Paths to try for an import: as written, then with the default extension.
fn candidates(resolved: &str) -> Vec<String> {
    let mut out = vec![resolved.to_string()];
    if !resolved.ends_with(SCRIPT_EXTENSION) {
        out.push(format!("{}{}", resolved, SCRIPT_EXTENSION));
    }
    out
}

/// Result of loading a script together with everything it imports.
#[derive(Debug, Clone, Default)]
pub struct MergeOutput {
    pub document: Document,
    /// Unresolvable imports, one human-readable line each.
    pub diagnostics: Vec<String>,
    /// Skipped lines in any of the files, prefixed with the file path.
    pub warnings: Vec<String>,
}

/// Read, parse and merge the script at `path` and its imports.
pub fn load(path: &str, source: &dyn ScriptSource) -> MergeOutput {
    let mut out = MergeOutput::default();
    // The file actually read names the entry, so a later import of it is a cycle.
    let found = candidates(&normalize_path(path))
        .into_iter()
        .find_map(|candidate| source.read(&candidate).map(|text| (candidate, text)));
    let Some((id, text)) = found else {
        out.diagnostics.push(format!("Script not found: '{}'", path));
        return out;
    };

    let parsed = parse(&text);
    out.warnings
        .extend(parsed.warnings.iter().map(|w| format!("{}:{}: {}", id, w.line, w.message)));
    let mut visited = HashSet::from([id.clone()]);
    let document = merge_imports_into(parsed.document, &id, source, &mut visited, &mut out);
    out.document = document;
    out
}

/// Merge the imports of an already-parsed document that lives at `path`.
pub fn merge_imports(document: Document, path: &str, source: &dyn ScriptSource) -> MergeOutput {
    let id = normalize_path(path);
    let mut out = MergeOutput::default();
    let mut visited = HashSet::from([id.clone()]);
    out.document = merge_imports_into(document, &id, source, &mut visited, &mut out);
    out
}

fn merge_imports_into(
    mut local: Document,
    file: &str,
    source: &dyn ScriptSource,
    visited: &mut HashSet<String>,
    out: &mut MergeOutput,
) -> Document {
    for import in local.imports.clone() {
        let resolved = resolve_import(file, &import);

        let mut found = None;
        for candidate in candidates(&resolved) {
            if visited.contains(&candidate) {
                // Already merged (or an import cycle). Nothing to add.
                found = Some(None);
                break;
            }
            if let Some(text) = source.read(&candidate) {
                found = Some(Some((candidate, text)));
                break;
            }
        }

        let (id, text) = match found {
            Some(Some(hit)) => hit,
            Some(None) => continue,
            None => {
                log::warn!("{}: import '{}' not found", file, import);
                out.diagnostics
                    .push(format!("Import not found: '{}' (from '{}')", import, file));
                continue;
            }
        };

        visited.insert(id.clone());
        let parsed = parse(&text);
        out.warnings
            .extend(parsed.warnings.iter().map(|w| format!("{}:{}: {}", id, w.line, w.message)));
        let imported = merge_imports_into(parsed.document, &id, source, visited, out);
        merge_document(&mut local, imported);
    }
    local
}

/// Union schemas and add entities the local file doesn't define.
/// On any name clash the local definition wins.
fn merge_document(local: &mut Document, imported: Document) {
    for (name, var) in imported.schema {
        local.schema.entry(name).or_insert(var);
    }
    for (name, def) in imported.entities {
        local.entities.entry(name).or_insert(def);
    }
}
