use anyhow::{bail, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names never scanned for type declarations.
const DEFAULT_EXCLUDED_DIRS: &[&str] = &["target"];

/// Collects the Rust source files whose type declarations feed the type catalog.
///
/// Hidden directories, `target` and any extra excluded directory names are skipped.
/// Files come back sorted so that catalogs built from the same tree are identical.
pub struct SourceScanner {
    root: PathBuf,
    excluded_dirs: Vec<String>,
}

/// Files found by a scan, plus the entries that could not be read.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub source_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl SourceScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Also skips directories named `name` (e.g. `tests`, `benches`).
    pub fn exclude_dir(mut self, name: &str) -> Self {
        self.excluded_dirs.push(name.to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, name: &str) -> bool {
        name.starts_with('.') || self.excluded_dirs.iter().any(|d| d == name)
    }

    /// Walks the tree below the root.
    ///
    /// Unreadable entries are reported as warnings; only a missing root is an error.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root.exists() {
            bail!("Source directory does not exist: {}", self.root.display());
        }
        debug!("Scanning {} for Rust sources", self.root.display());

        let mut result = ScanResult::default();
        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !self.is_excluded(&entry.file_name().to_string_lossy())
        });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file()
                        && path.extension().and_then(|e| e.to_str()) == Some("rs")
                    {
                        result.source_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    result.warnings.push(warning);
                }
            }
        }

        result.source_files.sort();
        debug!("Found {} Rust sources", result.source_files.len());
        Ok(result)
    }
}
