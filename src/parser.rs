use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// A Rust source file parsed with `syn`.
#[derive(Debug)]
pub struct ParsedSource {
    /// Where the source came from
    pub path: PathBuf,
    pub syntax_tree: syn::File,
}

/// Parses Rust sources into syntax trees for type introspection.
pub struct SourceParser;

impl SourceParser {
    /// Reads and parses one file.
    pub fn parse_file(path: &Path) -> Result<ParsedSource> {
        debug!("Parsing source: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {}", path.display()))?;
        Self::parse_str(path, &content)
    }

    /// Parses source text that is already in memory; `path` is only used for reporting.
    pub fn parse_str(path: &Path, content: &str) -> Result<ParsedSource> {
        let syntax_tree = syn::parse_file(content)
            .with_context(|| format!("Invalid Rust syntax in {}", path.display()))?;
        Ok(ParsedSource {
            path: path.to_path_buf(),
            syntax_tree,
        })
    }

    /// Parses every file, keeping the ones that succeed.
    ///
    /// A file with syntax errors is reported and skipped so that the rest of the tree
    /// still contributes its types.
    pub fn parse_all(paths: &[PathBuf]) -> (Vec<ParsedSource>, Vec<String>) {
        let mut parsed = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();
        for path in paths {
            match Self::parse_file(path) {
                Ok(source) => parsed.push(source),
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    failures.push(format!("{}: {:#}", path.display(), e));
                }
            }
        }
        debug!(
            "Parsed {} sources, {} failed",
            parsed.len(),
            failures.len()
        );
        (parsed, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todo.rs");
        fs::write(&path, "pub struct Todo { pub id: i32 }").unwrap();

        let parsed = SourceParser::parse_file(&path).unwrap();
        assert_eq!(parsed.path, path);
        assert_eq!(parsed.syntax_tree.items.len(), 1);
    }

    #[test]
    fn test_parse_errors_carry_context() {
        let err = SourceParser::parse_str(Path::new("broken.rs"), "pub struct {").unwrap_err();
        assert!(err.to_string().contains("Invalid Rust syntax in broken.rs"));

        let err = SourceParser::parse_file(Path::new("/nonexistent/todo.rs")).unwrap_err();
        assert!(err.to_string().contains("Failed to read source file"));
    }

    #[test]
    fn test_parse_all_skips_broken_files() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.rs");
        let bad = temp_dir.path().join("bad.rs");
        fs::write(&good, "pub enum Status { Open, Closed }").unwrap();
        fs::write(&bad, "fn broken( {").unwrap();

        let (parsed, failures) = SourceParser::parse_all(&[good.clone(), bad]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].path, good);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("bad.rs"));
    }
}
