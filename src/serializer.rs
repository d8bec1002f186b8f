//! YAML and JSON output of a generated document.
//!
//! Documents are rendered as text, either YAML or pretty-printed JSON, and written to a
//! file or returned to the caller for printing.

use crate::document::ApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Renders `doc` as YAML.
///
/// # Errors
///
/// Returns an error if a schema default or extension value cannot be represented.
pub fn serialize_yaml(doc: &ApiDocument) -> Result<String> {
    debug!("Serializing API document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize API document to YAML")
}

/// Renders `doc` as indented JSON.
pub fn serialize_json(doc: &ApiDocument) -> Result<String> {
    debug!("Serializing API document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize API document to JSON")
}

/// Writes `content` to `path`, creating missing parent directories and replacing any
/// existing file.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Info, Operation, Response};
    use crate::endpoint::HttpMethod;
    use crate::schema::Schema;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_document() -> ApiDocument {
        let mut info = Info::new("Todo API", "1.0.0");
        info.description = Some("Tasks and lists".to_string());
        let mut doc = ApiDocument::new(info);

        let mut operation = Operation::default();
        operation.responses.insert(
            "200".to_string(),
            Response {
                description: "OK".to_string(),
                content: BTreeMap::new(),
            },
        );
        doc.put_operation("/todos/{id}", HttpMethod::Get, operation);
        doc.components
            .schemas
            .insert("Todo".to_string(), Schema::of_type("object"));
        doc
    }

    #[test]
    fn test_serialize_yaml() {
        let yaml = serialize_yaml(&create_test_document()).unwrap();

        assert!(yaml.contains("openapi: 3.0.1"));
        assert!(yaml.contains("title: Todo API"));
        assert!(yaml.contains("description: Tasks and lists"));
        assert!(yaml.contains("/todos/{id}"));
        assert!(yaml.contains("schemas:"));
    }

    #[test]
    fn test_serialize_json() {
        let json = serialize_json(&create_test_document()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["openapi"], "3.0.1");
        assert_eq!(parsed["info"]["title"], "Todo API");
        assert_eq!(
            parsed["paths"]["/todos/{id}"]["get"]["responses"]["200"]["description"],
            "OK"
        );
        assert_eq!(parsed["components"]["schemas"]["Todo"]["type"], "object");
        assert!(json.lines().count() > 5, "JSON output should be indented");
    }

    #[test]
    fn test_yaml_and_json_describe_the_same_document() {
        let doc = create_test_document();
        let from_yaml: serde_json::Value =
            serde_yaml::from_str(&serialize_yaml(&doc).unwrap()).unwrap();
        let from_json: serde_json::Value =
            serde_json::from_str(&serialize_json(&doc).unwrap()).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_write_to_file_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("docs").join("api").join("openapi.yaml");

        write_to_file("openapi: 3.0.1\n", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "openapi: 3.0.1\n");
    }

    #[test]
    fn test_write_to_file_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.json");

        write_to_file("initial content", &file_path).unwrap();
        write_to_file("{}", &file_path).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "{}");
    }

    #[test]
    fn test_written_document_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("openapi.json");
        let doc = create_test_document();

        write_to_file(&serialize_json(&doc).unwrap(), &file_path).unwrap();
        let content = fs::read_to_string(&file_path).unwrap();
        let read_back: ApiDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(read_back, doc);
    }
}
