//! Parsing of externally authored token definitions.
//!
//! A definition is a nested JSON object. Any object with both `value` and
//! `type` is a token leaf; every other object is a group whose keys become
//! path segments. Keys starting with `$` are metadata and skipped.

use crate::error::{EngineError, EngineResult};
use serde_json::{Map, Value};
use tokensync_model::ParsedNode;
use tracing::debug;

/// Loads token definitions from JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionLoader;

impl DefinitionLoader {
    /// Creates a loader.
    pub fn new() -> Self {
        Self
    }

    /// Parses `source` into leaves in document order.
    pub fn load(&self, source: &str) -> EngineResult<Vec<ParsedNode>> {
        let document: Value = serde_json::from_str(source)
            .map_err(|e| EngineError::Definition(format!("malformed JSON: {e}")))?;
        self.load_value(&document)
    }

    /// Parses an already decoded document.
    pub fn load_value(&self, document: &Value) -> EngineResult<Vec<ParsedNode>> {
        let root = document
            .as_object()
            .ok_or_else(|| EngineError::Definition("document root must be an object".into()))?;

        let mut nodes = Vec::new();
        let mut path = Vec::new();
        walk(root, &mut path, &mut nodes)?;
        debug!(count = nodes.len(), "loaded definition");
        Ok(nodes)
    }
}

fn walk(
    object: &Map<String, Value>,
    path: &mut Vec<String>,
    out: &mut Vec<ParsedNode>,
) -> EngineResult<()> {
    for (key, value) in object {
        if key.starts_with('$') {
            continue;
        }
        let Some(child) = value.as_object() else {
            return Err(EngineError::Definition(format!(
                "{} is neither a group nor a token",
                join(path, key)
            )));
        };

        if child.contains_key("value") {
            out.push(leaf(key, child, path)?);
        } else {
            path.push(key.clone());
            walk(child, path, out)?;
            path.pop();
        }
    }
    Ok(())
}

fn leaf(name: &str, object: &Map<String, Value>, path: &[String]) -> EngineResult<ParsedNode> {
    let type_name = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Definition(format!("{} has no type", join(path, name))))?;
    let optional_text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);

    Ok(ParsedNode {
        name: name.to_string(),
        path: path.to_vec(),
        type_name: type_name.to_string(),
        value: object.get("value").cloned().unwrap_or(Value::Null),
        description: optional_text("description").unwrap_or_default(),
        persistent_id: optional_text("persistentId"),
    })
}

fn join(path: &[String], name: &str) -> String {
    let mut segments = path.to_vec();
    segments.push(name.to_string());
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaves_keep_document_order_and_paths() {
        let source = r##"{
            "Colors": {
                "Brand": {
                    "red": {"value": "#FF0000", "type": "color", "description": "Signal"},
                    "Primary": {
                        "main": {"value": "{Colors.Brand.red}", "type": "color"}
                    }
                }
            },
            "radius": {"small": {"value": "4px", "type": "borderRadius", "persistentId": "r-s"}}
        }"##;

        let nodes = DefinitionLoader::new().load(source).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].full_path(), "Colors.Brand.red");
        assert_eq!(nodes[0].description, "Signal");
        assert_eq!(nodes[1].path, vec!["Colors", "Brand", "Primary"]);
        assert_eq!(nodes[1].reference(), Some("Colors.Brand.red"));
        assert_eq!(nodes[2].type_name, "borderRadius");
        assert_eq!(nodes[2].persistent_id.as_deref(), Some("r-s"));
    }

    #[test]
    fn metadata_keys_are_skipped() {
        let nodes = DefinitionLoader::new()
            .load_value(&json!({
                "$themes": [],
                "base": {"$description": "x", "one": {"value": 1, "type": "sizing"}}
            }))
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].value, json!(1));
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let loader = DefinitionLoader::new();
        assert!(matches!(loader.load("[1, 2]"), Err(EngineError::Definition(_))));
        assert!(matches!(loader.load("{"), Err(EngineError::Definition(_))));

        let err = loader
            .load_value(&json!({"a": {"b": {"value": "#fff"}}}))
            .unwrap_err();
        assert_eq!(err, EngineError::Definition("a.b has no type".into()));

        let err = loader.load_value(&json!({"a": 3})).unwrap_err();
        assert!(err.to_string().contains("neither a group nor a token"));
    }
}
