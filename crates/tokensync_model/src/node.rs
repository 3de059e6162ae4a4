//! Resolution-time nodes.

use crate::token::Token;

/// One leaf of an externally authored definition, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNode {
    /// Token name (last key of the leaf).
    pub name: String,
    /// Enclosing keys from the document root, excluding `name`.
    pub path: Vec<String>,
    /// External type tag, e.g. `color` or `borderRadius`.
    pub type_name: String,
    /// Raw value: a literal or a `{a.b.c}` reference expression.
    pub value: serde_json::Value,
    /// Description, empty when absent.
    pub description: String,
    /// Stable identity carried by the definition, when authored.
    pub persistent_id: Option<String>,
}

impl ParsedNode {
    /// Dot-joined full path including the name; the key references point at.
    pub fn full_path(&self) -> String {
        let mut segments = self.path.clone();
        segments.push(self.name.clone());
        segments.join(".")
    }

    /// Returns the referenced path if the value is a reference expression.
    pub fn reference(&self) -> Option<&str> {
        self.value.as_str().and_then(reference_target)
    }
}

/// Returns the target of a `{a.b.c}` reference expression.
///
/// Any braced text with a non-blank inside is a reference, single-character
/// targets included.
pub fn reference_target(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix('{')?.strip_suffix('}')?.trim();
    (!inner.is_empty()).then_some(inner)
}

/// A parsed definition together with its resolved token.
///
/// Lives only for the duration of one synchronization run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedNode {
    /// Source definition.
    pub node: ParsedNode,
    /// Resolved token.
    pub token: Token,
    /// Group names from the category root to the token.
    pub path: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> ParsedNode {
        ParsedNode {
            name: "red".into(),
            path: vec!["Colors".into(), "Brand".into()],
            type_name: "color".into(),
            value,
            description: String::new(),
            persistent_id: None,
        }
    }

    #[test]
    fn reference_detection() {
        assert_eq!(reference_target(" {colors.red} "), Some("colors.red"));
        assert_eq!(reference_target("{ab}"), Some("ab"));
        assert_eq!(reference_target("{a}"), Some("a"));
        assert_eq!(reference_target("{ }"), None);
        assert_eq!(reference_target("{}"), None);
        assert_eq!(reference_target("#FF0000"), None);
        assert!(node(json!("#FF0000")).reference().is_none());
        assert!(node(json!(4)).reference().is_none());
        assert_eq!(node(json!("{base.red}")).reference(), Some("base.red"));
    }

    #[test]
    fn full_path_includes_name() {
        assert_eq!(node(json!("#FF0000")).full_path(), "Colors.Brand.red");
    }
}
