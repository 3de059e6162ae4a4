//! Reference resolution.
//!
//! Literal definitions resolve in one pass. Aliased definitions then resolve
//! by fixpoint: each pass resolves every alias whose target is already
//! resolved with the same type, until the pool empties or a pass makes no
//! progress. Whatever remains is reported as one batch of broken references.

use crate::error::{BrokenReason, BrokenReference, EngineError, EngineResult};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tokensync_model::{
    reference_target, BorderValue, Brand, FontValue, Measure, ParsedNode, ProcessedNode,
    ShadowValue, Token, TokenType, TokenValue, TypographyValue,
};
use tracing::debug;
use uuid::Uuid;

/// Output of a resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Resolved nodes: literals in definition order, then aliases in the
    /// order they resolved.
    pub nodes: Vec<ProcessedNode>,
    /// Number of passes made, the literal pass included.
    pub passes: usize,
}

/// Converts parsed definitions into tokens, resolving aliases.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    brand_id: String,
}

struct Pending {
    node: ParsedNode,
    token_type: TokenType,
    full_path: String,
}

impl Pending {
    fn target(&self) -> &str {
        self.node.reference().unwrap_or_default()
    }
}

impl ReferenceResolver {
    /// Creates a resolver producing tokens for `brand`.
    pub fn new(brand: &Brand) -> Self {
        Self {
            brand_id: brand.persistent_id.clone(),
        }
    }

    /// Resolves `nodes`.
    ///
    /// Fails on unknown type tags, malformed literals, duplicate paths and,
    /// after the fixpoint, on any alias left unresolved.
    pub fn resolve(&self, nodes: Vec<ParsedNode>) -> EngineResult<Resolution> {
        let mut seen_paths = HashSet::new();
        let mut resolved: Vec<ProcessedNode> = Vec::with_capacity(nodes.len());
        let mut by_path: HashMap<String, usize> = HashMap::new();
        let mut pool: Vec<Pending> = Vec::new();

        for node in nodes {
            let full_path = node.full_path();
            if !seen_paths.insert(full_path.clone()) {
                return Err(EngineError::Definition(format!("duplicate token path {full_path}")));
            }
            let token_type = token_type_for(&node.type_name)?;
            if node.reference().is_some() {
                pool.push(Pending {
                    node,
                    token_type,
                    full_path,
                });
                continue;
            }
            let value = parse_literal(token_type, &node.value, &full_path)?;
            by_path.insert(full_path, resolved.len());
            resolved.push(self.processed(node, token_type, value, None));
        }

        let mut passes = 1;
        while !pool.is_empty() {
            passes += 1;
            let before = pool.len();
            let mut remaining = Vec::new();
            for pending in pool {
                let target = by_path
                    .get(pending.target())
                    .map(|&index| &resolved[index].token)
                    .filter(|target| target.token_type == pending.token_type)
                    .map(|target| (target.value.clone(), target.id.clone()));
                match target {
                    Some((value, target_id)) => {
                        by_path.insert(pending.full_path.clone(), resolved.len());
                        resolved.push(self.processed(
                            pending.node,
                            pending.token_type,
                            value,
                            Some(target_id),
                        ));
                    }
                    None => remaining.push(pending),
                }
            }
            debug!(
                pass = passes,
                resolved = before - remaining.len(),
                remaining = remaining.len(),
                "alias pass"
            );
            let stalled = remaining.len() == before;
            pool = remaining;
            if stalled {
                break;
            }
        }

        if !pool.is_empty() {
            return Err(EngineError::BrokenReference(classify(&pool, &resolved, &by_path)));
        }
        Ok(Resolution {
            nodes: resolved,
            passes,
        })
    }

    fn processed(
        &self,
        node: ParsedNode,
        token_type: TokenType,
        value: TokenValue,
        alias_id: Option<String>,
    ) -> ProcessedNode {
        let id = Uuid::new_v4().to_string();
        let persistent_id = node
            .persistent_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let token = Token {
            id,
            persistent_id,
            name: node.name.clone(),
            description: node.description.clone(),
            token_type,
            value,
            alias_id,
            brand_id: self.brand_id.clone(),
            sort_order: 0,
            parent_id: None,
        };
        let path = node.path.clone();
        ProcessedNode { node, token, path }
    }
}

/// Follows each leftover chain to its terminal cause.
fn classify(
    pool: &[Pending],
    resolved: &[ProcessedNode],
    by_path: &HashMap<String, usize>,
) -> Vec<BrokenReference> {
    let leftovers: HashMap<&str, &Pending> =
        pool.iter().map(|p| (p.full_path.as_str(), p)).collect();

    pool.iter()
        .map(|start| {
            let mut visited = HashSet::from([start.full_path.as_str()]);
            let mut current = start;
            let reason = loop {
                let target = current.target();
                if let Some(&index) = by_path.get(target) {
                    // Resolved targets only block an alias by type.
                    debug_assert_ne!(resolved[index].token.token_type, current.token_type);
                    break BrokenReason::TypeMismatch;
                }
                let Some(&next) = leftovers.get(target) else {
                    break BrokenReason::MissingTarget;
                };
                if !visited.insert(target) {
                    break BrokenReason::Cycle;
                }
                if next.token_type != current.token_type {
                    break BrokenReason::TypeMismatch;
                }
                current = next;
            };
            BrokenReference {
                path: start.full_path.clone(),
                target: start.target().to_string(),
                reason,
            }
        })
        .collect()
}

/// Maps an external type tag to a token type. Matching ignores case.
pub fn token_type_for(tag: &str) -> EngineResult<TokenType> {
    let token_type = match tag.to_ascii_lowercase().as_str() {
        "color" => TokenType::Color,
        "borderradius" | "radius" => TokenType::Radius,
        "sizing" | "spacing" | "borderwidth" | "dimension" | "fontsizes" | "lineheights"
        | "letterspacing" | "paragraphspacing" | "opacity" | "measure" => TokenType::Measure,
        "fontfamilies" | "font" => TokenType::Font,
        "typography" => TokenType::Typography,
        "boxshadow" | "shadow" => TokenType::Shadow,
        "border" => TokenType::Border,
        "gradient" => TokenType::Gradient,
        "blur" => TokenType::Blur,
        "text" | "fontweights" | "textcase" | "textdecoration" | "other" | "string" => {
            TokenType::Text
        }
        "generic" => TokenType::Generic,
        _ => return Err(EngineError::UnsupportedTokenType(tag.to_string())),
    };
    Ok(token_type)
}

/// Parses a literal definition value for `token_type`.
pub fn parse_literal(token_type: TokenType, value: &Value, path: &str) -> EngineResult<TokenValue> {
    let invalid = || EngineError::Definition(format!("{path}: invalid {token_type} value {value}"));
    let measure = || Measure::from_json(value).ok_or_else(invalid);

    let parsed = match token_type {
        TokenType::Color => TokenValue::Color(non_empty_text(value).ok_or_else(invalid)?),
        TokenType::Radius => TokenValue::Radius(measure()?),
        TokenType::Measure => TokenValue::Measure(measure()?),
        TokenType::Blur => TokenValue::Blur(measure()?),
        TokenType::Font => TokenValue::Font(parse_font(value).ok_or_else(invalid)?),
        TokenType::Typography => {
            let object = composite(value, path)?;
            TokenValue::Typography(parse_typography(object).ok_or_else(invalid)?)
        }
        TokenType::Shadow => {
            if value.is_array() {
                return Err(EngineError::Definition(format!(
                    "{path}: layered shadows are not supported"
                )));
            }
            let object = composite(value, path)?;
            TokenValue::Shadow(parse_shadow(object).ok_or_else(invalid)?)
        }
        TokenType::Border => {
            let object = composite(value, path)?;
            TokenValue::Border(parse_border(object).ok_or_else(invalid)?)
        }
        TokenType::Gradient => TokenValue::Gradient(non_empty_text(value).ok_or_else(invalid)?),
        TokenType::Text => TokenValue::Text(scalar_text(value).ok_or_else(invalid)?),
        TokenType::Generic => TokenValue::Generic(scalar_text(value).ok_or_else(invalid)?),
    };
    Ok(parsed)
}

fn non_empty_text(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Returns the object of a composite value, rejecting references inside it.
fn composite<'v>(value: &'v Value, path: &str) -> EngineResult<&'v Map<String, Value>> {
    let object = value
        .as_object()
        .ok_or_else(|| EngineError::Definition(format!("{path}: expected an object value")))?;
    for (key, field) in object {
        if field.as_str().and_then(reference_target).is_some() {
            return Err(EngineError::Definition(format!(
                "{path}.{key}: references inside composite values are not supported"
            )));
        }
    }
    Ok(object)
}

fn field_measure(object: &Map<String, Value>, key: &str) -> Option<Option<Measure>> {
    match object.get(key) {
        None => Some(None),
        Some(value) => Measure::from_json(value).map(Some),
    }
}

fn field_text(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(scalar_text)
        .unwrap_or_default()
}

fn parse_font(value: &Value) -> Option<FontValue> {
    match value {
        Value::String(family) if !family.trim().is_empty() => Some(FontValue {
            family: family.trim().to_string(),
            subfamily: String::new(),
        }),
        Value::Object(object) => Some(FontValue {
            family: non_empty_text(object.get("family")?)?,
            subfamily: field_text(object, "subfamily"),
        }),
        _ => None,
    }
}

fn parse_typography(object: &Map<String, Value>) -> Option<TypographyValue> {
    Some(TypographyValue {
        font: FontValue {
            family: non_empty_text(object.get("fontFamily")?)?,
            subfamily: field_text(object, "fontWeight"),
        },
        font_size: Measure::from_json(object.get("fontSize")?)?,
        line_height: field_measure(object, "lineHeight")?,
        letter_spacing: field_measure(object, "letterSpacing")?,
        paragraph_spacing: field_measure(object, "paragraphSpacing")?,
    })
}

fn parse_shadow(object: &Map<String, Value>) -> Option<ShadowValue> {
    let zero = Measure::new(0.0, tokensync_model::Unit::Raw);
    Some(ShadowValue {
        x: field_measure(object, "x")?.unwrap_or(zero),
        y: field_measure(object, "y")?.unwrap_or(zero),
        radius: field_measure(object, "blur")?.unwrap_or(zero),
        spread: field_measure(object, "spread")?.unwrap_or(zero),
        color: non_empty_text(object.get("color")?)?,
        inner: object.get("type").and_then(Value::as_str) == Some("innerShadow"),
    })
}

fn parse_border(object: &Map<String, Value>) -> Option<BorderValue> {
    Some(BorderValue {
        width: Measure::from_json(object.get("width")?)?,
        color: non_empty_text(object.get("color")?)?,
        style: field_text(object, "style"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use tokensync_model::Unit;

    fn node(path: &str, type_name: &str, value: Value) -> ParsedNode {
        let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
        let name = segments.pop().unwrap();
        ParsedNode {
            name,
            path: segments,
            type_name: type_name.into(),
            value,
            description: String::new(),
            persistent_id: None,
        }
    }

    fn resolver() -> ReferenceResolver {
        ReferenceResolver::new(&Brand::new("b1", "Default"))
    }

    fn broken(err: EngineError) -> Vec<BrokenReference> {
        match err {
            EngineError::BrokenReference(broken) => broken,
            other => panic!("expected broken references, got {other}"),
        }
    }

    #[test]
    fn literals_resolve_in_one_pass() {
        let resolution = resolver()
            .resolve(vec![
                node("base.red", "color", json!("#FF0000")),
                node("space.s", "spacing", json!("4px")),
            ])
            .unwrap();
        assert_eq!(resolution.passes, 1);
        assert_eq!(resolution.nodes.len(), 2);
        assert_eq!(
            resolution.nodes[1].token.value,
            TokenValue::Measure(Measure::new(4.0, Unit::Pixels))
        );
        assert_eq!(resolution.nodes[0].path, vec!["base"]);
        assert_eq!(resolution.nodes[0].token.brand_id, "b1");
    }

    #[test]
    fn aliases_copy_value_and_point_at_target() {
        let resolution = resolver()
            .resolve(vec![
                node("brand.primary", "color", json!("{base.red}")),
                node("base.red", "color", json!("#FF0000")),
            ])
            .unwrap();
        assert_eq!(resolution.passes, 2);

        let red = &resolution.nodes[0].token;
        let primary = &resolution.nodes[1].token;
        assert_eq!(primary.name, "primary");
        assert_eq!(primary.value, red.value);
        assert_eq!(primary.alias_id.as_deref(), Some(red.id.as_str()));
    }

    #[test]
    fn persistent_id_is_carried_over() {
        let mut definition = node("base.red", "color", json!("#FF0000"));
        definition.persistent_id = Some("stable-red".into());
        let resolution = resolver().resolve(vec![definition]).unwrap();
        assert_eq!(resolution.nodes[0].token.persistent_id, "stable-red");
        assert_ne!(resolution.nodes[0].token.id, "stable-red");
    }

    #[test]
    fn broken_references_are_classified() {
        let err = resolver()
            .resolve(vec![
                node("base.red", "color", json!("#FF0000")),
                node("self", "color", json!("{self}")),
                node("missing", "color", json!("{nowhere.at.all}")),
                node("radius", "borderRadius", json!("{base.red}")),
                node("via.missing", "color", json!("{missing}")),
            ])
            .unwrap_err();

        let broken = broken(err);
        let reason = |path: &str| {
            broken
                .iter()
                .find(|b| b.path == path)
                .map(|b| b.reason)
                .unwrap()
        };
        assert_eq!(broken.len(), 4);
        assert_eq!(reason("self"), BrokenReason::Cycle);
        assert_eq!(reason("missing"), BrokenReason::MissingTarget);
        assert_eq!(reason("radius"), BrokenReason::TypeMismatch);
        assert_eq!(reason("via.missing"), BrokenReason::MissingTarget);
    }

    #[test]
    fn single_character_targets_are_references() {
        let broken = broken(
            resolver()
                .resolve(vec![node("a", "color", json!("{a}"))])
                .unwrap_err(),
        );
        assert_eq!(
            broken,
            vec![BrokenReference {
                path: "a".into(),
                target: "a".into(),
                reason: BrokenReason::Cycle,
            }]
        );

        let broken = self::broken(
            resolver()
                .resolve(vec![node("a", "color", json!("{b}"))])
                .unwrap_err(),
        );
        assert_eq!(broken[0].reason, BrokenReason::MissingTarget);

        let resolution = resolver()
            .resolve(vec![
                node("b", "color", json!("#00FF00")),
                node("a", "color", json!("{b}")),
            ])
            .unwrap();
        assert_eq!(resolution.nodes[1].token.value, TokenValue::Color("#00FF00".into()));
    }

    #[test]
    fn unknown_type_tag_fails() {
        let err = resolver()
            .resolve(vec![node("a", "hologram", json!("x"))])
            .unwrap_err();
        assert_eq!(err, EngineError::UnsupportedTokenType("hologram".into()));
    }

    #[test]
    fn duplicate_paths_fail() {
        let err = resolver()
            .resolve(vec![
                node("a.b", "color", json!("#000")),
                node("a.b", "color", json!("#fff")),
            ])
            .unwrap_err();
        assert!(matches!(err, EngineError::Definition(m) if m.contains("a.b")));
    }

    #[test]
    fn composite_literals() {
        let typography = parse_literal(
            TokenType::Typography,
            &json!({"fontFamily": "Inter", "fontWeight": "Bold", "fontSize": "16px",
                    "lineHeight": "24px"}),
            "type.body",
        )
        .unwrap();
        match typography {
            TokenValue::Typography(t) => {
                assert_eq!(t.font.subfamily, "Bold");
                assert_eq!(t.line_height, Some(Measure::new(24.0, Unit::Pixels)));
                assert_eq!(t.letter_spacing, None);
            }
            other => panic!("unexpected value {other:?}"),
        }

        let shadow = parse_literal(
            TokenType::Shadow,
            &json!({"x": 0, "y": "2px", "blur": "4px", "color": "#0003", "type": "innerShadow"}),
            "shadow.inset",
        )
        .unwrap();
        assert!(matches!(shadow, TokenValue::Shadow(s) if s.inner));

        assert!(parse_literal(TokenType::Shadow, &json!([]), "s").is_err());
        let err = parse_literal(
            TokenType::Border,
            &json!({"width": "1px", "color": "{base.red}"}),
            "border.focus",
        )
        .unwrap_err();
        assert!(err.to_string().contains("border.focus.color"));
    }

    #[test]
    fn type_tags_ignore_case() {
        assert_eq!(token_type_for("Color").unwrap(), TokenType::Color);
        assert_eq!(token_type_for("borderRadius").unwrap(), TokenType::Radius);
        assert_eq!(token_type_for("fontSizes").unwrap(), TokenType::Measure);
        assert_eq!(token_type_for("boxShadow").unwrap(), TokenType::Shadow);
        assert_eq!(token_type_for("fontWeights").unwrap(), TokenType::Text);
    }

    fn chain(depth: usize) -> Vec<ParsedNode> {
        let mut nodes = vec![node("chain.n0", "color", json!("#123456"))];
        for i in 1..=depth {
            nodes.push(node(
                &format!("chain.n{i}"),
                "color",
                json!(format!("{{chain.n{}}}", i - 1)),
            ));
        }
        nodes
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn alias_chains_resolve_in_any_order(
            nodes in (1usize..8).prop_flat_map(|depth| Just(chain(depth)).prop_shuffle())
        ) {
            let depth = nodes.len() - 1;
            let resolution = resolver().resolve(nodes).unwrap();
            prop_assert_eq!(resolution.nodes.len(), depth + 1);
            prop_assert!(resolution.passes <= depth + 1);
            for processed in &resolution.nodes {
                prop_assert_eq!(
                    &processed.token.value,
                    &TokenValue::Color("#123456".into())
                );
            }
        }

        #[test]
        fn cycles_never_resolve(length in 1usize..6, atomics in 0usize..4) {
            let mut nodes: Vec<ParsedNode> = (0..atomics)
                .map(|i| node(&format!("lit.n{i}"), "color", json!("#000000")))
                .collect();
            for i in 0..length {
                let next = (i + 1) % length;
                nodes.push(node(
                    &format!("loop.n{i}"),
                    "color",
                    json!(format!("{{loop.n{next}}}")),
                ));
            }

            let broken = broken(resolver().resolve(nodes).unwrap_err());
            prop_assert_eq!(broken.len(), length);
            prop_assert!(broken.iter().all(|b| b.reason == BrokenReason::Cycle));
        }
    }
}
