//! Token value payloads.
//!
//! A [`TokenValue`] has exactly one variant per [`TokenType`]. Payloads are
//! intentionally compact: they carry what synchronization needs to compare
//! and write values, not a full rendering model.

use crate::error::{ModelError, ModelResult};
use crate::token_type::TokenType;
use serde::{Deserialize, Serialize};

/// Unit attached to a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Unit {
    /// `px`
    Pixels,
    /// `rem`
    Rem,
    /// `em`
    Ems,
    /// `%`
    Percent,
    /// `pt`
    Points,
    /// Bare number.
    Raw,
}

impl Unit {
    fn suffix(&self) -> &'static str {
        match self {
            Unit::Pixels => "px",
            Unit::Rem => "rem",
            Unit::Ems => "em",
            Unit::Percent => "%",
            Unit::Points => "pt",
            Unit::Raw => "",
        }
    }
}

/// A dimension with unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Numeric magnitude.
    pub measure: f64,
    /// Unit of the magnitude.
    pub unit: Unit,
}

impl Measure {
    /// Creates a measure.
    pub fn new(measure: f64, unit: Unit) -> Self {
        Self { measure, unit }
    }

    /// Parses `16`, `16px`, `1.5rem`, `2em`, `50%` or `12pt`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        // Longest suffixes first so `rem` is not read as `em`.
        for unit in [Unit::Rem, Unit::Pixels, Unit::Ems, Unit::Points, Unit::Percent] {
            if let Some(number) = text.strip_suffix(unit.suffix()) {
                return number.trim().parse().ok().map(|m| Self::new(m, unit));
            }
        }
        text.parse().ok().map(|m| Self::new(m, Unit::Raw))
    }

    /// Parses a JSON number or string.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(|m| Self::new(m, Unit::Raw)),
            serde_json::Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    fn approx_eq(&self, other: &Measure) -> bool {
        self.unit == other.unit && (self.measure - other.measure).abs() < 1e-6
    }
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.measure, self.unit.suffix())
    }
}

/// Composite font reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontValue {
    /// Family name, e.g. `Inter`.
    pub family: String,
    /// Subfamily, e.g. `Bold`.
    #[serde(default)]
    pub subfamily: String,
}

/// Composite text style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyValue {
    /// Font used by the style.
    pub font: FontValue,
    /// Font size.
    pub font_size: Measure,
    /// Line height, when set.
    #[serde(default)]
    pub line_height: Option<Measure>,
    /// Letter spacing, when set.
    #[serde(default)]
    pub letter_spacing: Option<Measure>,
    /// Paragraph spacing, when set.
    #[serde(default)]
    pub paragraph_spacing: Option<Measure>,
}

/// Shadow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowValue {
    /// Horizontal offset.
    pub x: Measure,
    /// Vertical offset.
    pub y: Measure,
    /// Blur radius.
    pub radius: Measure,
    /// Spread.
    pub spread: Measure,
    /// Shadow color.
    pub color: String,
    /// Inner instead of drop shadow.
    #[serde(default)]
    pub inner: bool,
}

/// Stroke definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderValue {
    /// Stroke width.
    pub width: Measure,
    /// Stroke color.
    pub color: String,
    /// Stroke style, e.g. `solid`.
    #[serde(default)]
    pub style: String,
}

/// Value of a token. The variant always matches the owning token's type.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// Color as hex string.
    Color(String),
    /// Text style.
    Typography(TypographyValue),
    /// Corner radius.
    Radius(Measure),
    /// Font reference.
    Font(FontValue),
    /// Dimension.
    Measure(Measure),
    /// Shadow.
    Shadow(ShadowValue),
    /// Stroke.
    Border(BorderValue),
    /// Gradient as CSS-like source text.
    Gradient(String),
    /// Plain text.
    Text(String),
    /// Blur radius.
    Blur(Measure),
    /// Untyped text.
    Generic(String),
}

impl TokenValue {
    /// Returns the token type this value belongs to.
    pub fn token_type(&self) -> TokenType {
        match self {
            TokenValue::Color(_) => TokenType::Color,
            TokenValue::Typography(_) => TokenType::Typography,
            TokenValue::Radius(_) => TokenType::Radius,
            TokenValue::Font(_) => TokenType::Font,
            TokenValue::Measure(_) => TokenType::Measure,
            TokenValue::Shadow(_) => TokenType::Shadow,
            TokenValue::Border(_) => TokenType::Border,
            TokenValue::Gradient(_) => TokenType::Gradient,
            TokenValue::Text(_) => TokenType::Text,
            TokenValue::Blur(_) => TokenType::Blur,
            TokenValue::Generic(_) => TokenType::Generic,
        }
    }

    /// Compares payloads the way synchronization does: colors ignore hex
    /// case and measures compare within a small epsilon.
    pub fn same_payload(&self, other: &TokenValue) -> bool {
        match (self, other) {
            (TokenValue::Color(a), TokenValue::Color(b)) => a.eq_ignore_ascii_case(b),
            (TokenValue::Radius(a), TokenValue::Radius(b))
            | (TokenValue::Measure(a), TokenValue::Measure(b))
            | (TokenValue::Blur(a), TokenValue::Blur(b)) => a.approx_eq(b),
            (TokenValue::Typography(a), TokenValue::Typography(b)) => a == b,
            (TokenValue::Font(a), TokenValue::Font(b)) => a == b,
            (TokenValue::Shadow(a), TokenValue::Shadow(b)) => a == b,
            (TokenValue::Border(a), TokenValue::Border(b)) => a == b,
            (TokenValue::Gradient(a), TokenValue::Gradient(b))
            | (TokenValue::Text(a), TokenValue::Text(b))
            | (TokenValue::Generic(a), TokenValue::Generic(b)) => a == b,
            _ => false,
        }
    }

    /// Decodes the wire payload of a token of type `token_type`.
    pub fn from_remote(token_type: TokenType, value: &serde_json::Value) -> ModelResult<Self> {
        let decoded = match token_type {
            TokenType::Color => serde_json::from_value(value.clone()).map(TokenValue::Color),
            TokenType::Typography => {
                serde_json::from_value(value.clone()).map(TokenValue::Typography)
            }
            TokenType::Radius => serde_json::from_value(value.clone()).map(TokenValue::Radius),
            TokenType::Font => serde_json::from_value(value.clone()).map(TokenValue::Font),
            TokenType::Measure => serde_json::from_value(value.clone()).map(TokenValue::Measure),
            TokenType::Shadow => serde_json::from_value(value.clone()).map(TokenValue::Shadow),
            TokenType::Border => serde_json::from_value(value.clone()).map(TokenValue::Border),
            TokenType::Gradient => serde_json::from_value(value.clone()).map(TokenValue::Gradient),
            TokenType::Text => serde_json::from_value(value.clone()).map(TokenValue::Text),
            TokenType::Blur => serde_json::from_value(value.clone()).map(TokenValue::Blur),
            TokenType::Generic => serde_json::from_value(value.clone()).map(TokenValue::Generic),
        };
        decoded.map_err(|e| ModelError::InvalidValue {
            token_type,
            message: e.to_string(),
        })
    }

    /// Encodes the payload for the wire.
    pub fn to_remote(&self) -> serde_json::Value {
        let encoded = match self {
            TokenValue::Color(v)
            | TokenValue::Gradient(v)
            | TokenValue::Text(v)
            | TokenValue::Generic(v) => serde_json::to_value(v),
            TokenValue::Typography(v) => serde_json::to_value(v),
            TokenValue::Radius(v) | TokenValue::Measure(v) | TokenValue::Blur(v) => {
                serde_json::to_value(v)
            }
            TokenValue::Font(v) => serde_json::to_value(v),
            TokenValue::Shadow(v) => serde_json::to_value(v),
            TokenValue::Border(v) => serde_json::to_value(v),
        };
        // Payload structs contain only strings, numbers and options.
        encoded.unwrap_or(serde_json::Value::Null)
    }
}
