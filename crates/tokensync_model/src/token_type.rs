//! Closed set of token kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a design token.
///
/// Every token and every group carries exactly one type. Each (brand, type)
/// pair owns exactly one root group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenType {
    /// Solid color.
    Color,
    /// Composite text style.
    Typography,
    /// Corner radius.
    Radius,
    /// Font family reference.
    Font,
    /// Dimension with unit.
    Measure,
    /// Drop or inner shadow.
    Shadow,
    /// Stroke definition.
    Border,
    /// Gradient definition.
    Gradient,
    /// Plain text value.
    Text,
    /// Blur radius.
    Blur,
    /// Untyped value.
    Generic,
}

impl TokenType {
    /// All token types in canonical order.
    pub const ALL: [TokenType; 11] = [
        TokenType::Color,
        TokenType::Typography,
        TokenType::Radius,
        TokenType::Font,
        TokenType::Measure,
        TokenType::Shadow,
        TokenType::Border,
        TokenType::Gradient,
        TokenType::Text,
        TokenType::Blur,
        TokenType::Generic,
    ];

    /// Human readable name used for type root groups.
    pub fn root_name(&self) -> &'static str {
        match self {
            TokenType::Color => "Color",
            TokenType::Typography => "Typography",
            TokenType::Radius => "Radius",
            TokenType::Font => "Font",
            TokenType::Measure => "Measure",
            TokenType::Shadow => "Shadow",
            TokenType::Border => "Border",
            TokenType::Gradient => "Gradient",
            TokenType::Text => "Text",
            TokenType::Blur => "Blur",
            TokenType::Generic => "Generic",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_name())
    }
}
