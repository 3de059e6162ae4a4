//! Tokens and their wire representation.

use crate::error::ModelResult;
use crate::token_type::TokenType;
use crate::value::TokenValue;
use serde::{Deserialize, Serialize};

/// A named design value, possibly aliasing another token.
///
/// `alias_id` is an identity reference resolved lazily through an index; a
/// token never owns the token it aliases.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Identifier within this design system version.
    pub id: String,
    /// Identifier stable across versions.
    pub persistent_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Kind of the token.
    pub token_type: TokenType,
    /// Resolved value. For aliases this is the target's value.
    pub value: TokenValue,
    /// Id of the aliased token, if any.
    pub alias_id: Option<String>,
    /// Persistent id of the owning brand.
    pub brand_id: String,
    /// Position along the pre-order walk of the type tree.
    pub sort_order: i64,
    /// Id of the owning group, when known.
    pub parent_id: Option<String>,
}

impl Token {
    /// Returns true if this token aliases another one.
    pub fn is_alias(&self) -> bool {
        self.alias_id.is_some()
    }

    /// Returns true if name, description, value or alias differ.
    pub fn content_differs(&self, other: &Token) -> bool {
        self.name != other.name
            || self.description != other.description
            || self.alias_id != other.alias_id
            || !self.value.same_payload(&other.value)
    }
}

/// Token as transferred by the data bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRemoteModel {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Declared type.
    pub token_type: TokenType,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Type-specific payload.
    pub value: serde_json::Value,
    /// Aliased token id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_to: Option<String>,
    /// Sort order.
    #[serde(default)]
    pub sort_order: i64,
}

impl TokenRemoteModel {
    /// Decodes the payload and builds a token. The alias is not validated.
    pub fn into_token(self) -> ModelResult<Token> {
        let value = TokenValue::from_remote(self.token_type, &self.value)?;
        Ok(Token {
            id: self.id,
            persistent_id: self.persistent_id,
            name: self.name,
            description: self.description,
            token_type: self.token_type,
            value,
            alias_id: self.alias_to,
            brand_id: self.brand_id,
            sort_order: self.sort_order,
            parent_id: None,
        })
    }
}

impl From<&Token> for TokenRemoteModel {
    fn from(token: &Token) -> Self {
        Self {
            id: token.id.clone(),
            persistent_id: token.persistent_id.clone(),
            brand_id: token.brand_id.clone(),
            token_type: token.token_type,
            name: token.name.clone(),
            description: token.description.clone(),
            value: token.value.to_remote(),
            alias_to: token.alias_id.clone(),
            sort_order: token.sort_order,
        }
    }
}
