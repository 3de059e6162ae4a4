//! Change sets produced by tree merging.

use crate::group::TokenGroup;
use crate::token::Token;

/// Either side of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeElement {
    /// A token leaf.
    Token(Token),
    /// A group node; carries its recomputed child list.
    Group(TokenGroup),
}

impl TreeElement {
    /// Id of the element.
    pub fn id(&self) -> &str {
        match self {
            TreeElement::Token(t) => &t.id,
            TreeElement::Group(g) => &g.id,
        }
    }
}

/// Outcome for one element.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    /// Element exists only locally.
    Create(TreeElement),
    /// Element exists on both sides.
    Update(TreeElement),
    /// Element exists only upstream and has no dependents.
    Delete(TreeElement),
}

impl DiffEntry {
    /// The element this entry is about.
    pub fn element(&self) -> &TreeElement {
        match self {
            DiffEntry::Create(e) | DiffEntry::Update(e) | DiffEntry::Delete(e) => e,
        }
    }
}

/// Disjoint create/update/delete sets over one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet<T> {
    /// Entities to create.
    pub to_create: Vec<T>,
    /// Entities to update.
    pub to_update: Vec<T>,
    /// Entities to delete.
    pub to_delete: Vec<T>,
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self {
            to_create: Vec::new(),
            to_update: Vec::new(),
            to_delete: Vec::new(),
        }
    }
}

impl<T> ChangeSet<T> {
    /// Created and updated entities, in that order.
    pub fn upserts(&self) -> impl Iterator<Item = &T> {
        self.to_create.iter().chain(self.to_update.iter())
    }

    /// Mutable access to created and updated entities.
    pub fn upserts_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.to_create.iter_mut().chain(self.to_update.iter_mut())
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Full result of merging a local tree into the upstream tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeDiff {
    /// Token changes.
    pub tokens: ChangeSet<Token>,
    /// Group changes.
    pub groups: ChangeSet<TokenGroup>,
}

impl TreeDiff {
    /// All entries as tagged outcomes.
    pub fn entries(&self) -> Vec<DiffEntry> {
        let groups = |set: &[TokenGroup]| -> Vec<TreeElement> {
            set.iter().cloned().map(TreeElement::Group).collect()
        };
        let tokens = |set: &[Token]| -> Vec<TreeElement> {
            set.iter().cloned().map(TreeElement::Token).collect()
        };

        let mut entries = Vec::with_capacity(self.tokens.len() + self.groups.len());
        for element in groups(&self.groups.to_create)
            .into_iter()
            .chain(tokens(&self.tokens.to_create))
        {
            entries.push(DiffEntry::Create(element));
        }
        for element in groups(&self.groups.to_update)
            .into_iter()
            .chain(tokens(&self.tokens.to_update))
        {
            entries.push(DiffEntry::Update(element));
        }
        for element in groups(&self.groups.to_delete)
            .into_iter()
            .chain(tokens(&self.tokens.to_delete))
        {
            entries.push(DiffEntry::Delete(element));
        }
        entries
    }

    /// Returns true if nothing is created or deleted.
    pub fn is_structurally_unchanged(&self) -> bool {
        self.tokens.to_create.is_empty()
            && self.tokens.to_delete.is_empty()
            && self.groups.to_create.is_empty()
            && self.groups.to_delete.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenType;

    #[test]
    fn entries_are_tagged_by_outcome() {
        let mut diff = TreeDiff::default();
        diff.groups
            .to_create
            .push(TokenGroup::new("g1", "Primary", TokenType::Color, "b"));
        diff.groups
            .to_delete
            .push(TokenGroup::new("g2", "Old", TokenType::Color, "b"));

        let entries = diff.entries();
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], DiffEntry::Create(TreeElement::Group(g)) if g.id == "g1"));
        assert_eq!(entries[1].element().id(), "g2");
        assert!(!diff.is_structurally_unchanged());
    }
}
