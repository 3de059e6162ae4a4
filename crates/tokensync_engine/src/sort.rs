//! Sort order correction.

use crate::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};
use tokensync_model::{Token, TokenGroup, TreeDiff};

/// Distance between consecutive sort orders.
pub const SORT_ORDER_SPACING: i64 = 100;

/// Renumbers sort orders along a pre-order walk of every type root.
#[derive(Debug, Clone, Copy)]
pub struct SortOrderCorrector {
    spacing: i64,
}

impl Default for SortOrderCorrector {
    fn default() -> Self {
        Self::new(SORT_ORDER_SPACING)
    }
}

impl SortOrderCorrector {
    /// Creates a corrector with the given spacing.
    pub fn new(spacing: i64) -> Self {
        Self { spacing }
    }

    /// Renumbers `tokens` and `groups` in place.
    ///
    /// Entities not reachable from any root keep their order. Nothing is
    /// changed if the walk fails.
    pub fn correct(&self, tokens: &mut [Token], groups: &mut [TokenGroup]) -> EngineResult<()> {
        let orders = self.compute(tokens.iter(), groups.iter())?;
        apply(&orders, tokens.iter_mut(), groups.iter_mut());
        Ok(())
    }

    /// Renumbers the upserts of `diff`. Deleted entities are not walked.
    pub fn correct_diff(&self, diff: &mut TreeDiff) -> EngineResult<()> {
        let orders = self.compute(diff.tokens.upserts(), diff.groups.upserts())?;
        apply(&orders, diff.tokens.upserts_mut(), diff.groups.upserts_mut());
        Ok(())
    }

    fn compute<'a>(
        &self,
        tokens: impl Iterator<Item = &'a Token>,
        groups: impl Iterator<Item = &'a TokenGroup>,
    ) -> EngineResult<HashMap<String, i64>> {
        let token_ids: HashSet<&str> = tokens.map(|t| t.id.as_str()).collect();
        let groups: Vec<&TokenGroup> = groups.collect();
        let group_index: HashMap<&str, &TokenGroup> =
            groups.iter().map(|g| (g.id.as_str(), *g)).collect();

        let mut orders = HashMap::new();
        for root in groups.iter().filter(|g| g.is_root) {
            let mut visited: HashSet<&str> = HashSet::new();
            let mut position: i64 = 0;
            let mut stack: Vec<&str> = vec![root.id.as_str()];

            while let Some(id) = stack.pop() {
                if !visited.insert(id) {
                    return Err(EngineError::TreeConsistency {
                        id: id.to_string(),
                        token_type: root.token_type,
                        message: "cyclic or shared child".into(),
                    });
                }
                orders.insert(id.to_string(), position * self.spacing);
                position += 1;

                if let Some(group) = group_index.get(id) {
                    // Reversed so the first child is visited first.
                    for child in group.child_ids.iter().rev() {
                        if !group_index.contains_key(child.as_str())
                            && !token_ids.contains(child.as_str())
                        {
                            return Err(EngineError::dangling_child(child.clone(), root.token_type));
                        }
                        stack.push(child.as_str());
                    }
                }
            }
        }
        Ok(orders)
    }
}

fn apply<'a>(
    orders: &HashMap<String, i64>,
    tokens: impl Iterator<Item = &'a mut Token>,
    groups: impl Iterator<Item = &'a mut TokenGroup>,
) {
    for token in tokens {
        if let Some(&order) = orders.get(&token.id) {
            token.sort_order = order;
        }
    }
    for group in groups {
        if let Some(&order) = orders.get(&group.id) {
            group.sort_order = order;
        }
    }
}
