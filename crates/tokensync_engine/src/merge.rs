//! Tree diff and merge.
//!
//! Reconciles a freshly resolved local definition against the upstream tree
//! of one brand and produces disjoint create/update/delete sets. Matching is
//! by persistent id first, then by (type, group path, name). Matched upstream
//! entities keep their ids and are mutated in the working copy.

use crate::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};
use tokensync_model::{ProcessedNode, Token, TokenGroup, TokenType, TreeDiff};
use tracing::debug;
use uuid::Uuid;

type PathKey = (TokenType, Vec<String>);

/// Merges processed nodes into an upstream tree.
#[derive(Debug, Clone)]
pub struct TreeMerger {
    brand_id: String,
}

/// Working state of one merge run.
struct Workspace<'a> {
    brand_id: &'a str,
    tokens: Vec<Token>,
    groups: Vec<TokenGroup>,
    upstream_group_count: usize,
    group_index: HashMap<String, usize>,
    parent_of: HashMap<String, usize>,
    roots: HashMap<TokenType, usize>,
    child_group_by_name: HashMap<(usize, String), usize>,
    local_groups: HashMap<PathKey, &'a TokenGroup>,
    visited_groups: HashSet<usize>,
    created_groups: Vec<usize>,
}

impl TreeMerger {
    /// Creates a merger for `brand_id`; upstream content of other brands is ignored.
    pub fn new(brand_id: impl Into<String>) -> Self {
        Self {
            brand_id: brand_id.into(),
        }
    }

    /// Computes the diff of `nodes` against the upstream tree.
    ///
    /// The upstream slices are copied into a working set before any change,
    /// so callers holding cached snapshots never observe the merge. Fails if
    /// a node's persistent id belongs to an upstream token of another type.
    ///
    /// `local_groups` are the groups built for the definition; a group that
    /// has to be created reuses the id and description of the local group at
    /// the same path.
    pub fn merge(
        &self,
        upstream_tokens: &[Token],
        upstream_groups: &[TokenGroup],
        nodes: &[ProcessedNode],
        local_groups: &[TokenGroup],
    ) -> EngineResult<TreeDiff> {
        let mut work =
            Workspace::new(&self.brand_id, upstream_tokens, upstream_groups, local_groups)?;

        let by_persistent_id: HashMap<String, usize> = work
            .tokens
            .iter()
            .enumerate()
            .map(|(index, t)| (t.persistent_id.clone(), index))
            .collect();
        let by_path = work.token_paths();

        let mut claimed: HashMap<usize, String> = HashMap::new();
        let mut id_map: HashMap<String, String> = HashMap::new();
        let mut created_tokens: Vec<Token> = Vec::new();

        for processed in nodes {
            let token_type = processed.token.token_type;
            let parent = work.walk_path(token_type, &processed.path);
            let parent_id = work.groups[parent].id.clone();

            let by_id = by_persistent_id.get(&processed.token.persistent_id).copied();
            if let Some(upstream) = by_id.map(|index| &work.tokens[index]) {
                if upstream.token_type != token_type {
                    return Err(EngineError::Definition(format!(
                        "{} has type {token_type} but persistent id {} belongs to token {} of type {}",
                        processed.node.full_path(),
                        upstream.persistent_id,
                        upstream.id,
                        upstream.token_type
                    )));
                }
            }
            let matched = by_id.or_else(|| {
                let key = (token_type, processed.path.clone(), processed.token.name.clone());
                by_path.get(&key).copied()
            });

            let Some(index) = matched else {
                let mut token = processed.token.clone();
                token.brand_id = self.brand_id.clone();
                token.parent_id = Some(parent_id);
                work.groups[parent].add_child(&token.id);
                created_tokens.push(token);
                continue;
            };

            if let Some(previous) = claimed.insert(index, processed.node.full_path()) {
                return Err(EngineError::Definition(format!(
                    "{previous} and {} both match token {}",
                    processed.node.full_path(),
                    work.tokens[index].id
                )));
            }
            let token_id = work.tokens[index].id.clone();
            id_map.insert(processed.token.id.clone(), token_id.clone());

            let token = &mut work.tokens[index];
            token.name = processed.token.name.clone();
            token.description = processed.token.description.clone();
            token.value = processed.token.value.clone();
            token.alias_id = processed.token.alias_id.clone();
            token.parent_id = Some(parent_id);

            match work.parent_of.get(&token_id).copied() {
                Some(old) if old == parent => {}
                Some(old) => {
                    work.groups[old].remove_child(&token_id);
                    debug!(token = %token_id, "moving token");
                }
                None => {}
            }
            work.groups[parent].add_child(&token_id);
        }

        let remap = |token: &mut Token| {
            if let Some(target) = token.alias_id.as_ref().and_then(|id| id_map.get(id)) {
                token.alias_id = Some(target.clone());
            }
        };
        created_tokens.iter_mut().for_each(&remap);
        for index in claimed.keys() {
            remap(&mut work.tokens[*index]);
        }

        let mut diff = TreeDiff::default();
        let (kept, deleted): (Vec<_>, Vec<_>) = std::mem::take(&mut work.tokens)
            .into_iter()
            .enumerate()
            .partition(|(index, _)| claimed.contains_key(index));
        diff.tokens.to_update = kept.into_iter().map(|(_, t)| t).collect();
        diff.tokens.to_delete = deleted.into_iter().map(|(_, t)| t).collect();
        diff.tokens.to_create = created_tokens;

        let deleted_tokens: HashSet<&str> =
            diff.tokens.to_delete.iter().map(|t| t.id.as_str()).collect();
        for group in &mut work.groups {
            group.child_ids.retain(|id| !deleted_tokens.contains(id.as_str()));
        }

        let kept_tokens: HashSet<&str> = diff.tokens.upserts().map(|t| t.id.as_str()).collect();
        let retained = work.retained_groups(&kept_tokens);
        let deleted_groups: HashSet<String> = (0..work.upstream_group_count)
            .filter(|index| !retained.contains(index))
            .map(|index| work.groups[index].id.clone())
            .collect();
        for group in &mut work.groups {
            group.child_ids.retain(|id| !deleted_groups.contains(id));
        }

        let created: HashSet<usize> = work.created_groups.iter().copied().collect();
        let mut slots: Vec<Option<TokenGroup>> = work.groups.into_iter().map(Some).collect();
        for index in &work.created_groups {
            if let Some(group) = slots[*index].take() {
                diff.groups.to_create.push(group);
            }
        }
        for (index, slot) in slots.into_iter().enumerate() {
            let Some(group) = slot else { continue };
            if created.contains(&index) {
                continue;
            }
            if retained.contains(&index) {
                diff.groups.to_update.push(group);
            } else {
                diff.groups.to_delete.push(group);
            }
        }

        debug!(
            create = diff.tokens.to_create.len() + diff.groups.to_create.len(),
            update = diff.tokens.to_update.len() + diff.groups.to_update.len(),
            delete = diff.tokens.to_delete.len() + diff.groups.to_delete.len(),
            "merged tree"
        );
        Ok(diff)
    }
}

impl<'a> Workspace<'a> {
    fn new(
        brand_id: &'a str,
        upstream_tokens: &[Token],
        upstream_groups: &[TokenGroup],
        local_groups: &'a [TokenGroup],
    ) -> EngineResult<Self> {
        let tokens: Vec<Token> = upstream_tokens
            .iter()
            .filter(|t| t.brand_id == brand_id)
            .cloned()
            .collect();
        let groups: Vec<TokenGroup> = upstream_groups
            .iter()
            .filter(|g| g.brand_id == brand_id)
            .cloned()
            .collect();

        let group_index: HashMap<String, usize> = groups
            .iter()
            .enumerate()
            .map(|(index, g)| (g.id.clone(), index))
            .collect();

        let mut roots = HashMap::new();
        let mut parent_of = HashMap::new();
        let mut child_group_by_name = HashMap::new();
        for (index, group) in groups.iter().enumerate() {
            if group.is_root && roots.insert(group.token_type, index).is_some() {
                return Err(EngineError::TreeConsistency {
                    id: group.id.clone(),
                    token_type: group.token_type,
                    message: "duplicate root group".into(),
                });
            }
            for child in &group.child_ids {
                parent_of.entry(child.clone()).or_insert(index);
                if let Some(&child_index) = group_index.get(child) {
                    child_group_by_name
                        .entry((index, groups[child_index].name.clone()))
                        .or_insert(child_index);
                }
            }
        }

        Ok(Self {
            brand_id,
            upstream_group_count: groups.len(),
            tokens,
            groups,
            group_index,
            parent_of,
            roots,
            child_group_by_name,
            local_groups: local_group_paths(local_groups),
            visited_groups: HashSet::new(),
            created_groups: Vec::new(),
        })
    }

    /// Maps (type, group path, name) of every token reachable from a root.
    fn token_paths(&self) -> HashMap<(TokenType, Vec<String>, String), usize> {
        let token_index: HashMap<&str, usize> = self
            .tokens
            .iter()
            .enumerate()
            .map(|(index, t)| (t.id.as_str(), index))
            .collect();

        let mut paths = HashMap::new();
        for (&token_type, &root) in &self.roots {
            let mut seen = HashSet::new();
            let mut stack = vec![(root, Vec::new())];
            while let Some((index, path)) = stack.pop() {
                if !seen.insert(index) {
                    continue;
                }
                for child in &self.groups[index].child_ids {
                    if let Some(&group) = self.group_index.get(child) {
                        let mut child_path = path.clone();
                        child_path.push(self.groups[group].name.clone());
                        stack.push((group, child_path));
                    } else if let Some(&token) = token_index.get(child.as_str()) {
                        let key = (token_type, path.clone(), self.tokens[token].name.clone());
                        paths.entry(key).or_insert(token);
                    }
                }
            }
        }
        paths
    }

    /// Walks `path` from the type root, creating what is missing, and
    /// returns the leaf group.
    fn walk_path(&mut self, token_type: TokenType, path: &[String]) -> usize {
        let mut current = match self.roots.get(&token_type) {
            Some(&root) => root,
            None => {
                let reused = self.local_groups.get(&(token_type, Vec::new()));
                let id = reused.map(|g| g.id.clone()).unwrap_or_else(new_id);
                let mut root = TokenGroup::root(id, token_type, self.brand_id);
                if let Some(local) = reused {
                    root.description = local.description.clone();
                }
                let index = self.push_group(root);
                self.roots.insert(token_type, index);
                index
            }
        };
        self.visited_groups.insert(current);

        for depth in 1..=path.len() {
            let name = &path[depth - 1];
            let key = (current, name.clone());
            current = match self.child_group_by_name.get(&key) {
                Some(&existing) => existing,
                None => {
                    let reused = self.local_groups.get(&(token_type, path[..depth].to_vec()));
                    let id = reused.map(|g| g.id.clone()).unwrap_or_else(new_id);
                    let mut group = TokenGroup::new(id, name.clone(), token_type, self.brand_id);
                    if let Some(local) = reused {
                        group.description = local.description.clone();
                    }
                    group.parent_id = Some(self.groups[current].id.clone());
                    let child_id = group.id.clone();
                    let index = self.push_group(group);
                    self.groups[current].add_child(&child_id);
                    self.child_group_by_name.insert(key, index);
                    index
                }
            };
            self.visited_groups.insert(current);
        }
        current
    }

    fn push_group(&mut self, group: TokenGroup) -> usize {
        let index = self.groups.len();
        self.group_index.insert(group.id.clone(), index);
        self.groups.push(group);
        self.created_groups.push(index);
        index
    }

    /// Groups kept after the merge: visited, roots, created, or holding
    /// something kept.
    fn retained_groups(&self, token_ids: &HashSet<&str>) -> HashSet<usize> {
        let mut retained: HashSet<usize> = self
            .visited_groups
            .iter()
            .chain(self.roots.values())
            .chain(self.created_groups.iter())
            .copied()
            .collect();

        loop {
            let before = retained.len();
            for (index, group) in self.groups.iter().enumerate() {
                if retained.contains(&index) {
                    continue;
                }
                let holds_kept = group.child_ids.iter().any(|child| {
                    token_ids.contains(child.as_str())
                        || self
                            .group_index
                            .get(child)
                            .is_some_and(|g| retained.contains(g))
                });
                if holds_kept {
                    retained.insert(index);
                }
            }
            if retained.len() == before {
                return retained;
            }
        }
    }
}

/// Indexes local groups by (type, path below the root).
fn local_group_paths(groups: &[TokenGroup]) -> HashMap<PathKey, &TokenGroup> {
    let by_id: HashMap<&str, &TokenGroup> = groups.iter().map(|g| (g.id.as_str(), g)).collect();
    let mut paths = HashMap::new();
    for root in groups.iter().filter(|g| g.is_root) {
        let mut stack = vec![(root, Vec::new())];
        let mut seen = HashSet::new();
        while let Some((group, path)) = stack.pop() {
            if !seen.insert(group.id.as_str()) {
                continue;
            }
            for child in group.child_ids.iter().filter_map(|id| by_id.get(id.as_str())) {
                let mut child_path = path.clone();
                child_path.push(child.name.clone());
                stack.push((*child, child_path));
            }
            paths.entry((root.token_type, path)).or_insert(group);
        }
    }
    paths
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
