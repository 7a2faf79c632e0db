//! In-memory arena of categories keyed by id.
//!
//! Parent links are stored as ids, never as references, so every walk over the
//! hierarchy can carry a visited set and stop on a revisited node.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::categories::models::Category;
use crate::shared::constants::CATEGORY_PATH_SEPARATOR;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Category {0} not found")]
    UnknownCategory(Uuid),

    #[error("Category {child} references missing parent {parent}")]
    DanglingParent { child: Uuid, parent: Uuid },

    #[error("Ancestry of category {0} contains a cycle")]
    Cycle(Uuid),
}

impl From<TreeError> for AppError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::UnknownCategory(_) => AppError::NotFound(e.to_string()),
            TreeError::DanglingParent { .. } | TreeError::Cycle(_) => {
                tracing::error!("Corrupt category hierarchy: {}", e);
                AppError::Internal(e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: HashMap<Uuid, Category>,
}

impl CategoryTree {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            nodes: categories.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<&Category> {
        self.nodes.values().find(|c| c.slug == slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert or replace a node
    pub fn insert(&mut self, category: Category) {
        self.nodes.insert(category.id, category);
    }

    /// Ancestors of `id` ordered from the topmost root down to the node itself.
    pub fn ancestry(&self, id: Uuid) -> Result<Vec<&Category>, TreeError> {
        let mut current = self.nodes.get(&id).ok_or(TreeError::UnknownCategory(id))?;
        let mut visited = HashSet::from([id]);
        let mut chain = vec![current];

        while let Some(parent_id) = current.parent_id {
            if !visited.insert(parent_id) {
                return Err(TreeError::Cycle(id));
            }
            current = self.nodes.get(&parent_id).ok_or(TreeError::DanglingParent {
                child: current.id,
                parent: parent_id,
            })?;
            chain.push(current);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Render the ancestry as `"Root -> Child -> Node"`
    pub fn render_path(&self, id: Uuid) -> Result<String, TreeError> {
        let names: Vec<&str> = self
            .ancestry(id)?
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        Ok(names.join(CATEGORY_PATH_SEPARATOR))
    }

    /// Whether assigning `parent_id` as the parent of `id` would close a loop.
    pub fn would_create_cycle(&self, id: Uuid, parent_id: Uuid) -> Result<bool, TreeError> {
        if id == parent_id {
            return Ok(true);
        }
        Ok(self.ancestry(parent_id)?.iter().any(|c| c.id == id))
    }

    /// `id` followed by every descendant, breadth first. Empty if `id` is unknown.
    pub fn subtree(&self, id: Uuid) -> Vec<Uuid> {
        if !self.contains(id) {
            return Vec::new();
        }

        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for node in self.nodes.values() {
            if let Some(parent_id) = node.parent_id {
                children.entry(parent_id).or_default().push(node.id);
            }
        }

        let mut seen = HashSet::from([id]);
        let mut order = vec![id];
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for &child in children.get(&current).into_iter().flatten() {
                if seen.insert(child) {
                    order.push(child);
                    queue.push_back(child);
                }
            }
        }
        order
    }

    /// Remove `id` and all of its descendants, returning the removed nodes.
    pub fn remove_subtree(&mut self, id: Uuid) -> Vec<Category> {
        self.subtree(id)
            .into_iter()
            .filter_map(|node| self.nodes.remove(&node))
            .collect()
    }

    /// Direct children of `parent` (roots when `None`), sorted by name
    pub fn children_of(&self, parent: Option<Uuid>) -> Vec<&Category> {
        let mut children: Vec<&Category> = self
            .nodes
            .values()
            .filter(|c| c.parent_id == parent)
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        children
    }
}
