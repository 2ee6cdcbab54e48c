//! In-memory content store on a generational arena, persisted as TOML.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use generational_arena::{Arena, Index};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{ChildOrderRule, ContentInstance, ContentNode, ContentRef, ContentStatus};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::{ContentRepository, SaveFlags, StoreError, TypeRepository};

/// Arena slot: the node plus its children indices, in insertion order.
#[derive(Debug)]
struct StoredNode {
    node: ContentNode,
    children: Vec<Index>,
}

#[derive(Debug)]
struct StoreState {
    arena: Arena<StoredNode>,
    index: BTreeMap<ContentRef, Index>,
    next_id: u64,
}

impl StoreState {
    fn empty() -> Self {
        Self {
            arena: Arena::new(),
            index: BTreeMap::new(),
            next_id: ContentRef::START.id(),
        }
    }

    fn insert(&mut self, node: ContentNode) -> Result<(), StoreError> {
        let parent_idx = match node.parent {
            Some(parent) => Some(
                *self
                    .index
                    .get(&parent)
                    .ok_or(StoreError::NotFound(parent))?,
            ),
            None => None,
        };
        let reference = node.reference;
        let idx = self.arena.insert(StoredNode {
            node,
            children: Vec::new(),
        });
        if let Some(parent) = parent_idx.and_then(|p| self.arena.get_mut(p)) {
            parent.children.push(idx);
        }
        self.index.insert(reference, idx);
        self.next_id = self.next_id.max(reference.id() + 1);
        Ok(())
    }

    fn get(&self, reference: ContentRef) -> Option<&StoredNode> {
        self.index.get(&reference).and_then(|&i| self.arena.get(i))
    }

    /// Nodes in pre-order, parents before children.
    fn preorder(&self) -> Vec<ContentNode> {
        let mut out = Vec::with_capacity(self.index.len());
        let mut stack: Vec<Index> = self
            .index
            .values()
            .filter(|&&i| self.arena.get(i).is_some_and(|s| s.node.parent.is_none()))
            .rev()
            .copied()
            .collect();
        while let Some(idx) = stack.pop() {
            if let Some(stored) = self.arena.get(idx) {
                out.push(stored.node.clone());
                stack.extend(stored.children.iter().rev());
            }
        }
        out
    }
}

/// On-disk form of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreFile {
    pub next_id: u64,
    #[serde(default)]
    pub nodes: Vec<ContentNode>,
}

/// Content store holding the whole tree in memory.
///
/// Seeded with the start node (`ContentRef::START`). Content types are resolved through the
/// type repository so `get_default` can hand out instances that know their properties.
pub struct MemoryContentStore {
    types: Arc<dyn TypeRepository>,
    state: RwLock<StoreState>,
}

impl MemoryContentStore {
    pub fn new(types: Arc<dyn TypeRepository>) -> Self {
        let mut state = StoreState::empty();
        let start = ContentNode {
            reference: ContentRef::START,
            parent: None,
            type_name: "Start".to_string(),
            name: "Start".to_string(),
            peer_order: None,
            child_order_rule: ChildOrderRule::default(),
            status: ContentStatus::Published,
            published_at: None,
            properties: BTreeMap::new(),
        };
        let idx = state.arena.insert(StoredNode {
            node: start,
            children: Vec::new(),
        });
        state.index.insert(ContentRef::START, idx);
        state.next_id = ContentRef::START.id() + 1;
        Self {
            types,
            state: RwLock::new(state),
        }
    }

    /// Load a store file, or start a fresh store when it does not exist.
    #[instrument(level = "debug", skip(types))]
    pub fn open(path: &Path, types: Arc<dyn TypeRepository>) -> InfraResult<Self> {
        if !path.exists() {
            debug!("no store file, starting fresh");
            return Ok(Self::new(types));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
        let file: StoreFile =
            toml::from_str(&content).map_err(|e| InfraError::store_file(path, e.to_string()))?;
        Self::from_file(file, types).map_err(|e| InfraError::store_file(path, e.to_string()))
    }

    pub fn from_file(file: StoreFile, types: Arc<dyn TypeRepository>) -> Result<Self, StoreError> {
        let mut state = StoreState::empty();
        for node in file.nodes {
            state.insert(node)?;
        }
        state.next_id = state.next_id.max(file.next_id);
        if state.get(ContentRef::START).is_none() {
            return Err(StoreError::NotFound(ContentRef::START));
        }
        Ok(Self {
            types,
            state: RwLock::new(state),
        })
    }

    pub fn to_file(&self) -> StoreFile {
        let state = self.read();
        StoreFile {
            next_id: state.next_id,
            nodes: state.preorder(),
        }
    }

    /// Write the store as TOML, creating parent directories.
    #[instrument(level = "debug", skip(self))]
    pub fn save_to(&self, path: &Path) -> InfraResult<()> {
        let content = toml::to_string_pretty(&self.to_file())
            .map_err(|e| InfraError::store_file(path, e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
        }
        std::fs::write(path, content)
            .map_err(|e| InfraError::io(format!("write {}", path.display()), e))
    }

    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ContentRepository for MemoryContentStore {
    fn get_default(&self, parent: ContentRef, type_id: u32) -> Result<ContentInstance, StoreError> {
        if self.read().get(parent).is_none() {
            return Err(StoreError::NotFound(parent));
        }
        let content_type = self
            .types
            .load_by_id(type_id)
            .ok_or(StoreError::UnknownTypeId(type_id))?;
        Ok(ContentInstance::new(parent, content_type))
    }

    #[instrument(level = "trace", skip(self, instance), fields(name = %instance.name))]
    fn save(&self, instance: ContentInstance, flags: SaveFlags) -> Result<ContentRef, StoreError> {
        if !flags.skip_validation {
            let missing = instance.missing_required();
            if !missing.is_empty() {
                return Err(StoreError::Validation {
                    name: instance.name,
                    missing,
                });
            }
        }

        let parent = instance.parent;
        let mut state = self.write();
        let reference = ContentRef(state.next_id);
        let (status, published_at) = if flags.publish {
            (ContentStatus::Published, Some(Utc::now().to_rfc3339()))
        } else {
            (ContentStatus::Draft, None)
        };
        let node = ContentNode {
            reference,
            parent: Some(parent),
            type_name: instance.content_type.name.clone(),
            name: instance.name.clone(),
            peer_order: instance.peer_order,
            child_order_rule: instance.child_order_rule,
            status,
            published_at,
            properties: instance.into_properties(),
        };
        state.insert(node)?;
        debug!("saved {} under {}", reference, parent);
        Ok(reference)
    }

    fn get(&self, reference: ContentRef) -> Option<ContentNode> {
        self.read().get(reference).map(|s| s.node.clone())
    }

    fn children(&self, reference: ContentRef) -> Vec<ContentNode> {
        let state = self.read();
        let Some(stored) = state.get(reference) else {
            return Vec::new();
        };
        let mut children: Vec<ContentNode> = stored
            .children
            .iter()
            .filter_map(|&i| state.arena.get(i).map(|c| c.node.clone()))
            .collect();
        match stored.node.child_order_rule {
            ChildOrderRule::Index => {
                children.sort_by_key(|c| (c.peer_order.unwrap_or(u32::MAX), c.reference))
            }
            ChildOrderRule::Name => {
                children.sort_by(|a, b| a.name.cmp(&b.name).then(a.reference.cmp(&b.reference)))
            }
            ChildOrderRule::Created => children.sort_by_key(|c| c.reference),
        }
        children
    }
}
