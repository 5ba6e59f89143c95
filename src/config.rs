use crate::node::MAX_SLOTS;
use crate::payload::StoreMode;

/// Construction options for [`TernaryTree`](crate::TernaryTree).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TreeOptions {
    /// Nodes reserved up front in the arena.
    pub node_capacity: usize,
    /// Storage used by `insert_default`, `Extend` and `FromIterator`.
    pub default_store: StoreMode,
    /// Initial capacity of the path stack used by removal.
    pub path_capacity: usize,
    /// Most nodes the tree may hold; inserts past it fail with
    /// `AllocationFailed`. Clamped to the addressable range.
    pub max_nodes: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            node_capacity: 0,
            default_store: StoreMode::Reference,
            path_capacity: 16,
            max_nodes: MAX_SLOTS,
        }
    }
}

impl TreeOptions {
    pub fn with_node_capacity(mut self, node_capacity: usize) -> Self {
        self.node_capacity = node_capacity;
        self
    }

    pub fn with_default_store(mut self, mode: StoreMode) -> Self {
        self.default_store = mode;
        self
    }

    pub fn with_path_capacity(mut self, path_capacity: usize) -> Self {
        self.path_capacity = path_capacity;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}
