use crate::error::{Result, TstError};

// =============================================================================
// Pointer type
// =============================================================================

/// Index of a node in the arena. `Ptr::NULL` is the empty link.
///
/// On a terminal node the `equal` field holds a value-table index instead, with
/// `Ptr::NULL` meaning the data slot is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Ptr(u32);

/// Slots addressable by a `Ptr`; index `u32::MAX` is taken by `NULL`.
pub(crate) const MAX_SLOTS: usize = u32::MAX as usize;

/// Whether growing a table of `len` slots by `additional` stays within `limit`.
#[inline]
fn fits(len: usize, additional: usize, limit: usize) -> bool {
    len.checked_add(additional).is_some_and(|total| total <= limit)
}

impl Ptr {
    pub(crate) const NULL: Ptr = Ptr(u32::MAX);

    #[inline]
    pub(crate) fn new(idx: usize) -> Self {
        debug_assert!(idx < u32::MAX as usize);
        Self(idx as u32)
    }

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    pub(crate) fn idx(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }
}

// =============================================================================
// Node
// =============================================================================

/// Byte value of terminal nodes.
pub(crate) const TERMINATOR: u8 = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) byte: u8,
    pub(crate) less: Ptr,
    /// Continuation child, or the data slot of a terminal node.
    pub(crate) equal: Ptr,
    pub(crate) greater: Ptr,
}

impl Node {
    #[inline]
    pub(crate) fn new(byte: u8) -> Self {
        Self {
            byte,
            less: Ptr::NULL,
            equal: Ptr::NULL,
            greater: Ptr::NULL,
        }
    }

    #[inline]
    pub(crate) fn is_terminal(&self) -> bool {
        self.byte == TERMINATOR
    }

    /// `equal` as a tree edge; always null on terminal nodes.
    #[inline]
    pub(crate) fn equal_child(&self) -> Ptr {
        if self.is_terminal() {
            Ptr::NULL
        } else {
            self.equal
        }
    }

    /// `equal` as a value-table index; always null on non-terminal nodes.
    #[inline]
    pub(crate) fn data_slot(&self) -> Ptr {
        if self.is_terminal() {
            self.equal
        } else {
            Ptr::NULL
        }
    }

    /// No children and, for a terminal, no data either.
    #[inline]
    pub(crate) fn is_dead(&self) -> bool {
        self.less.is_null() && self.greater.is_null() && self.equal.is_null()
    }
}

/// One child link of the tree: the root pointer or a field of a node.
///
/// Removal records the path as link slots so it can overwrite the parent's
/// link when splicing out a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Link {
    Root,
    Less(Ptr),
    Equal(Ptr),
    Greater(Ptr),
}

impl Link {
    /// Node owning this link, `None` for the root pointer.
    #[inline]
    pub(crate) fn owner(self) -> Option<Ptr> {
        match self {
            Link::Root => None,
            Link::Less(p) | Link::Equal(p) | Link::Greater(p) => Some(p),
        }
    }
}

// =============================================================================
// Node Arena
// =============================================================================

/// Node storage with a free list of released slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NodeArena {
    nodes: Vec<Node>,
    free: Vec<Ptr>,
    /// Upper bound on slots, never above `MAX_SLOTS`.
    limit: usize,
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::with_limit(0, MAX_SLOTS)
    }
}

impl NodeArena {
    pub(crate) fn with_limit(capacity: usize, limit: usize) -> Self {
        let limit = limit.min(MAX_SLOTS);
        Self {
            nodes: Vec::with_capacity(capacity.min(limit)),
            free: Vec::new(),
            limit,
        }
    }

    #[inline]
    pub(crate) fn get(&self, ptr: Ptr) -> &Node {
        &self.nodes[ptr.idx()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, ptr: Ptr) -> &mut Node {
        &mut self.nodes[ptr.idx()]
    }

    /// Live node count.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Make room for `n` allocations that cannot fail afterwards.
    pub(crate) fn try_reserve(&mut self, n: usize) -> Result<()> {
        let fresh = n - self.free.len().min(n);
        if !fits(self.nodes.len(), fresh, self.limit) {
            return Err(TstError::limit("node arena"));
        }
        self.nodes
            .try_reserve(fresh)
            .map_err(|e| TstError::alloc("node arena", e))
    }

    pub(crate) fn alloc(&mut self, byte: u8) -> Ptr {
        match self.free.pop() {
            Some(ptr) => {
                self.nodes[ptr.idx()] = Node::new(byte);
                ptr
            }
            None => {
                self.nodes.push(Node::new(byte));
                Ptr::new(self.nodes.len() - 1)
            }
        }
    }

    pub(crate) fn release(&mut self, ptr: Ptr) {
        debug_assert!(!self.free.contains(&ptr), "double free of node {ptr:?}");
        self.nodes[ptr.idx()] = Node::new(TERMINATOR);
        self.free.push(ptr);
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node>()
            + self.free.capacity() * std::mem::size_of::<Ptr>()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
        self.free.shrink_to_fit();
    }
}

// =============================================================================
// Value table
// =============================================================================

/// Slots for terminal payloads, addressed by a terminal's data slot.
#[derive(Clone, Debug)]
pub(crate) struct ValueTable<T> {
    slots: Vec<Option<T>>,
    free: Vec<Ptr>,
    limit: usize,
}

impl<T> Default for ValueTable<T> {
    fn default() -> Self {
        Self::with_limit(MAX_SLOTS)
    }
}

impl<T> ValueTable<T> {
    pub(crate) fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            limit: limit.min(MAX_SLOTS),
        }
    }

    #[inline]
    pub(crate) fn get(&self, slot: Ptr) -> Option<&T> {
        if slot.is_null() {
            return None;
        }
        self.slots[slot.idx()].as_ref()
    }

    pub(crate) fn try_reserve(&mut self) -> Result<()> {
        if !self.free.is_empty() {
            return Ok(());
        }
        if !fits(self.slots.len(), 1, self.limit) {
            return Err(TstError::limit("value table"));
        }
        self.slots
            .try_reserve(1)
            .map_err(|e| TstError::alloc("value table", e))
    }

    pub(crate) fn put(&mut self, value: T) -> Ptr {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot.idx()] = Some(value);
                slot
            }
            None => {
                self.slots.push(Some(value));
                Ptr::new(self.slots.len() - 1)
            }
        }
    }

    pub(crate) fn take(&mut self, slot: Ptr) -> Option<T> {
        if slot.is_null() {
            return None;
        }
        let value = self.slots[slot.idx()].take();
        if value.is_some() {
            self.free.push(slot);
        }
        value
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Option<T>>()
            + self.free.capacity() * std::mem::size_of::<Ptr>()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.slots.shrink_to_fit();
        self.free.shrink_to_fit();
    }
}
