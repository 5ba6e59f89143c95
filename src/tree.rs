use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::iter;
use std::ops::ControlFlow;

use tracing::{debug, trace, warn};

use crate::config::TreeOptions;
use crate::error::{find_nul, validate_key, Result};
use crate::iter::PrefixIter;
use crate::node::{Link, NodeArena, Ptr, ValueTable, TERMINATOR};
use crate::path::PathStack;
use crate::payload::{Payload, StoreMode};

/// Query byte at `pos`, with the terminator past the end of the key.
#[inline]
pub(crate) fn key_byte(key: &[u8], pos: usize) -> u8 {
    key.get(pos).copied().unwrap_or(TERMINATOR)
}

/// Where a descent ended.
enum Descent {
    /// Terminal node matching the whole key.
    Terminal(Ptr),
    /// Null link reached after matching `pos` bytes.
    Vacant { link: Link, pos: usize },
}

// =============================================================================
// TernaryTree
// =============================================================================

/// An ordered set of byte strings stored as a ternary search tree.
///
/// Each node holds one byte and three links: `less` and `greater` lead to
/// siblings at the same depth, `equal` to the next byte of the same string.
/// A string ends at a terminal node (byte 0) whose `equal` link is reused as
/// the slot for the string's [`Payload`].
///
/// Keys may not contain zero bytes. No rebalancing is performed.
#[derive(Clone)]
pub struct TernaryTree<'a> {
    pub(crate) nodes: NodeArena,
    pub(crate) values: ValueTable<Payload<'a>>,
    pub(crate) root: Ptr,
    count: usize,
    options: TreeOptions,
}

impl<'a> TernaryTree<'a> {
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            nodes: NodeArena::with_limit(options.node_capacity, options.max_nodes),
            values: ValueTable::with_limit(options.max_nodes),
            root: Ptr::NULL,
            count: 0,
            options,
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Number of stored strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of live nodes, including sentinels left behind by removals.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity()
            + self.values.capacity()
            + self.values.values().map(Payload::heap_size).sum::<usize>()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
        self.values.shrink_to_fit();
    }

    #[inline]
    fn link_target(&self, link: Link) -> Ptr {
        match link {
            Link::Root => self.root,
            Link::Less(p) => self.nodes.get(p).less,
            Link::Equal(p) => self.nodes.get(p).equal,
            Link::Greater(p) => self.nodes.get(p).greater,
        }
    }

    #[inline]
    fn set_link(&mut self, link: Link, target: Ptr) {
        match link {
            Link::Root => self.root = target,
            Link::Less(p) => self.nodes.get_mut(p).less = target,
            Link::Equal(p) => {
                debug_assert!(!self.nodes.get(p).is_terminal());
                self.nodes.get_mut(p).equal = target
            }
            Link::Greater(p) => self.nodes.get_mut(p).greater = target,
        }
    }

    /// Walk `key` from the root, reporting each traversed link to `visit`.
    fn descend<E>(
        &self,
        key: &[u8],
        mut visit: impl FnMut(Link) -> std::result::Result<(), E>,
    ) -> std::result::Result<Descent, E> {
        let mut link = Link::Root;
        let mut pos = 0;
        loop {
            let cur = self.link_target(link);
            if cur.is_null() {
                return Ok(Descent::Vacant { link, pos });
            }
            visit(link)?;

            let q = key_byte(key, pos);
            link = match self.nodes.get(cur).byte.cmp(&q) {
                Ordering::Less => Link::Greater(cur),
                Ordering::Greater => Link::Less(cur),
                Ordering::Equal if q == TERMINATOR => return Ok(Descent::Terminal(cur)),
                Ordering::Equal => {
                    pos += 1;
                    Link::Equal(cur)
                }
            };
        }
    }

    fn find_terminal(&self, key: &[u8]) -> Option<Ptr> {
        if find_nul(key).is_some() {
            return None;
        }
        match self.descend(key, |_| Ok::<(), Infallible>(())) {
            Ok(Descent::Terminal(t)) => Some(t),
            Ok(Descent::Vacant { .. }) => None,
            Err(never) => match never {},
        }
    }

    /// Payload of a reachable terminal.
    ///
    /// Every reachable terminal holds a payload: removal clears the slot and
    /// then either frees the terminal or splices it out, since a terminal's
    /// `less` link is always empty and it can never be kept as a sentinel.
    #[inline]
    fn payload_of(&self, terminal: Ptr) -> &Payload<'a> {
        self.values
            .get(self.nodes.get(terminal).data_slot())
            .expect("terminal must hold a live payload")
    }
}

// =============================================================================
// Insertion
// =============================================================================

impl<'a> TernaryTree<'a> {
    /// Add `key`, keeping either a copy or a reference to it.
    ///
    /// Inserting a key that is already present changes nothing and returns the
    /// existing payload, whatever `mode` it was stored with.
    /// Shared prefixes reuse existing nodes; only the unmatched suffix is
    /// allocated.
    ///
    /// All memory is reserved before the tree is touched, so on error the tree
    /// is unchanged.
    pub fn insert(&mut self, key: &'a [u8], mode: StoreMode) -> Result<&Payload<'a>> {
        self.insert_with(key, || Payload::try_new(key, mode))
    }

    /// Add `key` as a tree-owned copy. The key need not outlive the tree.
    pub fn insert_owned(&mut self, key: &[u8]) -> Result<&Payload<'a>> {
        self.insert_with(key, || Payload::try_copy(key))
    }

    /// Add `key` with the configured [`TreeOptions::default_store`].
    pub fn insert_default(&mut self, key: &'a [u8]) -> Result<&Payload<'a>> {
        let mode = self.options.default_store;
        self.insert(key, mode)
    }

    fn insert_with(
        &mut self,
        key: &[u8],
        make: impl FnOnce() -> Result<Payload<'a>>,
    ) -> Result<&Payload<'a>> {
        validate_key(key)?;

        let descent = match self.descend(key, |_| Ok::<(), Infallible>(())) {
            Ok(d) => d,
            Err(never) => match never {},
        };

        let (mut link, pos) = match descent {
            Descent::Terminal(t) => return Ok(self.payload_of(t)),
            Descent::Vacant { link, pos } => (link, pos),
        };

        let suffix = &key[pos..];
        self.nodes.try_reserve(suffix.len() + 1).inspect_err(|err| {
            warn!(%err, nodes = suffix.len() + 1, "insert failed to reserve nodes");
        })?;
        let payload = self.reserve_payload(make)?;

        let mut terminal = Ptr::NULL;
        for &b in suffix.iter().chain(iter::once(&TERMINATOR)) {
            terminal = self.nodes.alloc(b);
            self.set_link(link, terminal);
            link = Link::Equal(terminal);
        }
        debug_assert!(self.nodes.get(terminal).is_terminal());
        let slot = self.values.put(payload);
        self.nodes.get_mut(terminal).equal = slot;

        self.count += 1;
        Ok(self.payload_of(terminal))
    }

    fn reserve_payload(
        &mut self,
        make: impl FnOnce() -> Result<Payload<'a>>,
    ) -> Result<Payload<'a>> {
        self.values
            .try_reserve()
            .and_then(|()| make())
            .inspect_err(|err| warn!(%err, "insert failed to reserve payload"))
    }
}

// =============================================================================
// Lookup
// =============================================================================

impl<'a> TernaryTree<'a> {
    /// Payload stored for exactly `key`.
    pub fn get(&self, key: &[u8]) -> Option<&Payload<'a>> {
        let terminal = self.find_terminal(key)?;
        self.values.get(self.nodes.get(terminal).data_slot())
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Root of the subtree holding every string that starts with `prefix`.
    pub(crate) fn prefix_root(&self, prefix: &[u8]) -> Ptr {
        if find_nul(prefix).is_some() {
            return Ptr::NULL;
        }
        let mut cur = self.root;
        let mut pos = 0;
        while pos < prefix.len() && !cur.is_null() {
            let node = self.nodes.get(cur);
            cur = match node.byte.cmp(&prefix[pos]) {
                Ordering::Less => node.greater,
                Ordering::Greater => node.less,
                Ordering::Equal => {
                    pos += 1;
                    node.equal_child()
                }
            };
        }
        cur
    }

    /// All payloads whose key starts with `prefix`, in ascending key order.
    pub fn prefix_iter<'t>(&'t self, prefix: &[u8]) -> PrefixIter<'t, 'a> {
        self.prefix_search(prefix, usize::MAX)
    }

    /// Like [`prefix_iter`](Self::prefix_iter) but yields at most `max_count`
    /// payloads.
    pub fn prefix_search<'t>(&'t self, prefix: &[u8], max_count: usize) -> PrefixIter<'t, 'a> {
        PrefixIter::new(self, self.prefix_root(prefix), max_count)
    }

    /// Call `f` for up to `max_count` payloads under `prefix`, in ascending
    /// key order, until it returns `Break`. Returns how many were delivered.
    pub fn for_each_prefix<F>(&self, prefix: &[u8], max_count: usize, mut f: F) -> usize
    where
        F: FnMut(&Payload<'a>) -> ControlFlow<()>,
    {
        let mut delivered = 0;
        for payload in self.prefix_search(prefix, max_count) {
            delivered += 1;
            if f(payload).is_break() {
                break;
            }
        }
        delivered
    }

    /// Every payload in ascending key order.
    pub fn iter<'t>(&'t self) -> PrefixIter<'t, 'a> {
        self.prefix_iter(b"")
    }
}

// =============================================================================
// Removal
// =============================================================================

impl<'a> TernaryTree<'a> {
    /// Remove `key`, releasing its payload. Returns whether it was present.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        self.take(key).is_some()
    }

    /// Remove `key` and hand its payload back to the caller.
    pub fn take(&mut self, key: &[u8]) -> Option<Payload<'a>> {
        if find_nul(key).is_some() {
            return None;
        }

        let path = PathStack::with_limit(self.options.path_capacity, self.node_count());
        let mut path = match path {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "remove failed to allocate path stack");
                return None;
            }
        };

        let terminal = match self.descend(key, |link| path.try_push(link)) {
            Ok(Descent::Terminal(t)) => t,
            Ok(Descent::Vacant { .. }) => return None,
            Err(err) => {
                warn!(%err, depth = path.len(), "remove failed to grow path stack");
                return None;
            }
        };

        let slot = self.nodes.get(terminal).data_slot();
        let payload = self.values.take(slot)?;
        self.nodes.get_mut(terminal).equal = Ptr::NULL;
        self.count -= 1;

        self.repair(path);
        Some(payload)
    }

    /// Free dead nodes along `path` and splice out at most one more.
    ///
    /// The last link on `path` points at the terminal whose data was just
    /// cleared.
    fn repair(&mut self, mut path: PathStack) {
        let Some(mut link) = path.pop() else {
            return;
        };
        let mut cur = self.link_target(link);

        while self.nodes.get(cur).is_dead() {
            self.set_link(link, Ptr::NULL);
            self.nodes.release(cur);
            trace!(node = cur.idx(), "freed dead node");

            match path.pop() {
                Some(parent) => {
                    debug_assert_eq!(Some(self.link_target(parent)), link.owner());
                    link = parent;
                    cur = self.link_target(link);
                }
                None => return,
            }
        }

        let node = self.nodes.get(cur).clone();
        if !node.equal.is_null() {
            // Still a prefix of another string (or a terminal with data).
            return;
        }

        let replacement = match (node.less.is_null(), node.greater.is_null()) {
            (false, true) => node.less,
            (true, false) => node.greater,
            (false, false) => {
                if self.nodes.get(node.less).greater.is_null() {
                    self.nodes.get_mut(node.less).greater = node.greater;
                    trace!(node = cur.idx(), "promoted less child");
                    node.less
                } else if self.nodes.get(node.greater).less.is_null() {
                    self.nodes.get_mut(node.greater).less = node.less;
                    trace!(node = cur.idx(), "promoted greater child");
                    node.greater
                } else {
                    trace!(node = cur.idx(), "kept sentinel");
                    return;
                }
            }
            (true, true) => {
                debug_assert!(false, "dead node survived cleanup");
                return;
            }
        };

        self.set_link(link, replacement);
        self.nodes.release(cur);
        trace!(node = cur.idx(), "spliced out node");
    }
}

// =============================================================================
// Teardown
// =============================================================================

enum Teardown {
    Enter(Ptr),
    Release(Ptr),
    Free,
}

impl<'a> TernaryTree<'a> {
    /// Release every node and owned payload, leaving an empty tree.
    ///
    /// Returns the number of nodes released.
    pub fn clear(&mut self) -> usize {
        let mut released = 0usize;
        let mut stack = Vec::new();
        if !self.root.is_null() {
            stack.push(Teardown::Enter(self.root));
        }

        // Post-order: less, equal (or payload), greater, then the node itself.
        while let Some(step) = stack.pop() {
            match step {
                Teardown::Enter(ptr) => {
                    let node = self.nodes.get(ptr);
                    stack.push(Teardown::Free);
                    if !node.greater.is_null() {
                        stack.push(Teardown::Enter(node.greater));
                    }
                    if node.is_terminal() {
                        stack.push(Teardown::Release(node.data_slot()));
                    } else if !node.equal.is_null() {
                        stack.push(Teardown::Enter(node.equal));
                    }
                    if !node.less.is_null() {
                        stack.push(Teardown::Enter(node.less));
                    }
                }
                Teardown::Release(slot) => drop(self.values.take(slot)),
                Teardown::Free => released += 1,
            }
        }

        debug_assert_eq!(released, self.nodes.len());
        debug!(released, strings = self.count, "cleared ternary tree");

        self.nodes.clear();
        self.values.clear();
        self.root = Ptr::NULL;
        self.count = 0;
        released
    }
}

impl Default for TernaryTree<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TernaryTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'t, 'a> IntoIterator for &'t TernaryTree<'a> {
    type Item = &'t Payload<'a>;
    type IntoIter = PrefixIter<'t, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Inserts with [`TreeOptions::default_store`]. Keys with zero bytes are
/// skipped, as are keys that fail to allocate.
impl<'a> Extend<&'a [u8]> for TernaryTree<'a> {
    fn extend<I: IntoIterator<Item = &'a [u8]>>(&mut self, keys: I) {
        for key in keys {
            if let Err(err) = self.insert_default(key) {
                warn!(%err, "skipped key while extending");
            }
        }
    }
}

impl<'a> FromIterator<&'a [u8]> for TernaryTree<'a> {
    fn from_iter<I: IntoIterator<Item = &'a [u8]>>(keys: I) -> Self {
        let mut tree = Self::new();
        tree.extend(keys);
        tree
    }
}
