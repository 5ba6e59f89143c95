use std::iter::FusedIterator;

use crate::node::Ptr;
use crate::payload::Payload;
use crate::tree::TernaryTree;

#[derive(Clone, Copy, Debug)]
enum Visit {
    Node(Ptr),
    /// Data slot of a terminal reached in order.
    Emit(Ptr),
}

/// In-order walk over one subtree, yielding payloads in ascending key order.
///
/// Stops after `remaining` payloads; the unvisited part of the subtree is
/// dropped with the iterator.
#[derive(Clone, Debug)]
pub struct PrefixIter<'t, 'a> {
    tree: &'t TernaryTree<'a>,
    stack: Vec<Visit>,
    remaining: usize,
}

impl<'t, 'a> PrefixIter<'t, 'a> {
    pub(crate) fn new(tree: &'t TernaryTree<'a>, start: Ptr, max_count: usize) -> Self {
        let mut stack = Vec::new();
        if !start.is_null() && max_count > 0 {
            stack.push(Visit::Node(start));
        }
        Self {
            tree,
            stack,
            remaining: max_count,
        }
    }
}

impl<'t, 'a> Iterator for PrefixIter<'t, 'a> {
    type Item = &'t Payload<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            self.stack.clear();
            return None;
        }

        while let Some(visit) = self.stack.pop() {
            match visit {
                Visit::Emit(slot) => {
                    if let Some(payload) = self.tree.values.get(slot) {
                        self.remaining -= 1;
                        return Some(payload);
                    }
                }
                Visit::Node(ptr) => {
                    let node = self.tree.nodes.get(ptr);
                    if !node.greater.is_null() {
                        self.stack.push(Visit::Node(node.greater));
                    }
                    if node.is_terminal() {
                        self.stack.push(Visit::Emit(node.data_slot()));
                    } else if !node.equal.is_null() {
                        self.stack.push(Visit::Node(node.equal));
                    }
                    if !node.less.is_null() {
                        self.stack.push(Visit::Node(node.less));
                    }
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.stack.is_empty() || self.remaining == 0 {
            (0, Some(0))
        } else {
            (0, Some(self.remaining.min(self.tree.len())))
        }
    }
}

impl FusedIterator for PrefixIter<'_, '_> {}
