//! Path stack recorded by removal.

use crate::error::{Result, TstError};
use crate::node::Link;

/// LIFO of link slots from the root down to the node being removed.
///
/// Growth doubles the capacity and reports exhaustion instead of aborting.
/// Each link leads to a distinct live node, so depth is capped at `limit`.
#[derive(Debug)]
pub(crate) struct PathStack {
    links: Vec<Link>,
    limit: usize,
}

impl PathStack {
    pub(crate) fn with_limit(capacity: usize, limit: usize) -> Result<Self> {
        let mut links = Vec::new();
        links
            .try_reserve_exact(capacity.max(1))
            .map_err(|e| TstError::alloc("path stack", e))?;
        Ok(Self { links, limit })
    }

    pub(crate) fn try_push(&mut self, link: Link) -> Result<()> {
        if self.links.len() >= self.limit {
            return Err(TstError::limit("path stack"));
        }
        if self.links.len() == self.links.capacity() {
            let additional = self.links.capacity().max(1);
            self.links
                .try_reserve_exact(additional)
                .map_err(|e| TstError::alloc("path stack", e))?;
        }
        self.links.push(link);
        Ok(())
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Link> {
        self.links.pop()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.links.capacity()
    }
}
