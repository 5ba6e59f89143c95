//! # tst-rs
//!
//! A ternary search tree over byte strings.
//!
//! Every node holds a single byte and three links (`less`, `equal`,
//! `greater`). Shared prefixes share nodes, lookups cost one comparison per
//! visited node, and an in-order walk yields keys in ascending byte order, so
//! prefix enumeration comes for free.
//!
//! Each stored key keeps a [`Payload`]: either a copy owned by the tree or a
//! reference to the caller's bytes, chosen per entry with [`StoreMode`].
//!
//! ## Example
//!
//! ```rust
//! use tst_rs::{StoreMode, TernaryTree};
//!
//! let mut tree = TernaryTree::new();
//! tree.insert(b"cat", StoreMode::Copy).unwrap();
//! tree.insert(b"car", StoreMode::Copy).unwrap();
//! tree.insert(b"dog", StoreMode::Reference).unwrap();
//!
//! assert_eq!(tree.get(b"car").map(|p| p.as_bytes()), Some(&b"car"[..]));
//!
//! let ca: Vec<&[u8]> = tree.prefix_search(b"ca", 10).map(|p| p.as_bytes()).collect();
//! assert_eq!(ca, vec![&b"car"[..], &b"cat"[..]]);
//!
//! assert!(tree.remove(b"car"));
//! assert!(!tree.contains_key(b"car"));
//! ```
//!
//! Keys are raw bytes and may not contain `0`, which marks the end of a key
//! inside the tree. The tree is never rebalanced.

#![deny(unsafe_op_in_unsafe_fn)]

mod config;
mod error;
mod iter;
mod node;
mod path;
mod payload;
mod tree;

pub use config::TreeOptions;
pub use error::{Result, TstError};
pub use iter::PrefixIter;
pub use payload::{Payload, StoreMode};
pub use tree::TernaryTree;

#[cfg(test)]
mod proptests;
