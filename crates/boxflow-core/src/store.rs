//! Node store: the per-session arena every box lives in.
//!
//! Boxes are appended to a flat `Vec` and addressed by [`BoxId`]. Checked
//! constructions are hash-consed: building a structurally identical node a
//! second time returns the existing id, so shared subexpressions exist once
//! and traversals can memoize on node identity. Nodes are held once, in
//! the arena; the lookup table maps content hashes to arena indices.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::arity::Arity;
use crate::error::BoxError;
use crate::node::{BoxId, BoxNode};

/// A registered node and its derived arity.
#[derive(Debug)]
struct Entry {
    node: BoxNode,
    arity: Arity,
}

/// Arena owning every box of one session.
#[derive(Debug)]
pub struct BoxStore {
    session: u32,
    entries: Vec<Entry>,
    buckets: HashMap<u64, Vec<u32>>,
}

/// Deterministic content hash used to index interned nodes.
pub(crate) fn content_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl BoxStore {
    pub(crate) fn new(session: u32) -> Self {
        Self {
            session,
            entries: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    /// Id of the owning session.
    pub fn session(&self) -> u32 {
        self.session
    }

    /// Number of distinct nodes stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no node has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verifies that `id` was issued by this store.
    pub fn check(&self, id: BoxId) -> Result<(), BoxError> {
        if id.session != self.session || id.index as usize >= self.entries.len() {
            return Err(BoxError::StaleBox(id));
        }
        Ok(())
    }

    /// Returns the node behind `id`.
    pub fn node(&self, id: BoxId) -> Result<&BoxNode, BoxError> {
        self.entry(id).map(|e| &e.node)
    }

    /// Returns the arity of `id`.
    pub fn arity(&self, id: BoxId) -> Result<Arity, BoxError> {
        self.entry(id).map(|e| e.arity)
    }

    /// Iterates over all nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (BoxId, &BoxNode, Arity)> {
        self.entries.iter().enumerate().map(|(i, e)| {
            (
                BoxId {
                    session: self.session,
                    index: i as u32,
                },
                &e.node,
                e.arity,
            )
        })
    }

    /// Registers a node whose arity has already been derived, reusing an
    /// identical existing node if there is one.
    pub(crate) fn intern(&mut self, node: BoxNode, arity: Arity) -> BoxId {
        let hash = content_hash(&node);
        let existing = self.buckets.get(&hash).and_then(|indices| {
            indices
                .iter()
                .copied()
                .find(|&i| self.entries[i as usize].node == node)
        });
        if let Some(index) = existing {
            return BoxId {
                session: self.session,
                index,
            };
        }
        let id = self.push(node, arity);
        self.buckets.entry(hash).or_default().push(id.index);
        id
    }

    /// Registers a node without hash-consing. Used for nodes whose arity
    /// was supplied from outside rather than derived here.
    pub(crate) fn insert_raw(&mut self, node: BoxNode, arity: Arity) -> BoxId {
        self.push(node, arity)
    }

    fn push(&mut self, node: BoxNode, arity: Arity) -> BoxId {
        let index = self.entries.len() as u32;
        self.entries.push(Entry { node, arity });
        BoxId {
            session: self.session,
            index,
        }
    }

    fn entry(&self, id: BoxId) -> Result<&Entry, BoxError> {
        self.check(id)?;
        Ok(&self.entries[id.index as usize])
    }
}
