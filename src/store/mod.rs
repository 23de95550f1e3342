//! Path-addressable group store.
//!
//! A [`GroupStore`] is a tree of ordered maps. Values live at the leaves
//! and are addressed by a key path such as `[border, measure, period]`.
//! Every container node carries a lock flag; a locked node rejects any
//! mutation at or below it.

mod merge;

pub use merge::{MergeReport, Policy};

use crate::error::{describe_path, StoreError};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

/// Result of a `set` or `set_path` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Nothing was stored at the path before.
    Inserted,
    /// A different value (or a container) was replaced.
    Replaced,
    /// An equal value was already stored.
    Unchanged,
    /// The path is locked, or overwriting was not permitted.
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
enum Node<K, V> {
    Leaf(V),
    Branch(Branch<K, V>),
}

#[derive(Debug, Clone, PartialEq)]
struct Branch<K, V> {
    children: BTreeMap<K, Node<K, V>>,
    locked: bool,
}

impl<K, V> Default for Branch<K, V> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            locked: false,
        }
    }
}

impl<K, V> Branch<K, V> {
    fn set_lock(&mut self, locked: bool, recursive: bool) {
        self.locked = locked;
        if recursive {
            for child in self.children.values_mut() {
                if let Node::Branch(branch) = child {
                    branch.set_lock(locked, true);
                }
            }
        }
    }
}

impl<K, V> Node<K, V> {
    /// Turn this node into a container, dropping a stored value if needed.
    fn make_branch(&mut self) -> Option<&mut Branch<K, V>> {
        if let Node::Leaf(_) = self {
            *self = Node::Branch(Branch::default());
        }
        match self {
            Node::Branch(branch) => Some(branch),
            Node::Leaf(_) => None,
        }
    }
}

/// What a path currently points at, relative to an incoming value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// An equal value is stored.
    Equal,
    /// A different value, or a container, is stored at the path.
    Different,
    /// Nothing is stored at the path and no value blocks it.
    Vacant,
    /// A value sits on an intermediate segment of the path.
    Blocked,
}

/// A recursive container of values addressed by key paths.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStore<K, V> {
    root: Branch<K, V>,
}

impl<K, V> Default for GroupStore<K, V> {
    fn default() -> Self {
        Self {
            root: Branch::default(),
        }
    }
}

impl<K, V> GroupStore<K, V>
where
    K: Ord + Clone + fmt::Display,
    V: Clone + PartialEq,
{
    /// Create an empty, unlocked store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the top-level value stored under `key`.
    pub fn get(&self, key: &K) -> Result<&V, StoreError> {
        self.get_path(std::slice::from_ref(key))
    }

    /// Set the top-level value stored under `key`.
    pub fn set(&mut self, key: K, value: V, overwrite: bool) -> Result<SetOutcome, StoreError> {
        self.set_path(&[key], value, overwrite, false)
    }

    /// Get the value stored at `path`.
    pub fn get_path(&self, path: &[K]) -> Result<&V, StoreError> {
        let (last, parents) = path.split_last().ok_or(StoreError::InvalidPath)?;
        let not_found = || StoreError::KeyNotFound {
            path: describe_path(path),
        };

        let mut branch = &self.root;
        for key in parents {
            match branch.children.get(key) {
                Some(Node::Branch(next)) => branch = next,
                _ => return Err(not_found()),
            }
        }

        match branch.children.get(last) {
            Some(Node::Leaf(value)) => Ok(value),
            _ => Err(not_found()),
        }
    }

    /// Whether a value is stored at `path`.
    pub fn contains_path(&self, path: &[K]) -> bool {
        self.get_path(path).is_ok()
    }

    /// Store `value` at `path`, creating containers along the way.
    ///
    /// An existing different value is only replaced when `overwrite` is set.
    /// A value sitting on an intermediate segment is only replaced by an
    /// empty container when `restructure` is set; otherwise the call fails
    /// with [`StoreError::PathBlocked`] and nothing is modified.
    pub fn set_path(
        &mut self,
        path: &[K],
        value: V,
        overwrite: bool,
        restructure: bool,
    ) -> Result<SetOutcome, StoreError> {
        let (last, parents) = path.split_last().ok_or(StoreError::InvalidPath)?;

        if self.is_locked(path) {
            return Ok(SetOutcome::Rejected);
        }

        if !restructure {
            if let Some(depth) = self.blocking_depth(parents) {
                return Err(StoreError::PathBlocked {
                    path: describe_path(&path[..=depth]),
                });
            }
        }

        let mut branch = &mut self.root;
        for key in parents {
            branch = branch
                .children
                .entry(key.clone())
                .or_insert_with(|| Node::Branch(Branch::default()))
                .make_branch()
                .ok_or_else(|| StoreError::PathBlocked {
                    path: describe_path(path),
                })?;
        }

        match branch.children.entry(last.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Node::Leaf(value));
                Ok(SetOutcome::Inserted)
            }
            Entry::Occupied(mut slot) => {
                if matches!(slot.get(), Node::Leaf(existing) if *existing == value) {
                    Ok(SetOutcome::Unchanged)
                } else if !overwrite {
                    Ok(SetOutcome::Rejected)
                } else {
                    slot.insert(Node::Leaf(value));
                    Ok(SetOutcome::Replaced)
                }
            }
        }
    }

    /// Whether a mutation at `path` would be refused by a lock.
    ///
    /// Walks the path as far as containers exist; any locked container
    /// on the way (the root included) locks the whole path.
    pub fn is_locked(&self, path: &[K]) -> bool {
        let mut branch = &self.root;
        let mut locked = branch.locked;
        for key in path {
            match branch.children.get(key) {
                Some(Node::Branch(next)) => {
                    branch = next;
                    locked |= branch.locked;
                }
                _ => break,
            }
        }
        locked
    }

    /// Lock the container at `path`, and optionally every container below it.
    pub fn lock(&mut self, path: &[K], recursive: bool) -> Result<(), StoreError> {
        self.branch_mut(path)?.set_lock(true, recursive);
        Ok(())
    }

    /// Unlock the container at `path`, and optionally every container below it.
    pub fn unlock(&mut self, path: &[K], recursive: bool) -> Result<(), StoreError> {
        self.branch_mut(path)?.set_lock(false, recursive);
        Ok(())
    }

    /// Lock the root container.
    pub fn lock_all(&mut self, recursive: bool) {
        self.root.set_lock(true, recursive);
    }

    /// Unlock the root container.
    pub fn unlock_all(&mut self, recursive: bool) {
        self.root.set_lock(false, recursive);
    }

    /// Keys directly below the container at `path`. An empty path lists the root.
    pub fn children(&self, path: &[K]) -> Result<Vec<&K>, StoreError> {
        let mut branch = &self.root;
        for key in path {
            match branch.children.get(key) {
                Some(Node::Branch(next)) => branch = next,
                _ => {
                    return Err(StoreError::KeyNotFound {
                        path: describe_path(path),
                    })
                }
            }
        }
        Ok(branch.children.keys().collect())
    }

    /// Every stored value with its full path, in key order.
    pub fn leaves(&self) -> Vec<(Vec<K>, &V)> {
        let mut out = Vec::new();
        collect_leaves(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Paths of every container below the root, parents before children.
    pub fn branch_paths(&self) -> Vec<Vec<K>> {
        let mut out = Vec::new();
        collect_branches(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        count_leaves(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classify `path` against an incoming value without modifying anything.
    pub(crate) fn slot(&self, path: &[K], value: &V) -> Slot {
        let Some((last, parents)) = path.split_last() else {
            return Slot::Vacant;
        };

        let mut branch = &self.root;
        for key in parents {
            match branch.children.get(key) {
                Some(Node::Branch(next)) => branch = next,
                Some(Node::Leaf(_)) => return Slot::Blocked,
                None => return Slot::Vacant,
            }
        }

        match branch.children.get(last) {
            Some(Node::Leaf(existing)) if existing == value => Slot::Equal,
            Some(_) => Slot::Different,
            None => Slot::Vacant,
        }
    }

    /// Depth of the first intermediate segment holding a value, if any.
    fn blocking_depth(&self, parents: &[K]) -> Option<usize> {
        let mut branch = &self.root;
        for (depth, key) in parents.iter().enumerate() {
            match branch.children.get(key) {
                Some(Node::Branch(next)) => branch = next,
                Some(Node::Leaf(_)) => return Some(depth),
                None => return None,
            }
        }
        None
    }

    fn branch_mut(&mut self, path: &[K]) -> Result<&mut Branch<K, V>, StoreError> {
        let mut branch = &mut self.root;
        for key in path {
            match branch.children.get_mut(key) {
                Some(Node::Branch(next)) => branch = next,
                _ => {
                    return Err(StoreError::KeyNotFound {
                        path: describe_path(path),
                    })
                }
            }
        }
        Ok(branch)
    }
}

fn collect_leaves<'a, K: Clone, V>(
    branch: &'a Branch<K, V>,
    prefix: &mut Vec<K>,
    out: &mut Vec<(Vec<K>, &'a V)>,
) {
    for (key, node) in &branch.children {
        prefix.push(key.clone());
        match node {
            Node::Leaf(value) => out.push((prefix.clone(), value)),
            Node::Branch(child) => collect_leaves(child, prefix, out),
        }
        prefix.pop();
    }
}

fn collect_branches<K: Clone, V>(branch: &Branch<K, V>, prefix: &mut Vec<K>, out: &mut Vec<Vec<K>>) {
    for (key, node) in &branch.children {
        if let Node::Branch(child) = node {
            prefix.push(key.clone());
            out.push(prefix.clone());
            collect_branches(child, prefix, out);
            prefix.pop();
        }
    }
}

fn count_leaves<K, V>(branch: &Branch<K, V>) -> usize {
    branch
        .children
        .values()
        .map(|node| match node {
            Node::Leaf(_) => 1,
            Node::Branch(child) => count_leaves(child),
        })
        .sum()
}
