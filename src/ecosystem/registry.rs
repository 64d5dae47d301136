use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashSet;

/// Opaque reference to an agent owned outside the core.
///
/// In the ECS layer this is [`bevy::prelude::Entity`]; tests use plain integers.
pub trait AgentHandle: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> AgentHandle for T where T: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

/// Insertion-ordered set of agent handles for one participant class.
///
/// Registry order defines snapshot slot order for the tick, so removals keep
/// the relative order of the survivors.
#[derive(Debug, Clone)]
pub struct AgentRegistry<H: AgentHandle> {
    handles: Vec<H>,
    members: FxHashSet<H>,
}

impl<H: AgentHandle> Default for AgentRegistry<H> {
    fn default() -> Self {
        Self {
            handles: Vec::new(),
            members: FxHashSet::default(),
        }
    }
}

impl<H: AgentHandle> AgentRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handle` unless already present. Returns whether it was added.
    pub fn register(&mut self, handle: H) -> bool {
        if !self.members.insert(handle) {
            return false;
        }
        self.handles.push(handle);
        true
    }

    /// Remove `handle` if present. Returns whether it was removed.
    pub fn unregister(&mut self, handle: H) -> bool {
        if !self.members.remove(&handle) {
            return false;
        }
        if let Some(slot) = self.handles.iter().position(|&h| h == handle) {
            self.handles.remove(slot);
        }
        true
    }

    /// Drop every handle for which `is_alive` is false and return how many went.
    pub fn compact<F: FnMut(H) -> bool>(&mut self, mut is_alive: F) -> usize {
        let before = self.handles.len();
        let members = &mut self.members;
        self.handles.retain(|&handle| {
            let alive = is_alive(handle);
            if !alive {
                members.remove(&handle);
            }
            alive
        });
        before - self.handles.len()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, handle: H) -> bool {
        self.members.contains(&handle)
    }

    pub fn get(&self, index: usize) -> Option<H> {
        self.handles.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = H> + '_ {
        self.handles.iter().copied()
    }

    pub fn as_slice(&self) -> &[H] {
        &self.handles
    }

    pub fn clear(&mut self) {
        self.handles.clear();
        self.members.clear();
    }
}
