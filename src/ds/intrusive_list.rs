//! Doubly linked list whose nodes live in a [`SlotArena`].
//!
//! Nodes are addressed by [`SlotId`], so an owner can keep a key → node map
//! and splice a node to the head in O(1) without walking the list.
//!
//! ```text
//!   head (newest)                                    tail (oldest)
//!     │                                                   │
//!     ▼                                                   ▼
//!   [id 4] ◄──────► [id 0] ◄──────► [id 2] ◄──────► [id 1]
//!
//!   arena: 0 → Node{value, link{prev: 4, next: 2}}
//!          1 → Node{value, link{prev: 2, next: -}}
//!          2 → Node{value, link{prev: 0, next: 1}}
//!          3 → (free)
//!          4 → Node{value, link{prev: -, next: 0}}
//! ```
//!
//! [`Lru`](crate::policy::Lru) pushes and promotes at the head and evicts
//! from the tail. [`iter`](IntrusiveList::iter) walks head to tail and is
//! double-ended, so `iter().rev()` yields oldest first.
use crate::ds::slot_arena::{SlotArena, SlotId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Link {
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    link: Link,
}

/// Arena-backed doubly linked list with stable node handles.
#[derive(Debug)]
pub struct IntrusiveList<T> {
    nodes: SlotArena<Node<T>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<T> IntrusiveList<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.nodes.get(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.nodes.get_mut(id).map(|node| &mut node.value)
    }

    /// Links `value` in as the new head.
    pub fn push_front(&mut self, value: T) -> SlotId {
        let id = self.nodes.insert(Node {
            value,
            link: Link::default(),
        });
        self.link_head(id);
        id
    }

    /// Unlinks and returns the tail value.
    pub fn pop_back(&mut self) -> Option<T> {
        self.remove(self.tail?)
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.unlink(id)?;
        self.nodes.remove(id).map(|node| node.value)
    }

    /// Splices `id` to the head. Returns `false` for a stale handle.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if self.head == Some(id) {
            return true;
        }
        if self.unlink(id).is_none() {
            return false;
        }
        self.link_head(id);
        true
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    /// Head to tail; `.rev()` for tail to head.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            front: self.head,
            back: self.tail,
            remaining: self.len(),
        }
    }

    fn link_of(&mut self, id: Option<SlotId>) -> Option<&mut Link> {
        id.and_then(|id| self.nodes.get_mut(id)).map(|node| &mut node.link)
    }

    fn link_head(&mut self, id: SlotId) {
        let old_head = self.head;
        if let Some(link) = self.link_of(Some(id)) {
            *link = Link {
                prev: None,
                next: old_head,
            };
        }
        match self.link_of(old_head) {
            Some(link) => link.prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    fn unlink(&mut self, id: SlotId) -> Option<()> {
        let Link { prev, next } = std::mem::take(&mut self.nodes.get_mut(id)?.link);
        match self.link_of(prev) {
            Some(link) => link.next = next,
            None => self.head = next,
        }
        match self.link_of(next) {
            Some(link) => link.prev = prev,
            None => self.tail = prev,
        }
        Some(())
    }

    /// Walks the list both ways and checks every back-link.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.head.is_none(), self.tail.is_none());

        let mut expected_prev = None;
        let mut cursor = self.head;
        let mut walked = 0usize;
        while let Some(id) = cursor {
            let node = self.nodes.get(id).expect("linked node missing from arena");
            assert_eq!(node.link.prev, expected_prev, "broken back-link at {id:?}");
            expected_prev = Some(id);
            cursor = node.link.next;
            walked += 1;
            assert!(walked <= self.len(), "cycle in list");
        }
        assert_eq!(expected_prev, self.tail);
        assert_eq!(walked, self.len());
        assert_eq!(self.iter().rev().count(), walked);
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Double-ended iterator over list values.
pub struct Iter<'a, T> {
    nodes: &'a SlotArena<Node<T>>,
    front: Option<SlotId>,
    back: Option<SlotId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.nodes.get(self.front?)?;
        self.front = node.link.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.nodes.get(self.back?)?;
        self.back = node.link.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
