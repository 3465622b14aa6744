//! Vec-backed arena with stable handles.
//!
//! Vacant slots form a singly linked free list threaded through the slots
//! themselves, so reuse needs no side allocation:
//!
//! ```text
//!   slots: [ Occupied(a) | Vacant{next: 3} | Occupied(b) | Vacant{next: -} ]
//!   free_head: 1  ──►  1  ──►  3  ──►  end
//! ```
//!
//! A [`SlotId`] stays valid until its value is removed; after that the index
//! may be handed out again.

/// Handle to a value stored in a [`SlotArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    Vacant { next_free: Option<usize> },
}

#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    live: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            live: 0,
        }
    }

    /// Stores `value`, preferring the most recently freed slot.
    pub fn insert(&mut self, value: T) -> SlotId {
        self.live += 1;
        if let Some(index) = self.free_head {
            if let Some(slot) = self.slots.get_mut(index) {
                if let Slot::Vacant { next_free } = *slot {
                    self.free_head = next_free;
                    *slot = Slot::Occupied(value);
                    return SlotId(index);
                }
            }
        }
        self.free_head = None;
        self.slots.push(Slot::Occupied(value));
        SlotId(self.slots.len() - 1)
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?;
        if !matches!(slot, Slot::Occupied(_)) {
            return None;
        }
        let vacant = Slot::Vacant {
            next_free: self.free_head,
        };
        match std::mem::replace(slot, vacant) {
            Slot::Occupied(value) => {
                self.free_head = Some(id.0);
                self.live -= 1;
                Some(value)
            },
            Slot::Vacant { .. } => None,
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        match self.slots.get(id.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        match self.slots.get_mut(id.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Drops every value; all outstanding handles become stale.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.live = 0;
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
