//! Section list store owned by the editing side

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Section, SectionSlot};

/// Direction for a single-step move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// What a successful mutation did to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Added { index: usize },
    Edited { index: usize },
    Deleted { index: usize },
    Moved { from: usize, to: usize },
}

impl ListChange {
    /// Whether existing entries changed position
    pub fn is_structural(&self) -> bool {
        matches!(self, ListChange::Deleted { .. } | ListChange::Moved { .. })
    }
}

type ChangeHook = Box<dyn Fn(&[Section]) + Send + Sync>;

/// Ordered, mutable section list.
///
/// Every mutation that actually changes the list is followed by a call to each
/// registered `on_change` hook with the complete new list. Invalid input and
/// out-of-range indices are ignored and return `None`.
#[derive(Default)]
pub struct SectionListStore {
    sections: Vec<Section>,
    hooks: Vec<ChangeHook>,
}

impl fmt::Debug for SectionListStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionListStore")
            .field("sections", &self.sections)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl SectionListStore {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections,
            hooks: Vec::new(),
        }
    }

    /// Load from a slot and write every later change back to it
    pub fn persisted<S>(slot: S) -> Self
    where
        S: SectionSlot + 'static,
    {
        let sections = slot.load_or_empty();
        info!("Loaded {} sections from local storage", sections.len());

        let mut store = Self::new(sections);
        store.on_change(move |sections| {
            if let Err(e) = slot.save(sections) {
                warn!("Failed to persist section list: {}", e);
            }
        });
        store
    }

    /// Register an observer called after every applied mutation
    pub fn on_change<F>(&mut self, hook: F)
    where
        F: Fn(&[Section]) + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Append a section
    pub fn add(&mut self, name: &str, duration_minutes: i64) -> Option<ListChange> {
        let section = match Section::new(name, duration_minutes) {
            Ok(section) => section,
            Err(e) => {
                debug!("Ignoring add: {}", e);
                return None;
            }
        };

        self.sections.push(section);
        self.commit(ListChange::Added {
            index: self.sections.len() - 1,
        })
    }

    /// Replace the section at `index`
    pub fn edit(&mut self, index: usize, name: &str, duration_minutes: i64) -> Option<ListChange> {
        if index >= self.sections.len() {
            debug!("Ignoring edit: index {} out of range", index);
            return None;
        }
        let section = match Section::new(name, duration_minutes) {
            Ok(section) => section,
            Err(e) => {
                debug!("Ignoring edit of {}: {}", index, e);
                return None;
            }
        };

        self.sections[index] = section;
        self.commit(ListChange::Edited { index })
    }

    pub fn delete(&mut self, index: usize) -> Option<ListChange> {
        if index >= self.sections.len() {
            debug!("Ignoring delete: index {} out of range", index);
            return None;
        }

        let removed = self.sections.remove(index);
        info!("Removed section '{}' at {}", removed.name, index);
        self.commit(ListChange::Deleted { index })
    }

    /// Move one position up or down; no-op at the edges
    pub fn move_section(&mut self, index: usize, direction: MoveDirection) -> Option<ListChange> {
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1)?,
            MoveDirection::Down => index + 1,
        };
        if index >= self.sections.len() || target >= self.sections.len() {
            return None;
        }

        self.sections.swap(index, target);
        self.commit(ListChange::Moved {
            from: index,
            to: target,
        })
    }

    /// Move the section at `from` so it ends up at `to` (drag-and-drop)
    pub fn reorder(&mut self, from: usize, to: usize) -> Option<ListChange> {
        let len = self.sections.len();
        if from >= len || to >= len {
            debug!("Ignoring reorder {} -> {}: out of range", from, to);
            return None;
        }
        if from == to {
            return None;
        }

        let section = self.sections.remove(from);
        self.sections.insert(to, section);
        self.commit(ListChange::Moved { from, to })
    }

    fn commit(&self, change: ListChange) -> Option<ListChange> {
        debug!("Section list changed: {:?}", change);
        for hook in &self.hooks {
            hook(&self.sections);
        }
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use crate::schedule::MemorySlot;

    fn names(store: &SectionListStore) -> Vec<&str> {
        store.sections().iter().map(|s| s.name.as_str()).collect()
    }

    fn store_with(names: &[&str]) -> SectionListStore {
        let mut store = SectionListStore::default();
        for name in names {
            store.add(name, 1);
        }
        store
    }

    #[test]
    fn add_rejects_invalid_input() {
        let mut store = SectionListStore::default();
        assert!(store.add("", 5).is_none());
        assert!(store.add("Break", 0).is_none());
        assert!(store.is_empty());

        assert_eq!(store.add("Break", 5), Some(ListChange::Added { index: 0 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn edit_validates_and_checks_index() {
        let mut store = store_with(&["a", "b"]);
        assert!(store.edit(5, "x", 3).is_none());
        assert!(store.edit(0, "", 3).is_none());
        assert!(store.edit(0, "x", -1).is_none());
        assert_eq!(names(&store), vec!["a", "b"]);

        assert!(store.edit(1, "x", 3).is_some());
        assert_eq!(store.sections()[1], Section::new("x", 3).unwrap());
    }

    #[test]
    fn delete_out_of_range_is_ignored() {
        let mut store = store_with(&["a", "b", "c"]);
        assert!(store.delete(3).is_none());
        assert_eq!(store.delete(1), Some(ListChange::Deleted { index: 1 }));
        assert_eq!(names(&store), vec!["a", "c"]);
    }

    #[test]
    fn move_is_clamped_at_edges() {
        let mut store = store_with(&["a", "b", "c"]);
        assert!(store.move_section(0, MoveDirection::Up).is_none());
        assert!(store.move_section(2, MoveDirection::Down).is_none());
        assert_eq!(names(&store), vec!["a", "b", "c"]);

        store.move_section(0, MoveDirection::Down);
        assert_eq!(names(&store), vec!["b", "a", "c"]);
        store.move_section(2, MoveDirection::Up);
        assert_eq!(names(&store), vec!["b", "c", "a"]);
    }

    #[test]
    fn reorder_moves_to_target_position() {
        let mut store = store_with(&["a", "b", "c", "d"]);
        store.reorder(0, 2);
        assert_eq!(names(&store), vec!["b", "c", "a", "d"]);
        store.reorder(3, 0);
        assert_eq!(names(&store), vec!["d", "b", "c", "a"]);
        assert!(store.reorder(1, 1).is_none());
        assert!(store.reorder(0, 9).is_none());
    }

    #[test]
    fn hooks_fire_only_on_applied_mutations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store = SectionListStore::default();
        let counter = Arc::clone(&calls);
        store.on_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.add("", 1);
        store.add("a", 1);
        store.add("b", 1);
        store.move_section(0, MoveDirection::Up);
        store.reorder(0, 1);
        store.delete(0);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn persisted_store_writes_every_change() {
        let slot = Arc::new(MemorySlot::with_sections(vec![Section::new("saved", 2).unwrap()]));

        let mut store = SectionListStore::persisted(Arc::clone(&slot));
        assert_eq!(names(&store), vec!["saved"]);

        store.add("next", 4);
        assert_eq!(slot.stored().unwrap().len(), 2);

        store.delete(0);
        assert_eq!(slot.stored().unwrap(), vec![Section::new("next", 4).unwrap()]);
    }

    #[test]
    fn invalid_stored_entries_survive_the_next_write() {
        let legacy = Section {
            name: "legacy".to_string(),
            duration_minutes: 0,
        };
        let slot = Arc::new(MemorySlot::with_sections(vec![legacy.clone()]));

        let mut store = SectionListStore::persisted(Arc::clone(&slot));
        store.add("fresh", 5);

        assert_eq!(
            slot.stored().unwrap(),
            vec![legacy, Section::new("fresh", 5).unwrap()]
        );
    }

    #[test]
    fn structural_changes_are_flagged() {
        assert!(!ListChange::Added { index: 0 }.is_structural());
        assert!(!ListChange::Edited { index: 0 }.is_structural());
        assert!(ListChange::Deleted { index: 0 }.is_structural());
        assert!(ListChange::Moved { from: 0, to: 1 }.is_structural());
    }
}
