//! Schedule data: sections, the editable list, and its local persistence

pub mod persistence;
pub mod section;
pub mod store;

pub use persistence::{FileSlot, MemorySlot, SectionSlot};
pub use section::Section;
pub use store::{ListChange, MoveDirection, SectionListStore};
