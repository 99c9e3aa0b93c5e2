//! Audience-facing display of a shared schedule

pub mod renderer;

pub use renderer::{DisplayFrame, DisplayRenderer, EMPTY_MESSAGE};
