//! The puzzle pipeline: generator output parsing and the reveal transform
//! that turns a solved grid into a playable, partially revealed puzzle.

pub mod grid;
pub mod reveal;

pub use grid::ParsedGrid;
pub use reveal::{reveal_letters, DEFAULT_REVEAL_QUOTA};
