//! User preferences stored next to the notes.

mod theme;

pub use theme::{Theme, ThemeError};
