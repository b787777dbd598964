//! On-disk persistence of the note tree.

mod atomic;
mod document;

pub use atomic::{AtomicWriteError, write_atomically};
pub use document::{PersistenceError, load, save};
