//! Hierarchical note tree.
//!
//! Notes are either plain text or notebooks holding further notes. The
//! [`NoteStore`] owns the tree and enforces that sibling names stay unique.

mod node;
mod path;
mod store;

pub use node::{CONTENT_SLOT_KEY, Container, Node, NodeKind, Tree};
pub use path::{NotePath, PATH_SEPARATOR};
pub use store::{MAX_DEPTH, NoteStore, NoteStoreError};
