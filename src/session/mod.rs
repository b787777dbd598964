//! Interactive front end over the note store.

mod command;
mod input;
mod session;

pub use input::stdin_lines;
pub use session::{Session, SessionError};
