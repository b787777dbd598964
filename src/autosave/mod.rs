//! Fixed-interval background persistence of the note store.

mod scheduler;

pub use scheduler::{
    AutosaveError, AutosaveEvent, AutosaveScheduler, DEFAULT_AUTOSAVE_INTERVAL, SchedulerState,
};
