use std::error::Error;

use colored::Colorize;
use supports_color::Stream;

use crate::notes::NodeKind;

/// Enables colors only when stdout can show them.
pub fn init_colors() {
    colored::control::set_override(supports_color::on(Stream::Stdout).is_some());
}

pub fn format_entry(name: &str, kind: NodeKind) -> String {
    match kind {
        NodeKind::Container => format!("{name}/").blue().bold().to_string(),
        NodeKind::Leaf => name.to_string(),
    }
}

pub fn format_entries(entries: &[(String, NodeKind)]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["(empty)".dimmed().to_string()];
    }
    entries
        .iter()
        .map(|(name, kind)| format_entry(name, *kind))
        .collect()
}

/// One line with the error and each of its causes.
pub fn format_error(error: &(dyn Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    format!("{} {}", "error:".red().bold(), message)
}

pub fn format_notice(message: &str) -> String {
    format!("{} {}", "note:".yellow().bold(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::{NotePath, NoteStoreError};

    #[test]
    fn containers_are_marked_with_a_slash() {
        assert!(format_entry("Work", NodeKind::Container).contains("Work/"));
        assert_eq!(format_entry("todo", NodeKind::Leaf), "todo");
    }

    #[test]
    fn empty_listing_says_so() {
        let lines = format_entries(&[]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("(empty)"));
    }

    #[test]
    fn error_lines_include_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = crate::storage::PersistenceError::ReadError {
            path: "/nowhere/notes.json".into(),
            source: io,
        };
        let line = format_error(&NoteStoreError::PersistenceFailure { source: error });

        assert!(line.contains("Could not access the notes file"));
        assert!(line.contains("/nowhere/notes.json"));
        assert!(line.ends_with("denied"));
    }

    #[test]
    fn store_errors_render_as_messages() {
        let error = NoteStoreError::DuplicateName {
            path: NotePath::root(),
            name: "Work".to_string(),
        };
        assert!(format_error(&error).contains("'Work' already exists in /"));
    }
}
