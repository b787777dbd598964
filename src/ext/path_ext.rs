use std::path::{Component, Path, PathBuf};

const FALLBACK_TEMP_STEM: &str = "notekeeper";

/// Absolute, normalized rendering of a path for messages.
///
/// Data files often do not exist yet, so when the path itself cannot be
/// canonicalized the parent directory is tried before falling back to a
/// lexical normalization against the current directory.
pub fn best_effort_path_display(path: &Path) -> String {
    if let Ok(canonical) = path.canonicalize() {
        return canonical.display().to_string();
    }

    let parent_canonical = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .and_then(|parent| parent.canonicalize().ok())
        .zip(path.file_name())
        .map(|(parent, file_name)| parent.join(file_name));
    if let Some(resolved) = parent_canonical {
        return resolved.display().to_string();
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|current_dir| current_dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    normalize_path(&absolute).display().to_string()
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }
    components.iter().collect()
}

pub trait PathExt {
    fn best_effort_path_display(&self) -> String;

    /// Hidden sibling used as a staging file for atomic replacement of `self`.
    /// `tag` tells concurrent writers' staging files apart.
    fn temp_sibling(&self, tag: &str) -> PathBuf;
}

impl PathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }

    fn temp_sibling(&self, tag: &str) -> PathBuf {
        let temp_name = match self.file_name() {
            Some(name) => format!(".{}.{}.tmp", name.to_string_lossy(), tag),
            None => format!(".{FALLBACK_TEMP_STEM}.{tag}.tmp"),
        };
        self.with_file_name(temp_name)
    }
}

impl PathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        self.as_path().best_effort_path_display()
    }

    fn temp_sibling(&self, tag: &str) -> PathBuf {
        self.as_path().temp_sibling(tag)
    }
}
