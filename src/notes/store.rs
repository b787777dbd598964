use std::path::Path;

use snafu::prelude::*;
use tracing::{debug, info};

use crate::notes::{CONTENT_SLOT_KEY, Container, Node, NodeKind, NotePath, PATH_SEPARATOR, Tree};
use crate::storage::{self, PersistenceError};

/// Deepest path a notebook may have. Nothing can be created inside a notebook
/// at this depth, which keeps saved documents within what the loader accepts.
pub const MAX_DEPTH: usize = 64;

/// Owns the note tree and is the only way to change it.
///
/// Callers address nodes by a [`NotePath`] to the parent container plus a name,
/// so nothing outside the store ever holds a reference into the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteStore {
    tree: Tree,
}

impl NoteStore {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    /// Loads the store from `path`; a missing file yields an empty store.
    pub async fn open(path: &Path) -> Result<Self, NoteStoreError> {
        let tree = storage::load(path).await.context(PersistenceFailureSnafu)?;
        if tree.is_empty() {
            info!("Starting with no notes");
        } else {
            info!("Loaded {} top-level notes", tree.len());
        }
        Ok(Self::new(tree))
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), NoteStoreError> {
        storage::save(&self.tree, path)
            .await
            .context(PersistenceFailureSnafu)
    }

    /// Copy of the current tree, taken so persistence can run without holding the store.
    pub fn snapshot(&self) -> Tree {
        self.tree.clone()
    }

    pub fn list_children(&self, path: &NotePath) -> Result<Vec<String>, NoteStoreError> {
        Ok(self.resolve(path)?.names().cloned().collect())
    }

    /// Names at `path` along with their kinds, in display order.
    pub fn entries(&self, path: &NotePath) -> Result<Vec<(String, NodeKind)>, NoteStoreError> {
        Ok(self
            .resolve(path)?
            .iter()
            .map(|(name, node)| (name.clone(), node.kind()))
            .collect())
    }

    pub fn kind(&self, path: &NotePath, name: &str) -> Result<NodeKind, NoteStoreError> {
        Ok(self.child(path, name)?.kind())
    }

    pub fn create(
        &mut self,
        path: &NotePath,
        name: &str,
        initial_content: impl Into<String>,
    ) -> Result<(), NoteStoreError> {
        validate_name(name)?;
        ensure_room_below(path)?;
        let container = self.resolve_mut(path)?;
        ensure!(
            !container.contains(name),
            DuplicateNameSnafu {
                path: path.clone(),
                name
            }
        );

        container.insert(name, Node::leaf(initial_content));
        debug!("Created note '{}' under {}", name, path);
        Ok(())
    }

    /// Turns a note into a notebook, keeping its text in the content slot.
    /// Does nothing if `name` already is a notebook.
    pub fn promote_to_container(&mut self, path: &NotePath, name: &str) -> Result<(), NoteStoreError> {
        let node = self.child_mut(path, name)?;
        if let Node::Leaf(text) = &mut *node {
            let text = std::mem::take(text);
            *node = Node::Container(Container::with_content(text));
            debug!("Promoted '{}' under {} to a notebook", name, path);
        }
        Ok(())
    }

    pub fn create_child(
        &mut self,
        path: &NotePath,
        name: &str,
        child_name: &str,
        initial_content: impl Into<String>,
    ) -> Result<(), NoteStoreError> {
        validate_name(child_name)?;
        ensure_room_below(&path.join(name))?;
        // Check for a collision before promoting so a failure leaves the tree untouched
        if let Node::Container(container) = self.child(path, name)? {
            ensure!(
                !container.contains(child_name),
                DuplicateNameSnafu {
                    path: path.join(name),
                    name: child_name
                }
            );
        }

        self.promote_to_container(path, name)?;
        self.create(&path.join(name), child_name, initial_content)
    }

    pub fn rename(
        &mut self,
        path: &NotePath,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), NoteStoreError> {
        validate_name(new_name)?;
        let container = self.resolve_mut(path)?;
        ensure!(
            container.contains(old_name),
            NotFoundSnafu {
                path: path.clone(),
                name: old_name
            }
        );
        if old_name == new_name {
            return Ok(());
        }
        ensure!(
            !container.contains(new_name),
            DuplicateNameSnafu {
                path: path.clone(),
                name: new_name
            }
        );

        container.rename_child(old_name, new_name);
        debug!("Renamed '{}' to '{}' under {}", old_name, new_name, path);
        Ok(())
    }

    /// Removes `name` and everything below it.
    pub fn delete(&mut self, path: &NotePath, name: &str) -> Result<Node, NoteStoreError> {
        let removed = self
            .resolve_mut(path)?
            .remove(name)
            .context(NotFoundSnafu {
                path: path.clone(),
                name,
            })?;
        debug!("Deleted {} '{}' under {}", removed.kind(), name, path);
        Ok(removed)
    }

    pub fn get_content(&self, path: &NotePath, name: &str) -> Result<&str, NoteStoreError> {
        let node = self.child(path, name)?;
        node.content().context(TypeMismatchSnafu {
            path: path.clone(),
            name,
            expected: NodeKind::Leaf,
            found: node.kind(),
        })
    }

    /// Overwrites a note's text. Notebooks are rejected; use [`Self::set_slot_content`].
    pub fn set_content(
        &mut self,
        path: &NotePath,
        name: &str,
        text: impl Into<String>,
    ) -> Result<(), NoteStoreError> {
        match self.child_mut(path, name)? {
            Node::Leaf(current) => {
                *current = text.into();
                Ok(())
            }
            Node::Container(_) => TypeMismatchSnafu {
                path: path.clone(),
                name,
                expected: NodeKind::Leaf,
                found: NodeKind::Container,
            }
            .fail(),
        }
    }

    /// Writes a notebook's own text into its content slot.
    pub fn set_slot_content(
        &mut self,
        path: &NotePath,
        name: &str,
        text: impl Into<String>,
    ) -> Result<(), NoteStoreError> {
        match self.child_mut(path, name)? {
            Node::Container(container) => {
                container.set_content(text);
                Ok(())
            }
            Node::Leaf(_) => TypeMismatchSnafu {
                path: path.clone(),
                name,
                expected: NodeKind::Container,
                found: NodeKind::Leaf,
            }
            .fail(),
        }
    }

    pub fn navigate_into(&self, path: &NotePath, name: &str) -> Result<NotePath, NoteStoreError> {
        match self.child(path, name)? {
            Node::Container(_) => Ok(path.join(name)),
            Node::Leaf(_) => TypeMismatchSnafu {
                path: path.clone(),
                name,
                expected: NodeKind::Container,
                found: NodeKind::Leaf,
            }
            .fail(),
        }
    }

    pub fn navigate_up(&self, path: &NotePath) -> NotePath {
        path.parent()
    }

    fn resolve(&self, path: &NotePath) -> Result<&Container, NoteStoreError> {
        let mut current = &self.tree;
        for (depth, name) in path.iter().enumerate() {
            current = match current.get(name) {
                Some(Node::Container(container)) => container,
                _ => {
                    return NotFoundSnafu {
                        path: path[..depth].iter().cloned().collect::<NotePath>(),
                        name,
                    }
                    .fail();
                }
            };
        }
        Ok(current)
    }

    fn resolve_mut(&mut self, path: &NotePath) -> Result<&mut Container, NoteStoreError> {
        let mut current = &mut self.tree;
        for (depth, name) in path.iter().enumerate() {
            current = match current.get_mut(name) {
                Some(Node::Container(container)) => container,
                _ => {
                    return NotFoundSnafu {
                        path: path[..depth].iter().cloned().collect::<NotePath>(),
                        name,
                    }
                    .fail();
                }
            };
        }
        Ok(current)
    }

    fn child(&self, path: &NotePath, name: &str) -> Result<&Node, NoteStoreError> {
        self.resolve(path)?.get(name).context(NotFoundSnafu {
            path: path.clone(),
            name,
        })
    }

    fn child_mut(&mut self, path: &NotePath, name: &str) -> Result<&mut Node, NoteStoreError> {
        self.resolve_mut(path)?.get_mut(name).context(NotFoundSnafu {
            path: path.clone(),
            name,
        })
    }
}

fn validate_name(name: &str) -> Result<(), NoteStoreError> {
    ensure!(!name.is_empty(), EmptyNameSnafu);
    ensure!(name != CONTENT_SLOT_KEY, ReservedNameSnafu { name });
    ensure!(!name.contains(PATH_SEPARATOR), SeparatorInNameSnafu { name });
    Ok(())
}

fn ensure_room_below(path: &NotePath) -> Result<(), NoteStoreError> {
    ensure!(path.len() < MAX_DEPTH, TooDeepSnafu { path: path.clone() });
    Ok(())
}

#[derive(Debug, Snafu)]
pub enum NoteStoreError {
    #[snafu(display("Nothing named '{}' in {}", name, path))]
    NotFound { path: NotePath, name: String },
    #[snafu(display("'{}' already exists in {}", name, path))]
    DuplicateName { path: NotePath, name: String },
    #[snafu(display("Names cannot be empty"))]
    EmptyName,
    #[snafu(display("'{}' is reserved and cannot be used as a name", name))]
    ReservedName { name: String },
    #[snafu(display("'{}' contains '{}', which separates names in paths", name, PATH_SEPARATOR))]
    SeparatorInName { name: String },
    #[snafu(display(
        "Notes cannot be nested more than {} levels deep, so nothing can be added in {}",
        MAX_DEPTH,
        path
    ))]
    TooDeep { path: NotePath },
    #[snafu(display("'{}' in {} is a {}, but a {} is needed here", name, path, found, expected))]
    TypeMismatch {
        path: NotePath,
        name: String,
        expected: NodeKind,
        found: NodeKind,
    },
    #[snafu(display("Could not access the notes file"))]
    PersistenceFailure { source: PersistenceError },
}
