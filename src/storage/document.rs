use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use compio::fs;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, info};

use crate::ext::PathExt;
use crate::notes::{Container, Node, Tree};
use crate::storage::atomic::{AtomicWriteError, write_atomically};

/// Version written into every saved document.
pub const SCHEMA_VERSION: u64 = 1;

const VERSION_KEY: &str = "version";
const NOTES_KEY: &str = "notes";
const NOTEBOOKS_KEY: &str = "notebooks";

#[derive(Serialize)]
struct VersionedDocument<'a> {
    version: u64,
    notes: &'a Tree,
}

/// One entry of the list-shaped `{"notebooks": [...]}` layout.
#[derive(Deserialize)]
struct ListedNotebook {
    name: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    sub_notes: Vec<ListedSubNote>,
}

#[derive(Deserialize)]
struct ListedSubNote {
    name: String,
    #[serde(default)]
    text: String,
}

/// Reads the tree stored at `path`.
///
/// A missing file is the first-run case and yields an empty tree. Any other
/// read failure, and any content that does not decode, is an error so real
/// data is never replaced by an empty tree.
pub async fn load(path: &Path) -> Result<Tree, PersistenceError> {
    debug!("Reading notes from {}", path.best_effort_path_display());
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            info!("No notes file found, starting with an empty tree");
            return Ok(Tree::new());
        }
        Err(source) => {
            return Err(PersistenceError::ReadError {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    decode(&bytes).context(CorruptSnafu {
        path: path.to_path_buf(),
    })
}

/// Writes the whole tree to `path`, atomically replacing any previous document.
pub async fn save(tree: &Tree, path: &Path) -> Result<(), PersistenceError> {
    let bytes = encode(tree).context(EncodeSnafu)?;
    write_atomically(path, bytes).await.context(WriteSnafu {
        path: path.to_path_buf(),
    })
}

pub fn encode(tree: &Tree) -> Result<Vec<u8>, DocumentError> {
    let document = VersionedDocument {
        version: SCHEMA_VERSION,
        notes: tree,
    };
    let mut bytes = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
    document.serialize(&mut serializer).context(SyntaxSnafu)?;
    Ok(bytes)
}

/// Decodes a document in any of the supported layouts:
/// the versioned envelope, a bare name-to-note mapping, or the list-shaped
/// `notebooks` layout.
pub fn decode(bytes: &[u8]) -> Result<Tree, DocumentError> {
    let value: Value = serde_json::from_slice(bytes).context(SyntaxSnafu)?;
    let Value::Object(top_level) = value else {
        return Err(DocumentError::TopLevelNotMap);
    };

    if is_versioned(&top_level) {
        decode_versioned(top_level)
    } else if is_notebook_list(&top_level) {
        decode_notebook_list(top_level)
    } else {
        debug!("Reading unversioned document");
        serde_json::from_value(Value::Object(top_level)).context(ShapeSnafu)
    }
}

fn is_versioned(top_level: &Map<String, Value>) -> bool {
    top_level.len() == 2
        && matches!(top_level.get(VERSION_KEY), Some(Value::Number(_)))
        && matches!(top_level.get(NOTES_KEY), Some(Value::Object(_)))
}

fn is_notebook_list(top_level: &Map<String, Value>) -> bool {
    top_level.len() == 1 && matches!(top_level.get(NOTEBOOKS_KEY), Some(Value::Array(_)))
}

fn decode_versioned(mut top_level: Map<String, Value>) -> Result<Tree, DocumentError> {
    let version = top_level
        .get(VERSION_KEY)
        .and_then(Value::as_u64)
        .ok_or(DocumentError::InvalidVersion)?;
    ensure!(
        version <= SCHEMA_VERSION,
        UnsupportedVersionSnafu { found: version }
    );

    let notes = top_level.remove(NOTES_KEY).unwrap_or(Value::Null);
    serde_json::from_value(notes).context(ShapeSnafu)
}

fn decode_notebook_list(mut top_level: Map<String, Value>) -> Result<Tree, DocumentError> {
    debug!("Converting list-shaped notebooks document");
    let notebooks = top_level.remove(NOTEBOOKS_KEY).unwrap_or(Value::Null);
    let notebooks: Vec<ListedNotebook> = serde_json::from_value(notebooks).context(ShapeSnafu)?;

    let mut tree = Tree::new();
    for notebook in notebooks {
        ensure!(
            !tree.contains(&notebook.name),
            DuplicateEntrySnafu {
                name: notebook.name
            }
        );
        let mut container = Container::with_content(notebook.text);
        for sub_note in notebook.sub_notes {
            ensure!(
                !container.contains(&sub_note.name),
                DuplicateEntrySnafu {
                    name: sub_note.name
                }
            );
            container.insert(sub_note.name, Node::Leaf(sub_note.text));
        }
        tree.insert(notebook.name, Node::Container(container));
    }
    Ok(tree)
}

#[derive(Debug, Snafu)]
pub enum DocumentError {
    #[snafu(display("The document is not valid JSON"))]
    SyntaxError { source: serde_json::Error },
    #[snafu(display("The top level of the document should be a map"))]
    TopLevelNotMap,
    #[snafu(display("The document version is not a non-negative integer"))]
    InvalidVersion,
    #[snafu(display(
        "The document has version {}, but only versions up to {} are supported",
        found,
        SCHEMA_VERSION
    ))]
    UnsupportedVersion { found: u64 },
    #[snafu(display("The document does not describe a note tree"))]
    ShapeError { source: serde_json::Error },
    #[snafu(display("The document contains '{}' more than once", name))]
    DuplicateEntry { name: String },
}

#[derive(Debug, Snafu)]
pub enum PersistenceError {
    #[snafu(display("Failed to read the notes file: {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("The notes file {} is corrupt", path.best_effort_path_display()))]
    Corrupt {
        path: PathBuf,
        source: DocumentError,
    },
    #[snafu(display("Failed to encode notes"))]
    EncodeError { source: DocumentError },
    #[snafu(display("Failed to write the notes file: {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: AtomicWriteError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::{MAX_DEPTH, NoteStore, NotePath};
    use rstest::*;
    use tempfile::TempDir;

    fn sample_tree() -> Tree {
        let mut store = NoteStore::default();
        let root = NotePath::root();
        store.create(&root, "Work", "notebook text").unwrap();
        store.create_child(&root, "Work", "todo", "buy milk").unwrap();
        store.create_child(&root.join("Work"), "todo", "deep", "").unwrap();
        store.create(&root, "Empty", "").unwrap();
        store.snapshot()
    }

    #[test]
    fn encode_decode_round_trip() {
        let tree = sample_tree();
        let decoded = decode(&encode(&tree).unwrap()).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn encoded_document_is_versioned_and_indented() {
        let text = String::from_utf8(encode(&Tree::new()).unwrap()).unwrap();
        assert_eq!(text, "{\n    \"version\": 1,\n    \"notes\": {}\n}");
    }

    #[test]
    fn decodes_unversioned_mapping() {
        let tree = decode(br#"{"Work": {"todo": "buy milk"}, "Ideas": ""}"#).unwrap();
        assert_eq!(tree.names().collect::<Vec<_>>(), vec!["Work", "Ideas"]);
    }

    #[test]
    fn unversioned_mapping_may_use_envelope_key_names() {
        let tree = decode(br#"{"version": "draft", "notes": "plain"}"#).unwrap();
        assert_eq!(tree.get("version").and_then(Node::content), Some("draft"));
    }

    #[test]
    fn decodes_notebook_list_layout() {
        let bytes = br#"{"notebooks": [
            {"name": "Work", "text": "work text", "sub_notes": [{"name": "todo", "text": "buy milk"}]},
            {"name": "Empty", "text": "", "sub_notes": []}
        ]}"#;
        let store = NoteStore::new(decode(bytes).unwrap());
        let root = NotePath::root();

        assert_eq!(store.list_children(&root).unwrap(), vec!["Work", "Empty"]);
        assert_eq!(store.get_content(&root, "Work").unwrap(), "work text");
        assert_eq!(
            store.get_content(&root.join("Work"), "todo").unwrap(),
            "buy milk"
        );
    }

    #[test]
    fn notebook_list_with_duplicates_is_rejected() {
        let bytes = br#"{"notebooks": [{"name": "A"}, {"name": "A"}]}"#;
        assert!(matches!(
            decode(bytes),
            Err(DocumentError::DuplicateEntry { .. })
        ));
    }

    #[rstest]
    #[case(b"{not json".as_slice())]
    #[case(b"".as_slice())]
    #[case(br#"{"a": 1}"#.as_slice())]
    #[case(br#"{"a": ["list"]}"#.as_slice())]
    #[case(br#"{"version": 1, "notes": {"a": null}}"#.as_slice())]
    fn corrupt_documents_are_rejected(#[case] bytes: &[u8]) {
        assert!(decode(bytes).is_err());
    }

    #[test]
    fn non_map_top_level_is_rejected() {
        assert!(matches!(
            decode(b"[1, 2]"),
            Err(DocumentError::TopLevelNotMap)
        ));
    }

    #[test]
    fn newer_versions_are_rejected() {
        assert!(matches!(
            decode(br#"{"version": 2, "notes": {}}"#),
            Err(DocumentError::UnsupportedVersion { found: 2 })
        ));
    }

    #[compio::test]
    async fn missing_file_loads_empty_tree() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let tree = load(&dir.path().join("absent.json")).await.unwrap();
        assert!(tree.is_empty());
    }

    #[compio::test]
    async fn corrupt_file_is_not_treated_as_absent() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("notes.json");
        std::fs::write(&path, "{\"Work\": ").unwrap();

        let result = load(&path).await;

        assert!(matches!(result, Err(PersistenceError::Corrupt { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"Work\": ");
    }

    #[compio::test]
    async fn unreadable_path_is_a_read_error() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let result = load(dir.path()).await;
        assert!(matches!(result, Err(PersistenceError::ReadError { .. })));
    }

    #[compio::test]
    async fn save_then_load_round_trip() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("notes.json");
        let tree = sample_tree();

        save(&tree, &path).await.unwrap();
        let loaded = load(&path).await.unwrap();

        assert_eq!(loaded, tree);
    }

    #[compio::test]
    async fn work_life_scenario() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("notes.json");
        let root = NotePath::root();
        let work = root.join("Work");

        let mut store = NoteStore::default();
        store.create(&root, "Work", "").unwrap();
        store.create_child(&root, "Work", "todo", "buy milk").unwrap();
        store.save_to(&path).await.unwrap();

        let mut store = NoteStore::open(&path).await.unwrap();
        assert_eq!(store.get_content(&work, "todo").unwrap(), "buy milk");

        store.rename(&root, "Work", "Life").unwrap();
        assert_eq!(store.list_children(&root).unwrap(), vec!["Life"]);

        store.delete(&root, "Life").unwrap();
        assert!(store.list_children(&root).unwrap().is_empty());
    }

    /// A chain of notebooks as deep as the store allows, ending in a notebook
    /// with its own text.
    fn deepest_tree() -> Tree {
        let mut store = NoteStore::default();
        let mut path = NotePath::root();
        store.create(&path, "level", "").unwrap();
        while store.create_child(&path, "level", "level", "").is_ok() {
            path = path.join("level");
        }
        store.promote_to_container(&path, "level").unwrap();
        store
            .set_slot_content(&path, "level", "bottom")
            .unwrap();
        assert_eq!(path.join("level").len(), MAX_DEPTH);
        store.snapshot()
    }

    fn wide_tree(prefix: &str) -> Tree {
        let mut store = NoteStore::default();
        let root = NotePath::root();
        for index in 0..2000 {
            store
                .create(&root, format!("{prefix}{index}").as_str(), "some text")
                .unwrap();
        }
        store.snapshot()
    }

    #[compio::test]
    async fn deepest_tree_survives_save_and_load() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("notes.json");
        let tree = deepest_tree();

        save(&tree, &path).await.unwrap();
        let loaded = load(&path).await.unwrap();

        assert_eq!(loaded, tree);
    }

    #[compio::test]
    async fn overlapping_saves_both_succeed() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("notes.json");
        let first = wide_tree("a");
        let second = wide_tree("b");

        for _ in 0..5 {
            let (left, right) = futures::join!(save(&first, &path), save(&second, &path));
            left.unwrap();
            right.unwrap();

            let loaded = load(&path).await.unwrap();
            assert!(loaded == first || loaded == second);
        }
    }
}
