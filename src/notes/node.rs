use derive_more::Display;
use hashlink::LinkedHashMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use snafu::Snafu;

/// Key under which a container's own text is stored in the persisted document.
pub const CONTENT_SLOT_KEY: &str = "__content__";

/// The whole note tree is a single root container.
pub type Tree = Container;

/// Display kind of a node, used by front ends to decide whether a name can be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NodeKind {
    #[display("note")]
    Leaf,
    #[display("notebook")]
    Container,
}

/// A named entry in the tree: either plain text or a container of further entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Leaf(String),
    Container(Container),
}

impl Node {
    pub fn leaf(text: impl Into<String>) -> Self {
        Node::Leaf(text.into())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Container(_) => NodeKind::Container,
        }
    }

    /// Text carried by the node: a leaf's text, or a container's content slot.
    pub fn content(&self) -> Option<&str> {
        match self {
            Node::Leaf(text) => Some(text),
            Node::Container(container) => container.content(),
        }
    }
}

/// Ordered mapping of unique child names, plus an optional content slot.
///
/// The slot holds the text a note had before it was promoted to a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "LinkedHashMap<String, Node>")]
pub struct Container {
    children: LinkedHashMap<String, Node>,
    content: Option<String>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            children: LinkedHashMap::new(),
            content: Some(content.into()),
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.children.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.children.iter()
    }

    /// Appends a child. The caller is responsible for checking the name is free.
    pub(crate) fn insert(&mut self, name: impl Into<String>, node: Node) {
        self.children.insert(name.into(), node);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Node> {
        self.children.remove(name)
    }

    /// Renames a child in place, keeping its position among its siblings.
    pub(crate) fn rename_child(&mut self, old_name: &str, new_name: &str) {
        let children = std::mem::take(&mut self.children);
        self.children = children
            .into_iter()
            .map(|(name, node)| {
                if name == old_name {
                    (new_name.to_string(), node)
                } else {
                    (name, node)
                }
            })
            .collect();
    }
}

impl Serialize for Container {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.children.len() + usize::from(self.content.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(content) = &self.content {
            map.serialize_entry(CONTENT_SLOT_KEY, content)?;
        }
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}

impl TryFrom<LinkedHashMap<String, Node>> for Container {
    type Error = ContentSlotError;

    fn try_from(mut children: LinkedHashMap<String, Node>) -> Result<Self, Self::Error> {
        let content = match children.remove(CONTENT_SLOT_KEY) {
            None => None,
            Some(Node::Leaf(text)) => Some(text),
            Some(Node::Container(_)) => return Err(ContentSlotError),
        };
        Ok(Self { children, content })
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("The '{CONTENT_SLOT_KEY}' entry of a notebook must be text"))]
pub struct ContentSlotError;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Container {
        let mut work = Container::with_content("notebook text");
        work.insert("todo", Node::leaf("buy milk"));
        work.insert("done", Node::leaf(""));

        let mut root = Container::new();
        root.insert("Work", Node::Container(work));
        root.insert("Ideas", Node::leaf("fly"));
        root
    }

    #[test]
    fn serializes_leaves_as_strings_and_slot_first() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"Work":{"__content__":"notebook text","todo":"buy milk","done":""},"Ideas":"fly"}"#
        );
    }

    #[test]
    fn deserializes_nested_containers_in_document_order() {
        let json = r#"{"b":"1","a":{"z":"2","y":{"__content__":"slot"}}}"#;
        let tree: Tree = serde_json::from_str(json).unwrap();

        assert_eq!(tree.names().collect::<Vec<_>>(), vec!["b", "a"]);
        let Some(Node::Container(a)) = tree.get("a") else {
            panic!("Expected 'a' to be a container");
        };
        assert_eq!(a.names().collect::<Vec<_>>(), vec!["z", "y"]);
        assert_eq!(a.get("y").and_then(Node::content), Some("slot"));
        assert!(a.content().is_none());
    }

    #[test]
    fn rejects_container_in_content_slot() {
        let json = r#"{"a":{"__content__":{"x":"y"}}}"#;
        let result: Result<Tree, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_text_leaves() {
        let result: Result<Tree, _> = serde_json::from_str(r#"{"a":42}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rename_child_keeps_position() {
        let mut root = sample();
        root.rename_child("Work", "Life");
        assert_eq!(root.names().collect::<Vec<_>>(), vec!["Life", "Ideas"]);
    }

    #[test]
    fn node_kind_display() {
        assert_eq!(NodeKind::Leaf.to_string(), "note");
        assert_eq!(NodeKind::Container.to_string(), "notebook");
    }
}
