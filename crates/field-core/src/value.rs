//! The persisted field value: a `root` node holding the document, or the
//! empty string when there is no content.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ElementKind, ElementNode, Marks, Node, TextNode};

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("invalid field value JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No content; persisted as `""`.
    Empty,
    Root(Vec<PersistedNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum RootTag {
    #[serde(rename = "root")]
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextTag {
    #[serde(rename = "text")]
    Text,
}

#[derive(Serialize)]
struct RootRef<'a> {
    #[serde(rename = "type")]
    tag: RootTag,
    children: &'a [PersistedNode],
}

#[derive(Deserialize)]
struct RootRepr {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    tag: RootTag,
    #[serde(default)]
    children: Vec<PersistedNode>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldValueRepr {
    Root(RootRepr),
    Marker(String),
    Null(()),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Empty => serializer.serialize_str(""),
            FieldValue::Root(children) => RootRef {
                tag: RootTag::Root,
                children,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match FieldValueRepr::deserialize(deserializer)? {
            FieldValueRepr::Root(root) => Ok(FieldValue::Root(root.children)),
            FieldValueRepr::Marker(marker) if marker.is_empty() => Ok(FieldValue::Empty),
            FieldValueRepr::Marker(other) => Err(de::Error::custom(format!(
                "expected a root node or the empty marker, found {other:?}"
            ))),
            FieldValueRepr::Null(()) => Ok(FieldValue::Empty),
        }
    }
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    pub fn to_json_string(&self) -> Result<String, ValueError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ValueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ValueError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// A node of the persisted tree. Text leaves store their content under
/// `value`; elements look exactly like the editing tree's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedNode {
    Text(PersistedText),
    Element(PersistedElement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedText {
    #[serde(rename = "type")]
    pub tag: TextTag,
    pub value: String,
    #[serde(flatten)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedElement {
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<PersistedNode>,
}

impl From<&Node> for PersistedNode {
    fn from(node: &Node) -> Self {
        match node {
            Node::Text(t) => PersistedNode::Text(PersistedText {
                tag: TextTag::Text,
                value: t.text.clone(),
                marks: t.marks.clone(),
            }),
            Node::Element(el) => PersistedNode::Element(PersistedElement {
                kind: el.kind.clone(),
                children: el.children.iter().map(PersistedNode::from).collect(),
            }),
        }
    }
}

impl From<&PersistedNode> for Node {
    fn from(node: &PersistedNode) -> Self {
        match node {
            PersistedNode::Text(t) => Node::Text(TextNode {
                text: t.value.clone(),
                marks: t.marks.clone(),
            }),
            PersistedNode::Element(el) => Node::Element(ElementNode {
                kind: el.kind.clone(),
                children: el.children.iter().map(Node::from).collect(),
            }),
        }
    }
}

/// Converts the editing tree to its persisted form. A tree whose text is
/// blank after trimming persists as [`FieldValue::Empty`].
pub fn serialize(nodes: &[Node]) -> FieldValue {
    let text: String = nodes.iter().map(Node::string).collect();
    if text.trim().is_empty() {
        return FieldValue::Empty;
    }
    FieldValue::Root(nodes.iter().map(PersistedNode::from).collect())
}

/// Converts a persisted value back to an editing tree. An absent or empty
/// value yields a single empty paragraph.
pub fn deserialize(value: Option<&FieldValue>) -> Vec<Node> {
    match value {
        None | Some(FieldValue::Empty) => vec![Node::paragraph("")],
        Some(FieldValue::Root(children)) => children.iter().map(Node::from).collect(),
    }
}
