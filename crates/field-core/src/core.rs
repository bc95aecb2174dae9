use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::EditorConfig;
use crate::ops::{self, Affinity, Applied, Op, Path, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError};
use crate::query::{clamp_point, first_text_point, node_at_path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Plain text of the whole document, blocks concatenated without
    /// separators.
    pub fn string(&self) -> String {
        self.children.iter().map(Node::string).collect()
    }
}

/// A node of the editing tree. Elements carry a `type`; text leaves don't.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode::new(text))
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(ElementNode { kind, children })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::element(ElementKind::Paragraph, vec![Node::text(text)])
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::element(
            ElementKind::Heading {
                level: HeadingLevel::clamped(level),
            },
            vec![Node::text(text)],
        )
    }

    pub fn list(list_type: ListType, items: Vec<Node>) -> Self {
        Self::element(ElementKind::List { list_type }, items)
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Self::element(ElementKind::ListItem, vec![Node::text(text)])
    }

    pub fn link(url: impl Into<String>, target: Option<&str>, text: impl Into<String>) -> Self {
        Self::element(
            ElementKind::Link {
                url: url.into(),
                target: target.map(str::to_string),
            },
            vec![Node::text(text)],
        )
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    /// Concatenated text of every leaf below this node.
    pub fn string(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Element(el) => el.children.iter().map(Node::string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn is_inline(&self) -> bool {
        self.kind.is_inline()
    }

    pub fn is_block(&self) -> bool {
        !self.kind.is_inline()
    }
}

/// The closed set of element kinds, with their attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ElementKind {
    Paragraph,
    Heading {
        level: HeadingLevel,
    },
    List {
        #[serde(rename = "listType")]
        list_type: ListType,
    },
    ListItem,
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Paragraph => "paragraph",
            ElementKind::Heading { .. } => "heading",
            ElementKind::List { .. } => "list",
            ElementKind::ListItem => "list-item",
            ElementKind::Link { .. } => "link",
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ElementKind::Link { .. })
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, ElementKind::Heading { .. })
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ElementKind::List { .. })
    }

    pub fn is_link(&self) -> bool {
        matches!(self, ElementKind::Link { .. })
    }
}

/// Heading level, always within `1..=6`. Deserializing any other level fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("heading level must be between 1 and 6, found {0}")]
pub struct InvalidHeadingLevel(pub u8);

impl HeadingLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&level)
            .then_some(Self(level))
    }

    /// Nearest valid level, for constructors taking a plain number.
    pub fn clamped(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or(InvalidHeadingLevel(level))
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Ordered,
    Unordered,
}

impl ListType {
    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Ordered => "ordered",
            ListType::Unordered => "unordered",
        }
    }
}

impl std::str::FromStr for ListType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordered" => Ok(ListType::Ordered),
            "unordered" => Ok(ListType::Unordered),
            other => Err(format!("Unknown list type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bold,
    Italic,
}

/// Text formatting. A mark that was never set stays `None`, which is
/// distinct from an explicit `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
}

impl Marks {
    pub fn get(&self, mark: Mark) -> Option<bool> {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
        }
    }

    pub fn is_active(&self, mark: Mark) -> bool {
        self.get(mark) == Some(true)
    }

    pub fn set(&mut self, mark: Mark, value: Option<bool>) {
        match mark {
            Mark::Bold => self.bold = value,
            Mark::Italic => self.italic = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }

    /// Start and end of the selection in document order.
    pub fn edges(&self) -> (Point, Point) {
        if self.is_backward() {
            (self.focus.clone(), self.anchor.clone())
        } else {
            (self.anchor.clone(), self.focus.clone())
        }
    }

    /// Rebuilds a selection from ordered edges, keeping the given direction.
    pub fn from_edges(start: Point, end: Point, backward: bool) -> Self {
        if backward {
            Self::new(end, start)
        } else {
            Self::new(start, end)
        }
    }
}

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Option<Selection>,
    pub selection_after: Option<Selection>,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PathError(pub String);

impl PathError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

pub struct Editor {
    doc: Document,
    selection: Option<Selection>,
    marks: Option<Marks>,
    registry: PluginRegistry,
    config: EditorConfig,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    changed: bool,
}

impl Editor {
    pub fn new(doc: Document, selection: Option<Selection>, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Option<Selection>,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            marks: None,
            registry,
            config: config.with_defaults(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            changed: false,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_richtext_plugins() -> Self {
        let doc = Document {
            children: vec![Node::paragraph("")],
        };
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Self::new(doc, Some(selection), PluginRegistry::richtext())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        if selection != self.selection {
            self.marks = None;
        }
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    /// Marks queued at the cursor for the next inserted text.
    pub fn pending_marks(&self) -> Option<&Marks> {
        self.marks.as_ref()
    }

    pub fn set_pending_marks(&mut self, marks: Option<Marks>) {
        self.marks = marks;
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Returns whether the document changed since the last call, and resets
    /// the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Replaces the whole document, dropping selection, pending marks and
    /// history.
    pub fn reset(&mut self, doc: Document) {
        self.doc = doc;
        self.selection = None;
        self.marks = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.normalize_in_place();
        self.changed = false;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut redo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok(inv) = self.apply_op(op, &mut []) {
                redo_ops.push(inv);
            } else {
                // If we can't apply inverse ops, bail out and stop mutating further.
                break;
            }
        }
        redo_ops.reverse();

        self.selection = selection_before.clone();
        self.marks = None;
        self.normalize_in_place();
        self.changed = true;

        self.redo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: redo_ops,
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut undo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok(inv) = self.apply_op(op, &mut []) {
                undo_ops.push(inv);
            } else {
                break;
            }
        }
        undo_ops.reverse();

        self.selection = selection_after.clone();
        self.marks = None;
        self.normalize_in_place();
        self.changed = true;

        self.undo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: undo_ops,
        });
        true
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let Transaction {
            ops,
            selection_after,
            meta,
        } = tx;
        let source = meta.source.unwrap_or_else(|| "transaction".to_string());
        self.batch(&source, |batch| {
            for op in ops {
                batch.apply(op)?;
            }
            if let Some(selection) = selection_after {
                batch.set_selection(Some(selection));
            }
            Ok(())
        })
    }

    /// Runs `f` as one atomic edit: its ops are applied without intermediate
    /// normalization, the tree is normalized once at the end and the whole
    /// batch becomes a single history entry. If `f` (or the final
    /// normalization) fails, every applied op is rolled back.
    pub fn batch<T>(
        &mut self,
        source: &str,
        f: impl FnOnce(&mut Batch<'_>) -> Result<T, ApplyError>,
    ) -> Result<T, ApplyError> {
        let selection_before = self.selection.clone();
        let marks_before = self.marks.clone();

        let mut batch = Batch {
            editor: self,
            inverse_ops: Vec::new(),
            refs: Vec::new(),
        };
        let result = f(&mut batch);
        let Batch {
            mut inverse_ops, ..
        } = batch;

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(source, error = %err, "rolling back batch");
                self.rollback(inverse_ops, selection_before, marks_before);
                return Err(err);
            }
        };

        if inverse_ops.is_empty() {
            if self.selection != selection_before {
                self.marks = None;
                self.normalize_selection_in_place();
            }
            return Ok(value);
        }

        match self.normalize_with_inverse_ops() {
            Ok(mut ops) => inverse_ops.append(&mut ops),
            Err(err) => {
                tracing::warn!(source, error = %err, "rolling back batch");
                self.rollback(inverse_ops, selection_before, marks_before);
                return Err(err);
            }
        }
        self.normalize_selection_in_place();
        if self.selection != selection_before {
            self.marks = None;
        }

        let structural = inverse_ops.iter().any(Op::is_structural);
        tracing::debug!(source, ops = inverse_ops.len(), structural, "applied batch");
        inverse_ops.reverse();

        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after: self.selection.clone(),
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }
        if structural {
            self.changed = true;
        }

        Ok(value)
    }

    pub fn run_command(
        &mut self,
        id: &str,
        args: Option<serde_json::Value>,
    ) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    fn rollback(
        &mut self,
        inverse_ops: Vec<Op>,
        selection: Option<Selection>,
        marks: Option<Marks>,
    ) {
        for op in inverse_ops.into_iter().rev() {
            if let Err(err) = self.apply_op(op, &mut []) {
                tracing::warn!(error = %err, "failed to roll back op");
                break;
            }
        }
        self.selection = selection;
        self.marks = marks;
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = self.normalize_with_inverse_ops() {
            tracing::warn!(error = %err, "normalization failed");
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        let Some(selection) = &self.selection else {
            return;
        };
        let fallback = first_text_point(&self.doc);
        let anchor = clamp_point(&self.doc, &selection.anchor).or_else(|| fallback.clone());
        let focus = clamp_point(&self.doc, &selection.focus).or_else(|| anchor.clone());
        self.selection = match (anchor, focus) {
            (Some(anchor), Some(focus)) => Some(Selection { anchor, focus }),
            _ => None,
        };
    }

    fn normalize_with_inverse_ops(&mut self) -> Result<Vec<Op>, ApplyError> {
        let mut inverse_ops: Vec<Op> = Vec::new();
        for _ in 0..self.config.max_normalize_iterations {
            let mut dirty = false;
            for ix in 0..self.registry.normalize_passes().len() {
                let pass = &self.registry.normalize_passes()[ix];
                let id = pass.id();
                let ops = pass.run(&self.doc);
                if ops.is_empty() {
                    continue;
                }
                tracing::trace!(pass = id, ops = ops.len(), "normalize");
                dirty = true;
                for op in ops {
                    let inv = self.apply_op(op, &mut [])?;
                    inverse_ops.push(inv);
                }
            }
            if !dirty {
                return Ok(inverse_ops);
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    fn apply_op(&mut self, op: Op, refs: &mut [(Point, Affinity)]) -> Result<Op, ApplyError> {
        let (inverse, applied) = apply_op_to(&mut self.doc, op)?;
        if let Some(selection) = &mut self.selection {
            applied.transform_selection(selection);
        }
        for (point, affinity) in refs.iter_mut() {
            applied.transform_point(point, *affinity);
        }
        Ok(inverse)
    }
}

/// Handle to a point tracked through the ops of a [`Batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointRef(usize);

/// An in-progress atomic edit; see [`Editor::batch`].
pub struct Batch<'a> {
    editor: &'a mut Editor,
    inverse_ops: Vec<Op>,
    refs: Vec<(Point, Affinity)>,
}

impl Batch<'_> {
    pub fn doc(&self) -> &Document {
        &self.editor.doc
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.editor.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.editor.selection = selection;
    }

    pub fn apply(&mut self, op: Op) -> Result<(), ApplyError> {
        let inverse = self.editor.apply_op(op, &mut self.refs)?;
        self.inverse_ops.push(inverse);
        Ok(())
    }

    pub fn track(&mut self, point: Point, affinity: Affinity) -> PointRef {
        self.refs.push((point, affinity));
        PointRef(self.refs.len() - 1)
    }

    /// Current position of a tracked point, resolved to an existing leaf.
    pub fn point(&self, point_ref: PointRef) -> Point {
        let (point, _) = &self.refs[point_ref.0];
        clamp_point(self.doc(), point).unwrap_or_else(|| point.clone())
    }
}

fn apply_op_to(doc: &mut Document, op: Op) -> Result<(Op, Applied), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            let len = text.len();
            Ok((
                Op::RemoveText {
                    path: path.clone(),
                    range: offset..offset + len,
                },
                Applied::InsertText { path, offset, len },
            ))
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start >= end {
                return Ok((
                    Op::InsertText {
                        path,
                        offset: start,
                        text: String::new(),
                    },
                    Applied::Attributes,
                ));
            }
            let removed = text_node.text[start..end].to_string();
            text_node.text.replace_range(start..end, "");
            Ok((
                Op::InsertText {
                    path: path.clone(),
                    offset: start,
                    text: removed,
                },
                Applied::RemoveText {
                    path,
                    range: start..end,
                },
            ))
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            Ok((
                Op::RemoveNode { path: path.clone() },
                Applied::InsertNode { path },
            ))
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            Ok((
                Op::InsertNode {
                    path: path.clone(),
                    node: removed,
                },
                Applied::RemoveNode { path },
            ))
        }
        Op::SplitNode {
            path,
            position,
            kind,
            marks,
        } => {
            let (right, position, is_text) = match node_mut(doc, &path)? {
                Node::Text(t) => {
                    let position = clamp_to_char_boundary(&t.text, position);
                    let rest = t.text.split_off(position);
                    let right = Node::Text(TextNode {
                        text: rest,
                        marks: marks.unwrap_or_else(|| t.marks.clone()),
                    });
                    (right, position, true)
                }
                Node::Element(el) => {
                    let position = position.min(el.children.len());
                    let rest = el.children.split_off(position);
                    let right = Node::Element(ElementNode {
                        kind: kind.unwrap_or_else(|| el.kind.clone()),
                        children: rest,
                    });
                    (right, position, false)
                }
            };
            let right_path = ops::next(&path);
            insert_node(doc, &right_path, right)?;
            Ok((
                Op::MergeNode { path: right_path },
                Applied::SplitNode {
                    path,
                    position,
                    is_text,
                },
            ))
        }
        Op::MergeNode { path } => {
            let prev_path = ops::previous(&path)
                .ok_or_else(|| PathError::new("Merge target has no previous sibling"))?;
            match (node_at_path(doc, &prev_path), node_at_path(doc, &path)) {
                (Some(Node::Text(_)), Some(Node::Text(_)))
                | (Some(Node::Element(_)), Some(Node::Element(_))) => {}
                _ => return Err(PathError::new("Merge requires two siblings of the same sort").into()),
            }
            let removed = remove_node(doc, &path)?;
            match (node_mut(doc, &prev_path)?, removed) {
                (Node::Text(prev), Node::Text(cur)) => {
                    let position = prev.text.len();
                    prev.text.push_str(&cur.text);
                    Ok((
                        Op::SplitNode {
                            path: prev_path,
                            position,
                            kind: None,
                            marks: Some(cur.marks),
                        },
                        Applied::MergeNode {
                            path,
                            position,
                            is_text: true,
                        },
                    ))
                }
                (Node::Element(prev), Node::Element(cur)) => {
                    let position = prev.children.len();
                    prev.children.extend(cur.children);
                    Ok((
                        Op::SplitNode {
                            path: prev_path,
                            position,
                            kind: Some(cur.kind),
                            marks: None,
                        },
                        Applied::MergeNode {
                            path,
                            position,
                            is_text: false,
                        },
                    ))
                }
                _ => Err(PathError::new("Merge requires two siblings of the same sort").into()),
            }
        }
        Op::MoveNode { path, to } => {
            let node = remove_node(doc, &path)?;
            if let Err(err) = check_insert(doc, &to) {
                insert_node(doc, &path, node)?;
                return Err(err.into());
            }
            insert_node(doc, &to, node)?;
            Ok((
                Op::MoveNode {
                    path: to.clone(),
                    to: path.clone(),
                },
                Applied::MoveNode { path, to },
            ))
        }
        Op::SetNode { path, kind } => {
            let Node::Element(el) = node_mut(doc, &path)? else {
                return Err(PathError::new("Text has no element kind").into());
            };
            let old = std::mem::replace(&mut el.kind, kind);
            Ok((Op::SetNode { path, kind: old }, Applied::Attributes))
        }
        Op::SetMarks { path, marks } => {
            let text_node = node_text_mut(doc, &path)?;
            let old = std::mem::replace(&mut text_node.marks, marks);
            Ok((Op::SetMarks { path, marks: old }, Applied::Attributes))
        }
    }
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn children_mut<'a>(doc: &'a mut Document, parent: &[usize]) -> Result<&'a mut Vec<Node>, PathError> {
    let mut children = &mut doc.children;
    for (depth, &ix) in parent.iter().enumerate() {
        let len = children.len();
        children = match children.get_mut(ix) {
            Some(Node::Element(el)) => &mut el.children,
            Some(Node::Text(_)) => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
            None => {
                return Err(PathError(format!(
                    "Path out of bounds at depth {depth}: {ix} >= {len}"
                )));
            }
        };
    }
    Ok(children)
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let Some((&ix, parent)) = path.split_last() else {
        return Err(PathError::new("Empty path"));
    };
    let children = children_mut(doc, parent)?;
    let len = children.len();
    children
        .get_mut(ix)
        .ok_or_else(|| PathError(format!("Path out of bounds: {ix} >= {len}")))
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(PathError::new("Expected Text node")),
    }
}

fn check_insert(doc: &Document, path: &[usize]) -> Result<(), PathError> {
    let Some((&index, parent)) = path.split_last() else {
        return Err(PathError::new("Empty insert path"));
    };
    let len = if parent.is_empty() {
        doc.children.len()
    } else {
        match node_at_path(doc, parent) {
            Some(Node::Element(el)) => el.children.len(),
            _ => return Err(PathError::new("Insert parent is not a container")),
        }
    };
    if index > len {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {len}"
        )));
    }
    Ok(())
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    check_insert(doc, path)?;
    let (&index, parent) = path
        .split_last()
        .ok_or_else(|| PathError::new("Empty insert path"))?;
    children_mut(doc, parent)?.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let Some((&index, parent)) = path.split_last() else {
        return Err(PathError::new("Empty remove path"));
    };
    let children = children_mut(doc, parent)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(vec![
            Node::element(
                ElementKind::Paragraph,
                vec![
                    Node::text("ab"),
                    Node::link("https://a.test", None, "cd"),
                    Node::text("ef"),
                ],
            ),
            Node::list(
                ListType::Ordered,
                vec![Node::list_item("one"), Node::list_item("two")],
            ),
        ])
    }

    fn assert_inverse(op: Op) {
        let mut d = doc();
        let (inverse, _) = apply_op_to(&mut d, op.clone()).unwrap();
        assert_ne!(d, doc(), "{op:?} did not change the document");
        apply_op_to(&mut d, inverse).unwrap();
        assert_eq!(d, doc(), "inverse of {op:?} did not restore the document");
    }

    #[test]
    fn every_op_has_an_exact_inverse() {
        assert_inverse(Op::InsertText {
            path: vec![0, 0],
            offset: 1,
            text: "x".into(),
        });
        assert_inverse(Op::RemoveText {
            path: vec![0, 2],
            range: 0..1,
        });
        assert_inverse(Op::InsertNode {
            path: vec![1],
            node: Node::paragraph("new"),
        });
        assert_inverse(Op::RemoveNode { path: vec![0, 1] });
        assert_inverse(Op::SplitNode {
            path: vec![0, 0],
            position: 1,
            kind: None,
            marks: None,
        });
        assert_inverse(Op::SplitNode {
            path: vec![1],
            position: 1,
            kind: None,
            marks: None,
        });
        assert_inverse(Op::MoveNode {
            path: vec![1, 1],
            to: vec![2],
        });
        assert_inverse(Op::SetNode {
            path: vec![0],
            kind: ElementKind::ListItem,
        });
        assert_inverse(Op::SetMarks {
            path: vec![0, 0],
            marks: Marks {
                bold: Some(true),
                italic: None,
            },
        });
    }

    #[test]
    fn merge_restores_split_properties() {
        let mut d = Document::new(vec![Node::element(
            ElementKind::Paragraph,
            vec![
                Node::text("a"),
                Node::Text(TextNode {
                    text: "b".into(),
                    marks: Marks {
                        bold: Some(true),
                        italic: None,
                    },
                }),
            ],
        )]);
        let before = d.clone();
        let (inverse, _) = apply_op_to(&mut d, Op::MergeNode { path: vec![0, 1] }).unwrap();
        assert_eq!(d.children[0].string(), "ab");
        apply_op_to(&mut d, inverse).unwrap();
        assert_eq!(d, before);
    }

    #[test]
    fn move_to_invalid_destination_leaves_document_intact() {
        let mut d = doc();
        let err = apply_op_to(
            &mut d,
            Op::MoveNode {
                path: vec![1, 0],
                to: vec![5],
            },
        );
        assert!(err.is_err());
        assert_eq!(d, doc());
    }

    #[test]
    fn failed_batch_rolls_back() {
        let mut editor = Editor::new(
            doc(),
            Some(Selection::collapsed(Point::new(vec![0, 0], 0))),
            PluginRegistry::richtext(),
        );
        let before = editor.doc().clone();
        let result = editor.batch("test", |b| {
            b.apply(Op::InsertText {
                path: vec![0, 0],
                offset: 0,
                text: "zz".into(),
            })?;
            b.apply(Op::RemoveNode { path: vec![9] })
        });
        assert!(result.is_err());
        assert_eq!(editor.doc(), &before);
        assert!(!editor.can_undo());
        assert!(!editor.take_changed());
    }
}
