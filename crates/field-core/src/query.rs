//! Read-only lookups over the document tree: node access by path, ancestor
//! search, leaf iteration and range helpers.

use crate::core::{Document, ElementNode, Node, Point, Selection, TextNode};
use crate::ops::{self, Path};

pub fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    if path.is_empty() {
        return None;
    }

    let mut node = doc.children.get(path[0])?;
    for &ix in path.iter().skip(1) {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Text(_) => return None,
        };
    }
    Some(node)
}

pub fn element_at<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a ElementNode> {
    node_at_path(doc, path).and_then(Node::as_element)
}

pub fn text_at<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a TextNode> {
    node_at_path(doc, path).and_then(Node::as_text)
}

/// Children of the node at `parent`; the empty path addresses the document.
pub fn children_at<'a>(doc: &'a Document, parent: &[usize]) -> Option<&'a [Node]> {
    if parent.is_empty() {
        return Some(&doc.children);
    }
    element_at(doc, parent).map(|el| el.children.as_slice())
}

/// Element ancestors of `path`, deepest first. The node at `path` itself is
/// not included.
pub fn ancestors<'a>(doc: &'a Document, path: &[usize]) -> Vec<(Path, &'a ElementNode)> {
    (1..path.len())
        .rev()
        .filter_map(|len| {
            let prefix = &path[..len];
            element_at(doc, prefix).map(|el| (prefix.to_vec(), el))
        })
        .collect()
}

/// Lowest strict ancestor of `path` matching `pred`.
pub fn above<'a>(
    doc: &'a Document,
    path: &[usize],
    pred: impl Fn(&ElementNode) -> bool,
) -> Option<(Path, &'a ElementNode)> {
    ancestors(doc, path).into_iter().find(|(_, el)| pred(el))
}

/// Lowest element containing both ends of the selection and matching `pred`.
pub fn above_selection<'a>(
    doc: &'a Document,
    selection: &Selection,
    pred: impl Fn(&ElementNode) -> bool,
) -> Option<(Path, &'a ElementNode)> {
    let (start, end) = selection.edges();
    let common = ops::common_ancestor(&start.path, &end.path);
    let deepest = if start.path == end.path {
        common.len().saturating_sub(1)
    } else {
        common.len()
    };
    (1..=deepest).rev().find_map(|len| {
        let prefix = &common[..len];
        element_at(doc, prefix)
            .filter(|el| pred(el))
            .map(|el| (prefix.to_vec(), el))
    })
}

/// Every text leaf in document order.
pub fn text_leaves(doc: &Document) -> Vec<(Path, &TextNode)> {
    fn walk<'a>(children: &'a [Node], path: &mut Path, out: &mut Vec<(Path, &'a TextNode)>) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(t) => out.push((path.clone(), t)),
                Node::Element(el) => walk(&el.children, path, out),
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

/// Text leaves that share at least one position with `start..end`.
pub fn leaves_in_range<'a>(
    doc: &'a Document,
    start: &Point,
    end: &Point,
) -> Vec<(Path, &'a TextNode)> {
    text_leaves(doc)
        .into_iter()
        .filter(|(path, leaf)| {
            if *path < start.path || *path > end.path {
                return false;
            }
            if start.path == end.path {
                return true;
            }
            if *path == start.path {
                return start.offset < leaf.text.len();
            }
            if *path == end.path {
                return end.offset > 0;
            }
            true
        })
        .collect()
}

/// Elements whose subtree intersects `start..=end`, in document order.
pub fn elements_in_range<'a>(
    doc: &'a Document,
    start: &Point,
    end: &Point,
    pred: impl Fn(&ElementNode) -> bool,
) -> Vec<(Path, &'a ElementNode)> {
    fn walk<'a>(
        children: &'a [Node],
        path: &mut Path,
        start: &[usize],
        end: &[usize],
        pred: &dyn Fn(&ElementNode) -> bool,
        out: &mut Vec<(Path, &'a ElementNode)>,
    ) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            let Node::Element(el) = node else {
                path.pop();
                continue;
            };
            // A subtree intersects when it starts no later than `end` and
            // ends no earlier than `start`.
            let after_end = path.as_slice() > end && !end.starts_with(path);
            let before_start = path.as_slice() < start && !start.starts_with(path);
            if !after_end && !before_start {
                if pred(el) {
                    out.push((path.clone(), el));
                }
                walk(&el.children, path, start, end, pred, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(
        &doc.children,
        &mut Vec::new(),
        &start.path,
        &end.path,
        &pred,
        &mut out,
    );
    out
}

pub fn first_text_point(doc: &Document) -> Option<Point> {
    text_leaves(doc)
        .into_iter()
        .next()
        .map(|(path, _)| Point::new(path, 0))
}

/// First position inside the node at `path`.
pub fn start_point(doc: &Document, path: &[usize]) -> Option<Point> {
    match node_at_path(doc, path)? {
        Node::Text(_) => Some(Point::new(path.to_vec(), 0)),
        Node::Element(_) => text_leaves(doc)
            .into_iter()
            .find(|(p, _)| p.starts_with(path))
            .map(|(p, _)| Point::new(p, 0)),
    }
}

/// Last position inside the node at `path`.
pub fn end_point(doc: &Document, path: &[usize]) -> Option<Point> {
    match node_at_path(doc, path)? {
        Node::Text(t) => Some(Point::new(path.to_vec(), t.text.len())),
        Node::Element(_) => text_leaves(doc)
            .into_iter()
            .rev()
            .find(|(p, _)| p.starts_with(path))
            .map(|(p, t)| Point::new(p, t.text.len())),
    }
}

/// Resolves `point` to the closest existing text position. Out-of-range
/// indices clamp to the last child; landing on an element resolves to its
/// first leaf, or its last leaf's end when `offset` is `usize::MAX`.
pub fn clamp_point(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved: Path = Vec::new();
    let mut children: &[Node] = &doc.children;
    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                let offset = crate::core::clamp_to_char_boundary(&t.text, point.offset);
                return Some(Point::new(resolved, offset));
            }
            Node::Element(el) => children = &el.children,
        }
    }

    if point.offset == usize::MAX {
        end_point(doc, &resolved)
    } else {
        start_point(doc, &resolved)
    }
    .or_else(|| first_text_point(doc))
}

/// Pulls the end of a range that sits at offset 0 of a later block back to
/// the end of the previous leaf, so a triple-click style selection does not
/// count the following block as selected.
pub fn unhang_range(doc: &Document, start: &Point, end: &Point) -> (Point, Point) {
    if end.offset != 0 || start.path == end.path || start >= end {
        return (start.clone(), end.clone());
    }
    let previous = text_leaves(doc)
        .into_iter()
        .rev()
        .find(|(path, _)| *path < end.path && *path >= start.path);
    match previous {
        Some((path, leaf)) => (start.clone(), Point::new(path, leaf.text.len())),
        None => (start.clone(), end.clone()),
    }
}

/// Text between two points, leaves concatenated in order.
pub fn string_in_range(doc: &Document, start: &Point, end: &Point) -> String {
    leaves_in_range(doc, start, end)
        .into_iter()
        .map(|(path, leaf)| {
            let from = if path == start.path { start.offset } else { 0 };
            let to = if path == end.path {
                end.offset
            } else {
                leaf.text.len()
            };
            leaf.text.get(from.min(to)..to).unwrap_or_default().to_string()
        })
        .collect()
}
