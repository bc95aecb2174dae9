use pretty_assertions::assert_eq;
use richtext_field_core::{
    Document, Editor, ElementKind, ListType, Node, PluginRegistry, Point, Selection,
    is_list_active, toggle_list,
};
use rstest::rstest;

fn editor(children: Vec<Node>, selection: Selection) -> Editor {
    Editor::new(Document::new(children), Some(selection), PluginRegistry::richtext())
}

fn items(list_type: ListType, texts: &[&str]) -> Node {
    Node::list(list_type, texts.iter().map(|t| Node::list_item(*t)).collect())
}

#[rstest]
#[case(ListType::Ordered)]
#[case(ListType::Unordered)]
fn paragraphs_become_one_list_and_back(#[case] list_type: ListType) {
    let mut editor = editor(
        vec![Node::paragraph("a"), Node::paragraph("b")],
        Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 1)),
    );

    toggle_list(&mut editor, list_type).unwrap();
    assert_eq!(editor.doc().children, vec![items(list_type, &["a", "b"])]);
    assert!(is_list_active(&editor, Some(list_type)));
    assert!(is_list_active(&editor, None));

    toggle_list(&mut editor, list_type).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph("b")]
    );
    assert!(!is_list_active(&editor, None));
}

#[test]
fn new_list_merges_with_the_previous_one() {
    let mut editor = editor(
        vec![items(ListType::Ordered, &["a"]), Node::paragraph("b")],
        Selection::collapsed(Point::new(vec![1, 0], 0)),
    );
    toggle_list(&mut editor, ListType::Ordered).unwrap();
    assert_eq!(editor.doc().children, vec![items(ListType::Ordered, &["a", "b"])]);
    assert_eq!(
        editor.selection(),
        Some(&Selection::collapsed(Point::new(vec![0, 1, 0], 0)))
    );
}

#[test]
fn list_between_two_lists_merges_with_both() {
    let mut editor = editor(
        vec![
            items(ListType::Unordered, &["a"]),
            Node::paragraph("b"),
            items(ListType::Unordered, &["c", "d"]),
        ],
        Selection::collapsed(Point::new(vec![1, 0], 1)),
    );
    toggle_list(&mut editor, ListType::Unordered).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![items(ListType::Unordered, &["a", "b", "c", "d"])]
    );
}

#[test]
fn lists_of_another_type_stay_separate() {
    let mut editor = editor(
        vec![items(ListType::Unordered, &["a"]), Node::paragraph("b")],
        Selection::collapsed(Point::new(vec![1, 0], 0)),
    );
    toggle_list(&mut editor, ListType::Ordered).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![
            items(ListType::Unordered, &["a"]),
            items(ListType::Ordered, &["b"]),
        ]
    );
    assert!(is_list_active(&editor, Some(ListType::Ordered)));
    assert!(!is_list_active(&editor, Some(ListType::Unordered)));
}

#[test]
fn switching_list_type_relabels_the_list() {
    let mut editor = editor(
        vec![items(ListType::Unordered, &["a", "b"])],
        Selection::new(Point::new(vec![0, 0, 0], 0), Point::new(vec![0, 1, 0], 1)),
    );
    toggle_list(&mut editor, ListType::Ordered).unwrap();
    assert_eq!(editor.doc().children, vec![items(ListType::Ordered, &["a", "b"])]);
}

#[test]
fn toggling_off_one_item_splits_the_list() {
    let mut editor = editor(
        vec![items(ListType::Ordered, &["a", "b", "c"])],
        Selection::collapsed(Point::new(vec![0, 1, 0], 0)),
    );
    toggle_list(&mut editor, ListType::Ordered).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![
            items(ListType::Ordered, &["a"]),
            Node::paragraph("b"),
            items(ListType::Ordered, &["c"]),
        ]
    );
}

#[test]
fn heading_is_wrapped_by_a_list_item() {
    let mut editor = editor(
        vec![Node::heading(2, "Title")],
        Selection::collapsed(Point::new(vec![0, 0], 0)),
    );

    toggle_list(&mut editor, ListType::Unordered).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::list(
            ListType::Unordered,
            vec![Node::element(ElementKind::ListItem, vec![Node::heading(2, "Title")])],
        )]
    );

    toggle_list(&mut editor, ListType::Unordered).unwrap();
    assert_eq!(editor.doc().children, vec![Node::heading(2, "Title")]);
}

#[test]
fn toggle_is_a_single_undo_step() {
    let mut editor = editor(
        vec![Node::paragraph("a"), Node::paragraph("b")],
        Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 1)),
    );
    let before = editor.doc().clone();
    toggle_list(&mut editor, ListType::Ordered).unwrap();

    assert!(editor.undo());
    assert_eq!(editor.doc(), &before);
    assert!(!editor.can_undo());
}

#[test]
fn selection_ending_at_next_block_start_leaves_that_block_alone() {
    let mut editor = editor(
        vec![Node::paragraph("a"), Node::paragraph("b")],
        Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 0)),
    );

    toggle_list(&mut editor, ListType::Ordered).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![items(ListType::Ordered, &["a"]), Node::paragraph("b")]
    );
    assert!(is_list_active(&editor, Some(ListType::Ordered)));

    toggle_list(&mut editor, ListType::Ordered).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph("b")]
    );
}
