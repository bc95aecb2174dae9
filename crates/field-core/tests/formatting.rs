use pretty_assertions::assert_eq;
use richtext_field_core::{
    BlockFormat, Document, Editor, ElementKind, HeadingLevel, ListType, Node, PluginRegistry, Point,
    Selection, get_active_formatting, is_formatting_active, toggle_formatting,
};
use rstest::rstest;

fn editor(children: Vec<Node>, selection: Selection) -> Editor {
    Editor::new(Document::new(children), Some(selection), PluginRegistry::richtext())
}

fn heading(level: u8) -> BlockFormat {
    BlockFormat::Heading(HeadingLevel::clamped(level))
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(6)]
fn paragraph_to_heading_and_back(#[case] level: u8) {
    let mut editor = editor(
        vec![Node::paragraph("Title")],
        Selection::collapsed(Point::new(vec![0, 0], 2)),
    );

    toggle_formatting(&mut editor, heading(level)).unwrap();
    assert_eq!(editor.doc().children, vec![Node::heading(level, "Title")]);
    assert_eq!(get_active_formatting(&editor), Some(heading(level)));
    assert!(is_formatting_active(&editor, heading(level)));

    toggle_formatting(&mut editor, BlockFormat::Paragraph).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("Title")]);
    assert_eq!(get_active_formatting(&editor), Some(BlockFormat::Paragraph));
}

#[test]
fn heading_changes_level_in_place() {
    let mut editor = editor(
        vec![Node::heading(1, "Title")],
        Selection::collapsed(Point::new(vec![0, 0], 0)),
    );
    toggle_formatting(&mut editor, heading(3)).unwrap();
    assert_eq!(editor.doc().children, vec![Node::heading(3, "Title")]);
    assert!(!is_formatting_active(&editor, heading(1)));
}

#[test]
fn paragraph_to_paragraph_is_a_no_op() {
    let mut editor = editor(
        vec![Node::paragraph("Body")],
        Selection::collapsed(Point::new(vec![0, 0], 1)),
    );
    toggle_formatting(&mut editor, BlockFormat::Paragraph).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("Body")]);
    assert!(!editor.can_undo());
}

#[test]
fn heading_inside_a_list_item_keeps_the_list() {
    let mut editor = editor(
        vec![Node::list(ListType::Unordered, vec![Node::list_item("item")])],
        Selection::collapsed(Point::new(vec![0, 0, 0], 1)),
    );

    toggle_formatting(&mut editor, heading(2)).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::list(
            ListType::Unordered,
            vec![Node::element(ElementKind::ListItem, vec![Node::heading(2, "item")])],
        )]
    );
    assert_eq!(get_active_formatting(&editor), Some(heading(2)));

    toggle_formatting(&mut editor, BlockFormat::Paragraph).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::list(ListType::Unordered, vec![Node::list_item("item")])]
    );
}

#[test]
fn only_the_block_under_the_cursor_changes() {
    let mut editor = editor(
        vec![Node::paragraph("one"), Node::paragraph("two")],
        Selection::collapsed(Point::new(vec![1, 0], 3)),
    );
    toggle_formatting(&mut editor, heading(4)).unwrap();
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("one"), Node::heading(4, "two")]
    );
}

#[test]
fn no_selection_reports_no_formatting() {
    let editor = Editor::new(
        Document::new(vec![Node::heading(2, "x")]),
        None,
        PluginRegistry::richtext(),
    );
    assert_eq!(get_active_formatting(&editor), None);
    assert!(!is_formatting_active(&editor, heading(2)));
}

#[test]
fn block_formats_serialize_as_toolbar_ids() {
    let formats: Vec<String> = BlockFormat::all().into_iter().map(String::from).collect();
    assert_eq!(
        formats,
        vec![
            "paragraph",
            "heading-1",
            "heading-2",
            "heading-3",
            "heading-4",
            "heading-5",
            "heading-6"
        ]
    );
    assert_eq!(
        serde_json::from_value::<BlockFormat>(serde_json::json!("heading-5")).unwrap(),
        heading(5)
    );
}

#[test]
fn selection_across_blocks_changes_nothing() {
    let mut editor = editor(
        vec![Node::paragraph("a"), Node::paragraph("b")],
        Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 1)),
    );

    toggle_formatting(&mut editor, heading(1)).unwrap();

    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph("b")]
    );
    assert!(!editor.can_undo());
}
