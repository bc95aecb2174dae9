use pretty_assertions::assert_eq;
use richtext_field_core::{
    Document, Editor, ElementKind, Key, KeyInput, KeyOutcome, ListType, Node, PluginRegistry,
    Point, Selection, handle_key_down,
};
use rstest::rstest;

fn editor(children: Vec<Node>, at: Point) -> Editor {
    Editor::new(
        Document::new(children),
        Some(Selection::collapsed(at)),
        PluginRegistry::richtext(),
    )
}

fn cursor(editor: &Editor) -> Point {
    let selection = editor.selection().unwrap();
    assert!(selection.is_collapsed());
    selection.focus.clone()
}

fn press(editor: &mut Editor, input: KeyInput) -> KeyOutcome {
    handle_key_down(editor, input).unwrap()
}

#[test]
fn enter_at_heading_end_opens_a_paragraph() {
    let mut editor = editor(vec![Node::heading(1, "Title")], Point::new(vec![0, 0], 5));

    assert_eq!(press(&mut editor, KeyInput::enter()), KeyOutcome::Handled);

    assert_eq!(
        editor.doc().children,
        vec![Node::heading(1, "Title"), Node::paragraph("")]
    );
    assert_eq!(cursor(&editor), Point::new(vec![1, 0], 0));
}

#[test]
fn enter_inside_heading_splits_it() {
    let mut editor = editor(vec![Node::heading(2, "Title")], Point::new(vec![0, 0], 2));
    press(&mut editor, KeyInput::enter());
    assert_eq!(
        editor.doc().children,
        vec![Node::heading(2, "Ti"), Node::heading(2, "tle")]
    );
    assert_eq!(cursor(&editor), Point::new(vec![1, 0], 0));
}

#[test]
fn enter_at_link_end_opens_a_paragraph_after_the_block() {
    let paragraph = Node::element(
        ElementKind::Paragraph,
        vec![
            Node::text("see "),
            Node::link("https://a.test", None, "docs"),
            Node::text(""),
        ],
    );
    let mut editor = editor(vec![paragraph.clone()], Point::new(vec![0, 1, 0], 4));

    assert_eq!(press(&mut editor, KeyInput::enter()), KeyOutcome::Handled);

    assert_eq!(editor.doc().children, vec![paragraph, Node::paragraph("")]);
    assert_eq!(cursor(&editor), Point::new(vec![1, 0], 0));
}

#[test]
fn enter_at_link_end_inside_a_list_item_adds_an_item() {
    let item = Node::element(
        ElementKind::ListItem,
        vec![
            Node::text(""),
            Node::link("https://a.test", None, "docs"),
            Node::text(""),
        ],
    );
    let mut editor = editor(
        vec![Node::list(ListType::Unordered, vec![item.clone()])],
        Point::new(vec![0, 0, 1, 0], 4),
    );

    press(&mut editor, KeyInput::enter());

    assert_eq!(
        editor.doc().children,
        vec![Node::list(ListType::Unordered, vec![item, Node::list_item("")])]
    );
    assert_eq!(cursor(&editor), Point::new(vec![0, 1, 0], 0));
}

#[test]
fn enter_at_list_item_end_adds_an_item() {
    let mut editor = editor(
        vec![Node::list(ListType::Ordered, vec![Node::list_item("ab")])],
        Point::new(vec![0, 0, 0], 2),
    );
    press(&mut editor, KeyInput::enter());
    assert_eq!(
        editor.doc().children,
        vec![Node::list(
            ListType::Ordered,
            vec![Node::list_item("ab"), Node::list_item("")],
        )]
    );
    assert_eq!(cursor(&editor), Point::new(vec![0, 1, 0], 0));
}

#[test]
fn enter_inside_a_list_item_splits_it() {
    let mut editor = editor(
        vec![Node::list(ListType::Ordered, vec![Node::list_item("abcd")])],
        Point::new(vec![0, 0, 0], 2),
    );
    press(&mut editor, KeyInput::enter());
    assert_eq!(
        editor.doc().children,
        vec![Node::list(
            ListType::Ordered,
            vec![Node::list_item("ab"), Node::list_item("cd")],
        )]
    );
    assert_eq!(cursor(&editor), Point::new(vec![0, 1, 0], 0));
}

#[rstest]
#[case(KeyInput::enter())]
#[case(KeyInput::backspace())]
fn empty_sole_list_item_becomes_a_paragraph(#[case] input: KeyInput) {
    let mut editor = editor(
        vec![Node::list(ListType::Unordered, vec![Node::list_item("")])],
        Point::new(vec![0, 0, 0], 0),
    );

    assert_eq!(press(&mut editor, input), KeyOutcome::Handled);

    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(cursor(&editor), Point::new(vec![0, 0], 0));
}

#[test]
fn empty_middle_item_splits_its_list() {
    let mut editor = editor(
        vec![Node::list(
            ListType::Ordered,
            vec![Node::list_item("a"), Node::list_item(""), Node::list_item("c")],
        )],
        Point::new(vec![0, 1, 0], 0),
    );
    press(&mut editor, KeyInput::enter());
    assert_eq!(
        editor.doc().children,
        vec![
            Node::list(ListType::Ordered, vec![Node::list_item("a")]),
            Node::paragraph(""),
            Node::list(ListType::Ordered, vec![Node::list_item("c")]),
        ]
    );
    assert_eq!(cursor(&editor), Point::new(vec![1, 0], 0));
}

#[test]
fn backspace_elsewhere_is_left_to_the_default() {
    let children = vec![Node::list(ListType::Ordered, vec![Node::list_item("a")])];
    let mut editor = editor(children.clone(), Point::new(vec![0, 0, 0], 1));
    assert_eq!(press(&mut editor, KeyInput::backspace()), KeyOutcome::NotHandled);
    assert_eq!(editor.doc().children, children);
}

#[test]
fn shift_enter_inserts_a_line_break() {
    let mut editor = editor(vec![Node::paragraph("ab")], Point::new(vec![0, 0], 1));
    assert_eq!(press(&mut editor, KeyInput::shift_enter()), KeyOutcome::Handled);
    assert_eq!(editor.doc().children, vec![Node::paragraph("a\nb")]);
    assert_eq!(cursor(&editor), Point::new(vec![0, 0], 2));
}

#[test]
fn enter_replaces_selected_text() {
    let mut editor = Editor::new(
        Document::new(vec![Node::paragraph("abcd")]),
        Some(Selection::new(
            Point::new(vec![0, 0], 1),
            Point::new(vec![0, 0], 3),
        )),
        PluginRegistry::richtext(),
    );
    press(&mut editor, KeyInput::enter());
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph("d")]
    );
}

#[test]
fn plain_characters_are_not_handled() {
    let mut editor = editor(vec![Node::paragraph("ab")], Point::new(vec![0, 0], 1));
    assert_eq!(
        press(&mut editor, KeyInput::new(Key::Char('b'))),
        KeyOutcome::NotHandled
    );
    assert_eq!(press(&mut editor, KeyInput::new(Key::Other)), KeyOutcome::NotHandled);
    assert_eq!(editor.pending_marks(), None);
}
