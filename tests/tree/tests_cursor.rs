use crate::helpers::grammars::CALC;

#[test]
fn test_cursor_walk() {
    let tree = CALC.parse("1+2; x;");
    let mut cursor = tree.walk();
    assert_eq!(cursor.node().kind(), "program");
    assert!(!cursor.goto_next_sibling());
    assert!(!cursor.goto_parent());

    assert!(cursor.goto_first_child());
    assert_eq!(cursor.node().kind(), "statement");
    assert_eq!(cursor.node().text(), "1+2;");
    assert!(cursor.goto_first_child());
    assert_eq!(cursor.node().kind(), "expression");
    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind(), ";");
    assert!(!cursor.node().is_named());
    assert!(!cursor.goto_next_sibling());
    assert_eq!(cursor.depth(), 2);

    assert!(cursor.goto_parent());
    assert!(cursor.goto_next_sibling());
    assert_eq!(cursor.node().text(), "x;");
    assert!(cursor.goto_parent());
    assert_eq!(cursor.node().kind(), "program");
    assert_eq!(cursor.depth(), 0);
}

#[test]
fn test_cursor_goto_byte() {
    let tree = CALC.parse("1; 22; 333;");
    let mut cursor = tree.walk();
    assert_eq!(cursor.goto_first_child_for_byte(4), Some(1));
    assert_eq!(cursor.node().text(), "22;");
    assert!(cursor.goto_parent());
    assert_eq!(cursor.goto_first_child_for_byte(100), None);
}

#[test]
fn test_preorder_visits_in_source_order() {
    let tree = CALC.parse("a + b; c;");
    let leaves: Vec<&str> = tree
        .preorder()
        .filter(|node| node.child_count() == 0)
        .map(|node| node.text())
        .collect();
    assert_eq!(leaves, ["a", "+", "b", ";", "c", ";"]);
}
