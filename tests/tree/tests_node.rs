use sylva::Point;

use crate::helpers::grammars::{CALC, SLANG};

#[test]
fn test_node_positions() {
    let tree = CALC.parse("1;\n  22;\n");
    let second = tree.root_node().child(1).unwrap();
    assert_eq!(second.byte_range(), 5..8);
    assert_eq!(second.start_point(), Point::new(1, 2));
    assert_eq!(second.end_point(), Point::new(1, 5));
    assert_eq!(tree.point(tree.len()), Point::new(2, 0));
}

#[test]
fn test_parent_links() {
    let tree = CALC.parse("(1);");
    let number = tree.preorder().find(|n| n.kind() == "NUMBER").unwrap();
    let chain: Vec<&str> = std::iter::successors(Some(number), |node| node.parent())
        .map(|node| node.kind())
        .collect();
    assert_eq!(
        chain,
        ["NUMBER", "expression", "expression", "statement", "program"]
    );
}

#[test]
fn test_hidden_rules_are_flattened() {
    let tree = SLANG.parse("int f(int a, int b) { }");
    let parameters = tree.preorder().find(|n| n.kind() == "parameters").unwrap();
    let kinds: Vec<&str> = parameters.children().iter().map(|n| n.kind()).collect();
    assert_eq!(kinds, ["parameter", ",", "parameter"]);
    assert_eq!(parameters.named_children().len(), 2);
}

#[test]
fn test_nodes_compare_by_position_and_subtree() {
    let tree = CALC.parse("1; 1;");
    let statements = tree.root_node().named_children();
    assert_ne!(statements[0], statements[1]);
    assert_eq!(statements[0], tree.root_node().child(0).unwrap());
}
