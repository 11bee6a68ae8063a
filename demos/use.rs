use balanced_tree::BalancedTree;

fn main() {
    let mut tree = BalancedTree::new();
    tree.insert(0, "zero");
    tree.insert(1, "one");
    tree.insert(2, "two");
    assert!(!tree.insert(2, "deux"));
    tree.insert(3, "three");
    tree.insert(4, "four");
    tree.insert(5, "five");
    assert_eq!(tree.find(&1), Ok(&"one"));
    tree.remove(&1);
    assert!(tree.find(&1).is_err());

    for (k, v) in &tree {
        println!("{k} => {v}");
    }

    println!("height {}, {} entries:", tree.height(), tree.count());
    print!("{}", tree.render());
}
