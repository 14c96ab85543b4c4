use std::cell::RefCell;
use std::rc::Rc;

use ilox::environment::Environment;
use ilox::value::Value;

fn frame() -> Rc<RefCell<Environment>> {
    Rc::new(RefCell::new(Environment::new()))
}

fn child_of(parent: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
    Rc::new(RefCell::new(Environment::with_enclosing(parent.clone())))
}

#[test]
fn test_get_at_walks_exactly_depth_parents() {
    let root = frame();
    root.borrow_mut()
        .define("a", Value::Number(1), 1)
        .unwrap();

    let mid = child_of(&root);
    let leaf = child_of(&mid);

    assert_eq!(
        Environment::get_at(&leaf, 2, "a", 1).unwrap(),
        Value::Number(1)
    );

    // Depth addressing is exact: there is no fallback chain walk.
    assert!(Environment::get_at(&leaf, 0, "a", 1).is_err());
    assert!(Environment::get_at(&leaf, 1, "a", 1).is_err());
}

#[test]
fn test_get_at_past_the_root_is_an_error() {
    let root = frame();
    root.borrow_mut()
        .define("a", Value::Number(1), 1)
        .unwrap();

    let err = Environment::get_at(&root, 3, "a", 1).unwrap_err();
    assert!(err.to_string().contains("Undefined variable"));
}

#[test]
fn test_define_rejects_redefinition_in_the_same_frame() {
    let root = frame();
    root.borrow_mut().define("x", Value::Nil, 1).unwrap();

    let err = root
        .borrow_mut()
        .define("x", Value::Number(2), 2)
        .unwrap_err();
    assert!(err.to_string().contains("Variable already defined"));
}

#[test]
fn test_shadowing_in_a_child_frame_is_fine() {
    let root = frame();
    root.borrow_mut()
        .define("x", Value::Number(1), 1)
        .unwrap();

    let leaf = child_of(&root);
    leaf.borrow_mut()
        .define("x", Value::Number(2), 2)
        .unwrap();

    assert_eq!(
        Environment::get_at(&leaf, 0, "x", 2).unwrap(),
        Value::Number(2)
    );
    assert_eq!(
        Environment::get_at(&leaf, 1, "x", 2).unwrap(),
        Value::Number(1)
    );
}

#[test]
fn test_assign_at_mutates_the_addressed_frame() {
    let root = frame();
    root.borrow_mut()
        .define("a", Value::Number(1), 1)
        .unwrap();

    let leaf = child_of(&root);

    Environment::assign_at(&leaf, 1, "a", Value::Number(5), 2).unwrap();
    assert_eq!(
        Environment::get_at(&root, 0, "a", 2).unwrap(),
        Value::Number(5)
    );
}

#[test]
fn test_assign_at_requires_an_existing_binding() {
    let root = frame();

    let err = Environment::assign_at(&root, 0, "ghost", Value::Nil, 1).unwrap_err();
    assert!(err.to_string().contains("Undefined variable"));
}
