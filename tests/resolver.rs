use ilox::error::LoxError;
use ilox::parser::{Binding, Expr, Parser, Stmt};
use ilox::resolver::Resolver;
use ilox::scanner::Scanner;
use ilox::token::Token;

fn parse(source: &str) -> Vec<Stmt> {
    let tokens: Vec<Token> = Scanner::new(source.as_bytes())
        .collect::<Result<_, _>>()
        .expect("scan should succeed");
    Parser::new(&tokens).parse().expect("parse should succeed")
}

/// Resolves `source` and hands back the annotated statements on success, or
/// the aggregated diagnostics on failure.
fn resolve(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
    let statements = parse(source);
    Resolver::new().resolve(&statements)?;
    Ok(statements)
}

fn first_message(errors: &[LoxError]) -> String {
    errors.first().expect("expected at least one error").to_string()
}

/// The binding recorded on a variable *read* appearing somewhere inside
/// `stmt` with the given name.
fn variable_binding(stmt: &Stmt, name: &str) -> Option<Binding> {
    fn from_expr(expr: &Expr, name: &str) -> Option<Binding> {
        match expr {
            Expr::Variable { name: n, binding } if n.lexeme == name => Some(binding.get()),
            Expr::Variable { .. } | Expr::Literal(_) => None,
            Expr::Grouping(inner) => from_expr(inner, name),
            Expr::Unary { right, .. } => from_expr(right, name),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                from_expr(left, name).or_else(|| from_expr(right, name))
            }
            Expr::Assign { value, .. } => from_expr(value, name),
            Expr::Call {
                callee, arguments, ..
            } => from_expr(callee, name)
                .or_else(|| arguments.iter().find_map(|a| from_expr(a, name))),
        }
    }

    fn from_stmt(stmt: &Stmt, name: &str) -> Option<Binding> {
        match stmt {
            Stmt::Expression(e) | Stmt::Print(e) => from_expr(e, name),
            Stmt::Var { initializer, .. } => {
                initializer.as_ref().and_then(|e| from_expr(e, name))
            }
            Stmt::Block(stmts) => stmts.iter().find_map(|s| from_stmt(s, name)),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => from_expr(condition, name)
                .or_else(|| from_stmt(then_branch, name))
                .or_else(|| else_branch.as_deref().and_then(|s| from_stmt(s, name))),
            Stmt::While { condition, body } => {
                from_expr(condition, name).or_else(|| from_stmt(body, name))
            }
            Stmt::Function(decl) => decl.body.iter().find_map(|s| from_stmt(s, name)),
            Stmt::Return { value, .. } => value.as_ref().and_then(|e| from_expr(e, name)),
            Stmt::Class { methods, .. } => methods
                .iter()
                .find_map(|m| m.body.iter().find_map(|s| from_stmt(s, name))),
        }
    }

    from_stmt(stmt, name)
}

#[test]
fn test_self_initializer_in_block_is_an_error() {
    let errors = resolve("{ var x = x; }").expect_err("should fail");
    assert!(first_message(&errors).contains("own initializer"));
}

#[test]
fn test_self_initializer_at_top_level_is_an_error() {
    let errors = resolve("var x = x;").expect_err("should fail");
    assert!(first_message(&errors).contains("own initializer"));
}

#[test]
fn test_redeclaration_in_same_scope_is_an_error() {
    let errors = resolve("{ var x; var x; }").expect_err("should fail");
    assert!(first_message(&errors).contains("already declared"));
}

#[test]
fn test_shadowing_across_scopes_is_legal() {
    assert!(resolve("{ var x; { var x; } }").is_ok());
}

#[test]
fn test_parameter_shadowed_by_local_is_an_error() {
    let errors = resolve("fun f(a) { var a = 1; }").expect_err("should fail");
    assert!(first_message(&errors).contains("already declared"));
}

#[test]
fn test_return_at_top_level_is_an_error() {
    let errors = resolve("return 1;").expect_err("should fail");
    assert!(first_message(&errors).contains("'return' used outside of function"));
}

#[test]
fn test_return_inside_function_is_legal() {
    assert!(resolve("fun f() { return 1; }").is_ok());
    assert!(resolve("fun f() { return; }").is_ok());
}

#[test]
fn test_all_errors_reported_in_one_pass() {
    let errors = resolve("return 1; { var x; var x; }").expect_err("should fail");
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_depth_counts_scope_boundaries_between_use_and_declaration() {
    let statements = resolve(
        "var g = 1;\n\
         {\n\
           var a = 2;\n\
           {\n\
             print a;\n\
             print g;\n\
           }\n\
         }",
    )
    .expect("should resolve");

    let block = &statements[1];

    // `a` is declared one block out from its use; `g` is a global.
    assert_eq!(
        variable_binding(block, "a"),
        Some(Binding::Local { depth: 1, slot: 0 })
    );
    assert_eq!(variable_binding(block, "g"), Some(Binding::Global));
}

#[test]
fn test_shadowing_binds_to_the_innermost_declaration() {
    let statements = resolve(
        "{\n\
           var x = 1;\n\
           {\n\
             var x = 2;\n\
             print x;\n\
           }\n\
         }",
    )
    .expect("should resolve");

    assert_eq!(
        variable_binding(&statements[0], "x"),
        Some(Binding::Local { depth: 0, slot: 0 })
    );
}

#[test]
fn test_function_resolves_its_own_name_in_the_enclosing_scope() {
    // A function declared inside a block can recurse: its name lives in the
    // block's scope, one hop out from the body.
    let statements = resolve("{ fun f() { f(); } }").expect("should resolve");

    assert_eq!(
        variable_binding(&statements[0], "f"),
        Some(Binding::Local { depth: 1, slot: 0 })
    );
}

#[test]
fn test_top_level_function_resolves_as_global() {
    let statements = resolve("fun f() { f(); }").expect("should resolve");

    assert_eq!(variable_binding(&statements[0], "f"), Some(Binding::Global));
}

#[test]
fn test_class_declaration_resolves() {
    // Methods are validated like functions (so `return` inside one is fine)
    // even though the evaluator never dispatches to them.
    assert!(resolve("class Foo { bar() { return 1; } }").is_ok());
}

#[test]
fn test_class_redeclaration_is_an_error() {
    let errors = resolve("{ class Foo {} class Foo {} }").expect_err("should fail");
    assert!(first_message(&errors).contains("already declared"));
}
