/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end tests through the bundled expression backend.
 */

use pretty_assertions::assert_eq;

use quarto_codetemplate::expr::{
    ExprParser, ExpressionFormatter, Node, ProgramFormatter, StatementsFormatter,
};
use quarto_codetemplate::{BuildOptions, ReplacementMap, Template, TemplateError};

fn expression_template(fragments: &[&str]) -> Template<ExprParser, ExpressionFormatter> {
    Template::compile(
        ExprParser::new(),
        ExpressionFormatter,
        fragments,
        BuildOptions::default(),
    )
    .unwrap()
}

#[test]
fn test_call_expression_round_trip() {
    let template = expression_template(&["foo(", ", ", ")"]);
    assert_eq!(template.slot_names(), &["$0", "$1"]);

    let expr = template
        .instantiate([Node::ident("a"), Node::int(1)])
        .unwrap();
    assert_eq!(
        expr,
        Node::call(Node::ident("foo"), vec![Node::ident("a"), Node::int(1)])
    );
    assert_eq!(expr.to_string(), "foo(a, 1)");
}

#[test]
fn test_repeated_instantiation_is_independent() {
    let template = expression_template(&["foo(", ")"]);

    let first = template.instantiate([Node::ident("x")]).unwrap();
    let second = template.instantiate([Node::ident("x")]).unwrap();
    assert_eq!(first, second);

    // A third call with different values is unaffected by the earlier ones.
    let third = template.instantiate([Node::int(9)]).unwrap();
    assert_eq!(third, Node::call(Node::ident("foo"), vec![Node::int(9)]));
}

#[test]
fn test_literal_slot_name_forces_retry() {
    // The second fragment embeds the first-attempt slot name verbatim, so
    // the builder must escalate to a longer prefix for the real gap.
    let template = expression_template(&["foo(", ", $0)"]);
    assert_eq!(template.slot_names(), &["$$0"]);

    // The literal "$0" is now an ordinary pattern-recognized placeholder,
    // bindable only by named override; the gap binds positionally.
    let overrides: ReplacementMap<Node> = [("$0", Node::ident("b"))].into_iter().collect();
    let expr = template
        .bind([Node::ident("a")])
        .instantiate_with(overrides)
        .unwrap();
    assert_eq!(
        expr,
        Node::call(Node::ident("foo"), vec![Node::ident("a"), Node::ident("b")])
    );
}

#[test]
fn test_overlap_law() {
    let template = expression_template(&["foo(", ", $0)"]);
    assert_eq!(template.slot_names(), &["$$0"]);

    // Overriding the positionally bound "$$0" must fail, not return a tree.
    let overrides: ReplacementMap<Node> = [("$$0", Node::ident("b"))].into_iter().collect();
    let err = template
        .bind([Node::ident("a")])
        .instantiate_with(overrides)
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::ReplacementOverlap { name } if name == "$$0"
    ));
}

#[test]
fn test_disjoint_merge_law() {
    let template = expression_template(&["foo(", ", NAME)"]);

    let overrides: ReplacementMap<Node> = [("NAME", Node::string("n"))].into_iter().collect();
    let expr = template
        .bind([Node::int(1)])
        .instantiate_with(overrides)
        .unwrap();
    assert_eq!(
        expr,
        Node::call(Node::ident("foo"), vec![Node::int(1), Node::string("n")])
    );
}

#[test]
fn test_empty_override_map_is_no_overrides() {
    let template = expression_template(&["foo(", ")"]);
    let expr = template
        .bind([Node::int(1)])
        .instantiate_with(ReplacementMap::new())
        .unwrap();
    assert_eq!(expr, Node::call(Node::ident("foo"), vec![Node::int(1)]));
}

#[test]
fn test_failed_call_leaves_template_usable() {
    let template = expression_template(&["foo(", ")"]);

    let overrides: ReplacementMap<Node> = [("$0", Node::int(2))].into_iter().collect();
    assert!(template
        .bind([Node::int(1)])
        .instantiate_with(overrides)
        .is_err());

    let expr = template.instantiate([Node::int(1)]).unwrap();
    assert_eq!(expr, Node::call(Node::ident("foo"), vec![Node::int(1)]));
}

#[test]
fn test_unknown_override_key_is_rejected() {
    let template = expression_template(&["foo(", ")"]);
    let overrides: ReplacementMap<Node> = [("NOPE", Node::int(2))].into_iter().collect();
    let err = template
        .bind([Node::int(1)])
        .instantiate_with(overrides)
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::UnknownSubstitution { name } if name == "NOPE"
    ));
}

#[test]
fn test_named_only_template_with_syntactic_placeholders() {
    // No interpolation gaps at all: every placeholder is syntactic and
    // bound through named overrides.
    let template = Template::compile(
        ExprParser::new(),
        ExpressionFormatter,
        &["console.log(%%msg%%, %%level%%)"],
        BuildOptions::default(),
    )
    .unwrap();
    assert!(template.slot_names().is_empty());

    let overrides: ReplacementMap<Node> = [
        ("msg", Node::string("ready")),
        ("level", Node::int(2)),
    ]
    .into_iter()
    .collect();
    let expr = template.bind([]).instantiate_with(overrides).unwrap();
    assert_eq!(
        expr.to_string(),
        "console.log(\"ready\", 2)"
    );
}

#[test]
fn test_statements_template_drops_unbound_placeholder() {
    let template = Template::compile(
        ExprParser::new(),
        StatementsFormatter,
        &["IMPORTS; main(", ")"],
        BuildOptions::default(),
    )
    .unwrap();

    // IMPORTS gets no value: the statement disappears.
    let statements = template.instantiate([Node::int(1)]).unwrap();
    assert_eq!(
        statements,
        vec![Node::call(Node::ident("main"), vec![Node::int(1)])]
    );
}

#[test]
fn test_statements_template_splices_program_value() {
    let template = Template::compile(
        ExprParser::new(),
        StatementsFormatter,
        &["IMPORTS; main(", ")"],
        BuildOptions::default(),
    )
    .unwrap();

    let imports = Node::program(vec![
        Node::call(Node::ident("use_a"), vec![]),
        Node::call(Node::ident("use_b"), vec![]),
    ]);
    let overrides: ReplacementMap<Node> = [("IMPORTS", imports)].into_iter().collect();
    let statements = template
        .bind([Node::int(1)])
        .instantiate_with(overrides)
        .unwrap();
    assert_eq!(statements.len(), 3);
    assert_eq!(
        statements[2],
        Node::call(Node::ident("main"), vec![Node::int(1)])
    );
}

#[test]
fn test_program_template_preserves_comments_on_request() {
    let template = Template::compile(
        ExprParser::new(),
        ProgramFormatter,
        &["// generated file\nrun(", ")"],
        BuildOptions::default().with_preserved_comments(true),
    )
    .unwrap();

    let program = template.instantiate([Node::int(1)]).unwrap();
    assert_eq!(
        program,
        Node::program(vec![
            Node::Comment(" generated file".to_string()),
            Node::call(Node::ident("run"), vec![Node::int(1)]),
        ])
    );
}

#[test]
fn test_unparsable_template_fails_at_compile_time() {
    let result = Template::compile(
        ExprParser::new(),
        ExpressionFormatter,
        &["foo((", ")"],
        BuildOptions::default(),
    );
    assert!(matches!(result, Err(TemplateError::Parse { .. })));
}

#[test]
fn test_expression_formatter_rejects_multiple_statements() {
    let result = Template::compile(
        ExprParser::new(),
        StatementsFormatter,
        &["a(); b(", ")"],
        BuildOptions::default(),
    )
    .unwrap()
    .instantiate([Node::int(1)])
    .unwrap();
    assert_eq!(result.len(), 2);

    // The same source through the expression formatter cannot even
    // compile: the wrapping parenthesis makes the two statements
    // unparsable as one expression.
    let err = Template::compile(
        ExprParser::new(),
        ExpressionFormatter,
        &["a(); b(", ")"],
        BuildOptions::default(),
    );
    assert!(matches!(err, Err(TemplateError::Parse { .. })));
}

#[test]
fn test_json_values_splice_as_literals() {
    let config = serde_json::json!({"retries": 3, "labels": ["a", "b"]});

    let template = expression_template(&["configure(", ", ", ")"]);
    let expr = template
        .instantiate([
            Node::try_from(&config["retries"]).unwrap(),
            Node::try_from(&config["labels"]).unwrap(),
        ])
        .unwrap();
    assert_eq!(expr.to_string(), "configure(3, [\"a\", \"b\"])");
}

#[test]
fn test_extra_whitelisted_names_survive_across_calls() {
    let template = Template::compile(
        ExprParser::new(),
        ExpressionFormatter,
        &["wrap(", ", handler)"],
        BuildOptions::default().with_whitelisted("handler"),
    )
    .unwrap();

    for i in 0..3 {
        let overrides: ReplacementMap<Node> =
            [("handler", Node::ident(format!("handler_{i}")))].into_iter().collect();
        let expr = template
            .bind([Node::int(i)])
            .instantiate_with(overrides)
            .unwrap();
        assert_eq!(expr.to_string(), format!("wrap({i}, handler_{i})"));
    }
}
