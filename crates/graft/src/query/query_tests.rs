use indoc::indoc;

use crate::error::{PredicateError, QueryError};
use crate::testing::{javascript, parse};
use crate::{Query, QueryCapture, QueryMatch, QueryOptions};

use super::assemble::{Decoded, decode};
use crate::native::RawEntry;
use crate::point::Point;

fn query(source: &str) -> Query {
    Query::new(&javascript(), source).expect("query compiles")
}

fn format_matches(matches: &[QueryMatch]) -> Vec<(usize, Vec<(String, String)>)> {
    matches
        .iter()
        .map(|m| {
            let captures = m
                .captures
                .iter()
                .map(|c| (c.name.clone(), c.node.text()))
                .collect();
            (m.pattern_index, captures)
        })
        .collect()
}

fn format_captures(captures: &[QueryCapture]) -> Vec<(String, String)> {
    captures
        .iter()
        .map(|c| (c.name.clone(), c.node.text()))
        .collect()
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(name, text)| ((*name).to_owned(), (*text).to_owned()))
        .collect()
}

// -- decoding ---------------------------------------------------------------

#[test]
fn decode_groups_captures_under_their_pattern() {
    let entries = [
        RawEntry::Pattern(0),
        RawEntry::Name(0),
        RawEntry::Name(1),
        RawEntry::Pattern(1),
        RawEntry::Name(0),
    ];
    let decoded = decode(&entries, vec![10, 11, 12]);
    assert_eq!(
        decoded,
        vec![
            Decoded {
                pattern_index: 0,
                yield_index: None,
                captures: vec![(0, 10), (1, 11)],
            },
            Decoded {
                pattern_index: 1,
                yield_index: None,
                captures: vec![(0, 12)],
            },
        ]
    );
}

#[test]
fn decode_reads_yield_indices() {
    let entries = [
        RawEntry::Pattern(2),
        RawEntry::Index(1),
        RawEntry::Name(4),
        RawEntry::Name(5),
    ];
    let decoded = decode(&entries, vec!["a", "b"]);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].yield_index, Some(1));
    assert_eq!(decoded[0].captures, vec![(4, "a"), (5, "b")]);
}

#[test]
fn decode_handles_captureless_matches() {
    let entries = [RawEntry::Pattern(0), RawEntry::Pattern(3)];
    let decoded = decode::<u8>(&entries, vec![]);
    assert_eq!(decoded.len(), 2);
    assert!(decoded[0].captures.is_empty());
    assert_eq!(decoded[1].pattern_index, 3);
}

// -- construction errors ----------------------------------------------------

#[test]
fn structural_errors_come_from_the_engine() {
    let err = Query::new(&javascript(), "(clas)").unwrap_err();
    assert!(matches!(err, QueryError::Pattern { .. }));

    let err = Query::new(&javascript(), "(if_statement").unwrap_err();
    assert!(matches!(err, QueryError::Pattern { .. }));
}

#[test]
fn missing_eq_argument_fails_construction() {
    let err = Query::new(&javascript(), "((identifier) @a (#eq? @a))").unwrap_err();
    let QueryError::Predicate(PredicateError::Arity {
        operator: "eq?",
        expected: "2",
        got: 1,
    }) = err
    else {
        panic!("expected an arity error, got: {err}");
    };
}

#[test]
fn unknown_operator_fails_construction() {
    let err = Query::new(&javascript(), "((identifier) @a (#nonsense? @a))").unwrap_err();
    assert!(
        err.to_string().contains("unknown query predicate `#nonsense?`"),
        "unexpected message: {err}"
    );
}

#[test]
fn invalid_regex_fails_construction() {
    let err = Query::new(&javascript(), r#"((identifier) @a (#match? @a "(oops"))"#).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Predicate(PredicateError::Regex { .. })
    ));
}

// -- matches ----------------------------------------------------------------

#[test]
fn matches_come_back_in_source_order() {
    let tree = parse("function one() { two(); function three() {} }");
    let query = query(indoc! {r#"
        (function_declaration name: (identifier) @fn-def)
        (call_expression function: (identifier) @fn-ref)
    "#});

    let matches = query.matches(&tree.root_node(), &QueryOptions::new());
    assert_eq!(
        format_matches(&matches),
        vec![
            (0, pairs(&[("fn-def", "one")])),
            (1, pairs(&[("fn-ref", "two")])),
            (0, pairs(&[("fn-def", "three")])),
        ]
    );
}

#[test]
fn point_range_restricts_the_search_window() {
    let tree = parse("[a, b,\nc, d,\ne, f,\ng, h]");
    let query = query("(identifier) @element");

    let options = QueryOptions::new().point_range(Point::new(1, 1)..Point::new(3, 1));
    let matches = query.matches(&tree.root_node(), &options);
    assert_eq!(
        format_matches(&matches),
        vec![
            (0, pairs(&[("element", "d")])),
            (0, pairs(&[("element", "e")])),
            (0, pairs(&[("element", "f")])),
            (0, pairs(&[("element", "g")])),
        ]
    );
}

#[test]
fn byte_range_restricts_the_search_window() {
    let tree = parse("[a, b, c, d]");
    let query = query("(identifier) @element");

    let options = QueryOptions::new().byte_range(4..8);
    let matches = query.matches(&tree.root_node(), &options);
    assert_eq!(
        format_matches(&matches),
        vec![
            (0, pairs(&[("element", "b")])),
            (0, pairs(&[("element", "c")])),
        ]
    );
}

#[test]
fn cross_capture_equality_keeps_only_agreeing_matches() {
    let tree = parse(indoc! {"
        ab = abc + 1;
        def = de + 1;
        ghi = ghi + 1;
    "});
    let query = query(indoc! {r#"
        (
          (assignment_expression
            left: (identifier) @id1
            right: (binary_expression
              left: (identifier) @id2))
          (#eq? @id1 @id2)
        )
    "#});

    let matches = query.matches(&tree.root_node(), &QueryOptions::new());
    assert_eq!(
        format_matches(&matches),
        vec![(0, pairs(&[("id1", "ghi"), ("id2", "ghi")]))]
    );
}

#[test]
fn max_start_depth_restricts_pattern_roots() {
    let tree = parse("function a() { function b() {} }");
    let query = query("(function_declaration) @f");

    let unrestricted = query.matches(&tree.root_node(), &QueryOptions::new());
    assert_eq!(unrestricted.len(), 2);

    let rooted = query.matches(&tree.root_node(), &QueryOptions::new().max_start_depth(0));
    assert!(rooted.is_empty());
}

#[test]
fn expired_timeout_yields_partial_results() {
    let tree = parse(&"function f() { g(); } ".repeat(200));
    let query = query("(call_expression) @call");

    let full = query.matches(&tree.root_node(), &QueryOptions::new());
    assert_eq!(full.len(), 200);

    // A zero budget expires before the first match is recorded; the run
    // still returns normally with what was produced.
    let expired = query.matches(&tree.root_node(), &QueryOptions::new().timeout_micros(0));
    assert!(expired.is_empty());
}

#[test]
fn match_limit_overrun_sets_the_flag_and_keeps_a_subset() {
    let source = format!("[{}];", "hello, ".repeat(50));
    let tree = parse(&source);
    let query = query("(array (identifier) @pre (identifier) @post)");

    let full = query.matches(&tree.root_node(), &QueryOptions::new());
    assert!(!query.did_exceed_match_limit());

    let limited = query.matches(&tree.root_node(), &QueryOptions::new().match_limit(32));
    assert!(query.did_exceed_match_limit());
    assert!(!limited.is_empty());
    assert!(limited.len() < full.len());

    assert_eq!(
        format_matches(&limited)[0],
        (0, pairs(&[("pre", "hello"), ("post", "hello")]))
    );
}

// -- captures ---------------------------------------------------------------

#[test]
fn captures_come_back_in_capture_order() {
    let tree = parse(indoc! {"
        a({
          bc: function de() {
            const fg = function hi() {}
          },
          jk: function lm() {
            const no = function pq() {}
          },
        });
    "});
    let query = query(indoc! {r#"
        (pair
          key: _ @method.def
          (function_expression
            name: (identifier) @method.alias))
        (variable_declarator
          name: _ @function.def
          value: (function_expression
            name: (identifier) @function.alias))
        ":" @delimiter
        "=" @operator
    "#});

    let captures = query.captures(&tree.root_node(), &QueryOptions::new());
    assert_eq!(
        format_captures(&captures),
        pairs(&[
            ("method.def", "bc"),
            ("delimiter", ":"),
            ("method.alias", "de"),
            ("function.def", "fg"),
            ("operator", "="),
            ("function.alias", "hi"),
            ("method.def", "jk"),
            ("delimiter", ":"),
            ("method.alias", "lm"),
            ("function.def", "no"),
            ("operator", "="),
            ("function.alias", "pq"),
        ])
    );
}

#[test]
fn capture_text_conditions_filter_per_match() {
    let tree = parse(indoc! {"
        const ab = require('./ab');
        new Cd(EF);
    "});
    let query = query(indoc! {r#"
        (identifier) @variable
        ((identifier) @function.builtin
         (#eq? @function.builtin "require"))
        ((identifier) @constructor
         (#match? @constructor "^[A-Z]"))
        ((identifier) @constant
         (#match? @constant "^[A-Z]{2,}$"))
    "#});

    let captures = query.captures(&tree.root_node(), &QueryOptions::new());
    assert_eq!(
        format_captures(&captures),
        pairs(&[
            ("variable", "ab"),
            ("variable", "require"),
            ("function.builtin", "require"),
            ("variable", "Cd"),
            ("constructor", "Cd"),
            ("variable", "EF"),
            ("constructor", "EF"),
            ("constant", "EF"),
        ])
    );
}

#[test]
fn quantified_captures_follow_the_quantifier_matrix() {
    let tree = parse("/// foo\n/// bar\n/// baz\n");

    let expect_count = |predicate: &str, expected: usize| {
        let query = query(&format!("((comment)+ @foo ({predicate}))"));
        let captures = query.captures(&tree.root_node(), &QueryOptions::new());
        assert_eq!(captures.len(), expected, "predicate: {predicate}");
    };

    expect_count(r##"#any-eq? @foo "/// foo""##, 3);
    expect_count(r##"#eq? @foo "/// foo""##, 0);
    expect_count(r##"#any-not-eq? @foo "/// foo""##, 3);
    expect_count(r##"#not-eq? @foo "/// foo""##, 0);
    expect_count(r##"#match? @foo "^/// foo""##, 0);
    expect_count(r##"#any-match? @foo "^/// foo""##, 3);
    expect_count(r##"#not-match? @foo "^/// foo""##, 0);
    expect_count(r##"#not-match? @foo "nowhere""##, 3);
    expect_count(r##"#any-not-match? @foo "^///""##, 0);
    expect_count(r##"#any-not-match? @foo "^/// foo""##, 3);
}

#[test]
fn property_predicates_annotate_without_filtering() {
    let tree = parse("a(b.c);");
    let query = query(indoc! {r#"
        ((call_expression (identifier) @func)
         (#set! foo)
         (#set! bar baz))
        ((property_identifier) @prop
         (#is? foo)
         (#is-not? bar baz))
    "#});

    let captures = query.captures(&tree.root_node(), &QueryOptions::new());
    assert_eq!(
        format_captures(&captures),
        pairs(&[("func", "a"), ("prop", "c")])
    );

    let func = &captures[0];
    let set = func.set_properties.as_ref().unwrap();
    assert_eq!(set.get("foo"), Some(&None));
    assert_eq!(set.get("bar"), Some(&Some("baz".to_owned())));
    assert!(func.asserted_properties.is_none());

    let prop = &captures[1];
    let asserted = prop.asserted_properties.as_ref().unwrap();
    assert_eq!(asserted.get("foo"), Some(&None));
    let refuted = prop.refuted_properties.as_ref().unwrap();
    assert_eq!(refuted.get("bar"), Some(&Some("baz".to_owned())));
    assert!(prop.set_properties.is_none());

    // The same maps ride along on matches for those patterns.
    let matches = query.matches(&tree.root_node(), &QueryOptions::new());
    assert_eq!(matches.len(), 2);
    assert!(matches[0].set_properties.is_some());
    assert!(matches[1].refuted_properties.is_some());
}

// -- query management -------------------------------------------------------

#[test]
fn disabled_patterns_stop_matching() {
    let tree = parse("function foo() { return 1; } class Bar { }");
    let mut query = query(indoc! {"
        (function_declaration name: (identifier) @name)
        (class_declaration name: (identifier) @name)
    "});

    assert_eq!(query.matches(&tree.root_node(), &QueryOptions::new()).len(), 2);

    query.disable_pattern(0);
    let matches = query.matches(&tree.root_node(), &QueryOptions::new());
    assert_eq!(format_matches(&matches), vec![(1, pairs(&[("name", "Bar")]))]);
}

#[test]
fn disabled_captures_disappear_from_results() {
    let tree = parse("function foo() { return 1; }");
    let mut query = query(indoc! {"
        (function_declaration
          name: (identifier) @name
          body: (statement_block) @body)
    "});

    query.disable_capture("body");
    let matches = query.matches(&tree.root_node(), &QueryOptions::new());
    assert_eq!(format_matches(&matches), vec![(0, pairs(&[("name", "foo")]))]);
}

#[test]
fn capture_names_and_pattern_count_describe_the_query() {
    let query = query(indoc! {"
        (function_declaration name: (identifier) @fn-def)
        (call_expression function: (identifier) @fn-ref)
    "});
    assert_eq!(query.pattern_count(), 2);
    assert_eq!(
        query.capture_names().to_vec(),
        vec!["fn-def".to_owned(), "fn-ref".to_owned()]
    );
}

#[test]
fn predicate_association_survives_pattern_reindexing() {
    // Three patterns, predicates only on the outer two; the middle pattern
    // must not inherit either predicate.
    let tree = parse("one; two; three;");
    let query = query(indoc! {r#"
        ((expression_statement (identifier) @a) (#eq? @a "one"))
        (expression_statement (identifier) @b)
        ((expression_statement (identifier) @c) (#eq? @c "three"))
    "#});

    let matches = query.matches(&tree.root_node(), &QueryOptions::new());
    assert_eq!(
        format_matches(&matches),
        vec![
            (0, pairs(&[("a", "one")])),
            (1, pairs(&[("b", "one")])),
            (1, pairs(&[("b", "two")])),
            (1, pairs(&[("b", "three")])),
            (2, pairs(&[("c", "three")])),
        ]
    );
}

#[test]
#[should_panic(expected = "query language does not match")]
fn foreign_language_nodes_are_rejected() {
    let other = crate::Language::new(
        tree_sitter_javascript::LANGUAGE,
        tree_sitter_javascript::NODE_TYPES,
    )
    .unwrap();
    let tree = parse("1;");
    let query = Query::new(&other, "(identifier) @x").unwrap();
    query.matches(&tree.root_node(), &QueryOptions::new());
}
