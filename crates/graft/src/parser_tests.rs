use std::sync::Arc;

use crate::testing::javascript;
use crate::{Parser, TextBuffer};

struct StringBuffer(String);

impl TextBuffer for StringBuffer {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn chunk_at(&self, offset: usize) -> Option<String> {
        if offset >= self.0.len() {
            return None;
        }
        let end = (offset + 16).min(self.0.len());
        Some(self.0[offset..end].to_owned())
    }
}

fn js_parser() -> Parser {
    let mut parser = Parser::new();
    parser.set_language(&javascript()).unwrap();
    parser
}

#[test]
#[should_panic(expected = "no language")]
fn parsing_without_a_language_panics() {
    Parser::new().parse("1;", None);
}

#[test]
fn parse_produces_a_tree_bound_to_the_language() {
    let mut parser = js_parser();
    let tree = parser.parse("let x = 1;", None).unwrap();
    assert!(tree.language().same(&javascript()));
    assert_eq!(tree.root_node().kind(), "program");
    assert!(parser.language().is_some());
}

#[test]
fn chunk_callback_parse_matches_string_parse() {
    let source = "function one() { two(); }";
    let mut parser = js_parser();

    let from_string = parser.parse(source, None).unwrap();
    let from_chunks = parser
        .parse_with(
            move |offset| {
                (offset < source.len()).then(|| {
                    let end = (offset + 5).min(source.len());
                    source[offset..end].to_owned()
                })
            },
            None,
        )
        .unwrap();

    assert_eq!(
        from_string.root_node().to_sexp(),
        from_chunks.root_node().to_sexp()
    );
}

#[test]
fn buffer_parse_matches_string_parse() {
    let source = "const x = [1, 2, 3];";
    let mut parser = js_parser();

    let from_string = parser.parse(source, None).unwrap();
    let from_buffer = parser
        .parse_buffer(Arc::new(StringBuffer(source.to_owned())), None)
        .unwrap();

    assert_eq!(
        from_string.root_node().to_sexp(),
        from_buffer.root_node().to_sexp()
    );
}

#[test]
fn timeout_aborts_and_reset_recovers() {
    let mut parser = js_parser();

    // A budget this small cannot cover a megabyte of input.
    let huge = format!("[{}];", "0, ".repeat(400_000));
    parser.set_timeout_micros(1);
    assert_eq!(parser.timeout_micros(), 1);
    assert!(parser.parse(huge, None).is_none());

    // Discard the checkpoint, lift the budget, parse something else.
    parser.reset();
    parser.set_timeout_micros(0);
    assert!(parser.parse("1;", None).is_some());
}

#[tokio::test]
async fn async_buffer_parse_resolves_with_the_tree() {
    let source = format!("const xs = [{}];", "1, ".repeat(20_000));
    let mut parser = js_parser();

    let tree = parser
        .parse_buffer_async(Arc::new(StringBuffer(source.clone())), None)
        .await
        .unwrap();

    assert_eq!(tree.root_node().kind(), "program");
    assert!(!tree.root_node().has_error());

    // The parser is reusable afterwards with its previous timeout intact.
    assert_eq!(parser.timeout_micros(), 0);
    assert!(parser.parse("1;", None).is_some());
}

#[tokio::test]
async fn async_parse_completes_synchronously_for_small_inputs() {
    let mut parser = js_parser();
    let tree = parser
        .parse_buffer_async(Arc::new(StringBuffer("1;".to_owned())), None)
        .await
        .unwrap();
    assert_eq!(tree.text_in_range(0..1), "1");
}
