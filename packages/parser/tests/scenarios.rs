use smartscript_parser::{parse, Document, Element, ForLoop, LexError, Node, ParseError};

fn for_loop(document: &Document, index: usize) -> &ForLoop {
    match document.child(index) {
        Some(Node::ForLoop(for_loop)) => for_loop,
        other => panic!("expected a FOR node at {index}, got {other:?}"),
    }
}

#[test]
fn plain_text_document() {
    let document = parse("Hi.").unwrap();
    assert_eq!(document.number_of_children(), 1);
    assert_eq!(document.child(0), Some(&Node::Text("Hi.".to_string())));
}

#[test]
fn single_echo_tag() {
    let document = parse("{$= 1 $}").unwrap();
    assert_eq!(
        document.children(),
        &[Node::Echo(vec![Element::ConstantInteger(1)])]
    );
}

#[test]
fn for_loop_with_body() {
    let document = parse("{$FOR i 1 10 1$}body{$END$}").unwrap();
    assert_eq!(document.number_of_children(), 1);

    let for_loop = for_loop(&document, 0);
    assert_eq!(for_loop.variable(), "i");
    assert_eq!(for_loop.start(), &Element::ConstantInteger(1));
    assert_eq!(for_loop.end(), &Element::ConstantInteger(10));
    assert_eq!(for_loop.step(), Some(&Element::ConstantInteger(1)));
    assert_eq!(for_loop.children(), &[Node::Text("body".to_string())]);
}

#[test]
fn end_without_for() {
    let err = parse("{$END$}").unwrap_err();
    assert!(matches!(err, ParseError::UnmatchedEnd { .. }));
    assert!(err.to_string().contains("unmatched END tag"));
}

#[test]
fn for_with_a_single_expression() {
    let err = parse("{$FOR i 1$}...{$END$}").unwrap_err();
    assert!(matches!(err, ParseError::TooFewForExpressions { .. }));
    assert!(err.to_string().contains("too few expressions in FOR tag"));
}

#[test]
fn invalid_escape_in_string_literal() {
    let err = parse(r#"Text {$= "bad \q escape" $}"#).unwrap_err();
    assert!(matches!(
        err,
        ParseError::Lex(LexError::InvalidEscape { sequence: 'q', .. })
    ));
    assert!(err.to_string().contains("invalid escape sequence"));
}

#[test]
fn escaped_tag_open_is_text() {
    let document = parse(r"a \{$= x $} b").unwrap();
    assert_eq!(document.children(), &[Node::Text("a {$= x $} b".to_string())]);
    assert_eq!(document.to_text(), r"a \{$= x $} b");
}

#[test]
fn escaped_backslash_before_tag() {
    let document = parse(r"\\{$= x $}").unwrap();
    assert_eq!(document.number_of_children(), 2);
    assert_eq!(document.child(0), Some(&Node::Text("\\".to_string())));
    assert_eq!(document.child(1).map(Node::value_name), Some("echo"));
}

#[test]
fn for_and_end_tags_balance() {
    for source in [
        "{$FOR i 1 2$}",
        "{$FOR i 1 2$}{$FOR j 1 2$}{$END$}",
        "{$FOR i 1 2$}{$END$}{$END$}",
    ] {
        assert!(parse(source).is_err(), "{source}");
    }
    assert!(parse("{$FOR i 1 2$}{$FOR j 1 2$}{$END$}{$END$}").is_ok());
}

#[test]
fn pretty_error_points_into_the_source() {
    let source = "line one\n{$FOR i 1 2$}x{$FOR j 1 2$}{$END$}\n";
    let err = parse(source).unwrap_err();
    let rendered = err.pretty(source);

    assert!(rendered.starts_with("error: unterminated FOR block over `i`"));
    assert!(rendered.contains("--> line 2, column 1"));
    assert!(rendered.contains("2 | {$FOR i 1 2$}x"));
}
