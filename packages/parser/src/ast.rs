use std::fmt;

use crate::{
    element::{is_valid_name, Element, ESCAPE},
    error::ParseError,
    lexer::{TAG_CLOSE, TAG_OPEN},
    parser::Parser,
};

pub const ECHO_TAG_NAME: &str = "=";
pub const FOR_TAG_NAME: &str = "FOR";
pub const END_TAG_NAME: &str = "END";

/// Root of a parsed document. Exactly one per parse.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn from_string(source: &str) -> Result<Self, ParseError> {
        Parser::new(source).parse()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    /// Canonical source text. Parsing it again gives an equal document.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Number of nodes below the root.
    pub fn node_count(&self) -> usize {
        self.children.iter().map(Node::node_count).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text with escapes resolved.
    Text(String),
    Echo(Vec<Element>),
    ForLoop(ForLoop),
}

impl Node {
    pub fn value_name(&self) -> &'static str {
        match self {
            Node::Text(_) => "text",
            Node::Echo(_) => "echo",
            Node::ForLoop(_) => "for",
        }
    }

    /// Empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::ForLoop(for_loop) => for_loop.children(),
            Node::Text(_) | Node::Echo(_) => &[],
        }
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children().get(index)
    }

    pub fn number_of_children(&self) -> usize {
        self.children().len()
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }

    fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }
}

/// A `{$FOR var start end [step]$} ... {$END$}` block.
///
/// The bounds are always numeric literals.
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    variable: String,
    start: Element,
    end: Element,
    step: Option<Element>,
    children: Vec<Node>,
}

impl ForLoop {
    /// `None` when the variable is not a valid name or a bound is not numeric.
    pub fn new(
        variable: impl Into<String>,
        start: Element,
        end: Element,
        step: Option<Element>,
        children: Vec<Node>,
    ) -> Option<Self> {
        let variable = variable.into();
        let numeric = start.is_numeric()
            && end.is_numeric()
            && step.as_ref().map_or(true, Element::is_numeric);

        if !numeric || !is_valid_name(&variable) {
            return None;
        }

        Some(Self {
            variable,
            start,
            end,
            step,
            children,
        })
    }

    // Bounds already checked by the parser.
    pub(crate) fn from_parts(
        variable: String,
        start: Element,
        end: Element,
        step: Option<Element>,
        children: Vec<Node>,
    ) -> Self {
        Self {
            variable,
            start,
            end,
            step,
            children,
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn start(&self) -> &Element {
        &self.start
    }

    pub fn end(&self) -> &Element {
        &self.end
    }

    pub fn step(&self) -> Option<&Element> {
        self.step.as_ref()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

fn write_text(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    for c in text.chars() {
        if c == ESCAPE || c == '{' {
            write!(f, "{ESCAPE}")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

fn write_children(f: &mut fmt::Formatter<'_>, children: &[Node]) -> fmt::Result {
    children.iter().try_for_each(|child| write!(f, "{child}"))
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_children(f, &self.children)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => write_text(f, text),
            Node::Echo(elements) => {
                write!(f, "{TAG_OPEN}{ECHO_TAG_NAME}")?;
                for element in elements {
                    write!(f, " {element}")?;
                }
                write!(f, "{TAG_CLOSE}")
            }
            Node::ForLoop(for_loop) => write!(f, "{for_loop}"),
        }
    }
}

impl fmt::Display for ForLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TAG_OPEN}{FOR_TAG_NAME} {} {} {}",
            self.variable, self.start, self.end
        )?;
        if let Some(step) = &self.step {
            write!(f, " {step}")?;
        }
        write!(f, "{TAG_CLOSE}")?;
        write_children(f, &self.children)?;
        write!(f, "{TAG_OPEN}{END_TAG_NAME}{TAG_CLOSE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Element {
        Element::ConstantInteger(v)
    }

    #[test]
    fn text_escapes_backslash_and_brace() {
        let node = Node::Text(r"a\b{$c{d".to_string());
        assert_eq!(node.to_text(), r"a\\b\{$c\{d");
    }

    #[test]
    fn echo_renders_elements_with_separators() {
        let node = Node::Echo(vec![
            Element::Variable("i".to_string()),
            Element::Operator("-".to_string()),
            int(1),
            Element::FunctionName("sin".to_string()),
            Element::StringLiteral("a \"b\"".to_string()),
        ]);
        assert_eq!(node.to_text(), r#"{$= i - 1 @sin "a \"b\""$}"#);
        assert_eq!(Node::Echo(vec![]).to_text(), "{$=$}");
    }

    #[test]
    fn for_loop_renders_header_body_and_end() {
        let body = vec![Node::Text("body".to_string())];
        let with_step = ForLoop::new("i", int(1), int(10), Some(int(2)), body.clone()).unwrap();
        assert_eq!(with_step.to_string(), "{$FOR i 1 10 2$}body{$END$}");

        let without_step =
            ForLoop::new("i", Element::ConstantDouble(0.5), int(3), None, body).unwrap();
        assert_eq!(without_step.to_string(), "{$FOR i 0.5 3$}body{$END$}");
    }

    #[test]
    fn for_loop_rejects_non_numeric_bounds() {
        let name = Element::Variable("n".to_string());
        assert!(ForLoop::new("i", name.clone(), int(1), None, vec![]).is_none());
        assert!(ForLoop::new("i", int(1), int(2), Some(name), vec![]).is_none());
        assert!(ForLoop::new("1i", int(1), int(2), None, vec![]).is_none());
        assert!(ForLoop::new("=", int(1), int(2), None, vec![]).is_none());
    }

    #[test]
    fn structural_equality_is_recursive() {
        let build = |text: &str| {
            Document::new(vec![Node::ForLoop(
                ForLoop::new("i", int(1), int(2), None, vec![Node::Text(text.to_string())])
                    .unwrap(),
            )])
        };
        assert_eq!(build("x"), build("x"));
        assert_ne!(build("x"), build("y"));
        assert_ne!(build("x"), Document::default());
    }

    #[test]
    fn child_accessors() {
        let inner = ForLoop::new(
            "j",
            int(0),
            int(1),
            None,
            vec![Node::Echo(vec![]), Node::Text("t".to_string())],
        )
        .unwrap();
        let document = Document::new(vec![Node::Text("a".to_string()), Node::ForLoop(inner)]);

        assert_eq!(document.number_of_children(), 2);
        assert_eq!(document.node_count(), 4);
        let for_node = document.child(1).unwrap();
        assert_eq!(for_node.value_name(), "for");
        assert_eq!(for_node.number_of_children(), 2);
        assert_eq!(for_node.child(1), Some(&Node::Text("t".to_string())));
        assert!(document.child(0).unwrap().children().is_empty());
        assert!(document.child(2).is_none());
    }
}
