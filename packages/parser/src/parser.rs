use crate::{
    ast::{Document, ForLoop, Node, ECHO_TAG_NAME, END_TAG_NAME, FOR_TAG_NAME},
    element::{is_valid_name, Element},
    error::ParseError,
    lexer::Lexer,
    token::{Token, TokenKind, TokenValue},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Close FOR blocks that are still open at end of input instead of
    /// failing with an "unterminated FOR block" error.
    pub allow_unclosed_blocks: bool,
}

/// Builds a [`Document`] from a source string in a single pass.
///
/// The parser pulls tokens from the lexer one at a time and keeps a stack of
/// the FOR blocks that are currently open. Text and echo nodes are appended to
/// the innermost open block; an END tag closes it and hands the finished
/// `ForLoop` to its parent.
pub struct Parser {
    lexer: Lexer,
    options: ParserOptions,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
            options: ParserOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn parse(mut self) -> Result<Document, ParseError> {
        let mut stack = BlockStack::default();

        loop {
            let token = self.next_token()?;
            match token.kind {
                TokenKind::EndOfInput => break,
                TokenKind::Text => {
                    let found = token.describe();
                    match token.value {
                        Some(TokenValue::String(text)) => stack.top().push(Node::Text(text)),
                        _ => {
                            return Err(ParseError::UnexpectedToken {
                                found,
                                offset: token.offset,
                            })
                        }
                    }
                }
                TokenKind::TagOpen => self.parse_tag(&token, &mut stack)?,
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        found: token.describe(),
                        offset: token.offset,
                    })
                }
            }
        }

        let document = stack.finish(self.options)?;
        tracing::debug!(nodes = document.node_count(), "document parsed");
        Ok(document)
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        Ok(self.lexer.next_token()?)
    }

    fn parse_tag(&mut self, open: &Token, stack: &mut BlockStack) -> Result<(), ParseError> {
        let name_token = self.next_token()?;
        let name = match (name_token.kind, name_token.as_str()) {
            (TokenKind::TagClose, _) => return Err(ParseError::EmptyTag { offset: open.offset }),
            (TokenKind::Name, Some(name)) => name.to_uppercase(),
            _ => {
                return Err(ParseError::UnknownTag {
                    name: name_token.describe(),
                    offset: name_token.offset,
                })
            }
        };

        match name.as_str() {
            FOR_TAG_NAME => {
                let block = self.parse_for_header(open.offset)?;
                tracing::debug!(variable = %block.variable, depth = stack.depth() + 1, "open FOR block");
                stack.open.push(block);
            }
            END_TAG_NAME => {
                let close = self.next_token()?;
                if !close.is(TokenKind::TagClose) {
                    return Err(ParseError::UnclosedEndTag {
                        found: close.describe(),
                        offset: close.offset,
                    });
                }
                let block = stack
                    .open
                    .pop()
                    .ok_or(ParseError::UnmatchedEnd { offset: open.offset })?;
                tracing::debug!(variable = %block.variable, depth = stack.depth(), "close FOR block");
                stack.top().push(Node::ForLoop(block.close()));
            }
            ECHO_TAG_NAME => {
                let elements = self.parse_echo()?;
                stack.top().push(Node::Echo(elements));
            }
            _ => {
                return Err(ParseError::UnknownTag {
                    name: name_token.describe(),
                    offset: name_token.offset,
                })
            }
        }

        Ok(())
    }

    fn parse_echo(&mut self) -> Result<Vec<Element>, ParseError> {
        let mut elements = vec![];
        loop {
            let token = self.next_token()?;
            if token.is(TokenKind::TagClose) {
                return Ok(elements);
            }
            elements.push(echo_element(token)?);
        }
    }

    fn parse_for_header(&mut self, offset: usize) -> Result<OpenFor, ParseError> {
        let token = self.next_token()?;
        let variable = match (token.kind, token.as_str()) {
            (TokenKind::Name, Some(name)) if is_valid_name(name) => name.to_string(),
            _ => {
                return Err(ParseError::MissingForVariable {
                    found: token.describe(),
                    offset: token.offset,
                })
            }
        };

        let mut bounds = Vec::with_capacity(3);
        loop {
            let token = self.next_token()?;
            if token.is(TokenKind::TagClose) {
                break;
            }
            if bounds.len() == 3 {
                return Err(ParseError::UnclosedForTag {
                    found: token.describe(),
                    offset: token.offset,
                });
            }
            bounds.push(for_expression(token)?);
        }

        let mut bounds = bounds.into_iter();
        match (bounds.next(), bounds.next(), bounds.next()) {
            (Some(start), Some(end), step) => Ok(OpenFor {
                variable,
                start,
                end,
                step,
                offset,
                children: vec![],
            }),
            _ => Err(ParseError::TooFewForExpressions { offset }),
        }
    }
}

fn echo_element(token: Token) -> Result<Element, ParseError> {
    let found = token.describe();
    let element = match (token.kind, token.value) {
        (TokenKind::ConstantInteger, Some(TokenValue::Integer(v))) => Element::ConstantInteger(v),
        (TokenKind::ConstantDouble, Some(TokenValue::Float(v))) => Element::ConstantDouble(v),
        (TokenKind::String, Some(TokenValue::String(v))) => Element::StringLiteral(v),
        (TokenKind::Function, Some(TokenValue::String(v))) => Element::FunctionName(v),
        (TokenKind::Operator, Some(TokenValue::Char(c))) => Element::Operator(c.to_string()),
        (TokenKind::Name, Some(TokenValue::String(v))) if is_valid_name(&v) => Element::Variable(v),
        _ => {
            return Err(ParseError::InvalidElement {
                found,
                offset: token.offset,
            })
        }
    };
    Ok(element)
}

// Numeric literals, or strings whose content is one.
fn for_expression(token: Token) -> Result<Element, ParseError> {
    let element = match (token.kind, &token.value) {
        (TokenKind::ConstantInteger, Some(TokenValue::Integer(v))) => {
            Some(Element::ConstantInteger(*v))
        }
        (TokenKind::ConstantDouble, Some(TokenValue::Float(v))) => Some(Element::ConstantDouble(*v)),
        (TokenKind::String, Some(TokenValue::String(text))) => Element::parse_number(text),
        _ => None,
    };

    element.ok_or_else(|| ParseError::InvalidForExpression {
        found: token.describe(),
        offset: token.offset,
    })
}

struct OpenFor {
    variable: String,
    start: Element,
    end: Element,
    step: Option<Element>,
    offset: usize,
    children: Vec<Node>,
}

impl OpenFor {
    fn close(self) -> ForLoop {
        ForLoop::from_parts(self.variable, self.start, self.end, self.step, self.children)
    }
}

// The document root is always at the bottom, so there is always a block to
// append to.
#[derive(Default)]
struct BlockStack {
    root: Vec<Node>,
    open: Vec<OpenFor>,
}

impl BlockStack {
    fn top(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(block) => &mut block.children,
            None => &mut self.root,
        }
    }

    fn depth(&self) -> usize {
        self.open.len()
    }

    fn finish(mut self, options: ParserOptions) -> Result<Document, ParseError> {
        if let Some(block) = self.open.last() {
            if !options.allow_unclosed_blocks {
                return Err(ParseError::UnterminatedFor {
                    variable: block.variable.clone(),
                    offset: block.offset,
                });
            }
        }

        while let Some(block) = self.open.pop() {
            tracing::debug!(variable = %block.variable, "implicitly closing FOR block");
            self.top().push(Node::ForLoop(block.close()));
        }

        Ok(Document::new(self.root))
    }
}

pub fn parse(source: &str) -> Result<Document, ParseError> {
    Parser::new(source).parse()
}
