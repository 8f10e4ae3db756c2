//! Lexer and parser for SmartScript documents.
//!
//! A document is literal text with embedded tags: `{$= ... $}` echoes a list
//! of elements and `{$FOR var start end [step]$} ... {$END$}` wraps a body.
//! [`parse`] turns a source string into a [`Document`], whose `Display` form
//! is canonical source text that parses back to an equal tree.

pub mod ast;
pub mod element;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Document, ForLoop, Node};
pub use element::Element;
pub use error::{LexError, ParseError, Position};
pub use lexer::{tokenize, Lexer, LexerState};
pub use parser::{parse, Parser, ParserOptions};
pub use token::{Token, TokenKind, TokenValue};
