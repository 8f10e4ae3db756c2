use crate::{
    ast::ECHO_TAG_NAME,
    element::{Element, ESCAPE, FUNCTION_PREFIX, OPERATORS, STRING_QUOTE},
    error::LexError,
    token::{Token, TokenKind, TokenValue},
};

pub const TAG_OPEN: &str = "{$";
pub const TAG_CLOSE: &str = "$}";

const OPEN_BRACE: char = '{';
const CLOSE_BRACE: char = '}';
const DOLLAR: char = '$';
const MINUS: char = '-';
const DOT: char = '.';
const EQUALS: char = '=';
const UNDERSCORE: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerState {
    OutsideTag,
    InsideTag,
}

// Class of the token being accumulated inside a tag. Fixed by the first
// character of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Name,
    Function,
    Integer,
    Double,
}

/// Turns a document into tokens on demand.
///
/// Outside of tags everything is literal text, where `\\` and `\{` are the
/// only escapes. Inside `{$ ... $}` the lexer produces names, numbers,
/// strings, functions and operators, using whitespace as a separator.
///
/// Offsets in tokens and errors count characters from the start of the
/// document.
#[derive(Debug, Clone)]
pub struct Lexer {
    chars: Vec<char>,
    cursor: usize,
    state: LexerState,
    last_token: Option<Token>,
    // Set once the iterator has handed out an error.
    failed: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            cursor: 0,
            state: LexerState::OutsideTag,
            last_token: None,
            failed: false,
        }
    }

    pub fn state(&self) -> LexerState {
        self.state
    }

    /// The most recently produced token, `None` before the first call.
    pub fn last_token(&self) -> Option<&Token> {
        self.last_token.as_ref()
    }

    fn is_finished(&self) -> bool {
        matches!(&self.last_token, Some(token) if token.is(TokenKind::EndOfInput))
    }

    /// Produce the next token. `EndOfInput` is returned exactly once, asking
    /// for another token after it is an error.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if self.is_finished() {
            return Err(LexError::PastEndOfInput {
                offset: self.cursor,
            });
        }

        let token = match self.state {
            LexerState::OutsideTag => self.next_outside_tag()?,
            LexerState::InsideTag => self.next_inside_tag()?,
        };

        tracing::trace!(kind = token.kind.name(), offset = token.offset, "token");
        self.last_token = Some(token.clone());
        Ok(token)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.cursor + ahead).copied()
    }

    fn at_tag_open(&self) -> bool {
        self.peek(0) == Some(OPEN_BRACE) && self.peek(1) == Some(DOLLAR)
    }

    fn next_outside_tag(&mut self) -> Result<Token, LexError> {
        let start = self.cursor;
        let mut text = String::new();

        while let Some(c) = self.peek(0) {
            if c == ESCAPE {
                match self.peek(1) {
                    Some(next @ (ESCAPE | OPEN_BRACE)) => {
                        text.push(next);
                        self.cursor += 2;
                    }
                    Some(next) => {
                        return Err(LexError::InvalidEscape {
                            sequence: next,
                            offset: self.cursor,
                        })
                    }
                    None => {
                        return Err(LexError::UnterminatedEscape {
                            offset: self.cursor,
                        })
                    }
                }
                continue;
            }

            if self.at_tag_open() {
                if !text.is_empty() {
                    break;
                }
                self.cursor += TAG_OPEN.len();
                self.state = LexerState::InsideTag;
                return Ok(Token::tag_open(start));
            }

            text.push(c);
            self.cursor += 1;
        }

        if text.is_empty() {
            Ok(Token::end_of_input(self.cursor))
        } else {
            Ok(Token::new(
                TokenKind::Text,
                Some(TokenValue::String(text)),
                start,
            ))
        }
    }

    fn next_inside_tag(&mut self) -> Result<Token, LexError> {
        while matches!(self.peek(0), Some(c) if c.is_whitespace()) {
            self.cursor += 1;
        }

        let start = self.cursor;
        let Some(c) = self.peek(0) else {
            return Err(LexError::UnterminatedTag { offset: start });
        };

        match c {
            DOLLAR => match self.peek(1) {
                Some(CLOSE_BRACE) => {
                    self.cursor += TAG_CLOSE.len();
                    self.state = LexerState::OutsideTag;
                    Ok(Token::tag_close(start))
                }
                Some(_) => Err(LexError::MalformedTagClose { offset: start }),
                None => Err(LexError::UnterminatedTag { offset: start }),
            },
            STRING_QUOTE => self.scan_string(start),
            FUNCTION_PREFIX => match self.peek(1) {
                Some(next) if next.is_alphabetic() => {
                    self.cursor += 1;
                    self.scan(Scan::Function, start)
                }
                _ => Err(LexError::InvalidFunctionName { offset: start }),
            },
            EQUALS => {
                self.cursor += 1;
                Ok(Token::new(
                    TokenKind::Name,
                    Some(TokenValue::String(ECHO_TAG_NAME.to_string())),
                    start,
                ))
            }
            MINUS if matches!(self.peek(1), Some(d) if d.is_ascii_digit()) => {
                self.cursor += 1;
                self.scan(Scan::Integer, start)
            }
            c if OPERATORS.contains(&c) => {
                self.cursor += 1;
                Ok(Token::new(
                    TokenKind::Operator,
                    Some(TokenValue::Char(c)),
                    start,
                ))
            }
            c if c.is_ascii_digit() => self.scan(Scan::Integer, start),
            c if c.is_alphabetic() => self.scan(Scan::Name, start),
            c => Err(LexError::DisallowedCharacter {
                character: c,
                offset: start,
            }),
        }
    }

    // Accumulate the run starting at `start`. The first character that does
    // not fit the class ends the token and is left for the next call.
    fn scan(&mut self, mut scan: Scan, start: usize) -> Result<Token, LexError> {
        while let Some(c) = self.peek(0) {
            let accepted = match scan {
                Scan::Name | Scan::Function => c.is_alphanumeric() || c == UNDERSCORE,
                Scan::Integer if c == DOT => {
                    scan = Scan::Double;
                    true
                }
                Scan::Integer | Scan::Double => c.is_ascii_digit() || c == DOT,
            };
            if !accepted {
                break;
            }
            self.cursor += 1;
        }

        let text: String = self.chars[start..self.cursor].iter().collect();
        match scan {
            Scan::Name => Ok(Token::new(
                TokenKind::Name,
                Some(TokenValue::String(text)),
                start,
            )),
            Scan::Function => {
                let name = text.trim_start_matches(FUNCTION_PREFIX).to_string();
                Ok(Token::new(
                    TokenKind::Function,
                    Some(TokenValue::String(name)),
                    start,
                ))
            }
            Scan::Integer | Scan::Double => match Element::parse_number(&text) {
                Some(Element::ConstantInteger(v)) => Ok(Token::new(
                    TokenKind::ConstantInteger,
                    Some(TokenValue::Integer(v)),
                    start,
                )),
                Some(Element::ConstantDouble(v)) => Ok(Token::new(
                    TokenKind::ConstantDouble,
                    Some(TokenValue::Float(v)),
                    start,
                )),
                _ => Err(LexError::MalformedNumber {
                    text,
                    offset: start,
                }),
            },
        }
    }

    fn scan_string(&mut self, start: usize) -> Result<Token, LexError> {
        self.cursor += 1;
        let mut value = String::new();

        loop {
            match self.peek(0) {
                None => return Err(LexError::UnterminatedString { offset: start }),
                Some(STRING_QUOTE) => {
                    self.cursor += 1;
                    break;
                }
                Some(ESCAPE) => {
                    let decoded = match self.peek(1) {
                        Some(c @ (ESCAPE | STRING_QUOTE)) => c,
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(other) => {
                            return Err(LexError::InvalidEscape {
                                sequence: other,
                                offset: self.cursor,
                            })
                        }
                        None => {
                            return Err(LexError::UnterminatedEscape {
                                offset: self.cursor,
                            })
                        }
                    };
                    value.push(decoded);
                    self.cursor += 2;
                }
                Some(c) => {
                    value.push(c);
                    self.cursor += 1;
                }
            }
        }

        Ok(Token::new(
            TokenKind::String,
            Some(TokenValue::String(value)),
            start,
        ))
    }
}

/// Yields every token up to and including `EndOfInput`, or up to the first
/// error.
impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.is_finished() {
            return None;
        }
        let result = self.next_token();
        self.failed = result.is_err();
        Some(result)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn text(value: &str) -> Option<TokenValue> {
        Some(TokenValue::String(value.to_string()))
    }

    #[test]
    fn plain_text_then_end_of_input() {
        let mut lexer = Lexer::new("Hi.");
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Text);
        assert_eq!(token.value, text("Hi."));
        assert!(lexer.next_token().unwrap().is(TokenKind::EndOfInput));
    }

    #[test]
    fn empty_document_is_just_end_of_input() {
        assert_eq!(kinds(""), vec![TokenKind::EndOfInput]);
    }

    #[test]
    fn reading_past_end_of_input_fails() {
        let mut lexer = Lexer::new("");
        lexer.next_token().unwrap();
        assert!(matches!(
            lexer.next_token(),
            Err(LexError::PastEndOfInput { .. })
        ));
    }

    #[test]
    fn last_token_and_state_follow_the_stream() {
        let mut lexer = Lexer::new("a{$= x$}");
        assert!(lexer.last_token().is_none());
        assert_eq!(lexer.state(), LexerState::OutsideTag);

        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!(lexer.state(), LexerState::InsideTag);
        assert_eq!(lexer.last_token().map(|t| t.kind), Some(TokenKind::TagOpen));

        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!(lexer.state(), LexerState::OutsideTag);
    }

    #[test]
    fn text_before_tag_is_emitted_first() {
        let tokens = tokenize("ab{$END$}cd").unwrap();
        assert_eq!(tokens[0].value, text("ab"));
        assert!(tokens[1].is(TokenKind::TagOpen));
        assert_eq!(tokens[1].offset, 2);
        assert_eq!(tokens[2].value, text("END"));
        assert!(tokens[3].is(TokenKind::TagClose));
        assert_eq!(tokens[4].value, text("cd"));
        assert!(tokens[5].is(TokenKind::EndOfInput));
    }

    #[test]
    fn escapes_outside_tags() {
        let tokens = tokenize(r"a \{$ b \\ c { d $}").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, text(r"a {$ b \ c { d $}"));
    }

    #[test]
    fn invalid_escape_outside_tags() {
        assert_eq!(
            tokenize(r"ab\n"),
            Err(LexError::InvalidEscape {
                sequence: 'n',
                offset: 2
            })
        );
    }

    #[test]
    fn unterminated_escape() {
        assert_eq!(
            tokenize("abc\\"),
            Err(LexError::UnterminatedEscape { offset: 3 })
        );
    }

    #[test]
    fn classifies_tag_contents() {
        let tokens = tokenize(r#"{$= i -1 2.5 "s" @sin * - +$}"#).unwrap();
        let values: Vec<_> = tokens.iter().map(|t| (t.kind, t.value.clone())).collect();
        assert_eq!(
            values,
            vec![
                (TokenKind::TagOpen, None),
                (TokenKind::Name, text("=")),
                (TokenKind::Name, text("i")),
                (TokenKind::ConstantInteger, Some(TokenValue::Integer(-1))),
                (TokenKind::ConstantDouble, Some(TokenValue::Float(2.5))),
                (TokenKind::String, text("s")),
                (TokenKind::Function, text("sin")),
                (TokenKind::Operator, Some(TokenValue::Char('*'))),
                (TokenKind::Operator, Some(TokenValue::Char('-'))),
                (TokenKind::Operator, Some(TokenValue::Char('+'))),
                (TokenKind::TagClose, None),
                (TokenKind::EndOfInput, None),
            ]
        );
    }

    #[test]
    fn tag_close_ends_a_token_in_progress() {
        let tokens = tokenize("{$END$}").unwrap();
        assert_eq!(tokens[1].value, text("END"));
        assert!(tokens[2].is(TokenKind::TagClose));
        assert_eq!(tokens[2].offset, 5);
    }

    #[test]
    fn incompatible_character_starts_the_next_token() {
        let tokens = tokenize("{$=12abc a1_b\"x\"3-4$}").unwrap();
        let values: Vec<_> = tokens[2..tokens.len() - 2]
            .iter()
            .map(|t| t.value.clone())
            .collect();
        assert_eq!(
            values,
            vec![
                Some(TokenValue::Integer(12)),
                text("abc"),
                text("a1_b"),
                text("x"),
                Some(TokenValue::Integer(3)),
                Some(TokenValue::Integer(-4)),
            ]
        );
    }

    #[test]
    fn string_escapes_inside_tags() {
        let tokens = tokenize(r#"{$= "a\"b\\c\nd\te\r" $}"#).unwrap();
        assert_eq!(tokens[2].value, text("a\"b\\c\nd\te\r"));
    }

    #[test]
    fn string_may_contain_tag_markers() {
        let tokens = tokenize(r#"{$= "x $} {$ y" $}"#).unwrap();
        assert_eq!(tokens[2].value, text("x $} {$ y"));
        assert!(tokens[3].is(TokenKind::TagClose));
    }

    #[test]
    fn invalid_escape_inside_string() {
        assert!(matches!(
            tokenize(r#"{$= "\q" $}"#),
            Err(LexError::InvalidEscape { sequence: 'q', .. })
        ));
    }

    #[test]
    fn unterminated_tag() {
        assert_eq!(
            tokenize("{$= x"),
            Err(LexError::UnterminatedTag { offset: 5 })
        );
        assert!(matches!(
            tokenize("{$= x $"),
            Err(LexError::UnterminatedTag { .. })
        ));
        assert!(matches!(
            tokenize("{$= \"abc"),
            Err(LexError::UnterminatedString { offset: 4 })
        ));
    }

    #[test]
    fn disallowed_characters_inside_tags() {
        assert_eq!(
            tokenize("{$= (x) $}"),
            Err(LexError::DisallowedCharacter {
                character: '(',
                offset: 4
            })
        );
        assert!(matches!(
            tokenize("{$= _x $}"),
            Err(LexError::DisallowedCharacter { character: '_', .. })
        ));
        assert!(matches!(
            tokenize("{$= x $ $}"),
            Err(LexError::MalformedTagClose { .. })
        ));
    }

    #[test]
    fn malformed_numbers() {
        assert!(matches!(
            tokenize("{$= 1.2.3 $}"),
            Err(LexError::MalformedNumber { .. })
        ));
        assert!(matches!(
            tokenize("{$= 99999999999999999999 $}"),
            Err(LexError::MalformedNumber { .. })
        ));
    }

    #[test]
    fn function_needs_a_letter() {
        assert!(matches!(
            tokenize("{$= @1 $}"),
            Err(LexError::InvalidFunctionName { offset: 4 })
        ));
        assert!(matches!(
            tokenize("{$= @ $}"),
            Err(LexError::InvalidFunctionName { .. })
        ));
    }

    #[test]
    fn iterator_stops_after_first_error() {
        let results: Vec<_> = Lexer::new("{$= x").collect();
        assert_eq!(results.len(), 4);
        assert!(results[3].is_err());
    }
}
