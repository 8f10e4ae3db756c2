use std::fmt;

/// Line and column (both 1-based) of a character offset in a source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// `offset` counts characters, not bytes. Offsets past the end land on the
    /// position right after the last character.
    pub fn locate(source: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for c in source.chars().take(offset) {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("invalid escape sequence `\\{sequence}` at offset {offset}.")]
    InvalidEscape { sequence: char, offset: usize },

    #[error("unterminated escape at end of input.")]
    UnterminatedEscape { offset: usize },

    #[error("unterminated tag at end of input.")]
    UnterminatedTag { offset: usize },

    #[error("unterminated string literal starting at offset {offset}.")]
    UnterminatedString { offset: usize },

    #[error("disallowed character `{character}` inside tag at offset {offset}.")]
    DisallowedCharacter { character: char, offset: usize },

    #[error("`$` must be followed by `}}` to close a tag (offset {offset}).")]
    MalformedTagClose { offset: usize },

    #[error("malformed numeric literal `{text}` at offset {offset}.")]
    MalformedNumber { text: String, offset: usize },

    #[error("function name must start with a letter right after `@` (offset {offset}).")]
    InvalidFunctionName { offset: usize },

    #[error("no more tokens: end of input was already reached.")]
    PastEndOfInput { offset: usize },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::InvalidEscape { offset, .. }
            | LexError::UnterminatedEscape { offset }
            | LexError::UnterminatedTag { offset }
            | LexError::UnterminatedString { offset }
            | LexError::DisallowedCharacter { offset, .. }
            | LexError::MalformedTagClose { offset }
            | LexError::MalformedNumber { offset, .. }
            | LexError::InvalidFunctionName { offset }
            | LexError::PastEndOfInput { offset } => *offset,
        }
    }

    pub fn position(&self, source: &str) -> Position {
        Position::locate(source, self.offset())
    }

    /// Same layout as [`ParseError::pretty`].
    pub fn pretty(&self, source: &str) -> String {
        render_diagnostic(&self.to_string(), source, self.position(source))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("empty tag at offset {offset}.")]
    EmptyTag { offset: usize },

    #[error("unknown tag name `{name}` at offset {offset}.")]
    UnknownTag { name: String, offset: usize },

    #[error("unexpected token `{found}` at offset {offset}.")]
    UnexpectedToken { found: String, offset: usize },

    #[error("FOR tag must start with a variable name, found `{found}` (offset {offset}).")]
    MissingForVariable { found: String, offset: usize },

    #[error("invalid FOR expression `{found}`: only numeric literals are allowed (offset {offset}).")]
    InvalidForExpression { found: String, offset: usize },

    #[error("too few expressions in FOR tag (offset {offset}).")]
    TooFewForExpressions { offset: usize },

    #[error("FOR tag is not properly closed with `$}}`, found `{found}` (offset {offset}).")]
    UnclosedForTag { found: String, offset: usize },

    #[error("END tag is not properly closed with `$}}`, found `{found}` (offset {offset}).")]
    UnclosedEndTag { found: String, offset: usize },

    #[error("unmatched END tag at offset {offset}.")]
    UnmatchedEnd { offset: usize },

    #[error("invalid element `{found}` in echo tag (offset {offset}).")]
    InvalidElement { found: String, offset: usize },

    #[error("unterminated FOR block over `{variable}` opened at offset {offset}.")]
    UnterminatedFor { variable: String, offset: usize },
}

impl ParseError {
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Lex(err) => err.offset(),
            ParseError::EmptyTag { offset }
            | ParseError::UnknownTag { offset, .. }
            | ParseError::UnexpectedToken { offset, .. }
            | ParseError::MissingForVariable { offset, .. }
            | ParseError::InvalidForExpression { offset, .. }
            | ParseError::TooFewForExpressions { offset }
            | ParseError::UnclosedForTag { offset, .. }
            | ParseError::UnclosedEndTag { offset, .. }
            | ParseError::UnmatchedEnd { offset }
            | ParseError::InvalidElement { offset, .. }
            | ParseError::UnterminatedFor { offset, .. } => *offset,
        }
    }

    pub fn position(&self, source: &str) -> Position {
        Position::locate(source, self.offset())
    }

    /// Render the error with the offending source line and a caret under the
    /// column where it was detected.
    ///
    /// ```text
    /// error: unmatched END tag at offset 4.
    ///   --> line 1, column 5
    ///   |
    /// 1 | body{$END$}
    ///   |     ^
    /// ```
    pub fn pretty(&self, source: &str) -> String {
        render_diagnostic(&self.to_string(), source, self.position(source))
    }
}

fn render_diagnostic(message: &str, source: &str, position: Position) -> String {
    let context = source
        .lines()
        .nth(position.line - 1)
        .unwrap_or_default()
        .trim_end_matches('\r');

    let number = position.line.to_string();
    let gutter = " ".repeat(number.len());
    let underline = " ".repeat(position.column.saturating_sub(1));

    format!(
        "error: {message}\n{gutter} --> {position}\n{gutter} |\n{number} | {context}\n{gutter} | {underline}^"
    )
}
