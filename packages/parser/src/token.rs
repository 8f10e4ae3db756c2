use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Literal text outside of any tag, escapes already resolved.
    Text,
    /// `{$`
    TagOpen,
    /// `$}`
    TagClose,
    ConstantInteger,
    ConstantDouble,
    /// Variable or tag name, including the echo tag name `=`.
    Name,
    /// `@name`, the value holds the name without the `@`.
    Function,
    Operator,
    String,
    EndOfInput,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Text => "text",
            TokenKind::TagOpen => "tag-open",
            TokenKind::TagClose => "tag-close",
            TokenKind::ConstantInteger => "integer",
            TokenKind::ConstantDouble => "double",
            TokenKind::Name => "name",
            TokenKind::Function => "function",
            TokenKind::Operator => "operator",
            TokenKind::String => "string",
            TokenKind::EndOfInput => "end-of-input",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    String(String),
    Integer(i64),
    Float(f64),
    Char(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Option<TokenValue>,
    /// Character offset of the first character of the token.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: Option<TokenValue>, offset: usize) -> Self {
        Self {
            kind,
            value,
            offset,
        }
    }

    pub fn tag_open(offset: usize) -> Self {
        Self::new(TokenKind::TagOpen, None, offset)
    }

    pub fn tag_close(offset: usize) -> Self {
        Self::new(TokenKind::TagClose, None, offset)
    }

    pub fn end_of_input(offset: usize) -> Self {
        Self::new(TokenKind::EndOfInput, None, offset)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Some(TokenValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Short source-like rendering used in error messages.
    pub fn describe(&self) -> String {
        match (&self.kind, &self.value) {
            (TokenKind::TagOpen, _) => "{$".to_string(),
            (TokenKind::TagClose, _) => "$}".to_string(),
            (TokenKind::EndOfInput, _) => "end of input".to_string(),
            (TokenKind::String, Some(TokenValue::String(s))) => format!("\"{s}\""),
            (TokenKind::Function, Some(TokenValue::String(s))) => format!("@{s}"),
            (_, Some(value)) => value.to_string(),
            (kind, None) => kind.name().to_string(),
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::String(s) => write!(f, "{s}"),
            TokenValue::Integer(i) => write!(f, "{i}"),
            TokenValue::Float(d) => write!(f, "{d:?}"),
            TokenValue::Char(c) => write!(f, "{c}"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{:<12} {:?} @{}", self.kind.name(), value, self.offset),
            None => write!(f, "{:<12} @{}", self.kind.name(), self.offset),
        }
    }
}
