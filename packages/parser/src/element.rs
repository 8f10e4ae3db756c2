use std::fmt;

pub const ESCAPE: char = '\\';
pub const STRING_QUOTE: char = '"';
pub const FUNCTION_PREFIX: char = '@';
pub const OPERATORS: [char; 5] = ['+', '-', '*', '/', '^'];

/// An atomic value inside an echo or FOR tag.
///
/// Two elements are equal when they are the same variant and render to the
/// same canonical text, so `ConstantDouble(0.0)` and `ConstantDouble(-0.0)`
/// are different elements.
#[derive(Debug, Clone)]
pub enum Element {
    ConstantInteger(i64),
    ConstantDouble(f64),
    StringLiteral(String),
    Variable(String),
    FunctionName(String),
    Operator(String),
}

impl Element {
    /// Recognize `-?digits[.digits]`. Anything with a dot becomes a double,
    /// integers must fit in an `i64` and doubles must be finite.
    pub fn parse_number(text: &str) -> Option<Element> {
        let unsigned = text.strip_prefix('-').unwrap_or(text);
        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (unsigned, None),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        match fraction {
            None => text.parse::<i64>().ok().map(Element::ConstantInteger),
            Some(fraction) if fraction.bytes().all(|b| b.is_ascii_digit()) => text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Element::ConstantDouble),
            Some(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Element::ConstantInteger(_) | Element::ConstantDouble(_))
    }

    pub fn value_name(&self) -> &'static str {
        match self {
            Element::ConstantInteger(_) => "integer",
            Element::ConstantDouble(_) => "double",
            Element::StringLiteral(_) => "string",
            Element::Variable(_) => "variable",
            Element::FunctionName(_) => "function",
            Element::Operator(_) => "operator",
        }
    }

    /// The raw value: strings without quotes or escapes, function names
    /// without `@`.
    pub fn as_text(&self) -> String {
        match self {
            Element::ConstantInteger(v) => v.to_string(),
            Element::ConstantDouble(v) => format_double(*v),
            Element::StringLiteral(v)
            | Element::Variable(v)
            | Element::FunctionName(v)
            | Element::Operator(v) => v.clone(),
        }
    }

    /// Canonical source form, re-lexes to an equal element.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::ConstantInteger(v) => write!(f, "{v}"),
            Element::ConstantDouble(v) => f.write_str(&format_double(*v)),
            Element::StringLiteral(v) => f.write_str(&quote_string(v)),
            Element::Variable(v) | Element::Operator(v) => f.write_str(v),
            Element::FunctionName(v) => write!(f, "{FUNCTION_PREFIX}{v}"),
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
            && self.to_string() == other.to_string()
    }
}

impl Eq for Element {}

/// A variable or function name: a letter followed by letters, digits or `_`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

// Display for f64 never uses an exponent, but drops the fraction of whole
// numbers, which would re-lex as an integer.
fn format_double(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') || !value.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(STRING_QUOTE);
    for c in value.chars() {
        match c {
            ESCAPE | STRING_QUOTE => {
                out.push(ESCAPE);
                out.push(c);
            }
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push(STRING_QUOTE);
    out
}
