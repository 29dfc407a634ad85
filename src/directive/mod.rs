//! Legacy template directives: recognition and rewriting.

pub mod scanner;
pub mod translator;

use std::ops::Range;

pub use scanner::{Opener, Scanner, find_opener, openers, scan};
pub use translator::{EqualsMode, Phase, TranslateOptions, Translator};

/// The two interchangeable delimiter conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// `{{repl Keyword ...}}`
    BraceFirst,
    /// `repl{{ Keyword ...}}`
    MarkerFirst,
}

/// What a directive asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    ConfigOption,
    ConfigOptionEquals,
    Namespace,
    IsKurl,
    NotIsKurl,
    If,
    Else,
    End,
    /// Any keyword this engine does not translate
    Unknown(String),
}

impl DirectiveKind {
    /// Classify a keyword. `not` is handled by the scanner since it needs a
    /// second word.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "ConfigOption" => Self::ConfigOption,
            "ConfigOptionEquals" => Self::ConfigOptionEquals,
            "Namespace" => Self::Namespace,
            "IsKurl" => Self::IsKurl,
            "if" => Self::If,
            "else" => Self::Else,
            "end" => Self::End,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Number of quoted arguments the kind takes, for kinds with a fixed arity
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::ConfigOption => Some(1),
            Self::ConfigOptionEquals => Some(2),
            Self::Namespace | Self::IsKurl | Self::NotIsKurl => Some(0),
            Self::If | Self::Else | Self::End | Self::Unknown(_) => None,
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::If | Self::Else | Self::End)
    }
}

/// How a directive ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// `}}` follows the arguments
    Closed,
    /// A `|` transform follows the arguments; the span stops in front of it
    Piped,
    /// The line ended before any `}}`; the span runs to the end of the line
    Unterminated,
    /// The arguments do not fit the kind
    Malformed,
}

/// One recognised occurrence in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub variant: Variant,
    /// Unquoted arguments, for fixed-arity kinds
    pub args: Vec<String>,
    /// Byte range of the whole occurrence in the scanned text
    pub span: Range<usize>,
    /// Byte range of the text between keyword and closing delimiter
    pub body: Range<usize>,
    pub form: Form,
}

impl Directive {
    /// The exact original text of the occurrence
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }

    pub fn body_text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.body.clone()]
    }
}

/// Quote a string the way Go's `%q` does, for use as a template literal
pub fn go_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_control() => quoted.push_str(&format!("\\x{:02x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
