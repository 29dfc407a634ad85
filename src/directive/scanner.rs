use super::{Directive, DirectiveKind, Form, Variant};

/// Position of a legacy opener and the whitespace after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opener {
    pub start: usize,
    /// First byte after the opener and any blanks following it
    pub end: usize,
    pub variant: Variant,
}

pub(crate) fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

pub(crate) fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn skip_blanks(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_blank(bytes[pos]) {
        pos += 1;
    }
    pos
}

pub(crate) fn ident_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_ident(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// Skip a quoted string starting at `pos`, returning the index after its
/// terminator. A string left open at the end of the line stops there.
pub(crate) fn skip_quoted(bytes: &[u8], pos: usize) -> usize {
    let quote = bytes[pos];
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Find the first legacy opener at or after `from`.
///
/// `{{repl` must be followed by whitespace so that target-dialect calls like
/// `{{replace ...}}` are left alone; `repl{{` needs none. When openers
/// overlap the leftmost one wins.
pub fn find_opener(text: &str, from: usize) -> Option<Opener> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i + 6 <= bytes.len() {
        let window = &bytes[i..i + 6];
        if window == b"{{repl" && bytes.get(i + 6).is_some_and(|b| b.is_ascii_whitespace()) {
            return Some(Opener {
                start: i,
                end: skip_blanks(bytes, i + 6),
                variant: Variant::BraceFirst,
            });
        }
        if window == b"repl{{" {
            return Some(Opener {
                start: i,
                end: skip_blanks(bytes, i + 6),
                variant: Variant::MarkerFirst,
            });
        }
        i += 1;
    }
    None
}

/// Every opener in the text, non-overlapping, in document order
pub fn openers(text: &str) -> impl Iterator<Item = Opener> + '_ {
    let mut from = 0;
    std::iter::from_fn(move || {
        let opener = find_opener(text, from)?;
        from = opener.end;
        Some(opener)
    })
}

/// Read one quoted argument at `start`: `"..."` with backslash escapes, or a
/// raw `` `...` `` string. The argument ends at the first unescaped
/// terminator; a newline before it means there is no argument.
pub(crate) fn read_quoted(text: &str, start: usize) -> Option<(String, usize)> {
    match text.as_bytes().get(start)? {
        b'"' => {
            let mut value = String::new();
            let mut chars = text[start + 1..].char_indices();
            while let Some((offset, ch)) = chars.next() {
                match ch {
                    '"' => return Some((value, start + 1 + offset + 1)),
                    '\n' => return None,
                    '\\' => match chars.next()?.1 {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        other => value.push(other),
                    },
                    c => value.push(c),
                }
            }
            None
        }
        b'`' => {
            let rest = &text[start + 1..];
            let stop = rest.find(['`', '\n'])?;
            if rest[stop..].starts_with('`') {
                Some((rest[..stop].to_string(), start + 1 + stop + 1))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Read `count` blank-separated quoted arguments starting at `pos`
pub(crate) fn read_args(text: &str, mut pos: usize, count: usize) -> Option<(Vec<String>, usize)> {
    let bytes = text.as_bytes();
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let start = skip_blanks(bytes, pos);
        if start == pos {
            return None;
        }
        let (value, end) = read_quoted(text, start)?;
        args.push(value);
        pos = end;
    }
    Some((args, pos))
}

/// Locate the closing `}}` outside quoted arguments, or the end of the line
fn find_close(bytes: &[u8], from: usize) -> Result<usize, usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => return Err(i),
            b'"' | b'`' => i = skip_quoted(bytes, i),
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Ok(i),
            _ => i += 1,
        }
    }
    Err(bytes.len())
}

/// Iterator over the directives of a document, in order
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn parse(&self, opener: Opener) -> Directive {
        let bytes = self.text.as_bytes();
        let keyword_end = ident_end(bytes, opener.end);
        let keyword = &self.text[opener.end..keyword_end];

        let (kind, head_end) = if keyword == "not" {
            let next_start = skip_blanks(bytes, keyword_end);
            let next_end = ident_end(bytes, next_start);
            if next_start > keyword_end && &self.text[next_start..next_end] == "IsKurl" {
                (DirectiveKind::NotIsKurl, next_end)
            } else {
                (DirectiveKind::Unknown(keyword.to_string()), keyword_end)
            }
        } else {
            (DirectiveKind::from_keyword(keyword), keyword_end)
        };

        match kind.arity() {
            Some(count) => self.parse_fixed(opener, kind, head_end, count),
            None => self.parse_free(opener, kind, head_end, Form::Closed),
        }
    }

    /// Kinds with a fixed argument list: `}}` or a pipe must follow
    fn parse_fixed(&self, opener: Opener, kind: DirectiveKind, head_end: usize, count: usize) -> Directive {
        let bytes = self.text.as_bytes();
        let Some((args, after_args)) = read_args(self.text, head_end, count) else {
            return self.parse_free(opener, kind, head_end, Form::Malformed);
        };

        let pos = skip_blanks(bytes, after_args);
        let form = if bytes[pos..].starts_with(b"}}") {
            Form::Closed
        } else if bytes.get(pos) == Some(&b'|') {
            Form::Piped
        } else {
            return self.parse_free(opener, kind, head_end, Form::Malformed);
        };

        let end = if form == Form::Closed { pos + 2 } else { pos };
        Directive {
            kind,
            variant: opener.variant,
            args,
            span: opener.start..end,
            body: head_end..pos,
            form,
        }
    }

    /// Kinds whose body is free text running to the closing delimiter
    fn parse_free(&self, opener: Opener, kind: DirectiveKind, head_end: usize, closed_form: Form) -> Directive {
        let (span_end, body_end, form) = match find_close(self.text.as_bytes(), head_end) {
            Ok(close) => (close + 2, close, closed_form),
            Err(eol) => (
                eol,
                eol,
                if closed_form == Form::Malformed { Form::Malformed } else { Form::Unterminated },
            ),
        };

        Directive {
            kind,
            variant: opener.variant,
            args: Vec::new(),
            span: opener.start..span_end,
            body: head_end..body_end,
            form,
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Directive;

    fn next(&mut self) -> Option<Self::Item> {
        let opener = find_opener(self.text, self.pos)?;
        let directive = self.parse(opener);
        self.pos = directive.span.end.max(opener.end);
        Some(directive)
    }
}

/// Collect every directive in a document
pub fn scan(text: &str) -> Vec<Directive> {
    Scanner::new(text).collect()
}
