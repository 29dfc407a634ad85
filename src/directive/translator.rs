use super::scanner::{ident_end, is_ident, read_args, skip_quoted};
use super::{Directive, DirectiveKind, Form, Scanner, go_quote};
use crate::error::{ConvertError, ConvertResult};
use crate::schema::values::IS_KURL_KEY;
use crate::schema::{ConfigSchema, ResolvedPath, SemanticType};
use tracing::debug;

/// Helm reference for the release namespace
pub const NAMESPACE_REF: &str = ".Release.Namespace";

/// How `ConfigOptionEquals` is written out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EqualsMode {
    /// `{{ if eq A B }}true{{ else }}false{{ end }}`, valid in any context
    #[default]
    Expanded,
    /// `{{ eq A B }}`
    Inline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    pub equals_mode: EqualsMode,
}

/// The rewrite passes, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ConfigOption,
    ConfigOptionEquals,
    Namespace,
    IsKurl,
    /// `if`/`else`/`end`; runs last so conditions are already rewritten
    Conditional,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::ConfigOption,
        Phase::ConfigOptionEquals,
        Phase::Namespace,
        Phase::IsKurl,
        Phase::Conditional,
    ];

    fn handles(&self, kind: &DirectiveKind) -> bool {
        match self {
            Phase::ConfigOption => *kind == DirectiveKind::ConfigOption,
            Phase::ConfigOptionEquals => *kind == DirectiveKind::ConfigOptionEquals,
            Phase::Namespace => *kind == DirectiveKind::Namespace,
            Phase::IsKurl => matches!(kind, DirectiveKind::IsKurl | DirectiveKind::NotIsKurl),
            Phase::Conditional => kind.is_conditional(),
        }
    }
}

/// Rewrites legacy directives into Helm template syntax.
///
/// Directives naming options missing from the schema are left exactly as
/// they were; the auditor picks them up afterwards.
pub struct Translator<'s> {
    schema: &'s ConfigSchema,
    options: TranslateOptions,
}

impl<'s> Translator<'s> {
    pub fn new(schema: &'s ConfigSchema, options: TranslateOptions) -> Self {
        Self { schema, options }
    }

    /// Run every phase over the document
    pub fn translate(&self, content: &str) -> ConvertResult<String> {
        let mut current = content.to_string();
        for phase in Phase::ALL {
            current = self.run_phase(&current, phase)?;
        }
        Ok(current)
    }

    /// Run a single phase. Text with no directives for the phase is returned
    /// unchanged.
    pub fn run_phase(&self, content: &str, phase: Phase) -> ConvertResult<String> {
        let mut output = String::with_capacity(content.len());
        let mut copied = 0;

        for directive in Scanner::new(content) {
            let replacement = self.rewrite(content, &directive, phase)?;
            if let Some(replacement) = replacement {
                debug!("replaced {} with {}", directive.text(content), replacement);
                output.push_str(&content[copied..directive.span.start]);
                output.push_str(&replacement);
                copied = directive.span.end;
            }
        }

        output.push_str(&content[copied..]);
        Ok(output)
    }

    fn rewrite(&self, content: &str, directive: &Directive, phase: Phase) -> ConvertResult<Option<String>> {
        if directive.form == Form::Malformed {
            return Ok(None);
        }

        // Conditions of if/else are rewritten in place by the earlier phases
        if phase != Phase::Conditional && matches!(directive.kind, DirectiveKind::If | DirectiveKind::Else) {
            return self.rewrite_condition_in_place(content, directive, phase);
        }

        if !phase.handles(&directive.kind) {
            return Ok(None);
        }

        match directive.kind {
            DirectiveKind::ConfigOption => Ok(self
                .schema
                .resolve(&directive.args[0])
                .map(|resolved| reference(&resolved.values_ref(), directive.form))),
            DirectiveKind::ConfigOptionEquals => self.rewrite_equals(directive),
            DirectiveKind::Namespace => Ok(Some(reference(NAMESPACE_REF, directive.form))),
            DirectiveKind::IsKurl => Ok(Some(reference(&is_kurl_ref(), directive.form))),
            DirectiveKind::NotIsKurl => Ok(Some(reference(&format!("not {}", is_kurl_ref()), directive.form))),
            DirectiveKind::If | DirectiveKind::Else | DirectiveKind::End => {
                Ok(rewrite_conditional(content, directive))
            }
            DirectiveKind::Unknown(_) => Ok(None),
        }
    }

    fn rewrite_equals(&self, directive: &Directive) -> ConvertResult<Option<String>> {
        let (name, literal) = (&directive.args[0], &directive.args[1]);
        let Some(resolved) = self.schema.resolve(name) else {
            return Ok(None);
        };
        let Some(comparison) = comparison(&resolved, name, literal)? else {
            debug!("{} has type {:?}, leaving ConfigOptionEquals untouched", name, resolved.semantic_type);
            return Ok(None);
        };

        match (self.options.equals_mode, directive.form) {
            (EqualsMode::Expanded, Form::Closed) => Ok(Some(format!(
                "{{{{ if {} }}}}true{{{{ else }}}}false{{{{ end }}}}",
                comparison
            ))),
            (EqualsMode::Inline, form) => Ok(Some(reference(&comparison, form))),
            (EqualsMode::Expanded, _) => Ok(None),
        }
    }

    fn rewrite_condition_in_place(
        &self,
        content: &str,
        directive: &Directive,
        phase: Phase,
    ) -> ConvertResult<Option<String>> {
        let body = directive.body_text(content);
        let rewritten = self.rewrite_condition(body, phase)?;
        if rewritten == body {
            return Ok(None);
        }

        Ok(Some(format!(
            "{}{}{}",
            &content[directive.span.start..directive.body.start],
            rewritten,
            &content[directive.body.end..directive.span.end]
        )))
    }

    /// Rewrite bare sub-expressions of the phase's kind inside a condition
    pub fn rewrite_condition(&self, body: &str, phase: Phase) -> ConvertResult<String> {
        let bytes = body.as_bytes();
        let mut output = String::with_capacity(body.len());
        let mut copied = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'`' => i = skip_quoted(bytes, i),
                b if b.is_ascii_alphabetic() && !follows_reference(bytes, i) => {
                    let word_end = ident_end(bytes, i);
                    match self.rewrite_call(body, &body[i..word_end], word_end, phase)? {
                        Some((replacement, end)) => {
                            output.push_str(&body[copied..i]);
                            output.push_str(&replacement);
                            copied = end;
                            i = end;
                        }
                        None => i = word_end,
                    }
                }
                _ => i += 1,
            }
        }

        output.push_str(&body[copied..]);
        Ok(output)
    }

    /// A bare call `word args...` at `args_start`; returns the replacement
    /// expression and where the call ends
    fn rewrite_call(
        &self,
        body: &str,
        word: &str,
        args_start: usize,
        phase: Phase,
    ) -> ConvertResult<Option<(String, usize)>> {
        match (phase, word) {
            (Phase::ConfigOption, "ConfigOption") => {
                let Some((args, end)) = read_args(body, args_start, 1) else {
                    return Ok(None);
                };
                Ok(self.schema.resolve(&args[0]).map(|resolved| (resolved.values_ref(), end)))
            }
            (Phase::ConfigOptionEquals, "ConfigOptionEquals") => {
                let Some((args, end)) = read_args(body, args_start, 2) else {
                    return Ok(None);
                };
                let Some(resolved) = self.schema.resolve(&args[0]) else {
                    return Ok(None);
                };
                Ok(comparison(&resolved, &args[0], &args[1])?.map(|expr| (expr, end)))
            }
            (Phase::Namespace, "Namespace") => Ok(Some((NAMESPACE_REF.to_string(), args_start))),
            (Phase::IsKurl, "IsKurl") => Ok(Some((is_kurl_ref(), args_start))),
            _ => Ok(None),
        }
    }
}

fn is_kurl_ref() -> String {
    format!(".Values.{IS_KURL_KEY}")
}

/// `true` when the byte before `pos` makes the word a field or variable
/// access rather than a function call
fn follows_reference(bytes: &[u8], pos: usize) -> bool {
    pos > 0 && (is_ident(bytes[pos - 1]) || bytes[pos - 1] == b'.' || bytes[pos - 1] == b'$')
}

/// Whether a condition still calls a legacy function. Target-dialect
/// functions are all lower-case, legacy ones start with a capital.
pub fn has_legacy_call(body: &str) -> bool {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'`' => i = skip_quoted(bytes, i),
            b if b.is_ascii_alphabetic() && !follows_reference(bytes, i) => {
                if b.is_ascii_uppercase() {
                    return true;
                }
                i = ident_end(bytes, i);
            }
            _ => i += 1,
        }
    }
    false
}

/// `{{ <expr> }}`, or just the open half when a pipe follows
fn reference(expr: &str, form: Form) -> String {
    match form {
        Form::Piped => format!("{{{{ {expr} "),
        _ => format!("{{{{ {expr} }}}}"),
    }
}

/// Build the `eq` test for an option against a literal.
///
/// `None` for option types compared by neither string nor boolean equality.
fn comparison(resolved: &ResolvedPath, name: &str, literal: &str) -> ConvertResult<Option<String>> {
    let comparand = match &resolved.semantic_type {
        t if t.is_quoted_string() => go_quote(literal),
        SemanticType::Bool => parse_bool_literal(literal)
            .ok_or_else(|| ConvertError::MalformedBooleanLiteral {
                item: name.to_string(),
                literal: literal.to_string(),
            })?
            .to_string(),
        _ => return Ok(None),
    };
    Ok(Some(format!("eq {} {}", resolved.values_ref(), comparand)))
}

/// Accepted boolean spellings: `0`/`1` and `true`/`false`
pub fn parse_bool_literal(literal: &str) -> Option<bool> {
    match literal {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn rewrite_conditional(content: &str, directive: &Directive) -> Option<String> {
    let keyword = match directive.kind {
        DirectiveKind::If => "if",
        DirectiveKind::Else => "else",
        DirectiveKind::End => "end",
        _ => return None,
    };

    let body = directive.body_text(content);
    if has_legacy_call(body) {
        return None;
    }

    let rewritten = match (directive.form, body.trim()) {
        (Form::Unterminated, _) => format!("{{{{ {} {}", keyword, body.trim_start()),
        (_, "") => format!("{{{{ {keyword} }}}}"),
        (_, condition) => format!("{{{{ {keyword} {condition} }}}}"),
    };
    Some(rewritten)
}
