//! Turns `kots.io/when` / `kots.io/exclude` annotations into a Helm
//! conditional wrapped around the whole document.

use crate::directive::{EqualsMode, TranslateOptions, Translator, go_quote};
use crate::error::{ConvertError, ConvertResult};
use crate::schema::ConfigSchema;
use serde_yaml::Value;
use tracing::debug;

pub const WHEN_ANNOTATION: &str = "kots.io/when";
pub const EXCLUDE_ANNOTATION: &str = "kots.io/exclude";

/// Which of the two recognised annotations a document carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalAnnotation {
    /// Emit the document when the expression renders `true`
    When,
    /// Emit the document unless the expression renders `true`
    Exclude,
}

impl ConditionalAnnotation {
    pub fn key(&self) -> &'static str {
        match self {
            Self::When => WHEN_ANNOTATION,
            Self::Exclude => EXCLUDE_ANNOTATION,
        }
    }

    /// Opening `if` for an expanded-mode expression
    fn open(&self, translated: &str) -> String {
        let renders_true = format!("eq (tpl {} $) \"true\"", go_quote(translated));
        match self {
            Self::When => format!("{{{{ if {renders_true} }}}}"),
            Self::Exclude => format!("{{{{ if not ({renders_true}) }}}}"),
        }
    }
}

/// Result of expanding one file
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub content: String,
    /// One entry per expanded document, in file order
    pub annotations: Vec<ConditionalAnnotation>,
}

impl Expansion {
    fn unchanged(content: &str) -> Self {
        Self {
            content: content.to_string(),
            annotations: Vec::new(),
        }
    }
}

/// Split text at `---` separator lines. Separators stay attached to the
/// document that follows, so joining the pieces restores the input.
fn split_documents(content: &str) -> Vec<&str> {
    let mut documents = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let is_separator = line.trim_end() == "---" || line.starts_with("--- ");
        if is_separator && offset > start {
            documents.push(&content[start..offset]);
            start = offset;
        }
        offset += line.len();
    }
    documents.push(&content[start..]);
    documents
}

/// Leading `---` line of a document, if it has one
fn split_separator(document: &str) -> (&str, &str) {
    if !document.starts_with("---") {
        return ("", document);
    }
    match document.find('\n') {
        Some(end) => document.split_at(end + 1),
        None => (document, ""),
    }
}

fn mentions_annotation(content: &str) -> bool {
    content.contains(WHEN_ANNOTATION) || content.contains(EXCLUDE_ANNOTATION)
}

pub struct AnnotationExpander<'s> {
    translator: Translator<'s>,
}

impl<'s> AnnotationExpander<'s> {
    /// Annotation values always translate in expanded mode: the result is
    /// consumed as a rendered string, which works in every context.
    pub fn new(schema: &'s ConfigSchema) -> Self {
        Self {
            translator: Translator::new(
                schema,
                TranslateOptions {
                    equals_mode: EqualsMode::Expanded,
                },
            ),
        }
    }

    /// Expand every document carrying one of the annotations; anything else
    /// is returned unchanged.
    ///
    /// Multi-document files are expanded one `---` document at a time. Only
    /// documents that mention an annotation key are parsed, so templates
    /// that are not valid YAML on their own pass straight through.
    pub fn expand(&self, content: &str) -> ConvertResult<Expansion> {
        if !mentions_annotation(content) {
            return Ok(Expansion::unchanged(content));
        }

        let mut expanded = String::with_capacity(content.len());
        let mut annotations = Vec::new();

        for document in split_documents(content) {
            let (separator, body) = split_separator(document);
            expanded.push_str(separator);

            match self.expand_document(body)? {
                Some((wrapped, annotation)) => {
                    expanded.push_str(&wrapped);
                    annotations.push(annotation);
                }
                None => expanded.push_str(body),
            }
        }

        Ok(Expansion {
            content: expanded,
            annotations,
        })
    }

    fn expand_document(&self, content: &str) -> ConvertResult<Option<(String, ConditionalAnnotation)>> {
        if !mentions_annotation(content) {
            return Ok(None);
        }

        let mut document: Value = serde_yaml::from_str(content).map_err(ConvertError::AnnotationDecode)?;

        let Some(metadata) = document.get_mut("metadata").and_then(Value::as_mapping_mut) else {
            return Ok(None);
        };
        let Some(annotations) = metadata.get_mut("annotations").and_then(Value::as_mapping_mut) else {
            return Ok(None);
        };

        let annotation = match (
            annotations.contains_key(WHEN_ANNOTATION),
            annotations.contains_key(EXCLUDE_ANNOTATION),
        ) {
            (true, true) => {
                return Err(ConvertError::ConflictingAnnotations {
                    when: WHEN_ANNOTATION,
                    exclude: EXCLUDE_ANNOTATION,
                });
            }
            (true, false) => ConditionalAnnotation::When,
            (false, true) => ConditionalAnnotation::Exclude,
            (false, false) => return Ok(None),
        };

        // The key has to go before remarshaling, otherwise the auditor
        // would count its value as an untranslated directive.
        let value = annotations.shift_remove(annotation.key()).unwrap_or(Value::Null);
        if annotations.is_empty() {
            metadata.shift_remove("annotations");
        }

        let expression = annotation_text(&value).ok_or(ConvertError::InvalidAnnotationValue {
            key: annotation.key(),
        })?;
        let translated = self.translator.translate(&expression)?;
        debug!("{} {:?} translated to {:?}", annotation.key(), expression, translated);

        let body = serde_yaml::to_string(&document).map_err(ConvertError::Remarshal)?;
        let wrapped = format!("{}\n{}\n{{{{ end }}}}\n", annotation.open(&translated), body.trim_end());
        Ok(Some((wrapped, annotation)))
    }
}

fn annotation_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConfigGroup, ConfigItem};

    fn schema() -> ConfigSchema {
        ConfigSchema {
            groups: vec![ConfigGroup {
                name: "group1".to_string(),
                title: None,
                items: vec![ConfigItem {
                    name: "mode".to_string(),
                    item_type: "string".to_string(),
                    default: None,
                }],
            }],
        }
    }

    #[test]
    fn test_when_annotation() {
        let schema = ConfigSchema::default();
        let content = r#"apiVersion: v1
kind: Service
metadata:
  name: api
  annotations:
    kots.io/when: "{{repl IsKurl}}"
spec:
  type: ClusterIP
"#;

        let expansion = AnnotationExpander::new(&schema).expand(content).unwrap();
        assert_eq!(expansion.annotations, vec![ConditionalAnnotation::When]);
        assert_eq!(
            expansion.content,
            r#"{{ if eq (tpl "{{ .Values.isKurl }}" $) "true" }}
apiVersion: v1
kind: Service
metadata:
  name: api
spec:
  type: ClusterIP
{{ end }}
"#
        );
        assert!(!expansion.content.contains(WHEN_ANNOTATION));
    }

    #[test]
    fn test_exclude_annotation_is_negated() {
        let schema = schema();
        let content = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: ha
  annotations:
    kots.io/exclude: '{{repl ConfigOptionEquals "mode" "ha"}}'
    team: platform
data:
  key: value
"#;

        let expansion = AnnotationExpander::new(&schema).expand(content).unwrap();
        assert_eq!(expansion.annotations, vec![ConditionalAnnotation::Exclude]);
        assert_eq!(
            expansion.content,
            r#"{{ if not (eq (tpl "{{ if eq .Values.group1.mode \"ha\" }}true{{ else }}false{{ end }}" $) "true") }}
apiVersion: v1
kind: ConfigMap
metadata:
  name: ha
  annotations:
    team: platform
data:
  key: value
{{ end }}
"#
        );
    }

    #[test]
    fn test_both_annotations_rejected() {
        let schema = ConfigSchema::default();
        let content = r#"metadata:
  annotations:
    kots.io/when: "true"
    kots.io/exclude: "false"
"#;
        let err = AnnotationExpander::new(&schema).expand(content).unwrap_err();
        assert!(matches!(err, ConvertError::ConflictingAnnotations { .. }));
    }

    #[test]
    fn test_boolean_annotation_value() {
        let schema = ConfigSchema::default();
        let content = "metadata:\n  name: x\n  annotations:\n    kots.io/when: false\n";
        let expansion = AnnotationExpander::new(&schema).expand(content).unwrap();
        assert!(expansion.content.starts_with(r#"{{ if eq (tpl "false" $) "true" }}"#));
    }

    #[test]
    fn test_document_without_annotations_is_not_parsed() {
        let schema = ConfigSchema::default();
        // Not valid YAML: the inner quotes end the outer string early
        let content = r#"name: "{{repl ConfigOption "foo1"}}""#;
        let expansion = AnnotationExpander::new(&schema).expand(content).unwrap();
        assert_eq!(expansion, Expansion::unchanged(content));
    }

    #[test]
    fn test_key_mentioned_outside_annotations() {
        let schema = ConfigSchema::default();
        let content = "data:\n  note: see kots.io/when docs\n";
        let expansion = AnnotationExpander::new(&schema).expand(content).unwrap();
        assert_eq!(expansion.content, content);
        assert!(expansion.annotations.is_empty());
    }

    #[test]
    fn test_unparseable_annotated_document() {
        let schema = ConfigSchema::default();
        let content = "metadata:\n  annotations:\n    kots.io/when: [unclosed\n";
        let err = AnnotationExpander::new(&schema).expand(content).unwrap_err();
        assert!(matches!(err, ConvertError::AnnotationDecode(_)));
    }

    #[test]
    fn test_non_scalar_annotation_value() {
        let schema = ConfigSchema::default();
        let content = "metadata:\n  name: x\n  annotations:\n    kots.io/when: [a]\n";
        let err = AnnotationExpander::new(&schema).expand(content).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidAnnotationValue { key: WHEN_ANNOTATION }));
    }

    #[test]
    fn test_unquoted_directive_cannot_be_remarshaled() {
        let schema = ConfigSchema::default();
        // `{{repl Namespace}}` parses as a flow mapping used as a key
        let content = "metadata:\n  name: x\n  annotations:\n    kots.io/when: 'true'\ndata:\n  ns: {{repl Namespace}}\n";
        let err = AnnotationExpander::new(&schema).expand(content).unwrap_err();
        assert!(matches!(err, ConvertError::Remarshal(_)));
    }

    #[test]
    fn test_multi_document_expanded_per_document() {
        let schema = ConfigSchema::default();
        let content = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: first
  annotations:
    kots.io/when: '{{repl IsKurl}}'
data:
  a: b
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: second
data:
  ns: {{repl Namespace}}
---
kind: Secret
metadata:
  name: third
  annotations:
    kots.io/exclude: "true"
"#;

        let expansion = AnnotationExpander::new(&schema).expand(content).unwrap();
        assert_eq!(
            expansion.annotations,
            vec![ConditionalAnnotation::When, ConditionalAnnotation::Exclude]
        );
        assert_eq!(
            expansion.content,
            r#"{{ if eq (tpl "{{ .Values.isKurl }}" $) "true" }}
apiVersion: v1
kind: ConfigMap
metadata:
  name: first
data:
  a: b
{{ end }}
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: second
data:
  ns: {{repl Namespace}}
---
{{ if not (eq (tpl "true" $) "true") }}
kind: Secret
metadata:
  name: third
{{ end }}
"#
        );
    }

    #[test]
    fn test_split_documents_roundtrip() {
        let content = "---\na: 1\n---\nb: 2\n--- # trailing\nc: 3";
        let documents = split_documents(content);
        assert_eq!(documents, vec!["---\na: 1\n", "---\nb: 2\n", "--- # trailing\nc: 3"]);
        assert_eq!(documents.concat(), content);
        assert_eq!(split_separator(documents[1]), ("---\n", "b: 2\n"));
        assert_eq!(split_separator("a: 1\n"), ("", "a: 1\n"));
    }
}
