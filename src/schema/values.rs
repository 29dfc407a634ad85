use super::{ConfigItem, ConfigSchema, SemanticType};
use crate::directive::translator::parse_bool_literal;
use serde_yaml::{Mapping, Value};
use tracing::warn;

/// Key of the always-present flag telling templates they run on kURL
pub const IS_KURL_KEY: &str = "isKurl";

/// Project the schema onto a values map: `isKurl` plus `group -> item -> default`
pub fn project_values(schema: &ConfigSchema) -> Mapping {
    let mut values = Mapping::new();
    values.insert(Value::from(IS_KURL_KEY), Value::Bool(false));

    for group in &schema.groups {
        let mut group_values = Mapping::new();
        for item in &group.items {
            group_values.insert(Value::from(item.name.as_str()), default_value(item));
        }
        values.insert(Value::from(group.name.as_str()), Value::Mapping(group_values));
    }

    values
}

/// Boolean items hold real booleans, since translated comparisons test
/// them against `true`/`false`; everything else keeps its declared default.
fn default_value(item: &ConfigItem) -> Value {
    if item.semantic_type() != SemanticType::Bool {
        return item.default.clone().unwrap_or_else(|| Value::from(""));
    }

    match &item.default {
        None => Value::Bool(false),
        Some(Value::Bool(b)) => Value::Bool(*b),
        Some(Value::String(s)) if s.is_empty() => Value::Bool(false),
        Some(Value::String(s)) => match parse_bool_literal(s) {
            Some(b) => Value::Bool(b),
            None => {
                warn!("bool item {} has default {:?}; using false", item.name, s);
                Value::Bool(false)
            }
        },
        Some(Value::Number(n)) => Value::Bool(n.as_i64().is_some_and(|v| v != 0)),
        Some(other) => {
            warn!("bool item {} has non-scalar default {:?}; using false", item.name, other);
            Value::Bool(false)
        }
    }
}

/// Render the projected values as a `values.yaml` document
pub fn render_values(schema: &ConfigSchema) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&project_values(schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConfigGroup, ConfigItem};

    #[test]
    fn test_empty_schema_still_has_is_kurl() {
        let rendered = render_values(&ConfigSchema::default()).unwrap();
        assert_eq!(rendered, "isKurl: false\n");
    }

    #[test]
    fn test_projection_keeps_declaration_order() {
        let schema = ConfigSchema {
            groups: vec![ConfigGroup {
                name: "db".to_string(),
                title: None,
                items: vec![
                    ConfigItem {
                        name: "host".to_string(),
                        item_type: "string".to_string(),
                        default: Some(Value::from("postgres")),
                    },
                    ConfigItem {
                        name: "password".to_string(),
                        item_type: "password".to_string(),
                        default: None,
                    },
                ],
            }],
        };

        let rendered = render_values(&schema).unwrap();
        assert_eq!(rendered, "isKurl: false\ndb:\n  host: postgres\n  password: ''\n");
    }

    #[test]
    fn test_bool_defaults_are_booleans() {
        let item = |name: &str, default: Option<Value>| ConfigItem {
            name: name.to_string(),
            item_type: "bool".to_string(),
            default,
        };
        let schema = ConfigSchema {
            groups: vec![ConfigGroup {
                name: "db".to_string(),
                title: None,
                items: vec![
                    item("embedded", Some(Value::from("1"))),
                    item("tls", None),
                    item("ha", Some(Value::from("false"))),
                    item("metrics", Some(Value::Bool(true))),
                    item("empty", Some(Value::from(""))),
                ],
            }],
        };

        let rendered = render_values(&schema).unwrap();
        assert_eq!(
            rendered,
            "isKurl: false\ndb:\n  embedded: true\n  tls: false\n  ha: false\n  metrics: true\n  empty: false\n"
        );
    }
}
