//! Schema types and builders for tfplug
//!
//! Providers and data sources describe their attributes with these types.
//! Terraform uses the schema to type-check configuration and to decide which
//! attributes it must supply and which the provider computes.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// AttributeType mirrors the primitive and collection types of Terraform
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// JSON type constraint as Terraform expects it in schema responses
    pub fn to_type_json(&self) -> serde_json::Value {
        match self {
            AttributeType::String => serde_json::json!("string"),
            AttributeType::Number => serde_json::json!("number"),
            AttributeType::Bool => serde_json::json!("bool"),
            AttributeType::List(elem) => serde_json::json!(["list", elem.to_type_json()]),
            AttributeType::Map(elem) => serde_json::json!(["map", elem.to_type_json()]),
        }
    }

    fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null | Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(elem), Dynamic::List(items)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (AttributeType::Map(elem), Dynamic::Map(entries)) => {
                entries.values().all(|item| elem.accepts(item))
            }
            _ => false,
        }
    }
}

/// Schema is returned by providers and data sources
#[derive(Debug, Clone)]
pub struct Schema {
    /// Increment when a change requires state migration
    pub version: i64,
    pub description: String,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Checks a config object against the schema
    ///
    /// Required attributes must be present and not null. Unknown values pass,
    /// since they only resolve during apply. Computed-only attributes must not
    /// be set by the user.
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for attr in &self.attributes {
            let path = AttributePath::new(&attr.name);
            let value = config.get_or_null(&path).unwrap_or(Dynamic::Null);

            if attr.required && value.is_null() {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!(
                            "The argument \"{}\" is required, but no definition was found.",
                            attr.name
                        ),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            let computed_only = attr.computed && !attr.optional && !attr.required;
            if computed_only && !value.is_null() && !value.is_unknown() {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid configuration",
                        format!("The attribute \"{}\" is computed and cannot be set.", attr.name),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            if !attr.r#type.accepts(&value) {
                diagnostics.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!(
                            "Inappropriate value for attribute \"{}\": got {}.",
                            attr.name,
                            value.type_name()
                        ),
                    )
                    .with_attribute(path),
                );
            }
        }

        diagnostics
    }
}

/// Attribute represents a single configuration attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
}

/// AttributeBuilder provides a fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Sensitive values are redacted from plan output
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides a fluent API for building schemas
#[derive(Default)]
pub struct SchemaBuilder {
    version: i64,
    description: String,
    attributes: Vec<Attribute>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            version: self.version,
            description: self.description,
            attributes: self.attributes,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn lookup_schema() -> Schema {
        SchemaBuilder::new()
            .description("lookup")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("filter", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret", AttributeType::String)
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build()
    }

    #[test]
    fn builder_sets_flags() {
        let schema = lookup_schema();

        let filter = schema.attribute("filter").unwrap();
        assert!(filter.required);
        assert!(!filter.optional);

        let secret = schema.attribute("secret").unwrap();
        assert!(secret.optional);
        assert!(secret.sensitive);

        assert!(schema.attribute("id").unwrap().computed);
        assert!(schema.attribute("missing").is_none());
    }

    #[test]
    fn required_attribute_must_be_set() {
        let diags = lookup_schema().validate_config(&DynamicValue::object());

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("filter")));
    }

    #[test]
    fn unknown_required_value_passes() {
        let config = DynamicValue::from_pairs([("filter", Dynamic::Unknown)]);

        assert!(lookup_schema().validate_config(&config).is_empty());
    }

    #[test]
    fn computed_attribute_cannot_be_configured() {
        let config = DynamicValue::from_pairs([("filter", "web"), ("id", "123")]);

        let diags = lookup_schema().validate_config(&config);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(AttributePath::new("id")));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let config = DynamicValue::from_pairs([("filter", true)]);

        let diags = lookup_schema().validate_config(&config);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("got bool"));
    }

    #[test]
    fn type_json_matches_terraform_constraints() {
        assert_eq!(AttributeType::String.to_type_json(), serde_json::json!("string"));
        assert_eq!(
            AttributeType::List(Box::new(AttributeType::String)).to_type_json(),
            serde_json::json!(["list", "string"])
        );
    }
}
