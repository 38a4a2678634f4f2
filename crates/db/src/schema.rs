//! Collection validator contracts expressed as `$jsonSchema` documents.

use mongodb::bson::{doc, Bson, Document};
use regex::Regex;

/// BSON type names accepted by `$jsonSchema` `bsonType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsonType {
    String,
    Bool,
    Date,
    Object,
}

impl BsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            BsonType::String => "string",
            BsonType::Bool => "bool",
            BsonType::Date => "date",
            BsonType::Object => "object",
        }
    }

    /// Whether `value` has this BSON type.
    pub fn matches(self, value: &Bson) -> bool {
        matches!(
            (self, value),
            (BsonType::String, Bson::String(_))
                | (BsonType::Bool, Bson::Boolean(_))
                | (BsonType::Date, Bson::DateTime(_))
                | (BsonType::Object, Bson::Document(_))
        )
    }
}

/// Regular expression a string property must match, compiled once when the
/// rule is declared.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Constraints declared for one property.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub name: String,
    pub bson_type: BsonType,
    pub pattern: Option<Pattern>,
    pub min_length: Option<u32>,
    pub description: Option<String>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, bson_type: BsonType) -> Self {
        Self {
            name: name.into(),
            bson_type,
            pattern: None,
            min_length: None,
            description: None,
        }
    }

    /// Require string values to match `pattern`. Fails if the expression
    /// does not compile.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.pattern = Some(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn min_length(mut self, min: u32) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_document(&self) -> Document {
        let mut property = doc! { "bsonType": self.bson_type.as_str() };
        if let Some(min) = self.min_length {
            property.insert("minLength", i64::from(min));
        }
        if let Some(pattern) = &self.pattern {
            property.insert("pattern", pattern.as_str());
        }
        if let Some(description) = &self.description {
            property.insert("description", description.as_str());
        }
        property
    }

    fn check(&self, value: &Bson) -> Result<(), String> {
        if !self.bson_type.matches(value) {
            return Err(format!(
                "field '{}' must be of bsonType '{}'",
                self.name,
                self.bson_type.as_str()
            ));
        }

        let Bson::String(text) = value else {
            return Ok(());
        };

        if let Some(min) = self.min_length {
            if text.chars().count() < min as usize {
                return Err(format!(
                    "field '{}' must be at least {} characters",
                    self.name, min
                ));
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(text) {
                return Err(format!(
                    "field '{}' does not match pattern '{}'",
                    self.name,
                    pattern.as_str()
                ));
            }
        }

        Ok(())
    }
}

/// Validation rule attached to a collection and evaluated by the store on
/// every insert and update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaContract {
    required: Vec<String>,
    properties: Vec<FieldRule>,
}

impl SchemaContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property that must be present.
    pub fn required(mut self, rule: FieldRule) -> Self {
        self.required.push(rule.name.clone());
        self.properties.push(rule);
        self
    }

    /// Declare a property that may be absent.
    pub fn optional(mut self, rule: FieldRule) -> Self {
        self.properties.push(rule);
        self
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    /// The `$jsonSchema` body, without the `$jsonSchema` wrapper.
    pub fn to_json_schema(&self) -> Document {
        let mut properties = Document::new();
        for rule in &self.properties {
            properties.insert(rule.name.clone(), rule.to_document());
        }

        doc! {
            "bsonType": BsonType::Object.as_str(),
            "required": self.required.clone(),
            "properties": properties,
        }
    }

    /// The full `validator` option for a `create` command.
    pub fn to_validator(&self) -> Document {
        doc! { "$jsonSchema": self.to_json_schema() }
    }

    /// Evaluate `document` the way the server evaluates the validator.
    /// Unknown fields are allowed.
    pub fn validate(&self, document: &Document) -> Result<(), String> {
        for field in &self.required {
            if !document.contains_key(field) {
                return Err(format!("missing required field '{field}'"));
            }
        }

        for rule in &self.properties {
            if let Some(value) = document.get(&rule.name) {
                rule.check(value)?;
            }
        }

        Ok(())
    }
}
