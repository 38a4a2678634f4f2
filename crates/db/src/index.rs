use std::fmt;

use mongodb::{bson::Document, options::IndexOptions, IndexModel};

/// Single-field ascending index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub field: String,
    pub unique: bool,
}

impl IndexSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: false,
        }
    }

    pub fn unique(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: true,
        }
    }

    /// Server-assigned default name, e.g. `email_1`.
    pub fn name(&self) -> String {
        format!("{}_1", self.field)
    }

    pub fn to_model(&self) -> IndexModel {
        let mut options = IndexOptions::default();
        options.name = Some(self.name());
        if self.unique {
            options.unique = Some(true);
        }

        let mut keys = Document::new();
        keys.insert(self.field.clone(), 1);

        IndexModel::builder()
            .keys(keys)
            .options(options)
            .build()
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unique {
            write!(f, "{} (unique)", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn display_marks_unique_indexes() {
        assert_eq!(IndexSpec::unique("email").to_string(), "email (unique)");
        assert_eq!(IndexSpec::ascending("createdAt").to_string(), "createdAt");
    }

    #[test]
    fn model_carries_keys_and_uniqueness() {
        let model = IndexSpec::unique("email").to_model();
        assert_eq!(model.keys, doc! { "email": 1 });
        let options = model.options.unwrap();
        assert_eq!(options.unique, Some(true));
        assert_eq!(options.name.as_deref(), Some("email_1"));

        let model = IndexSpec::ascending("name").to_model();
        assert_eq!(model.options.unwrap().unique, None);
    }
}
