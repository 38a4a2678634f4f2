use ignite_db::bson::{doc, DateTime, Document};
use serde::{Deserialize, Serialize};

/// A user record as stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Full name, non-empty
    pub name: String,
    /// Unique email address
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl User {
    /// Active user stamped with `now` as both creation and update time.
    pub fn new(name: &str, email: &str, phone: Option<&str>, now: DateTime) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            active: true,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

impl From<&User> for Document {
    fn from(user: &User) -> Self {
        let mut document = doc! {
            "name": user.name.as_str(),
            "email": user.email.as_str(),
        };
        if let Some(phone) = &user.phone {
            document.insert("phone", phone.as_str());
        }
        document.insert("active", user.active);
        if let Some(created_at) = user.created_at {
            document.insert("createdAt", created_at);
        }
        if let Some(updated_at) = user.updated_at {
            document.insert("updatedAt", updated_at);
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ignite_db::bson;

    #[test]
    fn document_uses_camel_case_timestamps() {
        let now = DateTime::now();
        let document = Document::from(&User::new("Ana", "ana@example.com", None, now));

        assert_eq!(document.get_datetime("createdAt").unwrap(), &now);
        assert_eq!(document.get_datetime("updatedAt").unwrap(), &now);
        assert!(document.get("phone").is_none());
        assert!(document.get_bool("active").unwrap());
    }

    #[test]
    fn document_reads_back_into_user() {
        let user = User::new("Ana", "ana@example.com", Some("1234567890"), DateTime::now());
        let read: User = bson::from_document(Document::from(&user)).unwrap();
        assert_eq!(read, user);
    }
}
