//! Catalog request and response shapes.
//!
//! Optional fields are skipped when serializing, so an echoed item only
//! carries what the client actually sent.

use std::collections::BTreeSet;

use atelier_store::hash_password;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// An image reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Image {
    #[validate(url)]
    pub url: String,
    pub name: String,
}

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Item {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 300))]
    pub description: Option<String>,
    /// Must be greater than zero.
    #[validate(range(exclusive_min = 0.0))]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_offer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Duplicates collapse; serialized in sorted order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Vec<Image>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_at: Option<NaiveTime>,
    /// Delay in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_after: Option<f64>,
}

impl Item {
    /// Validates the item's own fields and then every embedded image.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        for image in self.image.iter().chain(self.thumbnails.iter().flatten()) {
            image.validate()?;
        }
        Ok(())
    }
}

/// An offer bundling several items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub items: Vec<Item>,
}

impl Offer {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        self.items.iter().try_for_each(Item::check)
    }
}

/// Registration input. Carries the raw password.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserIn {
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// What a registration returns. Has no password field at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOut {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// What a registration would store.
#[derive(Debug, Clone)]
pub struct UserInDb {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

impl From<UserIn> for UserInDb {
    fn from(user: UserIn) -> Self {
        Self {
            hashed_password: hash_password(&user.password),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

impl From<UserInDb> for UserOut {
    fn from(user: UserInDb) -> Self {
        Self {
            username: user.username,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

/// A timestamped log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub title: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Item {
        serde_json::from_value(value).expect("item should deserialize")
    }

    #[test]
    fn unset_fields_are_not_serialized() {
        let echoed = serde_json::to_value(item(json!({ "name": "Foo", "price": 35.4 })))
            .expect("item should serialize");
        assert_eq!(echoed, json!({ "name": "Foo", "price": 35.4 }));
    }

    #[test]
    fn unique_tags_collapse() {
        let parsed = item(json!({
            "name": "Foo",
            "price": 1.0,
            "unique_tags": ["b", "a", "b"]
        }));
        let tags: Vec<_> = parsed.unique_tags.expect("tags").into_iter().collect();
        assert_eq!(tags, ["a", "b"]);
    }

    #[test]
    fn price_must_be_positive() {
        assert!(item(json!({ "name": "Foo", "price": 0.0 })).check().is_err());
        assert!(item(json!({ "name": "Foo", "price": 0.01 })).check().is_ok());
    }

    #[test]
    fn description_is_capped() {
        let long = "x".repeat(301);
        assert!(item(json!({ "name": "Foo", "price": 1.0, "description": long }))
            .check()
            .is_err());
    }

    #[test]
    fn embedded_images_are_checked() {
        let bad_thumb = item(json!({
            "name": "Foo",
            "price": 1.0,
            "thumbnails": [
                { "url": "https://example.com/a.png", "name": "a" },
                { "url": "not a url", "name": "b" }
            ]
        }));
        assert!(bad_thumb.check().is_err());

        let good = item(json!({
            "name": "Foo",
            "price": 1.0,
            "image": { "url": "https://example.com/a.png", "name": "a" }
        }));
        assert!(good.check().is_ok());
    }

    #[test]
    fn user_out_drops_password() {
        let user_in = UserIn {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
            full_name: None,
        };

        let stored = UserInDb::from(user_in);
        assert_eq!(stored.hashed_password, hash_password("hunter2"));

        let out = serde_json::to_value(UserOut::from(stored)).expect("should serialize");
        assert_eq!(
            out,
            json!({ "username": "ada", "email": "ada@example.com", "full_name": null })
        );
    }
}
