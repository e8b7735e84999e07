//! Form payloads
//!
//! The urlencoded bodies the HTML forms submit, with the quirks of browser
//! forms smoothed over: empty selects become `None`, checkboxes are present
//! or absent, `datetime-local` values parse into UTC timestamps.
//!
//! None of the forms carries an author field; authorship is always stamped
//! server-side from the session.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Post, PostInput};
use crate::services::ProfileInput;

/// Accepted `pub_date` input formats, browser `datetime-local` first
const PUB_DATE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn empty_string_as_none_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Post create/edit form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub pub_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none_i64")]
    pub location_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none_i64")]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub image: Option<String>,
    /// Checkbox; present when checked
    #[serde(default)]
    pub is_published: Option<String>,
}

impl PostForm {
    /// Convert the submission into a `PostInput`, or a field error
    pub fn to_input(&self) -> Result<PostInput, String> {
        let pub_date = match self.pub_date.as_deref() {
            Some(raw) => Some(parse_pub_date(raw)?),
            None => None,
        };

        Ok(PostInput {
            title: self.title.trim().to_string(),
            text: self.text.clone(),
            pub_date,
            location_id: self.location_id,
            category_id: self.category_id,
            image: self.image.clone(),
            is_published: self.is_published.is_some(),
        })
    }

    /// Prefill the form from an existing post for the edit page
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: Some(post.pub_date.format("%Y-%m-%dT%H:%M").to_string()),
            location_id: post.location_id,
            category_id: post.category_id,
            image: post.image.clone(),
            is_published: post.is_published.then(|| "on".to_string()),
        }
    }
}

fn parse_pub_date(raw: &str) -> Result<DateTime<Utc>, String> {
    for format in PUB_DATE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(format!("Invalid publication date: {}", raw))
}

/// Comment create/edit form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// Profile edit form: exactly the fixed editable field subset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

impl ProfileForm {
    pub fn to_input(&self) -> ProfileInput {
        ProfileInput {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

/// Login form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub next: Option<String>,
}

/// Registration form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Only app-local paths are valid post-login redirect targets
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}
