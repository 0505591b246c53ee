//! Database models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Admin account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "admin_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Admin,
    Editor,
}

/// Blog post lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Scheduled,
    Archived,
}

impl Default for PostStatus {
    fn default() -> Self {
        PostStatus::Draft
    }
}

/// Lead pipeline status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
    Archived,
}

/// Admin user row. `password_hash` is nullable only before setup has run.
#[derive(Debug, Clone, FromRow)]
pub struct AdminUser {
    pub id: i32,
    pub email: String,
    pub password_hash: Option<String>,
    pub name: String,
    pub role: AdminRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_signed_in: Option<DateTime<Utc>>,
}

/// Public view of an admin account, safe to return to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
}

impl From<AdminUser> for AdminProfile {
    fn from(user: AdminUser) -> Self {
        AdminProfile {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Blog post row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub cover_image_alt: Option<String>,
    pub video_url: Option<String>,
    pub author_name: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub og_image: Option<String>,
    pub cta_text: Option<String>,
    pub cta_url: Option<String>,
    pub status: PostStatus,
    pub is_featured: bool,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload for blog posts. A present `id` selects update; absence
/// selects insert. `is_published` and `published_at` are recomputed from
/// `status` at write time and never taken from the client as-is.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostUpsert {
    pub id: Option<i32>,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub cover_image_alt: Option<String>,
    pub video_url: Option<String>,
    pub author_name: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub og_image: Option<String>,
    pub cta_text: Option<String>,
    pub cta_url: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    pub is_featured: Option<bool>,
    pub published_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Blog category row. Posts reference categories by slug string, not by
/// foreign key, so deleting a category never cascades.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCategory {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Upsert payload for categories
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpsert {
    pub id: Option<i32>,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

/// FAQ item row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqItem {
    pub id: i32,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub is_published: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload for FAQ items
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqUpsert {
    pub id: Option<i32>,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub is_published: Option<bool>,
    pub sort_order: Option<i32>,
}

/// Lead row, created by the public contact form
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for leads (status always starts at `new`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
}

/// Media file metadata row. The backing bytes live on disk under the upload
/// directory; this row only records what the upload handler stored.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: i32,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i32,
    pub url: String,
    pub file_key: String,
    pub alt: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for media metadata, produced by the upload handler
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaFile {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i32,
    pub url: String,
    pub file_key: String,
    pub alt: Option<String>,
}

/// Site setting row - free-form key/value pair
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSetting {
    pub id: i32,
    pub setting_key: String,
    pub setting_value: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PostStatus::Published).unwrap(),
            "\"published\""
        );
        let status: PostStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(status, PostStatus::Archived);
    }

    #[test]
    fn post_status_rejects_unknown_variant() {
        let result = serde_json::from_str::<PostStatus>("\"live\"");
        assert!(result.is_err());
    }

    #[test]
    fn upsert_payload_defaults_status_to_draft() {
        let payload: BlogPostUpsert =
            serde_json::from_str(r#"{"slug":"tax-law-basics","title":"Tax Law Basics"}"#).unwrap();
        assert_eq!(payload.status, PostStatus::Draft);
        assert!(payload.id.is_none());
    }

    #[test]
    fn admin_profile_drops_password_hash() {
        let user = AdminUser {
            id: 1,
            email: "ana@example.com".to_string(),
            password_hash: Some("$2b$12$secret".to_string()),
            name: "Ana".to_string(),
            role: AdminRole::Admin,
            is_active: true,
            created_at: Utc::now(),
            last_signed_in: None,
        };
        let profile = AdminProfile::from(user);
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"role\":\"admin\""));
    }
}
