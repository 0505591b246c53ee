//! Data access layer. Every database statement in the crate lives here, one
//! function per entity and operation. Lookups return `Ok(None)` for missing
//! rows; everything else propagates the sqlx error to the caller, which maps
//! it to a client-facing status.

use chrono::Utc;
use sqlx::PgPool;

use crate::db::models::{
    AdminUser, BlogCategory, BlogPost, BlogPostUpsert, CategoryUpsert, FaqItem, FaqUpsert, Lead,
    LeadStatus, MediaFile, NewLead, NewMediaFile, PostStatus, SiteSetting,
};

// ============================================================================
// Admin users
// ============================================================================

pub async fn get_admin_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as::<_, AdminUser>(
        "SELECT * FROM admin_users WHERE LOWER(email) = LOWER($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn get_admin_by_id(pool: &PgPool, id: i32) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Creates the bootstrap admin. Role is always `admin` and the account is
/// active; the unique email constraint surfaces duplicates as errors.
pub async fn create_admin(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    name: &str,
) -> Result<AdminUser, sqlx::Error> {
    sqlx::query_as::<_, AdminUser>(
        r#"
        INSERT INTO admin_users (email, password_hash, name, role, is_active)
        VALUES ($1, $2, $3, 'admin', true)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .fetch_one(pool)
    .await
}

pub async fn update_last_signed_in(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE admin_users SET last_signed_in = now() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_admins(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM admin_users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ============================================================================
// Blog posts
// ============================================================================

pub async fn list_blog_posts(pool: &PgPool) -> Result<Vec<BlogPost>, sqlx::Error> {
    sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn get_blog_post_by_id(pool: &PgPool, id: i32) -> Result<Option<BlogPost>, sqlx::Error> {
    sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_blog_post_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<BlogPost>, sqlx::Error> {
    sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
}

/// Publish-state consistency: `is_published` always mirrors the status, and
/// publishing without an explicit timestamp stamps the current time.
/// `published_at`/`scheduled_at` keep their stored values on update when the
/// payload omits them.
pub async fn upsert_blog_post(
    pool: &PgPool,
    input: &BlogPostUpsert,
) -> Result<BlogPost, sqlx::Error> {
    let is_published = input.status == PostStatus::Published;
    let published_at = match input.published_at {
        Some(at) => Some(at),
        None if is_published => Some(Utc::now()),
        None => None,
    };

    if let Some(id) = input.id {
        sqlx::query_as::<_, BlogPost>(
            r#"
            UPDATE blog_posts SET
                slug = $1, title = $2, subtitle = $3, excerpt = $4, content = $5,
                cover_image = $6, cover_image_alt = $7, video_url = $8, author_name = $9,
                category = $10, tags = $11, meta_title = $12, meta_description = $13,
                meta_keywords = $14, og_image = $15, cta_text = $16, cta_url = $17,
                status = $18, is_featured = COALESCE($19, is_featured),
                is_published = $20,
                published_at = COALESCE($21, published_at),
                scheduled_at = COALESCE($22, scheduled_at),
                updated_at = now()
            WHERE id = $23
            RETURNING *
            "#,
        )
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.subtitle)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&input.cover_image)
        .bind(&input.cover_image_alt)
        .bind(&input.video_url)
        .bind(&input.author_name)
        .bind(&input.category)
        .bind(&input.tags)
        .bind(&input.meta_title)
        .bind(&input.meta_description)
        .bind(&input.meta_keywords)
        .bind(&input.og_image)
        .bind(&input.cta_text)
        .bind(&input.cta_url)
        .bind(input.status)
        .bind(input.is_featured)
        .bind(is_published)
        .bind(published_at)
        .bind(input.scheduled_at)
        .bind(id)
        .fetch_one(pool)
        .await
    } else {
        sqlx::query_as::<_, BlogPost>(
            r#"
            INSERT INTO blog_posts (
                slug, title, subtitle, excerpt, content,
                cover_image, cover_image_alt, video_url, author_name,
                category, tags, meta_title, meta_description,
                meta_keywords, og_image, cta_text, cta_url,
                status, is_featured, is_published, published_at, scheduled_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING *
            "#,
        )
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.subtitle)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&input.cover_image)
        .bind(&input.cover_image_alt)
        .bind(&input.video_url)
        .bind(&input.author_name)
        .bind(&input.category)
        .bind(&input.tags)
        .bind(&input.meta_title)
        .bind(&input.meta_description)
        .bind(&input.meta_keywords)
        .bind(&input.og_image)
        .bind(&input.cta_text)
        .bind(&input.cta_url)
        .bind(input.status)
        .bind(input.is_featured.unwrap_or(false))
        .bind(is_published)
        .bind(published_at)
        .bind(input.scheduled_at)
        .fetch_one(pool)
        .await
    }
}

pub async fn delete_blog_post(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_posts(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_posts_by_status(
    pool: &PgPool,
    status: PostStatus,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ============================================================================
// Blog categories
// ============================================================================

pub async fn list_categories(pool: &PgPool) -> Result<Vec<BlogCategory>, sqlx::Error> {
    sqlx::query_as::<_, BlogCategory>(
        "SELECT * FROM blog_categories ORDER BY sort_order, name",
    )
    .fetch_all(pool)
    .await
}

pub async fn upsert_category(
    pool: &PgPool,
    input: &CategoryUpsert,
) -> Result<BlogCategory, sqlx::Error> {
    if let Some(id) = input.id {
        sqlx::query_as::<_, BlogCategory>(
            r#"
            UPDATE blog_categories
            SET slug = $1, name = $2, description = $3,
                sort_order = COALESCE($4, sort_order)
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.sort_order)
        .bind(id)
        .fetch_one(pool)
        .await
    } else {
        sqlx::query_as::<_, BlogCategory>(
            r#"
            INSERT INTO blog_categories (slug, name, description, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.sort_order.unwrap_or(0))
        .fetch_one(pool)
        .await
    }
}

pub async fn delete_category(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM blog_categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_categories(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_categories")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ============================================================================
// FAQ
// ============================================================================

pub async fn list_faq(pool: &PgPool) -> Result<Vec<FaqItem>, sqlx::Error> {
    sqlx::query_as::<_, FaqItem>("SELECT * FROM faq_items ORDER BY sort_order, id")
        .fetch_all(pool)
        .await
}

pub async fn upsert_faq(pool: &PgPool, input: &FaqUpsert) -> Result<FaqItem, sqlx::Error> {
    if let Some(id) = input.id {
        sqlx::query_as::<_, FaqItem>(
            r#"
            UPDATE faq_items
            SET question = $1, answer = $2, category = $3,
                is_published = COALESCE($4, is_published),
                sort_order = COALESCE($5, sort_order),
                updated_at = now()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&input.question)
        .bind(&input.answer)
        .bind(&input.category)
        .bind(input.is_published)
        .bind(input.sort_order)
        .bind(id)
        .fetch_one(pool)
        .await
    } else {
        sqlx::query_as::<_, FaqItem>(
            r#"
            INSERT INTO faq_items (question, answer, category, is_published, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&input.question)
        .bind(&input.answer)
        .bind(&input.category)
        .bind(input.is_published.unwrap_or(true))
        .bind(input.sort_order.unwrap_or(0))
        .fetch_one(pool)
        .await
    }
}

pub async fn delete_faq(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM faq_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_faq(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM faq_items")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ============================================================================
// Leads
// ============================================================================

pub async fn list_leads(pool: &PgPool) -> Result<Vec<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn insert_lead(pool: &PgPool, input: &NewLead) -> Result<Lead, sqlx::Error> {
    sqlx::query_as::<_, Lead>(
        r#"
        INSERT INTO leads (name, email, phone, message, source)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.message)
    .bind(&input.source)
    .fetch_one(pool)
    .await
}

/// Returns `None` when no lead with that id exists.
pub async fn update_lead_status(
    pool: &PgPool,
    id: i32,
    status: LeadStatus,
) -> Result<Option<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>(
        "UPDATE leads SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_lead(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM leads WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_leads(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_leads_by_status(
    pool: &PgPool,
    status: LeadStatus,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ============================================================================
// Media
// ============================================================================

pub async fn list_media(pool: &PgPool) -> Result<Vec<MediaFile>, sqlx::Error> {
    sqlx::query_as::<_, MediaFile>("SELECT * FROM media_files ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn insert_media(pool: &PgPool, input: &NewMediaFile) -> Result<MediaFile, sqlx::Error> {
    sqlx::query_as::<_, MediaFile>(
        r#"
        INSERT INTO media_files (filename, original_name, mime_type, size, url, file_key, alt)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&input.filename)
    .bind(&input.original_name)
    .bind(&input.mime_type)
    .bind(input.size)
    .bind(&input.url)
    .bind(&input.file_key)
    .bind(&input.alt)
    .fetch_one(pool)
    .await
}

/// Removes the row and hands back its metadata so the caller can delete the
/// backing file. Returns `None` when the row was already gone. Row removal
/// and file removal are two independent steps; this function only performs
/// the first.
pub async fn delete_media(pool: &PgPool, id: i32) -> Result<Option<MediaFile>, sqlx::Error> {
    sqlx::query_as::<_, MediaFile>("DELETE FROM media_files WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count_media(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM media_files")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ============================================================================
// Site settings
// ============================================================================

pub async fn list_settings(pool: &PgPool) -> Result<Vec<SiteSetting>, sqlx::Error> {
    sqlx::query_as::<_, SiteSetting>("SELECT * FROM site_settings")
        .fetch_all(pool)
        .await
}

/// Atomic insert-or-update keyed on `setting_key`. A duplicate key updates
/// the existing row in place rather than raising a conflict.
pub async fn upsert_setting(
    pool: &PgPool,
    key: &str,
    value: &str,
) -> Result<SiteSetting, sqlx::Error> {
    sqlx::query_as::<_, SiteSetting>(
        r#"
        INSERT INTO site_settings (setting_key, setting_value)
        VALUES ($1, $2)
        ON CONFLICT (setting_key) DO UPDATE SET
            setting_value = EXCLUDED.setting_value,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(key)
    .bind(value)
    .fetch_one(pool)
    .await
}
