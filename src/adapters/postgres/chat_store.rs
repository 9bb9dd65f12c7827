//! PostgreSQL implementation of the chat store.
//!
//! Persists sessions, messages, and generated-image records. Turn writes
//! bump the owning session's denormalized counters in the same transaction
//! as the row insert, so the counters always equal the row counts.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::catalog::{ImagePurpose, StylePreset};
use crate::domain::foundation::{ImageId, MessageId, SessionId, Timestamp};
use crate::domain::session::{
    ChatMessage, ChatSession, ContentKind, GeneratedImageRecord, MessageRole, SessionStatus,
};
use crate::ports::{AssistantTurn, ChatStore, SessionFilter, SessionPage, StoreError};

/// PostgreSQL implementation of ChatStore.
#[derive(Clone)]
pub struct PostgresChatStore {
    pool: PgPool,
}

impl PostgresChatStore {
    /// Creates a new PostgresChatStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PostgresChatStore {
    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, title, image_purpose, status, style_preset, brand_guidelines,
                final_image_url, messages_count, images_generated, total_tokens_used,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.title())
        .bind(session.purpose().as_str())
        .bind(session.status().as_str())
        .bind(session.style().map(|s| s.as_str()))
        .bind(session.brand_guidelines())
        .bind(session.final_image_url())
        .bind(session.messages_count())
        .bind(session.images_generated())
        .bind(session.total_tokens_used())
        .bind(session.created_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to insert session: {}", e)))?;

        Ok(())
    }

    async fn find_session(&self, id: &SessionId) -> Result<Option<ChatSession>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, title, image_purpose, status, style_preset, brand_guidelines,
                   final_image_url, messages_count, images_generated, total_tokens_used,
                   created_at, updated_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to fetch session: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_sessions(&self, filter: SessionFilter) -> Result<SessionPage, StoreError> {
        let (rows, total) = match filter.status {
            Some(status) => {
                let rows = sqlx::query(
                    r#"
                    SELECT id, title, image_purpose, status, style_preset, brand_guidelines,
                           final_image_url, messages_count, images_generated, total_tokens_used,
                           created_at, updated_at
                    FROM sessions
                    WHERE status = $1
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(status.as_str())
                .bind(filter.limit)
                .bind(filter.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::database(format!("Failed to list sessions: {}", e)))?;

                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE status = $1")
                        .bind(status.as_str())
                        .fetch_one(&self.pool)
                        .await
                        .map_err(|e| {
                            StoreError::database(format!("Failed to count sessions: {}", e))
                        })?;

                (rows, total)
            }
            None => {
                let rows = sqlx::query(
                    r#"
                    SELECT id, title, image_purpose, status, style_preset, brand_guidelines,
                           final_image_url, messages_count, images_generated, total_tokens_used,
                           created_at, updated_at
                    FROM sessions
                    ORDER BY created_at DESC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(filter.limit)
                .bind(filter.offset)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::database(format!("Failed to list sessions: {}", e)))?;

                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| {
                        StoreError::database(format!("Failed to count sessions: {}", e))
                    })?;

                (rows, total)
            }
        };

        let sessions = rows
            .iter()
            .map(row_to_session)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SessionPage { sessions, total })
    }

    async fn delete_session(&self, id: &SessionId) -> Result<bool, StoreError> {
        // Message and image rows go with the session via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to delete session: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, role, content_kind, text_content, image_url,
                   image_thumbnail_url, generation_metadata, tokens_used,
                   generation_time_ms, created_at
            FROM messages
            WHERE session_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to fetch messages: {}", e)))?;

        rows.iter().map(row_to_message).collect()
    }

    async fn append_user_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::database(format!("Failed to start transaction: {}", e)))?;

        // Counter bump first: zero rows affected means the session is gone
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET messages_count = messages_count + 1, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(message.session_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::database(format!("Failed to update session: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SessionNotFound(message.session_id));
        }

        insert_message(&mut tx, message).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn record_assistant_turn(&self, turn: &AssistantTurn) -> Result<(), StoreError> {
        let session_id = turn.message.session_id;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::database(format!("Failed to start transaction: {}", e)))?;

        let image_increment: i32 = if turn.image.is_some() { 1 } else { 0 };
        let image_url = turn.image.as_ref().map(|image| image.image_url.as_str());

        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET messages_count = messages_count + 1,
                images_generated = images_generated + $2,
                total_tokens_used = total_tokens_used + $3,
                final_image_url = COALESCE($4, final_image_url),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(session_id.as_uuid())
        .bind(image_increment)
        .bind(turn.tokens_used)
        .bind(image_url)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::database(format!("Failed to update session: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SessionNotFound(session_id));
        }

        insert_message(&mut tx, &turn.message).await?;

        if let Some(image) = &turn.image {
            sqlx::query(
                r#"
                INSERT INTO generated_images (
                    id, session_id, message_id, image_url, thumbnail_url, width, height,
                    format, prompt_used, model_used, image_purpose, generation_cost_usd,
                    is_selected, is_exported, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                "#,
            )
            .bind(image.id.as_uuid())
            .bind(image.session_id.as_uuid())
            .bind(image.message_id.as_uuid())
            .bind(&image.image_url)
            .bind(image.thumbnail_url.as_deref())
            .bind(image.width)
            .bind(image.height)
            .bind(image.format.as_deref())
            .bind(&image.prompt_used)
            .bind(&image.model_used)
            .bind(image.image_purpose.as_str())
            .bind(image.generation_cost_usd)
            .bind(image.is_selected)
            .bind(image.is_exported)
            .bind(image.created_at.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::database(format!("Failed to insert image record: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn find_image(&self, id: &ImageId) -> Result<Option<GeneratedImageRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, session_id, message_id, image_url, thumbnail_url, width, height,
                   format, prompt_used, model_used, image_purpose, generation_cost_usd,
                   is_selected, is_exported, created_at
            FROM generated_images
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to fetch image record: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_image(&row)?)),
            None => Ok(None),
        }
    }
}

async fn insert_message(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    message: &ChatMessage,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO messages (
            id, session_id, role, content_kind, text_content, image_url,
            image_thumbnail_url, generation_metadata, tokens_used,
            generation_time_ms, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(message.id.as_uuid())
    .bind(message.session_id.as_uuid())
    .bind(message.role.as_str())
    .bind(message.content_kind.as_str())
    .bind(message.text_content.as_deref())
    .bind(message.image_url.as_deref())
    .bind(message.image_thumbnail_url.as_deref())
    .bind(message.generation_metadata.as_ref())
    .bind(message.tokens_used)
    .bind(message.generation_time_ms)
    .bind(message.created_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| StoreError::database(format!("Failed to insert message: {}", e)))?;

    Ok(())
}

// === Row Mapping ===

fn row_to_session(row: &PgRow) -> Result<ChatSession, StoreError> {
    let id: uuid::Uuid = row.get("id");
    let title: Option<String> = row.get("title");
    let purpose_str: &str = row.get("image_purpose");
    let status_str: &str = row.get("status");
    let style_str: Option<&str> = row.get("style_preset");
    let brand_guidelines: Option<serde_json::Value> = row.get("brand_guidelines");
    let final_image_url: Option<String> = row.get("final_image_url");
    let messages_count: i32 = row.get("messages_count");
    let images_generated: i32 = row.get("images_generated");
    let total_tokens_used: i64 = row.get("total_tokens_used");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
    let updated_at: chrono::DateTime<chrono::Utc> = row.get("updated_at");

    let style = match style_str {
        Some(s) => Some(str_to_style(s)?),
        None => None,
    };

    Ok(ChatSession::reconstitute(
        SessionId::from_uuid(id),
        title,
        str_to_purpose(purpose_str)?,
        str_to_status(status_str)?,
        style,
        brand_guidelines,
        final_image_url,
        messages_count,
        images_generated,
        total_tokens_used,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}

fn row_to_message(row: &PgRow) -> Result<ChatMessage, StoreError> {
    let id: uuid::Uuid = row.get("id");
    let session_id: uuid::Uuid = row.get("session_id");
    let role_str: &str = row.get("role");
    let kind_str: &str = row.get("content_kind");
    let text_content: Option<String> = row.get("text_content");
    let image_url: Option<String> = row.get("image_url");
    let image_thumbnail_url: Option<String> = row.get("image_thumbnail_url");
    let generation_metadata: Option<serde_json::Value> = row.get("generation_metadata");
    let tokens_used: i64 = row.get("tokens_used");
    let generation_time_ms: Option<i64> = row.get("generation_time_ms");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

    Ok(ChatMessage {
        id: MessageId::from_uuid(id),
        session_id: SessionId::from_uuid(session_id),
        role: str_to_role(role_str)?,
        content_kind: str_to_content_kind(kind_str)?,
        text_content,
        image_url,
        image_thumbnail_url,
        generation_metadata,
        tokens_used,
        generation_time_ms,
        created_at: Timestamp::from_datetime(created_at),
    })
}

fn row_to_image(row: &PgRow) -> Result<GeneratedImageRecord, StoreError> {
    let id: uuid::Uuid = row.get("id");
    let session_id: uuid::Uuid = row.get("session_id");
    let message_id: uuid::Uuid = row.get("message_id");
    let image_url: String = row.get("image_url");
    let thumbnail_url: Option<String> = row.get("thumbnail_url");
    let width: Option<i32> = row.get("width");
    let height: Option<i32> = row.get("height");
    let format: Option<String> = row.get("format");
    let prompt_used: String = row.get("prompt_used");
    let model_used: String = row.get("model_used");
    let purpose_str: &str = row.get("image_purpose");
    let generation_cost_usd: f64 = row.get("generation_cost_usd");
    let is_selected: bool = row.get("is_selected");
    let is_exported: bool = row.get("is_exported");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

    Ok(GeneratedImageRecord {
        id: ImageId::from_uuid(id),
        session_id: SessionId::from_uuid(session_id),
        message_id: MessageId::from_uuid(message_id),
        image_url,
        thumbnail_url,
        width,
        height,
        format,
        prompt_used,
        model_used,
        image_purpose: str_to_purpose(purpose_str)?,
        generation_cost_usd,
        is_selected,
        is_exported,
        created_at: Timestamp::from_datetime(created_at),
    })
}

// === Helper Functions ===

fn str_to_status(s: &str) -> Result<SessionStatus, StoreError> {
    match s {
        "active" => Ok(SessionStatus::Active),
        "completed" => Ok(SessionStatus::Completed),
        "archived" => Ok(SessionStatus::Archived),
        _ => Err(StoreError::database(format!("Invalid session status: {}", s))),
    }
}

fn str_to_role(s: &str) -> Result<MessageRole, StoreError> {
    match s {
        "user" => Ok(MessageRole::User),
        "assistant" => Ok(MessageRole::Assistant),
        _ => Err(StoreError::database(format!("Invalid message role: {}", s))),
    }
}

fn str_to_content_kind(s: &str) -> Result<ContentKind, StoreError> {
    match s {
        "text" => Ok(ContentKind::Text),
        "image" => Ok(ContentKind::Image),
        "mixed" => Ok(ContentKind::Mixed),
        _ => Err(StoreError::database(format!("Invalid content kind: {}", s))),
    }
}

fn str_to_purpose(s: &str) -> Result<ImagePurpose, StoreError> {
    match s {
        "sns_instagram_square" => Ok(ImagePurpose::SnsInstagramSquare),
        "sns_instagram_portrait" => Ok(ImagePurpose::SnsInstagramPortrait),
        "sns_facebook" => Ok(ImagePurpose::SnsFacebook),
        "banner_web" => Ok(ImagePurpose::BannerWeb),
        "banner_mobile" => Ok(ImagePurpose::BannerMobile),
        "product_showcase" => Ok(ImagePurpose::ProductShowcase),
        "email_header" => Ok(ImagePurpose::EmailHeader),
        "custom" => Ok(ImagePurpose::Custom),
        _ => Err(StoreError::database(format!("Invalid image purpose: {}", s))),
    }
}

fn str_to_style(s: &str) -> Result<StylePreset, StoreError> {
    match s {
        "modern" => Ok(StylePreset::Modern),
        "minimal" => Ok(StylePreset::Minimal),
        "vibrant" => Ok(StylePreset::Vibrant),
        "luxury" => Ok(StylePreset::Luxury),
        "playful" => Ok(StylePreset::Playful),
        "professional" => Ok(StylePreset::Professional),
        "natural" => Ok(StylePreset::Natural),
        "tech" => Ok(StylePreset::Tech),
        _ => Err(StoreError::database(format!("Invalid style preset: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_strings_roundtrip() {
        for purpose in [
            ImagePurpose::SnsInstagramSquare,
            ImagePurpose::SnsInstagramPortrait,
            ImagePurpose::SnsFacebook,
            ImagePurpose::BannerWeb,
            ImagePurpose::BannerMobile,
            ImagePurpose::ProductShowcase,
            ImagePurpose::EmailHeader,
            ImagePurpose::Custom,
        ] {
            assert_eq!(str_to_purpose(purpose.as_str()).unwrap(), purpose);
        }
    }

    #[test]
    fn style_strings_roundtrip() {
        for style in [
            StylePreset::Modern,
            StylePreset::Minimal,
            StylePreset::Vibrant,
            StylePreset::Luxury,
            StylePreset::Playful,
            StylePreset::Professional,
            StylePreset::Natural,
            StylePreset::Tech,
        ] {
            assert_eq!(str_to_style(style.as_str()).unwrap(), style);
        }
    }

    #[test]
    fn unknown_column_values_are_rejected() {
        assert!(str_to_status("paused").is_err());
        assert!(str_to_role("system").is_err());
        assert!(str_to_content_kind("video").is_err());
        assert!(str_to_purpose("sns_tiktok").is_err());
        assert!(str_to_style("grunge").is_err());
    }
}
