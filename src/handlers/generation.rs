// Media generation handlers: gated image/video generation, history, quota

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::generation::{GenerationRecord, MediaKind},
    models::subscription::Subscription,
    models::user::{User, UserError},
    services::ledger::{self, GateDecision},
    services::media_gen::InputImage,
    utils::ServiceError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(min = 1, max = 4000, message = "Prompt must be 1-4000 characters"))]
    pub prompt: String,
    /// Base64 source frame to animate; video generation only
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_mime_type: Option<String>,
    /// "drive" uploads the result to the shared Drive folder instead of
    /// local media storage
    #[serde(default)]
    pub store: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub record: GenerationRecord,
    pub charged_cents: i64,
    /// Post-charge credit balance in cents, "Unlimited" for admins, null
    /// when the unit was covered by the free quota with no subscription
    pub remaining_credits: serde_json::Value,
    /// Local media path or Drive file id, mirrored from the record payload
    pub media_ref: String,
    /// The generated media itself, base64-encoded
    pub media_base64: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub daily_free_images_remaining: i32,
    pub daily_free_videos_remaining: i32,
    pub credit_cents: Option<i64>,
    pub unlimited: bool,
}

/// POST /generate/image
pub async fn generate_image(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    run_generation(state, auth_user, MediaKind::Image, req).await
}

/// POST /generate/video
pub async fn generate_video(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    run_generation(state, auth_user, MediaKind::Video, req).await
}

/// Shared gate -> generate -> store -> settle pipeline.
///
/// The preflight gate is advisory and exists to refuse before burning an
/// upstream request; the settle step re-runs the charge as conditional
/// UPDATEs inside a transaction, so concurrent requests cannot overdraw
/// credit or overshoot the daily quota.
async fn run_generation(
    state: AppState,
    auth_user: AuthenticatedUser,
    kind: MediaKind,
    req: GenerateRequest,
) -> Result<(StatusCode, Json<GenerateResponse>), ServiceError> {
    req.validate()?;
    let prompt = req.prompt.trim().to_string();
    let source_image = input_image(kind, &req)?;
    let today = Utc::now().date_naive();

    let mut conn = state.diesel_pool.get().await?;
    let user = User::find_by_id(&mut conn, auth_user.user_id)
        .await
        .map_err(|e| match e {
            UserError::NotFound => ServiceError::NotFound,
            e => ServiceError::DatabaseError(e.to_string()),
        })?;

    match state.ledger.preflight(&mut conn, &user, kind, today).await? {
        GateDecision::Allow(_) => {},
        GateDecision::DenyNoSubscription => return Err(ServiceError::NoSubscription),
        GateDecision::DenyInsufficientCredit => return Err(ServiceError::InsufficientCredit),
    }
    // Release the connection for the duration of the upstream call
    drop(conn);

    let media = match kind {
        MediaKind::Image => state.media_gen.generate_image(&prompt).await?,
        MediaKind::Video => state.media_gen.generate_video(&prompt, source_image).await?,
    };

    let media_ref = match req.store.as_deref() {
        Some("drive") => {
            let file_name = media_file_name(kind, &media.mime_type);
            let file = state
                .drive
                .upload(&file_name, &media.mime_type, media.bytes.clone())
                .await?;
            file.id
        },
        _ => store_local(kind, &media.mime_type, &media.bytes).await?,
    };

    let mut conn = state.diesel_pool.get().await?;
    let (source, record) = state
        .ledger
        .settle(
            &mut conn,
            user.id,
            user.is_admin(),
            kind,
            &prompt,
            &media_ref,
            today,
        )
        .await?;

    let remaining_credits = if user.is_admin() {
        serde_json::json!("Unlimited")
    } else {
        let balance = Subscription::find_active_for_user(&mut conn, user.id)
            .await
            .map_err(|e| ServiceError::DatabaseError(e.to_string()))?
            .map(|s| s.credit_cents);
        serde_json::json!(balance)
    };

    let media_base64 = base64::engine::general_purpose::STANDARD.encode(&media.bytes);

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            charged_cents: source.charged_cents(),
            remaining_credits,
            media_ref,
            media_base64,
            mime_type: media.mime_type,
            record,
        }),
    ))
}

/// Validate and shape the optional source frame for image-to-video calls
fn input_image(kind: MediaKind, req: &GenerateRequest) -> Result<Option<InputImage>, ServiceError> {
    let Some(data) = req.image.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if kind != MediaKind::Video {
        return Err(ServiceError::ValidationError(
            "a source image is only supported for video generation".to_string(),
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(data.as_bytes())
        .map_err(|_| ServiceError::ValidationError("image must be valid base64".to_string()))?;

    Ok(Some(InputImage {
        image_bytes: data.to_string(),
        mime_type: req
            .image_mime_type
            .clone()
            .unwrap_or_else(|| "image/png".to_string()),
    }))
}

/// A file name with no directory components; keeps the media route inside
/// the media directory
fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

/// GET /media/{file_name}
///
/// Serves a generated media file from local storage with its content type.
pub async fn serve_media(
    _auth_user: AuthenticatedUser,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    if !is_bare_file_name(&file_name) {
        return Err(ServiceError::NotFound);
    }

    let media_dir = &crate::app_config::config().media_dir;
    let path = std::path::Path::new(media_dir).join(&file_name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ServiceError::NotFound)?;

    let mime_type = crate::services::drive::mime_from_name(&file_name);
    Ok(([(header::CONTENT_TYPE, mime_type)], bytes))
}

fn media_file_name(kind: MediaKind, mime_type: &str) -> String {
    let ext = match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "video/mp4" => "mp4",
        _ => match kind {
            MediaKind::Image => "bin",
            MediaKind::Video => "mp4",
        },
    };
    format!("{}-{}.{}", kind.as_str(), Uuid::new_v4(), ext)
}

/// Write media bytes under the configured media directory, returning the
/// relative path stored in the generation record
async fn store_local(
    kind: MediaKind,
    mime_type: &str,
    bytes: &[u8],
) -> Result<String, ServiceError> {
    let media_dir = &crate::app_config::config().media_dir;
    let file_name = media_file_name(kind, mime_type);
    let path = std::path::Path::new(media_dir).join(&file_name);

    tokio::fs::create_dir_all(media_dir).await.map_err(|e| {
        tracing::error!("Failed to create media dir {}: {}", media_dir, e);
        ServiceError::InternalError
    })?;
    tokio::fs::write(&path, bytes).await.map_err(|e| {
        tracing::error!("Failed to write media file {:?}: {}", path, e);
        ServiceError::InternalError
    })?;

    Ok(format!("{}/{}", media_dir.trim_end_matches('/'), file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(image: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            prompt: "a quiet harbor".to_string(),
            image: image.map(str::to_string),
            image_mime_type: None,
            store: None,
        }
    }

    #[test]
    fn test_video_accepts_source_image() {
        let req = request(Some("aGVsbG8="));
        let img = input_image(MediaKind::Video, &req).unwrap().unwrap();
        assert_eq!(img.image_bytes, "aGVsbG8=");
        assert_eq!(img.mime_type, "image/png");
    }

    #[test]
    fn test_image_kind_rejects_source_image() {
        let req = request(Some("aGVsbG8="));
        assert!(matches!(
            input_image(MediaKind::Image, &req),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let req = request(Some("not base64!!"));
        assert!(matches!(
            input_image(MediaKind::Video, &req),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_absent_image_is_none() {
        assert!(input_image(MediaKind::Video, &request(None))
            .unwrap()
            .is_none());
        assert!(input_image(MediaKind::Image, &request(None))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_media_route_rejects_path_components() {
        assert!(is_bare_file_name("image-abc.png"));
        assert!(!is_bare_file_name("../etc/passwd"));
        assert!(!is_bare_file_name("sub/dir.png"));
        assert!(!is_bare_file_name("back\\slash.png"));
        assert!(!is_bare_file_name(""));
    }
}

/// GET /generate/history
pub async fn generation_history(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let records = GenerationRecord::list_for_user(&mut conn, auth_user.user_id, 100).await?;
    Ok(Json(records))
}

/// GET /generate/quota
pub async fn generation_quota(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let today = Utc::now().date_naive();

    // User row and subscription snapshot on separate pooled connections
    let (user, subscription) = futures_util::future::try_join(
        async {
            let mut conn = state.diesel_pool.get().await?;
            User::find_by_id(&mut conn, auth_user.user_id)
                .await
                .map_err(|e| match e {
                    UserError::NotFound => ServiceError::NotFound,
                    e => ServiceError::DatabaseError(e.to_string()),
                })
        },
        async {
            let mut conn = state.diesel_pool.get().await?;
            state
                .subscription_service
                .current_for_user(&mut conn, auth_user.user_id)
                .await
        },
    )
    .await?;

    if user.is_admin() {
        return Ok(Json(QuotaResponse {
            daily_free_images_remaining: i32::MAX,
            daily_free_videos_remaining: i32::MAX,
            credit_cents: None,
            unlimited: true,
        }));
    }

    Ok(Json(QuotaResponse {
        daily_free_images_remaining: user
            .remaining_daily_slots(today, ledger::DAILY_FREE_IMAGES),
        daily_free_videos_remaining: user
            .remaining_daily_slots(today, ledger::DAILY_FREE_VIDEOS),
        credit_cents: subscription.map(|s| s.credit_cents),
        unlimited: false,
    }))
}
