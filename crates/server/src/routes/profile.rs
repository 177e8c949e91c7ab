use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    db::{
        models::{CollectionKind, MediaRef, MediaType, Profile, Rating, User},
        timestamp_now,
    },
    error::{is_unique_violation, AppError, Result},
    ids::{non_blank, value_key},
    middleware::auth::Caller,
    routes::ratings,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_profile))
        .route("/:id/update", post(update_profile))
        .route("/:id/ratings", get(list_user_ratings))
        .route("/:id/library", get(get_library))
        .route("/:id/library/add", post(add_to_library))
        .route("/:id/library/:item_id", delete(remove_from_library))
        .route("/:id/wishlist", get(get_wishlist))
        .route("/:id/wishlist/add", post(add_to_wishlist))
        .route("/:id/wishlist/:item_id", delete(remove_from_wishlist))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    #[serde(alias = "avatarUrl")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddItemRequest {
    pub id: Option<Value>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub year: Option<Value>,
    #[serde(rename = "coverUrl")]
    pub cover_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    pub message: &'static str,
    pub item: MediaRef,
}

async fn find_user(pool: &SqlitePool, user_id: &str) -> Result<User> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, bio, avatar_url, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::UserNotFound)
}

async fn ensure_user(pool: &SqlitePool, user_id: &str) -> Result<()> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    if exists == 0 {
        return Err(AppError::UserNotFound);
    }
    Ok(())
}

async fn collection_items(
    pool: &SqlitePool,
    user_id: &str,
    kind: CollectionKind,
) -> Result<Vec<MediaRef>> {
    let items = sqlx::query_as::<_, MediaRef>(
        r#"
        SELECT media_id, title, media_type, year, cover_url
        FROM collection_items
        WHERE user_id = ? AND list = ?
        ORDER BY added_at ASC, rowid ASC
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;

    Ok(items)
}

async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile>> {
    let user = find_user(&state.db.pool, &user_id).await?;
    let wishlist = collection_items(&state.db.pool, &user.id, CollectionKind::Wishlist).await?;
    let library = collection_items(&state.db.pool, &user.id, CollectionKind::Library).await?;

    Ok(Json(Profile {
        id: user.id,
        username: user.username,
        email: user.email,
        bio: user.bio,
        avatar_url: user.avatar_url,
        wishlist,
        library,
    }))
}

async fn update_profile(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateProfileRequest>, AppError>,
) -> Result<Json<MessageResponse>> {
    let user_id = caller.acting_user(Some(user_id.as_str()))?;
    // Blank username/email are ignored; bio and avatar may be cleared.
    let result = sqlx::query(
        r#"
        UPDATE users SET
            username = COALESCE(?, username),
            email = COALESCE(?, email),
            bio = COALESCE(?, bio),
            avatar_url = COALESCE(?, avatar_url)
        WHERE id = ?
        "#,
    )
    .bind(non_blank(body.username.as_deref()))
    .bind(non_blank(body.email.as_deref()))
    .bind(body.bio.as_deref())
    .bind(body.avatar_url.as_deref())
    .bind(&user_id)
    .execute(&state.db.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::EmailExists
        } else {
            AppError::Database(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::UserNotFound);
    }

    Ok(Json(MessageResponse {
        message: "Profile updated",
    }))
}

async fn list_user_ratings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Rating>>> {
    let ratings = ratings::ratings_for_user(&state.db.pool, &user_id).await?;
    Ok(Json(ratings))
}

async fn add_item(
    pool: &SqlitePool,
    user_id: &str,
    kind: CollectionKind,
    body: AddItemRequest,
) -> Result<MediaRef> {
    let (Some(media_id), Some(title), Some(media_type)) = (
        value_key(body.id.as_ref()),
        non_blank(body.title.as_deref()),
        non_blank(body.media_type.as_deref()),
    ) else {
        return Err(AppError::MissingFields);
    };

    let media_type: MediaType = media_type.parse().map_err(AppError::InvalidMediaType)?;

    let item = MediaRef {
        id: media_id,
        title: title.to_string(),
        media_type: media_type.as_str().to_string(),
        year: value_key(body.year.as_ref()).unwrap_or_default(),
        cover_url: body.cover_url.unwrap_or_default(),
    };

    ensure_user(pool, user_id).await?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM collection_items WHERE user_id = ? AND list = ? AND media_id = ?",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(&item.id)
    .fetch_one(pool)
    .await?;

    if existing > 0 {
        return Err(AppError::AlreadyInCollection(kind));
    }

    insert_item(pool, user_id, kind, &item).await?;

    tracing::debug!(user_id = %user_id, media_id = %item.id, list = %kind, "added collection item");

    Ok(item)
}

// The primary key settles races between concurrent adds of the same item.
async fn insert_item(
    pool: &SqlitePool,
    user_id: &str,
    kind: CollectionKind,
    item: &MediaRef,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO collection_items (user_id, list, media_id, title, media_type, year, cover_url, added_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(&item.id)
    .bind(&item.title)
    .bind(&item.media_type)
    .bind(&item.year)
    .bind(&item.cover_url)
    .bind(timestamp_now())
    .execute(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::AlreadyInCollection(kind)
        } else {
            AppError::Database(e)
        }
    })?;

    Ok(())
}

async fn remove_item(
    pool: &SqlitePool,
    user_id: &str,
    kind: CollectionKind,
    media_id: &str,
) -> Result<()> {
    ensure_user(pool, user_id).await?;

    let result = sqlx::query(
        "DELETE FROM collection_items WHERE user_id = ? AND list = ? AND media_id = ?",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(media_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ItemNotFound);
    }
    Ok(())
}

async fn list_items(pool: &SqlitePool, user_id: &str, kind: CollectionKind) -> Result<Vec<MediaRef>> {
    ensure_user(pool, user_id).await?;
    collection_items(pool, user_id, kind).await
}

async fn add_to_library(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<AddItemRequest>, AppError>,
) -> Result<(StatusCode, Json<AddItemResponse>)> {
    let user_id = caller.acting_user(Some(user_id.as_str()))?;
    let item = add_item(&state.db.pool, &user_id, CollectionKind::Library, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(AddItemResponse {
            message: "Added to library",
            item,
        }),
    ))
}

async fn get_library(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<MediaRef>>> {
    let items = list_items(&state.db.pool, &user_id, CollectionKind::Library).await?;
    Ok(Json(items))
}

async fn remove_from_library(
    State(state): State<AppState>,
    caller: Caller,
    Path((user_id, item_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    let user_id = caller.acting_user(Some(user_id.as_str()))?;
    remove_item(&state.db.pool, &user_id, CollectionKind::Library, &item_id).await?;
    Ok(Json(MessageResponse {
        message: "Removed from library",
    }))
}

async fn add_to_wishlist(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<AddItemRequest>, AppError>,
) -> Result<(StatusCode, Json<AddItemResponse>)> {
    let user_id = caller.acting_user(Some(user_id.as_str()))?;
    let item = add_item(&state.db.pool, &user_id, CollectionKind::Wishlist, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(AddItemResponse {
            message: "Added to wishlist",
            item,
        }),
    ))
}

async fn get_wishlist(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<MediaRef>>> {
    let items = list_items(&state.db.pool, &user_id, CollectionKind::Wishlist).await?;
    Ok(Json(items))
}

async fn remove_from_wishlist(
    State(state): State<AppState>,
    caller: Caller,
    Path((user_id, item_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    let user_id = caller.acting_user(Some(user_id.as_str()))?;
    remove_item(&state.db.pool, &user_id, CollectionKind::Wishlist, &item_id).await?;
    Ok(Json(MessageResponse {
        message: "Removed from wishlist",
    }))
}
