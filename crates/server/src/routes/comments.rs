use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    db::{
        models::{Comment, COMMENT_TOMBSTONE, UNKNOWN_USERNAME},
        timestamp_now,
    },
    error::{AppError, Result},
    ids::{new_id, non_blank, value_key},
    middleware::auth::{ActorParams, Caller},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(post_comment))
        .route("/comments/:thread_id", get(list_comments))
        .route("/comment/:id", put(update_comment).delete(delete_comment))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub thread_id: Option<Value>,
    pub content: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateCommentResponse {
    pub message: &'static str,
    pub comment_id: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub message: &'static str,
    pub comment: Comment,
}

const COMMENT_COLUMNS: &str = "id, content, thread_id, user_id, username, date_created, deleted";

async fn find_comment(pool: &sqlx::SqlitePool, comment_id: &str) -> Result<Comment> {
    sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"
    ))
    .bind(comment_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::CommentNotFound)
}

// Only the author may touch a comment.
async fn owned_comment(
    pool: &sqlx::SqlitePool,
    comment_id: &str,
    user_id: &str,
) -> Result<Comment> {
    let comment = find_comment(pool, comment_id).await?;
    if comment.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(comment)
}

async fn post_comment(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Json(body), _): WithRejection<Json<CreateCommentRequest>, AppError>,
) -> Result<(StatusCode, Json<CreateCommentResponse>)> {
    let (Some(thread_id), Some(content)) = (
        value_key(body.thread_id.as_ref()),
        non_blank(body.content.as_deref()),
    ) else {
        return Err(AppError::MissingFields);
    };
    let user_id = caller.acting_user(body.user_id.as_deref())?;

    let thread_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM threads WHERE id = ?")
        .bind(&thread_id)
        .fetch_one(&state.db.pool)
        .await?;
    if thread_exists == 0 {
        return Err(AppError::ThreadNotFound);
    }

    let username = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_optional(&state.db.pool)
        .await?
        .unwrap_or_else(|| UNKNOWN_USERNAME.to_string());

    let comment_id = new_id();

    sqlx::query(
        "INSERT INTO comments (id, thread_id, user_id, username, content, deleted, date_created) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&comment_id)
    .bind(&thread_id)
    .bind(&user_id)
    .bind(&username)
    .bind(content)
    .bind(false)
    .bind(timestamp_now())
    .execute(&state.db.pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCommentResponse {
            message: "Comment added successfully",
            comment_id,
        }),
    ))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<Vec<Comment>>> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE thread_id = ? ORDER BY date_created ASC, rowid ASC"
    ))
    .bind(&thread_id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(comments))
}

async fn update_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateCommentRequest>, AppError>,
) -> Result<Json<CommentResponse>> {
    let content = non_blank(body.content.as_deref()).ok_or(AppError::MissingFields)?;
    let user_id = caller.acting_user(body.user_id.as_deref())?;
    let comment = owned_comment(&state.db.pool, &id, &user_id).await?;

    sqlx::query("UPDATE comments SET content = ?, deleted = 0 WHERE id = ? AND user_id = ?")
        .bind(content)
        .bind(&comment.id)
        .bind(&user_id)
        .execute(&state.db.pool)
        .await?;

    let comment = find_comment(&state.db.pool, &comment.id).await?;
    Ok(Json(CommentResponse {
        message: "Comment updated",
        comment,
    }))
}

async fn delete_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    WithRejection(Query(params), _): WithRejection<Query<ActorParams>, AppError>,
    body: Option<Json<ActorParams>>,
) -> Result<Json<CommentResponse>> {
    let claimed = params.merge(body);
    let user_id = caller.acting_user(claimed.as_deref())?;
    let comment = owned_comment(&state.db.pool, &id, &user_id).await?;

    // Soft delete: the row and its id stay, only the content is replaced.
    sqlx::query("UPDATE comments SET deleted = 1, content = ? WHERE id = ? AND user_id = ?")
        .bind(COMMENT_TOMBSTONE)
        .bind(&comment.id)
        .bind(&user_id)
        .execute(&state.db.pool)
        .await?;

    tracing::debug!(comment_id = %comment.id, "comment soft-deleted");

    let comment = find_comment(&state.db.pool, &comment.id).await?;
    Ok(Json(CommentResponse {
        message: "Comment deleted",
        comment,
    }))
}
