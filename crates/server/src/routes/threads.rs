use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    db::{
        models::{Thread, ThreadRow, DEFAULT_CATEGORY},
        timestamp_now,
    },
    error::{AppError, Result},
    ids::{new_id, non_blank},
    middleware::auth::{ActorParams, Caller},
    AppState,
};

pub const DEFAULT_PAGE_SIZE: i64 = 5;
pub const MAX_PAGE_SIZE: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_threads).post(create_thread))
        .route(
            "/:id",
            get(get_thread).put(update_thread).delete(delete_thread),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateThreadRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateThreadRequest {
    pub content: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListThreadsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListThreadsQuery {
    /// Clamped `(limit, offset)` for the requested page.
    pub fn window(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (limit, (page - 1).saturating_mul(limit))
    }
}

#[derive(Debug, Serialize)]
pub struct CreateThreadResponse {
    pub message: &'static str,
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadMessageResponse {
    pub message: &'static str,
}

const THREAD_COLUMNS: &str = "id, title, content, category, user_id, username, date_created";

async fn comment_ids(pool: &SqlitePool, thread_id: &str) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT id FROM comments WHERE thread_id = ? ORDER BY date_created ASC, rowid ASC",
    )
    .bind(thread_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

async fn find_thread(pool: &SqlitePool, thread_id: &str) -> Result<ThreadRow> {
    sqlx::query_as::<_, ThreadRow>(&format!(
        "SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?"
    ))
    .bind(thread_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::ThreadNotFound)
}

async fn load_thread(pool: &SqlitePool, thread_id: &str) -> Result<Thread> {
    let row = find_thread(pool, thread_id).await?;
    let comments = comment_ids(pool, &row.id).await?;
    Ok(Thread::from_row(row, comments))
}

async fn create_thread(
    State(state): State<AppState>,
    caller: Caller,
    WithRejection(Json(body), _): WithRejection<Json<CreateThreadRequest>, AppError>,
) -> Result<(StatusCode, Json<CreateThreadResponse>)> {
    let (Some(title), Some(content)) = (
        non_blank(body.title.as_deref()),
        non_blank(body.content.as_deref()),
    ) else {
        return Err(AppError::MissingFields);
    };
    let user_id = caller.acting_user(body.user_id.as_deref())?;
    let category = non_blank(body.category.as_deref()).unwrap_or(DEFAULT_CATEGORY);

    let username = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or(AppError::InvalidUser)?;

    let thread_id = new_id();

    sqlx::query(
        "INSERT INTO threads (id, title, content, category, user_id, username, date_created) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&thread_id)
    .bind(title)
    .bind(content)
    .bind(category)
    .bind(&user_id)
    .bind(&username)
    .bind(timestamp_now())
    .execute(&state.db.pool)
    .await?;

    tracing::info!(thread_id = %thread_id, user_id = %user_id, "thread created");

    Ok((
        StatusCode::CREATED,
        Json(CreateThreadResponse {
            message: "Thread created successfully",
            thread_id,
        }),
    ))
}

async fn list_threads(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListThreadsQuery>, AppError>,
) -> Result<Json<Vec<Thread>>> {
    let (limit, offset) = query.window();

    let rows = sqlx::query_as::<_, ThreadRow>(&format!(
        "SELECT {THREAD_COLUMNS} FROM threads ORDER BY date_created DESC, rowid DESC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db.pool)
    .await?;

    let mut threads = Vec::with_capacity(rows.len());
    for row in rows {
        let comments = comment_ids(&state.db.pool, &row.id).await?;
        threads.push(Thread::from_row(row, comments));
    }

    Ok(Json(threads))
}

async fn get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<Thread>> {
    let thread = load_thread(&state.db.pool, &thread_id).await?;
    Ok(Json(thread))
}

async fn update_thread(
    State(state): State<AppState>,
    caller: Caller,
    Path(thread_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateThreadRequest>, AppError>,
) -> Result<Json<Thread>> {
    let content = non_blank(body.content.as_deref()).ok_or(AppError::MissingFields)?;
    let user_id = caller.acting_user(body.user_id.as_deref())?;

    let row = find_thread(&state.db.pool, &thread_id).await?;
    if row.user_id != user_id {
        return Err(AppError::Forbidden);
    }

    sqlx::query("UPDATE threads SET content = ? WHERE id = ? AND user_id = ?")
        .bind(content)
        .bind(&row.id)
        .bind(&user_id)
        .execute(&state.db.pool)
        .await?;

    let thread = load_thread(&state.db.pool, &row.id).await?;
    Ok(Json(thread))
}

async fn delete_thread(
    State(state): State<AppState>,
    caller: Caller,
    Path(thread_id): Path<String>,
    WithRejection(Query(params), _): WithRejection<Query<ActorParams>, AppError>,
    body: Option<Json<ActorParams>>,
) -> Result<Json<ThreadMessageResponse>> {
    let claimed = params.merge(body);
    let user_id = caller.acting_user(claimed.as_deref())?;

    let row = find_thread(&state.db.pool, &thread_id).await?;
    if row.user_id != user_id {
        return Err(AppError::Forbidden);
    }

    // Comments go with the thread through ON DELETE CASCADE.
    sqlx::query("DELETE FROM threads WHERE id = ? AND user_id = ?")
        .bind(&row.id)
        .bind(&user_id)
        .execute(&state.db.pool)
        .await?;

    tracing::info!(thread_id = %row.id, "thread deleted");

    Ok(Json(ThreadMessageResponse {
        message: "Thread deleted",
    }))
}
