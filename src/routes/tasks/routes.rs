use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        OriginalUri, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use super::dto::{ListQuery, TaskPayload};
use super::model::TaskResponse;
use super::pagination::{num_pages, page_links, request_url, Page};
use super::queries::TaskFilter;
use crate::error::AppError;
use crate::routes::middleware_auth::AuthUser;
use crate::state::AppState;

/// List the caller's tasks, newest first, optionally filtered by completion.
pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page_number().ok_or(AppError::InvalidPage)?;
    let filter = TaskFilter {
        is_completed: query.completion_filter(),
    };

    let (tasks, count) = state
        .tasks
        .list_tasks(ctx.user_id, filter, page, state.page_size)
        .await?;

    let pages = num_pages(count, state.page_size);
    if page > pages {
        return Err(AppError::InvalidPage);
    }

    let current = request_url(state.public_base_url.as_ref(), &headers, &uri)?;
    let (next, previous) = page_links(&current, page, pages);

    Ok(Json(Page {
        count,
        next,
        previous,
        results: tasks.into_iter().map(TaskResponse::from).collect(),
    }))
}

/// Create a task owned by the caller
pub async fn create(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    body: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let new_task = json_body(body)?.validate_create()?;

    let task = state.tasks.create_task(ctx.user_id, &new_task).await?;
    tracing::info!(user_id = %task.owner_id, task_id = task.id, "task created");

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = task_id(id)?;

    match state.tasks.get_task(ctx.user_id, id).await? {
        Some(task) => Ok(Json(TaskResponse::from(task))),
        None => Err(AppError::NotFound),
    }
}

/// Full replace of the writable fields
pub async fn replace(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = task_id(id)?;
    let changes = json_body(body)?.validate_replace()?;

    match state.tasks.update_task(ctx.user_id, id, &changes).await? {
        Some(task) => Ok(Json(TaskResponse::from(task))),
        None => Err(AppError::NotFound),
    }
}

pub async fn patch(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TaskPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = task_id(id)?;
    let changes = json_body(body)?.validate_patch()?;

    match state.tasks.update_task(ctx.user_id, id, &changes).await? {
        Some(task) => Ok(Json(TaskResponse::from(task))),
        None => Err(AppError::NotFound),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = task_id(id)?;

    if !state.tasks.delete_task(ctx.user_id, id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(user_id = %ctx.user_id, task_id = id, "task deleted");

    Ok(StatusCode::NO_CONTENT)
}

// A non-numeric id names no task at all.
fn task_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id).map_err(|_| AppError::NotFound)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}
