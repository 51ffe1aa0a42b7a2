//! Case workspace handlers.
//!
//! All routes are owner-scoped: a case belonging to another user answers
//! 404 exactly like a missing one.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::instrument;

use forensight_core::CaseId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Case, CaseUpdate, NewCase};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CaseMessage {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct CaseCreated {
    pub message: &'static str,
    pub case_id: CaseId,
}

fn case_not_found() -> AppError {
    AppError::NotFound("Case not found".to_string())
}

/// List the caller's cases, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Case>>> {
    let cases = state.cases().list_for_owner(user.id).await?;
    Ok(Json(cases))
}

/// Create a case.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<NewCase>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(mut new_case) = payload?;
    new_case.title = new_case.title.trim().to_owned();
    if new_case.title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    let case = state.cases().create(user.id, new_case).await?;
    tracing::info!(case_id = %case.id, "Case created");

    Ok((
        StatusCode::CREATED,
        Json(CaseCreated {
            message: "Case created successfully",
            case_id: case.id,
        }),
    ))
}

/// Get one case.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<CaseId>, PathRejection>,
) -> Result<Json<Case>> {
    let Path(id) = id?;
    state
        .cases()
        .get(user.id, id)
        .await?
        .map(Json)
        .ok_or_else(case_not_found)
}

/// Apply a partial update.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<CaseId>, PathRejection>,
    payload: std::result::Result<Json<CaseUpdate>, JsonRejection>,
) -> Result<Json<CaseMessage>> {
    let Path(id) = id?;
    let Json(mut update) = payload?;
    if let Some(title) = update.title.as_mut() {
        *title = title.trim().to_owned();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
    }

    state
        .cases()
        .update(user.id, id, update)
        .await?
        .ok_or_else(case_not_found)?;
    tracing::info!(case_id = %id, "Case updated");

    Ok(Json(CaseMessage {
        message: "Case updated successfully",
    }))
}

/// Delete a case.
#[instrument(skip_all)]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<CaseId>, PathRejection>,
) -> Result<Json<CaseMessage>> {
    let Path(id) = id?;
    if !state.cases().delete(user.id, id).await? {
        return Err(case_not_found());
    }
    tracing::info!(case_id = %id, "Case deleted");

    Ok(Json(CaseMessage {
        message: "Case deleted successfully",
    }))
}
