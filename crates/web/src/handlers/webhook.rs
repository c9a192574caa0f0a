use std::time::Duration;

use anyhow::Context;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use stamper_core::{
    AppError,
    models::{HookResponse, IssuesContainer},
};
use stamper_redmine::batch::batch_transaction;

use crate::{
    AppState,
    extract::{BitriseEventType, HookEvent},
};

/// Entry point for Bitrise build-lifecycle hooks. A triggered event
/// snapshots the ready-to-build issues into the cache; the matching
/// finished event resolves that snapshot and stamps every issue done.
pub async fn webhook(
    State(state): State<AppState>,
    event: HookEvent,
) -> Result<Response, AppError> {
    tracing::info!("Received bitrise event {:?} for project {}", event.event_type, event.project);
    match &event.event_type {
        BitriseEventType::Triggered => handle_triggered(&state, &event).await,
        BitriseEventType::Finished => handle_finished(&state, &event).await,
        BitriseEventType::Other(name) => {
            Ok(skip(format!("Unsupported bitrise event type {name}")))
        }
    }
}

async fn handle_triggered(state: &AppState, event: &HookEvent) -> Result<Response, AppError> {
    let payload = &event.payload;
    if !payload.is_internal() {
        return Ok(skip("Skipping done transition: build workflow is not internal"));
    }

    let issues = state
        .redmine
        .ready_issues(&event.project)
        .await
        .map_err(|err| AppError::BadRequest(format!("Wrong error from server: {err}")))?;

    let data = serde_json::to_string(&issues).context("Can't serialize issue data to string")?;
    let ttl = Duration::from_secs(state.config.redis.cache_ttl_secs);
    state
        .cache
        .set(&payload.build_slug, &data, ttl)
        .await
        .with_context(|| format!("Can't write new cache entry for build {}", payload.build_slug))?;

    let mut response = HookResponse::new(format!(
        "Caching issue data was completed (Build: {})",
        payload.build_slug
    ));
    response.success = issues.ids();
    Ok(Json(response).into_response())
}

async fn handle_finished(state: &AppState, event: &HookEvent) -> Result<Response, AppError> {
    let payload = &event.payload;
    if !payload.is_internal() {
        return Ok(skip("Skipping done transition: build workflow is not internal"));
    }
    if !payload.is_successful() {
        return Ok(skip("Skipping done transition: build status is not success"));
    }

    // A cache miss, a failed read, or an unreadable entry all degrade
    // to a fresh issue query; none of them is an error condition.
    let slug = &payload.build_slug;
    let mut cached = None;
    match state.cache.get(slug).await {
        Ok(Some(raw)) => match serde_json::from_str::<IssuesContainer>(&raw) {
            Ok(issues) => cached = Some(issues),
            Err(err) => tracing::warn!("Discarding unreadable cache entry for build {slug}: {err}"),
        },
        Ok(None) => tracing::info!("No cache entry for build {slug}"),
        Err(err) => tracing::warn!("Cache read failed for build {slug}: {err}"),
    }
    let (issues, origin) = match cached {
        Some(issues) => (issues, "cached"),
        None => {
            let issues = state
                .redmine
                .ready_issues(&event.project)
                .await
                .map_err(|err| AppError::BadRequest(format!("Wrong error from server: {err}")))?;
            (issues, "fresh")
        }
    };

    let response = batch_transaction(
        state.marker.as_ref(),
        &issues,
        &state.config.redmine,
        payload.build_number,
    )
    .await;
    state
        .notifier
        .send(&response, &state.config.redmine.host, payload.build_number, &issues.issues, origin)
        .await;
    Ok(Json(response).into_response())
}

fn skip(message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(HookResponse::new(message))).into_response()
}
