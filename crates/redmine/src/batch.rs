use futures_util::future;
use stamper_core::{
    config::RedmineConfig,
    models::{HookResponse, IssuesContainer},
};

use crate::DoneMarker;

/// Marks every issue in the container as done, one concurrent call per
/// issue, and waits for all of them before returning. Never fails as a
/// whole: each issue id lands in either `success` or `failures`.
pub async fn batch_transaction(
    marker: &dyn DoneMarker,
    issues: &IssuesContainer,
    config: &RedmineConfig,
    build_number: u32,
) -> HookResponse {
    let outcomes = future::join_all(issues.issues.iter().map(|issue| async move {
        (issue.id, marker.mark_done(issue, config, build_number).await)
    }))
    .await;

    let mut response = HookResponse::new("Successful completed task");
    for (id, outcome) in outcomes {
        match outcome {
            Ok(()) => response.success.push(id),
            Err(err) => {
                tracing::warn!("Failed to mark issue {id} as done: {err}");
                response.failures.push(id);
            }
        }
    }
    response
}
