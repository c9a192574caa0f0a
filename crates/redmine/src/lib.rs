pub mod batch;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use stamper_core::{
    config::RedmineConfig,
    models::{Issue, IssuesContainer},
};
use thiserror::Error;

const API_KEY_HEADER: &str = "X-Redmine-API-Key";

#[derive(Debug, Error)]
pub enum RedmineError {
    #[error("Redmine is unreachable: {0}")]
    Unavailable(#[source] reqwest::Error),
    #[error("Received wrong status code {0}")]
    Rejected(reqwest::StatusCode),
    #[error("Failed to parse Redmine response: {0}")]
    Malformed(#[source] reqwest::Error),
}

/// Redmine REST client. One attempt per call, no retries; a failed
/// call surfaces immediately to the caller.
#[derive(Clone)]
pub struct Redmine {
    client: reqwest::Client,
    config: RedmineConfig,
}

impl Redmine {
    pub fn new(config: RedmineConfig) -> Self {
        Self { client: build_client(), config }
    }

    /// Fetch all issues of the project that sit in the ready-to-build
    /// status.
    pub async fn ready_issues(&self, project: &str) -> Result<IssuesContainer, RedmineError> {
        let response = self
            .client
            .get(format!("{}/issues.json", self.config.host))
            .query(&[
                ("status_id", self.config.ready_status.to_string().as_str()),
                ("project_id", project),
            ])
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(RedmineError::Unavailable)?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(RedmineError::Rejected(status));
        }
        response.json().await.map_err(RedmineError::Malformed)
    }
}

/// Single status-transition call against the tracker. The seam behind
/// which test doubles are substituted; any implementation must perform
/// exactly one remote mutation per call, idempotent on success.
#[async_trait]
pub trait DoneMarker: Send + Sync {
    async fn mark_done(
        &self,
        issue: &Issue,
        config: &RedmineConfig,
        build_number: u32,
    ) -> Result<(), RedmineError>;
}

/// Production marker: moves an issue to the done status, hands it back
/// to its author, and stamps the build number into the configured
/// custom field.
#[derive(Clone)]
pub struct RedmineDoneMarker {
    client: reqwest::Client,
}

impl RedmineDoneMarker {
    pub fn new() -> Self {
        Self { client: build_client() }
    }
}

impl Default for RedmineDoneMarker {
    fn default() -> Self { Self::new() }
}

#[derive(Serialize)]
struct UpdateCustomField {
    id: u32,
    value: String,
}

#[derive(Serialize)]
struct UpdateIssue {
    assigned_to_id: String,
    status_id: String,
    custom_fields: Vec<UpdateCustomField>,
}

#[derive(Serialize)]
struct UpdateRequest {
    issue: UpdateIssue,
}

#[async_trait]
impl DoneMarker for RedmineDoneMarker {
    async fn mark_done(
        &self,
        issue: &Issue,
        config: &RedmineConfig,
        build_number: u32,
    ) -> Result<(), RedmineError> {
        let body = UpdateRequest {
            issue: UpdateIssue {
                assigned_to_id: issue.author.id.to_string(),
                status_id: config.done_status.to_string(),
                custom_fields: vec![UpdateCustomField {
                    id: config.build_field_id,
                    value: build_number.to_string(),
                }],
            },
        };
        let response = self
            .client
            .put(format!("{}/issues/{}.json", config.host, issue.id))
            .header(API_KEY_HEADER, &config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(RedmineError::Unavailable)?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(RedmineError::Rejected(status));
        }
        Ok(())
    }
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stamper_core::models::{Author, Project};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path, query_param},
    };

    use super::*;

    fn test_config(host: String) -> RedmineConfig {
        RedmineConfig {
            host,
            api_key: "secret".into(),
            ready_status: 2,
            done_status: 5,
            build_field_id: 32,
        }
    }

    #[tokio::test]
    async fn ready_issues_queries_status_and_project() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues.json"))
            .and(query_param("status_id", "2"))
            .and(query_param("project_id", "11"))
            .and(header(API_KEY_HEADER, "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issues": [
                    {"id": 1, "author": {"id": 7}, "project": {"id": 11, "name": "Mobile"}},
                    {"id": 2, "author": {"id": 8}, "project": {"id": 11, "name": "Mobile"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let redmine = Redmine::new(test_config(server.uri()));
        let issues = redmine.ready_issues("11").await.unwrap();
        assert_eq!(issues.ids(), vec![1, 2]);
    }

    #[tokio::test]
    async fn ready_issues_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues.json"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let redmine = Redmine::new(test_config(server.uri()));
        let err = redmine.ready_issues("11").await.unwrap_err();
        assert!(matches!(err, RedmineError::Rejected(status) if status.as_u16() == 403));
    }

    #[tokio::test]
    async fn ready_issues_reports_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/issues.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let redmine = Redmine::new(test_config(server.uri()));
        let err = redmine.ready_issues("11").await.unwrap_err();
        assert!(matches!(err, RedmineError::Malformed(_)));
    }

    #[tokio::test]
    async fn mark_done_reassigns_and_stamps_build_number() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/issues/42.json"))
            .and(header(API_KEY_HEADER, "secret"))
            .and(body_partial_json(json!({
                "issue": {
                    "assigned_to_id": "7",
                    "status_id": "5",
                    "custom_fields": [{"id": 32, "value": "128"}]
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let issue = Issue {
            id: 42,
            author: Author { id: 7 },
            project: Project { id: 11, name: "Mobile".into() },
        };
        let marker = RedmineDoneMarker::new();
        marker.mark_done(&issue, &test_config(server.uri()), 128).await.unwrap();
    }

    #[tokio::test]
    async fn mark_done_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/issues/42.json"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let issue = Issue {
            id: 42,
            author: Author { id: 7 },
            project: Project { id: 11, name: "Mobile".into() },
        };
        let marker = RedmineDoneMarker::new();
        let err = marker.mark_done(&issue, &test_config(server.uri()), 128).await.unwrap_err();
        assert!(matches!(err, RedmineError::Rejected(status) if status.as_u16() == 422));
    }
}
