use serde::{Deserialize, Serialize};

/// Build status value Bitrise reports for a successful build.
const BUILD_STATUS_SUCCESS: u32 = 1;

/// Bitrise webhook payload. Fields default when absent to stay
/// compatible with hooks that omit them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HookPayload {
    pub build_slug: String,
    pub build_number: u32,
    pub build_status: u32,
    pub build_triggered_workflow: String,
}

impl HookPayload {
    pub fn is_internal(&self) -> bool { self.build_triggered_workflow == "internal" }

    pub fn is_successful(&self) -> bool { self.build_status == BUILD_STATUS_SUCCESS }
}

/// Single Redmine issue, reduced to the fields the stamper needs.
/// Unknown response fields are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u32,
    pub author: Author,
    pub project: Project,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u32,
    pub name: String,
}

/// Issue list as Redmine returns it and as it is serialized into the
/// cache between the triggered and finished events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuesContainer {
    pub issues: Vec<Issue>,
}

impl IssuesContainer {
    pub fn ids(&self) -> Vec<u32> { self.issues.iter().map(|issue| issue.id).collect() }
}

/// Response body for every handled hook. `success` and `failures`
/// partition the processed issue ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookResponse {
    pub message: String,
    pub success: Vec<u32>,
    pub failures: Vec<u32>,
}

impl HookResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), success: Vec::new(), failures: Vec::new() }
    }
}
