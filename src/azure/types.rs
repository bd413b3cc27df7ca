use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope for Azure DevOps list endpoints: `{ "count": n, "value": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub count: i32,
}

// Build types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: i32,
    #[serde(default)]
    pub build_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>, // notStarted, inProgress, cancelling, postponed, completed
    #[serde(default)]
    pub result: Option<String>, // succeeded, partiallySucceeded, failed, canceled
    #[serde(default)]
    pub queue_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub definition: Option<DefinitionRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionRef {
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
}

// Release types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: i32,
    #[serde(default)]
    pub deployment_status: Option<String>, // notDeployed, inProgress, succeeded, partiallySucceeded, failed
    #[serde(default)]
    pub operation_status: Option<String>, // pending, scheduled, queued*, phaseInProgress, cancelling, ...
    #[serde(default)]
    pub queued_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub release_definition: Option<ReleaseDefinitionRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinitionRef {
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDefinition {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_disabled: bool,
}

// Pull request types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    #[serde(rename = "pullRequestId")]
    pub pull_request_id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub repository: Option<Repository>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_list_deserializes_from_rest_payload() {
        let json = r#"{
            "count": 1,
            "value": [{
                "id": 321,
                "buildNumber": "20240106.2",
                "status": "inProgress",
                "queueTime": "2024-01-06T08:00:00Z",
                "startTime": "2024-01-06T08:01:30Z",
                "sourceBranch": "refs/heads/main",
                "definition": { "id": 12, "name": "CI" }
            }]
        }"#;

        let parsed: ListResponse<Build> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.count, 1);
        let build = &parsed.value[0];
        assert_eq!(build.id, 321);
        assert_eq!(build.status.as_deref(), Some("inProgress"));
        assert_eq!(build.result, None);
        assert_eq!(build.definition.as_ref().unwrap().id, 12);
        assert!(build.start_time.is_some());
    }

    #[test]
    fn test_deployment_tolerates_missing_fields() {
        let json = r#"{ "id": 9, "deploymentStatus": "succeeded" }"#;
        let deployment: Deployment = serde_json::from_str(json).unwrap();
        assert_eq!(deployment.deployment_status.as_deref(), Some("succeeded"));
        assert_eq!(deployment.operation_status, None);
        assert_eq!(deployment.queued_on, None);
    }

    #[test]
    fn test_pull_request_repository_name() {
        let json = r#"{
            "pullRequestId": 55,
            "title": "Fix build",
            "status": "active",
            "repository": { "id": "abc", "name": "website" }
        }"#;
        let pr: PullRequest = serde_json::from_str(json).unwrap();
        assert_eq!(pr.pull_request_id, 55);
        assert_eq!(pr.repository.unwrap().name, "website");
    }
}
