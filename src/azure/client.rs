use crate::azure::types::*;
use crate::error::DevOpsError;
use crate::settings::ButtonSettings;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::json;

const API_VERSION: &str = "7.1";

/// The slice of Azure DevOps this plugin talks to. Methods take the button's
/// settings so one client instance can serve buttons pointing at different
/// organizations; a connection is effectively re-derived per call.
pub trait CicdApi: Send + Sync {
    /// Newest in-progress build, honoring the definition/branch filters.
    fn in_progress_builds<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Build>, DevOpsError>>;

    /// Most recent build regardless of state, honoring the same filters.
    fn latest_build<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Option<Build>, DevOpsError>>;

    fn build_definitions<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<DefinitionRef>, DevOpsError>>;

    fn queue_build<'a>(
        &'a self,
        settings: &'a ButtonSettings,
        definition_id: i32,
    ) -> BoxFuture<'a, Result<(), DevOpsError>>;

    fn in_progress_deployments<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Deployment>, DevOpsError>>;

    fn latest_deployments<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Deployment>, DevOpsError>>;

    fn release_definitions<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<ReleaseDefinition>, DevOpsError>>;

    fn create_release<'a>(
        &'a self,
        settings: &'a ButtonSettings,
        definition_id: i32,
    ) -> BoxFuture<'a, Result<(), DevOpsError>>;

    fn active_pull_requests<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<PullRequest>, DevOpsError>>;
}

/// REST client with PAT basic auth (empty user name, token as password).
#[derive(Debug, Clone, Default)]
pub struct AzureClient {
    http: reqwest::Client,
}

impl AzureClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Release management lives on its own host for hosted organizations.
    fn release_base(settings: &ButtonSettings) -> String {
        settings
            .organization()
            .replacen("://dev.azure.com", "://vsrm.dev.azure.com", 1)
    }

    fn api_url(base: &str, settings: &ButtonSettings, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}/{}/_apis/{}?api-version={}",
            base,
            urlencoding::encode(&settings.project_name),
            path,
            API_VERSION
        );
        for (key, value) in query {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        settings: &ButtonSettings,
        url: String,
    ) -> Result<T, DevOpsError> {
        let response = self
            .http
            .get(&url)
            .basic_auth("", Some(&settings.access_token))
            .send()
            .await?;
        let response = Self::check_status(response)?;
        Ok(response.json().await?)
    }

    async fn post(
        &self,
        settings: &ButtonSettings,
        url: String,
        body: serde_json::Value,
    ) -> Result<(), DevOpsError> {
        let response = self
            .http
            .post(&url)
            .basic_auth("", Some(&settings.access_token))
            .json(&body)
            .send()
            .await?;
        Self::check_status(response)?;
        Ok(())
    }

    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DevOpsError> {
        let status = response.status();
        match status.as_u16() {
            // A bad PAT comes back as a 203 carrying the sign-in page, not a 401.
            203 | 401 | 403 => Err(DevOpsError::AuthenticationFailed),
            404 => Err(DevOpsError::NotFound(response.url().path().to_string())),
            _ if !status.is_success() => Err(DevOpsError::RemoteUnavailable(format!(
                "unexpected status {status}"
            ))),
            _ => Ok(response),
        }
    }

    fn build_query(settings: &ButtonSettings, in_progress_only: bool) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("queryOrder", "queueTimeDescending".to_string()),
            ("$top", "1".to_string()),
        ];
        if in_progress_only {
            query.push(("statusFilter", "inProgress".to_string()));
        }
        if let Some(id) = settings.definition() {
            query.push(("definitions", id.to_string()));
        }
        if let Some(branch) = settings.full_branch_name() {
            query.push(("branchName", branch));
        }
        query
    }

    fn deployment_query(settings: &ButtonSettings, in_progress_only: bool) -> Vec<(&'static str, String)> {
        let mut query = vec![("queryOrder", "descending".to_string())];
        if in_progress_only {
            query.push(("deploymentStatus", "inProgress".to_string()));
        }
        if let Some(id) = settings.definition() {
            query.push(("definitionId", id.to_string()));
        }
        query
    }
}

impl CicdApi for AzureClient {
    fn in_progress_builds<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Build>, DevOpsError>> {
        Box::pin(async move {
            let query = Self::build_query(settings, true);
            let url = Self::api_url(settings.organization(), settings, "build/builds", &query);
            let list: ListResponse<Build> = self.get(settings, url).await?;
            Ok(list.value)
        })
    }

    fn latest_build<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Option<Build>, DevOpsError>> {
        Box::pin(async move {
            let query = Self::build_query(settings, false);
            let url = Self::api_url(settings.organization(), settings, "build/builds", &query);
            let list: ListResponse<Build> = self.get(settings, url).await?;
            Ok(list.value.into_iter().next())
        })
    }

    fn build_definitions<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<DefinitionRef>, DevOpsError>> {
        Box::pin(async move {
            let url = Self::api_url(settings.organization(), settings, "build/definitions", &[]);
            let list: ListResponse<DefinitionRef> = self.get(settings, url).await?;
            Ok(list.value)
        })
    }

    fn queue_build<'a>(
        &'a self,
        settings: &'a ButtonSettings,
        definition_id: i32,
    ) -> BoxFuture<'a, Result<(), DevOpsError>> {
        Box::pin(async move {
            let url = Self::api_url(settings.organization(), settings, "build/builds", &[]);
            let mut body = json!({ "definition": { "id": definition_id } });
            if let Some(branch) = settings.full_branch_name() {
                body["sourceBranch"] = json!(branch);
            }
            self.post(settings, url, body).await
        })
    }

    fn in_progress_deployments<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Deployment>, DevOpsError>> {
        Box::pin(async move {
            let query = Self::deployment_query(settings, true);
            let url = Self::api_url(&Self::release_base(settings), settings, "release/deployments", &query);
            let list: ListResponse<Deployment> = self.get(settings, url).await?;
            Ok(list.value)
        })
    }

    fn latest_deployments<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Deployment>, DevOpsError>> {
        Box::pin(async move {
            let query = Self::deployment_query(settings, false);
            let url = Self::api_url(&Self::release_base(settings), settings, "release/deployments", &query);
            let list: ListResponse<Deployment> = self.get(settings, url).await?;
            Ok(list.value)
        })
    }

    fn release_definitions<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<ReleaseDefinition>, DevOpsError>> {
        Box::pin(async move {
            let url = Self::api_url(&Self::release_base(settings), settings, "release/definitions", &[]);
            let list: ListResponse<ReleaseDefinition> = self.get(settings, url).await?;
            Ok(list.value)
        })
    }

    fn create_release<'a>(
        &'a self,
        settings: &'a ButtonSettings,
        definition_id: i32,
    ) -> BoxFuture<'a, Result<(), DevOpsError>> {
        Box::pin(async move {
            let url = Self::api_url(&Self::release_base(settings), settings, "release/releases", &[]);
            let body = json!({ "definitionId": definition_id });
            self.post(settings, url, body).await
        })
    }

    fn active_pull_requests<'a>(
        &'a self,
        settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<PullRequest>, DevOpsError>> {
        Box::pin(async move {
            let query = vec![("searchCriteria.status", "active".to_string())];
            let url = Self::api_url(settings.organization(), settings, "git/pullrequests", &query);
            let list: ListResponse<PullRequest> = self.get(settings, url).await?;
            Ok(list.value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings() -> ButtonSettings {
        ButtonSettings {
            organization_url: "https://dev.azure.com/fabrikam/".to_string(),
            project_name: "Web Site".to_string(),
            access_token: "pat".to_string(),
            ..ButtonSettings::default()
        }
    }

    #[test]
    fn test_release_base_moves_hosted_orgs_to_vsrm() {
        assert_eq!(
            AzureClient::release_base(&settings()),
            "https://vsrm.dev.azure.com/fabrikam"
        );

        let mut on_prem = settings();
        on_prem.organization_url = "https://tfs.corp.local/DefaultCollection".to_string();
        assert_eq!(
            AzureClient::release_base(&on_prem),
            "https://tfs.corp.local/DefaultCollection"
        );
    }

    #[test]
    fn test_api_url_encodes_project_and_query() {
        let settings = settings();
        let url = AzureClient::api_url(
            settings.organization(),
            &settings,
            "build/builds",
            &[("branchName", "refs/heads/main".to_string())],
        );
        assert_eq!(
            url,
            "https://dev.azure.com/fabrikam/Web%20Site/_apis/build/builds\
             ?api-version=7.1&branchName=refs%2Fheads%2Fmain"
        );
    }

    #[test]
    fn test_build_query_applies_filters() {
        let mut settings = settings();
        settings.definition_id = Some(12);
        settings.branch_name = Some("main".to_string());

        let query = AzureClient::build_query(&settings, true);
        assert!(query.contains(&("statusFilter", "inProgress".to_string())));
        assert!(query.contains(&("definitions", "12".to_string())));
        assert!(query.contains(&("branchName", "refs/heads/main".to_string())));
        assert!(query.contains(&("$top", "1".to_string())));

        let unfiltered = AzureClient::build_query(&ButtonSettings::default(), false);
        assert!(!unfiltered.iter().any(|(k, _)| *k == "statusFilter"));
        assert!(!unfiltered.iter().any(|(k, _)| *k == "definitions"));
    }

    #[test]
    fn test_deployment_query_optional_definition() {
        let query = AzureClient::deployment_query(&settings(), true);
        assert!(query.contains(&("deploymentStatus", "inProgress".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "definitionId"));

        let mut with_def = settings();
        with_def.definition_id = Some(3);
        let query = AzureClient::deployment_query(&with_def, false);
        assert!(query.contains(&("definitionId", "3".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "deploymentStatus"));
    }
}
