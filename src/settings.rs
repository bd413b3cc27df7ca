use crate::error::DevOpsError;
use serde::{Deserialize, Serialize};

/// Which part of Azure DevOps a button is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineKind {
    #[default]
    Build,
    Release,
    PullRequest,
}

/// What a key press does. Tap and long press are configured independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyPressAction {
    DoNothing,
    #[default]
    UpdateStatus,
    Run,
    Open,
}

/// Per-button configuration, persisted by the host runtime and edited by the
/// configuration form. Field names are the wire contract with both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ButtonSettings {
    /// Organization endpoint, e.g. `https://dev.azure.com/fabrikam`
    pub organization_url: String,
    pub project_name: String,
    /// Personal access token
    pub access_token: String,
    pub pipeline_kind: PipelineKind,
    /// Build/release definition id; `None` or 0 means "any definition".
    /// For the pull-request kind this names the repository instead.
    pub definition_id: Option<i32>,
    pub branch_name: Option<String>,
    pub tap_action: KeyPressAction,
    pub long_press_action: KeyPressAction,
    /// Background refresh interval in seconds; 0 disables polling.
    pub poll_interval_secs: u64,
    /// Message of the last failed operation, surfaced in the form.
    pub last_error: Option<String>,
}

impl Default for ButtonSettings {
    fn default() -> Self {
        Self {
            organization_url: String::new(),
            project_name: String::new(),
            access_token: String::new(),
            pipeline_kind: PipelineKind::Build,
            definition_id: None,
            branch_name: None,
            tap_action: KeyPressAction::UpdateStatus,
            long_press_action: KeyPressAction::Run,
            poll_interval_secs: 60,
            last_error: None,
        }
    }
}

impl ButtonSettings {
    /// A button can only operate once endpoint, project and token are set.
    pub fn validate(&self) -> Result<(), DevOpsError> {
        if self.organization_url.trim().is_empty() {
            return Err(DevOpsError::ConfigurationInvalid(
                "organization URL is not set".into(),
            ));
        }
        if self.project_name.trim().is_empty() {
            return Err(DevOpsError::ConfigurationInvalid(
                "project name is not set".into(),
            ));
        }
        if self.access_token.trim().is_empty() {
            return Err(DevOpsError::ConfigurationInvalid(
                "access token is not set".into(),
            ));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Definition filter, with the form's 0 placeholder treated as unset.
    pub fn definition(&self) -> Option<i32> {
        self.definition_id.filter(|id| *id > 0)
    }

    /// Repository named by the definition field (pull-request kind reuses it).
    pub fn repository(&self) -> Option<String> {
        self.definition().map(|id| id.to_string())
    }

    /// Branch filter in full ref form (`refs/heads/main`).
    pub fn full_branch_name(&self) -> Option<String> {
        let branch = self.branch_name.as_deref()?.trim();
        if branch.is_empty() {
            return None;
        }
        if branch.starts_with("refs/") {
            Some(branch.to_string())
        } else {
            Some(format!("refs/heads/{branch}"))
        }
    }

    /// Organization endpoint without a trailing slash.
    pub fn organization(&self) -> &str {
        self.organization_url.trim_end_matches('/')
    }
}
