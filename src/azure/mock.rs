//! Scripted stand-in for [`CicdApi`] used across the unit tests.

use crate::azure::client::CicdApi;
use crate::azure::types::*;
use crate::error::DevOpsError;
use crate::settings::ButtonSettings;
use futures::future::BoxFuture;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockApi {
    pub in_progress_builds: Vec<Build>,
    pub latest_build: Option<Build>,
    pub build_definitions: Vec<DefinitionRef>,
    pub in_progress_deployments: Vec<Deployment>,
    pub latest_deployments: Vec<Deployment>,
    pub release_definitions: Vec<ReleaseDefinition>,
    pub pull_requests: Vec<PullRequest>,
    /// When set, every read fails with RemoteUnavailable.
    pub offline: bool,
    /// Every call, in order, e.g. `queue_build:12`.
    pub calls: Mutex<Vec<String>>,
}

impl MockApi {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn gate<T>(&self, value: T) -> Result<T, DevOpsError> {
        if self.offline {
            Err(DevOpsError::RemoteUnavailable("mock is offline".into()))
        } else {
            Ok(value)
        }
    }
}

impl CicdApi for MockApi {
    fn in_progress_builds<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Build>, DevOpsError>> {
        self.record("in_progress_builds");
        let result = self.gate(self.in_progress_builds.clone());
        Box::pin(async move { result })
    }

    fn latest_build<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Option<Build>, DevOpsError>> {
        self.record("latest_build");
        let result = self.gate(self.latest_build.clone());
        Box::pin(async move { result })
    }

    fn build_definitions<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<DefinitionRef>, DevOpsError>> {
        self.record("build_definitions");
        let result = self.gate(self.build_definitions.clone());
        Box::pin(async move { result })
    }

    fn queue_build<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
        definition_id: i32,
    ) -> BoxFuture<'a, Result<(), DevOpsError>> {
        self.record(format!("queue_build:{definition_id}"));
        let result = self.gate(());
        Box::pin(async move { result })
    }

    fn in_progress_deployments<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Deployment>, DevOpsError>> {
        self.record("in_progress_deployments");
        let result = self.gate(self.in_progress_deployments.clone());
        Box::pin(async move { result })
    }

    fn latest_deployments<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<Deployment>, DevOpsError>> {
        self.record("latest_deployments");
        let result = self.gate(self.latest_deployments.clone());
        Box::pin(async move { result })
    }

    fn release_definitions<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<ReleaseDefinition>, DevOpsError>> {
        self.record("release_definitions");
        let result = self.gate(self.release_definitions.clone());
        Box::pin(async move { result })
    }

    fn create_release<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
        definition_id: i32,
    ) -> BoxFuture<'a, Result<(), DevOpsError>> {
        self.record(format!("create_release:{definition_id}"));
        let result = self.gate(());
        Box::pin(async move { result })
    }

    fn active_pull_requests<'a>(
        &'a self,
        _settings: &'a ButtonSettings,
    ) -> BoxFuture<'a, Result<Vec<PullRequest>, DevOpsError>> {
        self.record("active_pull_requests");
        let result = self.gate(self.pull_requests.clone());
        Box::pin(async move { result })
    }
}
