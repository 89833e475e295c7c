//! Deployment run orchestration.
//!
//! A [`DeploymentRun`] is created once per webhook invocation and walks
//! three phases in strict order: filter the pushed changes against the
//! configured branches, deploy each deployable branch sequentially, then
//! report. Nothing survives the run.

use std::collections::HashMap;
use std::sync::Arc;

use crate::BranchConfig;
use crate::deploy::deploy_branch;
use crate::error::Result;
use crate::log::{RunLog, Severity};
use crate::provider::{Change, ProviderAdapter};

pub struct DeploymentRun {
    repository: String,
    branches: HashMap<String, BranchConfig>,
    changes: Vec<Change>,
    deployable: Vec<Change>,
    log: Arc<RunLog>,
}

impl DeploymentRun {
    /// Build a run from a raw webhook body.
    ///
    /// The adapter is the per-provider payload capability; a payload that
    /// does not parse aborts here, before any branch is considered.
    pub fn from_payload(
        adapter: &dyn ProviderAdapter,
        raw: &[u8],
        branches: HashMap<String, BranchConfig>,
        log: Arc<RunLog>,
    ) -> Result<Self> {
        let event = adapter.extract(raw)?;
        Ok(Self {
            repository: event.repository,
            branches,
            changes: event.changes,
            deployable: Vec::new(),
            log,
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn deployable_changes(&self) -> &[Change] {
        &self.deployable
    }

    /// Execute the whole run: filter, deploy, report.
    pub async fn run(mut self) {
        self.before_deployment_tasks();
        self.deployment_tasks().await;
        self.after_deployment_tasks();
    }

    /// Filter phase: decide which pushed changes are deployable.
    ///
    /// Every change either lands in the deployable list (order preserved)
    /// or produces exactly one warning; none is silently dropped.
    fn before_deployment_tasks(&mut self) {
        self.log
            .info(format!("Starting to deploy {}", self.repository));

        for change in &self.changes {
            if change.is_branch() && self.branches.contains_key(&change.ref_name) {
                self.deployable.push(change.clone());
            } else {
                self.log.warning(format!(
                    "Ignoring {} change to {}: not configured for deployment",
                    change.kind.label(),
                    change.ref_name
                ));
            }
        }
    }

    /// Execute phase: deploy each deployable branch in order.
    ///
    /// The success check is global over the run's log, not per branch: once
    /// any error has been logged, every later branch in the same run is
    /// reported as an error too, even if its own commands all exited 0.
    async fn deployment_tasks(&mut self) {
        for change in &self.deployable {
            // Filter phase guarantees the key exists.
            let Some(config) = self.branches.get(&change.ref_name) else {
                continue;
            };

            let completed = deploy_branch(change, config, &self.log).await;

            if completed && !self.log.has_any(Severity::Error) {
                self.log
                    .success(format!("Branch {} deployed successfully", change.ref_name));
            } else {
                self.log
                    .error(format!("Failed to deploy branch {}", change.ref_name));
            }
        }
    }

    /// Report phase: flush the buffered dump once.
    ///
    /// Skipped entirely in debug mode, where every message already went to
    /// the sink as it was created.
    fn after_deployment_tasks(&self) {
        if !self.log.in_debug() {
            self.log.info("Deployment completed");
            self.log.flush();
        }
    }
}
