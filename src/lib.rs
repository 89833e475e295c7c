pub mod deploy;
pub mod error;
pub mod log;
pub mod provider;
pub mod server;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Operator-supplied configuration: which branches deploy, and how.
#[derive(Debug, Deserialize, Clone)]
pub struct DeployerConfig {
    #[serde(default)]
    pub debug: bool,
    pub branches: HashMap<String, BranchConfig>,
}

/// Working directory plus ordered command templates for one branch.
///
/// Templates may use the `%branch%` and `%branchDir%` tokens, resolved
/// per command at execution time.
#[derive(Debug, Deserialize, Clone)]
pub struct BranchConfig {
    pub path: String,
    pub commands: Vec<String>,
}

pub struct AppState {
    /// Serializes deployment runs. The run log is process-scoped, so only
    /// one invocation may be in flight at a time.
    pub run_lock: Mutex<()>,
    pub config: DeployerConfig,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_branch_tables() {
        let raw = r#"
            debug = true

            [branches.main]
            path = "/srv/main"
            commands = ["git pull", "make deploy"]

            [branches."release/v2"]
            path = "/srv/release"
            commands = ["echo %branch% in %branchDir%"]
        "#;

        let config: DeployerConfig = toml::from_str(raw).unwrap();
        assert!(config.debug);
        assert_eq!(config.branches.len(), 2);

        let main = &config.branches["main"];
        assert_eq!(main.path, "/srv/main");
        assert_eq!(main.commands, vec!["git pull", "make deploy"]);
        assert!(config.branches.contains_key("release/v2"));
    }

    #[test]
    fn debug_defaults_to_off() {
        let raw = r#"
            [branches.main]
            path = "/srv/main"
            commands = []
        "#;

        let config: DeployerConfig = toml::from_str(raw).unwrap();
        assert!(!config.debug);
    }
}
