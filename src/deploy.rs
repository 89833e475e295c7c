//! Per-branch command execution.

use tokio::process::Command;

use crate::BranchConfig;
use crate::log::RunLog;
use crate::provider::Change;

/// Resolve the `%branch%` / `%branchDir%` tokens of one command template.
pub fn substitute(template: &str, branch: &str, branch_dir: &str) -> String {
    template
        .replace("%branch%", branch)
        .replace("%branchDir%", branch_dir)
}

/// Run a branch's configured commands in order, fail-fast.
///
/// Every command is spawned as its own `sh -c` process with the working
/// directory forced to the branch directory, so no shell state carries
/// over between commands. Stdout is logged line by line as `info`; the
/// first non-zero exit status is logged as `error` and stops the rest of
/// this branch's commands. Already-run commands are not rolled back.
///
/// Returns `true` once the branch has been processed, even when a command
/// failed; the caller derives the branch outcome from the log state.
pub async fn deploy_branch(change: &Change, config: &BranchConfig, log: &RunLog) -> bool {
    let branch = &change.ref_name;
    let branch_dir = &config.path;

    log.info(format!("Deploying branch {}", branch));

    for template in &config.commands {
        let command = substitute(template, branch, branch_dir);
        log.info(format!("Executing {}", command));

        let output = match Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(branch_dir)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                log.error(format!("Failed to start {}: {}", command, e));
                break;
            }
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            log.info(line.to_string());
        }

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "killed by signal".to_string());
            log.error(format!(
                "An error {} has occurred while trying to execute {}",
                status, command
            ));
            break;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Severity;
    use crate::provider::ChangeKind;

    fn branch_change(name: &str) -> Change {
        Change {
            ref_name: name.to_string(),
            kind: ChangeKind::Branch,
        }
    }

    #[test]
    fn substitute_replaces_both_tokens() {
        assert_eq!(
            substitute("echo %branch% in %branchDir%", "release", "/srv/release"),
            "echo release in /srv/release"
        );
    }

    #[test]
    fn substitute_leaves_plain_commands_alone() {
        assert_eq!(substitute("git pull", "main", "/srv/main"), "git pull");
    }

    #[tokio::test]
    async fn command_output_is_logged_line_by_line() {
        let dir = tempfile::tempdir().unwrap();
        let config = BranchConfig {
            path: dir.path().to_string_lossy().to_string(),
            commands: vec!["printf 'one\\ntwo\\n'".to_string()],
        };
        let log = RunLog::new(false);

        let completed = deploy_branch(&branch_change("main"), &config, &log).await;

        assert!(completed);
        let texts: Vec<String> = log.messages().into_iter().map(|m| m.text).collect();
        assert!(texts.contains(&"one".to_string()));
        assert!(texts.contains(&"two".to_string()));
        assert!(!log.has_any(Severity::Error));
    }

    #[tokio::test]
    async fn commands_run_in_the_branch_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = BranchConfig {
            path: dir.path().to_string_lossy().to_string(),
            commands: vec!["pwd".to_string()],
        };
        let log = RunLog::new(false);

        deploy_branch(&branch_change("main"), &config, &log).await;

        let dump = log.dump();
        assert!(
            dump.contains(dir.path().file_name().unwrap().to_str().unwrap()),
            "expected branch dir in output, got: {}",
            dump
        );
    }

    #[tokio::test]
    async fn failing_command_stops_the_remaining_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let config = BranchConfig {
            path: dir.path().to_string_lossy().to_string(),
            commands: vec![
                "echo before".to_string(),
                "exit 3".to_string(),
                "echo after".to_string(),
            ],
        };
        let log = RunLog::new(false);

        // Completion is reported even though a command failed.
        let completed = deploy_branch(&branch_change("main"), &config, &log).await;
        assert!(completed);

        let texts: Vec<String> = log.messages().into_iter().map(|m| m.text).collect();
        assert!(texts.contains(&"before".to_string()));
        assert!(!texts.iter().any(|t| t.contains("after")));
        assert!(log.has_any(Severity::Error));

        let error_text = log
            .messages()
            .into_iter()
            .find(|m| m.is(Severity::Error))
            .unwrap()
            .text;
        assert!(error_text.contains('3'), "exit status in: {}", error_text);
        assert!(error_text.contains("exit 3"), "command in: {}", error_text);
    }

    #[tokio::test]
    async fn resolved_command_text_is_logged_before_execution() {
        let dir = tempfile::tempdir().unwrap();
        let config = BranchConfig {
            path: dir.path().to_string_lossy().to_string(),
            commands: vec!["echo deploying %branch%".to_string()],
        };
        let log = RunLog::new(false);

        deploy_branch(&branch_change("release"), &config, &log).await;

        let texts: Vec<String> = log.messages().into_iter().map(|m| m.text).collect();
        assert!(texts.contains(&"Executing echo deploying release".to_string()));
        assert!(texts.contains(&"deploying release".to_string()));
    }
}
