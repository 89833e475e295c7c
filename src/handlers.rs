use axum::{
    Json,
    body::Bytes,
    extract::Path,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use deployer::SharedState;
use deployer::log;
use deployer::provider::{BitbucketAdapter, GithubAdapter, ProviderAdapter};
use deployer::server::DeploymentRun;
use serde_json::json;
use tracing::{info, warn};

pub async fn root() -> &'static str {
    "deployer is running"
}

/// True only for an `X-GitHub-Event` header that is exactly `push`; a
/// missing or unreadable header does not count.
fn github_event_is_push(headers: &HeaderMap) -> bool {
    headers.get("X-GitHub-Event").and_then(|v| v.to_str().ok()) == Some("push")
}

/// Returns the current server status and config summary
pub async fn status(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    Json(json!({
        "server": {
            "name": "deployer",
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
        },
        "config": {
            "debug": state.config.debug,
            "configured_branches": state.config.branches.len(),
        }
    }))
}

/// Handles a provider's webhook POST request.
///
/// The path segment selects the payload adapter; the run itself is
/// provider-independent. The run outcome lives in the emitted log, so the
/// response only distinguishes "ran" from "rejected payload".
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let adapter: &dyn ProviderAdapter = match provider.as_str() {
        "bitbucket" => &BitbucketAdapter,
        "github" => &GithubAdapter,
        _ => {
            warn!("Unknown webhook provider '{}'", provider);
            return StatusCode::NOT_FOUND;
        }
    };

    // GitHub posts ping and other events to the same hook; only pushes
    // trigger a deployment.
    if provider == "github" && !github_event_is_push(&headers) {
        info!(
            "Not push event; Received {:?} event",
            headers.get("X-GitHub-Event")
        );
        return StatusCode::NO_CONTENT;
    }

    // One deployment at a time: the run log is process-scoped and branch
    // directories are shared on disk.
    let _guard = state.run_lock.lock().await;

    let run_log = log::instance(state.config.debug);
    let run = match DeploymentRun::from_payload(
        adapter,
        &body,
        state.config.branches.clone(),
        run_log,
    ) {
        Ok(run) => run,
        Err(e) => {
            warn!("Rejected {} payload: {}", provider, e);
            log::destroy();
            return StatusCode::BAD_REQUEST;
        }
    };

    info!(
        "Deployment run started for repository '{}'",
        run.repository()
    );
    run.run().await;

    // Discard the process log so the next invocation starts fresh.
    log::destroy();

    StatusCode::OK
}
