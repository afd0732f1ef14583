// Thin async wrapper over blocking ureq agents.
// Requests run on the blocking pool so callers can simply await them.

use std::time::Duration;

use tracing::debug;
use ureq::Agent;
use url::Url;

use crate::{AskError, Result};

/// Status and body of a completed HTTP exchange, whatever the status code
#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub(crate) const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Build an agent that reports non-2xx responses as values instead of errors,
/// so error bodies can be surfaced to the user.
pub(crate) fn build_agent(timeout: Duration, user_agent: &str) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .user_agent(user_agent)
        .build()
        .into()
}

pub(crate) async fn get(
    agent: &Agent,
    url: Url,
    headers: Vec<(&'static str, String)>,
) -> Result<HttpResponse> {
    let agent = agent.clone();
    run_blocking(move || {
        debug!("GET {}", url);
        let mut request = agent.get(url.as_str());
        for (name, value) in &headers {
            request = request.header(*name, value.as_str());
        }
        let mut response = request.call()?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        Ok(HttpResponse { status, body })
    })
    .await
}

pub(crate) async fn post_json(
    agent: &Agent,
    url: Url,
    headers: Vec<(&'static str, String)>,
    body: String,
) -> Result<HttpResponse> {
    let agent = agent.clone();
    run_blocking(move || {
        debug!("POST {} ({} bytes)", url, body.len());
        let mut request = agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        for (name, value) in &headers {
            request = request.header(*name, value.as_str());
        }
        let mut response = request.send(&body)?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        Ok(HttpResponse { status, body })
    })
    .await
}

async fn run_blocking<F>(request_fn: F) -> Result<HttpResponse>
where
    F: FnOnce() -> std::result::Result<HttpResponse, ureq::Error> + Send + 'static,
{
    tokio::task::spawn_blocking(request_fn)
        .await
        .map_err(|e| AskError::Network(format!("HTTP task failed: {}", e)))?
        .map_err(|e| AskError::Network(e.to_string()))
}
