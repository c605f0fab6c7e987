use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::StageError;

const RENDER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct NavigateResponse {
    html: String,
    status_code: u16,
}

/// Releases the remote render session on drop, best-effort, regardless of
/// which exit path `render` took (success, error, or timeout).
struct SessionGuard {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let client = self.client.clone();
        let url = format!("{}/sessions/{}", self.base_url, self.session_id);
        tokio::spawn(async move {
            if let Err(err) = client.delete(&url).send().await {
                tracing::warn!("failed to release render session {url}: {err}");
            }
        });
    }
}

/// Renders `url` via the external headless-browser collaborator. A page is
/// acquired, navigated, read, and the session is always released — even if
/// navigation times out or errors.
pub async fn render_page(
    client: &reqwest::Client,
    render_service_url: &str,
    url: &str,
) -> Result<(String, u16), StageError> {
    let session: SessionResponse = client
        .post(format!("{render_service_url}/sessions"))
        .send()
        .await
        .map_err(|e| StageError::Transport(e.to_string()))?
        .error_for_status()
        .map_err(|e| StageError::Transport(e.to_string()))?
        .json()
        .await
        .map_err(|e| StageError::ParseError(e.to_string()))?;

    let _guard = SessionGuard {
        client: client.clone(),
        base_url: render_service_url.to_string(),
        session_id: session.session_id.clone(),
    };

    let navigate = client
        .post(format!(
            "{render_service_url}/sessions/{}/navigate",
            session.session_id
        ))
        .timeout(RENDER_TIMEOUT)
        .json(&json!({ "url": url, "wait_until": "network_idle" }))
        .send();

    let response = tokio::time::timeout(RENDER_TIMEOUT, navigate)
        .await
        .map_err(|_| StageError::RenderTimeout)?
        .map_err(|e| StageError::Transport(e.to_string()))?;

    let parsed: NavigateResponse = response
        .json()
        .await
        .map_err(|e| StageError::ParseError(e.to_string()))?;

    Ok((parsed.html, parsed.status_code))
}
