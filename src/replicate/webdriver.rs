// ABOUTME: Remote grid backed by an existing W3C WebDriver browser session
// ABOUTME: Sends keys through the Actions endpoint and pastes text via the clipboard

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::remote::{Direction, RemoteGrid};

const KEY_CONTROL: &str = "\u{E009}";
const KEY_HOME: &str = "\u{E011}";
const KEY_TAB: &str = "\u{E004}";
const KEY_ARROW_DOWN: &str = "\u{E015}";

/// Client for a browser session that already has the target sheet open and focused.
pub struct WebDriverGrid {
    client: reqwest::Client,
    session_url: Url,
}

impl WebDriverGrid {
    /// Attach to session `session_id` on the WebDriver server at `base_url`.
    pub fn new(base_url: &str, session_id: &str) -> Result<Self> {
        if session_id.trim().is_empty() {
            anyhow::bail!("WebDriver session id must not be empty");
        }
        let mut base = Url::parse(base_url)
            .with_context(|| format!("Invalid WebDriver URL '{}'", base_url))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let session_url = base
            .join(&format!("session/{}/", session_id.trim()))
            .context("Failed to build WebDriver session URL")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            session_url,
        })
    }

    pub fn session_url(&self) -> &Url {
        &self.session_url
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        let url = self
            .session_url
            .join(endpoint)
            .with_context(|| format!("Failed to build WebDriver URL for '{}'", endpoint))?;

        let response = self.client.post(url).json(&body).send().await.context(
            "Failed to reach WebDriver server. Check that the browser session is still open",
        )?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("WebDriver request '{}' failed {}: {}", endpoint, status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse WebDriver response")
    }

    /// Press `keys` in order, then release them in reverse order.
    async fn press(&self, keys: &[&str]) -> Result<()> {
        let mut actions: Vec<Value> = keys
            .iter()
            .map(|k| json!({"type": "keyDown", "value": k}))
            .collect();
        actions.extend(
            keys.iter()
                .rev()
                .map(|k| json!({"type": "keyUp", "value": k})),
        );
        let body = json!({
            "actions": [{"type": "key", "id": "keyboard", "actions": actions}]
        });
        self.post("actions", body).await.map(|_| ())
    }
}

impl RemoteGrid for WebDriverGrid {
    async fn move_cursor(&mut self, direction: Direction) -> Result<()> {
        match direction {
            Direction::Top => self.press(&[KEY_CONTROL, KEY_HOME]).await,
            Direction::Down => self.press(&[KEY_ARROW_DOWN]).await,
            Direction::Right => self.press(&[KEY_TAB]).await,
            Direction::RowStart => self.press(&[KEY_HOME]).await,
        }
    }

    async fn inject_text(&mut self, text: &str) -> Result<()> {
        let body = json!({
            "script": format!("return navigator.clipboard.writeText('{}');", text),
            "args": []
        });
        self.post("execute/sync", body).await.map(|_| ())
    }

    async fn commit_cell(&mut self) -> Result<()> {
        self.press(&[KEY_CONTROL, "v"]).await
    }

    async fn save(&mut self) -> Result<()> {
        self.press(&[KEY_CONTROL, "s"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_url() {
        let grid = WebDriverGrid::new("http://localhost:4444/", "abc123").unwrap();
        assert_eq!(
            grid.session_url().as_str(),
            "http://localhost:4444/session/abc123/"
        );
        assert_eq!(
            grid.session_url().join("actions").unwrap().as_str(),
            "http://localhost:4444/session/abc123/actions"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let grid = WebDriverGrid::new("http://grid:4444/wd/hub", "s1").unwrap();
        assert_eq!(
            grid.session_url().as_str(),
            "http://grid:4444/wd/hub/session/s1/"
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(WebDriverGrid::new("not a url", "abc").is_err());
        assert!(WebDriverGrid::new("http://localhost:4444/", " ").is_err());
    }
}
