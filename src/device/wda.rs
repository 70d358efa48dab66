//! WebDriverAgent client: app launch, screenshots and taps over HTTP.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::Device;
use crate::error::{BotError, Result};
use crate::layout::TapPoint;

/// Joins a host URL and a port, e.g. `http://10.0.0.5` and 8100.
pub fn endpoint(base_url: &str, port: u16) -> String {
    format!("{}:{}", base_url.trim_end_matches('/'), port)
}

/// Body of `POST /session` launching `bundle_id`.
///
/// The MJPEG port is only requested when the screen is being recorded.
pub fn session_request(bundle_id: &str, mjpeg_port: Option<u16>) -> Value {
    let mut always_match = json!({ "bundleId": bundle_id });
    if let Some(port) = mjpeg_port {
        always_match["mjpegServerPort"] = json!(port);
    }
    json!({ "capabilities": { "alwaysMatch": always_match } })
}

/// Session id from a WDA response, at the top level or under `value`.
pub fn parse_session_id(body: &Value) -> Option<String> {
    body.get("sessionId")
        .or_else(|| body.get("value").and_then(|v| v.get("sessionId")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn tap_request(point: TapPoint) -> Value {
    json!({
        "actions": [{
            "action": "tap",
            "options": { "x": point.x, "y": point.y }
        }]
    })
}

#[derive(Deserialize)]
struct ScreenshotResponse {
    value: String,
}

/// Decodes the base64 PNG of a `GET /screenshot` response.
pub fn decode_screenshot(body: &str) -> Result<Vec<u8>> {
    let response: ScreenshotResponse = serde_json::from_str(body)?;
    // WDA may wrap long base64 output
    let cleaned: String = response.value.split_whitespace().collect();
    Ok(STANDARD.decode(cleaned)?)
}

pub struct WdaClient {
    client: Client,
    url: String,
    session_id: Option<String>,
}

impl WdaClient {
    pub fn new(base_url: &str, port: u16, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: endpoint(base_url, port), session_id: None })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Starts a session with the game in the foreground.
    pub fn open_app(&mut self, bundle_id: &str, mjpeg_port: Option<u16>) -> Result<String> {
        info!("Opening {} via {}", bundle_id, self.url);
        let body: Value = self
            .client
            .post(format!("{}/session", self.url))
            .json(&session_request(bundle_id, mjpeg_port))
            .send()?
            .error_for_status()?
            .json()?;

        let id = parse_session_id(&body)
            .ok_or_else(|| BotError::Device(format!("no session id in response: {}", body)))?;
        debug!("WDA session {}", id);
        self.session_id = Some(id.clone());
        Ok(id)
    }

    fn session_id(&mut self) -> Result<String> {
        if let Some(id) = &self.session_id {
            return Ok(id.clone());
        }
        let body: Value = self.client.get(format!("{}/session", self.url)).send()?.json()?;
        let id = parse_session_id(&body)
            .ok_or_else(|| BotError::Device("WDA has no active session".to_string()))?;
        self.session_id = Some(id.clone());
        Ok(id)
    }
}

impl Device for WdaClient {
    fn screenshot_png(&mut self) -> Result<Vec<u8>> {
        let body = self
            .client
            .get(format!("{}/screenshot", self.url))
            .send()?
            .error_for_status()?
            .text()?;
        decode_screenshot(&body)
    }

    fn tap(&mut self, point: TapPoint, label: &str) -> Result<()> {
        info!("TAP {} at {}", label, point);
        let id = self.session_id()?;
        let response = self
            .client
            .post(format!("{}/session/{}/wda/touch/perform", self.url, id))
            .json(&tap_request(point))
            .send()?;

        if response.status().is_client_error() {
            // Session expired; look it up again next time
            self.session_id = None;
        }
        response.error_for_status()?;
        Ok(())
    }
}
