//! Blocking HTTP submission to the generation server.
//!
//! One POST per combination to `{server}/prompt` with the ComfyUI queue
//! payload `{"prompt": ..., "client_id": ...}`. The server queues work
//! internally; there is no client-side rate limiting and no retry — a
//! rejection or transport failure is fatal for the run.

use colored::Colorize;
use serde_json::{json, Value};
use sweepgrid_core::{PromptSink, SegmentKey, SubmitError};

pub struct HttpPromptSink {
    client: reqwest::blocking::Client,
    url: String,
    client_id: String,
}

impl HttpPromptSink {
    pub fn new(server: &str, client_id: String) -> Result<Self, SubmitError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| SubmitError::Transport {
                message: format!("failed to build http client: {e}"),
            })?;
        Ok(HttpPromptSink {
            client,
            url: format!("{}/prompt", server.trim_end_matches('/')),
            client_id,
        })
    }
}

impl PromptSink for HttpPromptSink {
    fn submit(&mut self, key: &SegmentKey, prompt: &Value) -> Result<(), SubmitError> {
        let payload = json!({ "prompt": prompt, "client_id": self.client_id });
        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| SubmitError::Transport {
                message: format!(
                    "failed to reach generation server at {} (is it running?) ({e})",
                    self.url
                ),
            })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        println!("{} {} queued", "ok".green().bold(), key);
        Ok(())
    }
}
