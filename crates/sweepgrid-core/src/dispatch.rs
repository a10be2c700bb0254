//! Per-combination dispatch into the workflow template.
//!
//! For every combination that is not already on disk: deep-copy the
//! template, write each axis value into its addressed slot as a literal
//! (overwriting links), write the save-target slot with the folder-qualified
//! segment key, and hand the prompt to the [`PromptSink`].
//!
//! Failure semantics are deliberately blunt: any addressing failure or any
//! sink failure stops the whole sweep before further submissions. Nothing is
//! retried or rolled back; the resume pass of the next invocation picks up
//! from the gap.

use crate::axis::{AxisSet, ConfigError};
use crate::combo::SegmentKey;
use crate::reconcile;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Rejection or transport failure from the generation server. Fatal for the
/// run; the already-submitted prefix of the sweep stays queued.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("server rejected prompt: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {message}")]
    Transport { message: String },
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

// ============================================================================
// Save target
// ============================================================================

fn save_target_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+):([A-Za-z0-9_]+):(.+)$").unwrap())
}

/// The distinguished slot that receives the folder-qualified segment key, so
/// the server writes output under a predictable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    pub node_id: String,
    pub input: String,
    pub folder: String,
}

impl SaveTarget {
    /// Parse `'<nodeId>:<input>:<subfolder>'`, e.g. `'9:filename_prefix:MyImages'`.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let caps = save_target_re()
            .captures(spec.trim())
            .ok_or_else(|| ConfigError::BadSaveTarget {
                spec: spec.to_string(),
            })?;
        let folder = caps[3].trim().to_string();
        if folder.is_empty() {
            return Err(ConfigError::BadSaveTarget {
                spec: spec.to_string(),
            });
        }
        Ok(SaveTarget {
            node_id: caps[1].to_string(),
            input: caps[2].to_string(),
            folder,
        })
    }

    /// The literal written into the save-target slot for one combination.
    pub fn prefix_for(&self, key: &SegmentKey) -> String {
        let folder = self.folder.trim_end_matches(|c| c == '/' || c == '\\');
        if folder.is_empty() {
            key.to_string()
        } else {
            format!("{folder}/{key}")
        }
    }
}

// ============================================================================
// Template mutation
// ============================================================================

/// Write `value` into `prompt[node_id].inputs[input]`, replacing whatever is
/// there (including node links).
pub fn set_input_literal(
    prompt: &mut Value,
    node_id: &str,
    input: &str,
    value: Value,
) -> Result<(), ConfigError> {
    let node = prompt
        .get_mut(node_id)
        .ok_or_else(|| ConfigError::NodeNotFound {
            node_id: node_id.to_string(),
        })?;
    let inputs = node
        .get_mut("inputs")
        .and_then(|v| v.as_object_mut())
        .ok_or_else(|| ConfigError::NodeInputsMissing {
            node_id: node_id.to_string(),
        })?;
    inputs.insert(input.to_string(), value);
    Ok(())
}

// ============================================================================
// Sweep loop
// ============================================================================

/// Seam to the external generation server. Implementations submit one fully
/// prepared prompt and report rejection or transport failure.
pub trait PromptSink {
    fn submit(&mut self, key: &SegmentKey, prompt: &Value) -> Result<(), SubmitError>;
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Combinations handed to the sink this run.
    pub submitted: usize,
    /// Combinations whose output already existed.
    pub skipped: usize,
}

/// Run the whole sweep in enumeration order.
///
/// The template is never mutated: every combination works on its own deep
/// copy. The first addressing or submission failure aborts with the earlier
/// combinations already submitted and the later ones never attempted.
pub fn run_sweep(
    set: &AxisSet,
    template: &Value,
    save_target: &SaveTarget,
    output_dir: &Path,
    sink: &mut dyn PromptSink,
) -> Result<SweepOutcome, SweepError> {
    let mut outcome = SweepOutcome::default();

    for combo in set.combinations() {
        let key = set.segment_key(&combo);
        if reconcile::should_skip(output_dir, &key) {
            tracing::debug!(key = %key, "output exists; skipping");
            outcome.skipped += 1;
            continue;
        }

        let mut prompt = template.clone();
        for axis in set.present() {
            let value = &axis.values[combo.index(axis.id)];
            set_input_literal(
                &mut prompt,
                &axis.target.node_id,
                &axis.target.input,
                value.to_json(),
            )
            .map_err(|e| {
                tracing::error!(axis = %axis.id, error = %e, "axis value assignment failed");
                e
            })?;
        }
        set_input_literal(
            &mut prompt,
            &save_target.node_id,
            &save_target.input,
            Value::from(save_target.prefix_for(&key)),
        )?;

        sink.submit(&key, &prompt)?;
        outcome.submitted += 1;
        tracing::debug!(key = %key, "prompt queued");
    }

    Ok(outcome)
}

// ============================================================================
// Tests
// ============================================================================
