//! Sweepgrid sweep engine
//!
//! Drives a generative-image server through a parameter sweep:
//! - up to seven independent axes (`s,t,u,v,x,y,z`), each with its own
//!   line-delimited value file and a target (node, input) slot,
//! - full cartesian enumeration in a fixed, documented order,
//! - a deterministic filesystem-safe encoding of every combination,
//! - reconciliation of the on-disk output set (delete strays, skip
//!   combinations whose output already exists),
//! - per-combination dispatch into a deep copy of the workflow template.
//!
//! The HTTP round-trip to the server lives behind [`dispatch::PromptSink`];
//! this crate never opens a socket itself.

pub mod axis;
pub mod combo;
pub mod decode;
pub mod dispatch;
pub mod reconcile;

pub use axis::{Axis, AxisId, AxisSet, AxisSpec, AxisTarget, AxisValue, ConfigError, ValueKind};
pub use combo::{Combination, SegmentKey};
pub use dispatch::{PromptSink, SaveTarget, SubmitError, SweepError, SweepOutcome};
