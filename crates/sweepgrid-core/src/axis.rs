//! Axis definitions and value loading.
//!
//! A sweep has up to seven axes, identified by the letters `s,t,u,v,x,y,z`
//! in that fixed canonical order. Each axis addresses one `(node, input)`
//! slot in the workflow template and carries an ordered, non-empty sequence
//! of typed values read from a line-delimited file. Axes `s` and `t` are
//! mandatory.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

// ============================================================================
// Axis identity
// ============================================================================

/// One of the seven sweep dimensions, in canonical order.
///
/// The order is load-bearing: it defines enumeration nesting (`s` outermost,
/// `z` fastest-varying) and the override direction on slot collisions
/// (later axis wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AxisId {
    S,
    T,
    U,
    V,
    X,
    Y,
    Z,
}

impl AxisId {
    pub const COUNT: usize = 7;

    /// All axes in canonical order.
    pub const ALL: [AxisId; Self::COUNT] = [
        AxisId::S,
        AxisId::T,
        AxisId::U,
        AxisId::V,
        AxisId::X,
        AxisId::Y,
        AxisId::Z,
    ];

    /// Axes that must be supplied for any sweep.
    pub const REQUIRED: [AxisId; 2] = [AxisId::S, AxisId::T];

    pub fn letter(self) -> char {
        match self {
            AxisId::S => 's',
            AxisId::T => 't',
            AxisId::U => 'u',
            AxisId::V => 'v',
            AxisId::X => 'x',
            AxisId::Y => 'y',
            AxisId::Z => 'z',
        }
    }

    /// Position in canonical order; also the slot index inside [`AxisSet`].
    pub fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Fatal configuration problems. Never retried; the run aborts before any
/// submission happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("axis '{axis}' is required; provide --{axis} <nodeId>-<input>.txt")]
    MissingRequiredAxis { axis: AxisId },

    #[error("axis {axis}: spec '{spec}' must look like '<nodeId>-<input>.txt'")]
    BadAxisSpec { axis: AxisId, spec: String },

    #[error("invalid --as value for axis {axis}: {hint} (use auto|int|float|string)")]
    BadTypeHint { axis: AxisId, hint: String },

    #[error("axis {axis}: values file not found: {path}")]
    ValuesFileMissing { axis: AxisId, path: PathBuf },

    #[error("axis {axis}: failed to read {path}: {source}")]
    ValuesFileRead {
        axis: AxisId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("axis {axis}: parse error on line {line} in {path} ({message})")]
    BadValue {
        axis: AxisId,
        line: usize,
        path: PathBuf,
        message: String,
    },

    #[error("axis {axis}: no values found in {path}")]
    EmptyValues { axis: AxisId, path: PathBuf },

    #[error("axis {axis}: node id '{node_id}' not found in workflow")]
    UnknownNode { axis: AxisId, node_id: String },

    #[error("node id '{node_id}' not found in workflow")]
    NodeNotFound { node_id: String },

    #[error("node '{node_id}' has no 'inputs' object")]
    NodeInputsMissing { node_id: String },

    #[error(
        "--save-target must look like '<nodeId>:<input>:<subfolder>' \
         (e.g. '9:filename_prefix:MyImages'): {spec}"
    )]
    BadSaveTarget { spec: String },
}

// ============================================================================
// Values
// ============================================================================

/// Type hint for value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Try int, then float, then fall back to the raw string.
    Auto,
    Int,
    Float,
    Str,
}

impl ValueKind {
    /// Parse a user-supplied `--as` word. `str` is accepted as an alias for
    /// `string`.
    pub fn parse(axis: AxisId, text: &str) -> Result<Self, ConfigError> {
        match text.to_ascii_lowercase().as_str() {
            "auto" => Ok(ValueKind::Auto),
            "int" => Ok(ValueKind::Int),
            "float" => Ok(ValueKind::Float),
            "string" | "str" => Ok(ValueKind::Str),
            _ => Err(ConfigError::BadTypeHint {
                axis,
                hint: text.to_string(),
            }),
        }
    }

    /// Numeric parses tolerate surrounding whitespace; string values keep
    /// the line verbatim.
    fn coerce(self, token: &str) -> Result<AxisValue, String> {
        let trimmed = token.trim();
        match self {
            ValueKind::Str => Ok(AxisValue::Str(token.to_string())),
            ValueKind::Int => trimmed
                .parse::<i64>()
                .map(AxisValue::Int)
                .map_err(|e| format!("invalid int '{trimmed}': {e}")),
            ValueKind::Float => trimmed
                .parse::<f64>()
                .map(AxisValue::Float)
                .map_err(|e| format!("invalid float '{trimmed}': {e}")),
            ValueKind::Auto => Ok(trimmed
                .parse::<i64>()
                .map(AxisValue::Int)
                .or_else(|_| trimmed.parse::<f64>().map(AxisValue::Float))
                .unwrap_or_else(|_| AxisValue::Str(token.to_string()))),
        }
    }
}

/// One literal axis value.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl AxisValue {
    /// The JSON literal written into the workflow slot.
    pub fn to_json(&self) -> Value {
        match self {
            AxisValue::Int(i) => Value::from(*i),
            AxisValue::Float(f) => Value::from(*f),
            AxisValue::Str(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Int(i) => write!(f, "{i}"),
            AxisValue::Float(x) => write!(f, "{x}"),
            AxisValue::Str(s) => write!(f, "{s}"),
        }
    }
}

// ============================================================================
// Axis spec parsing
// ============================================================================

/// The `(node, input)` slot an axis writes into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisTarget {
    pub node_id: String,
    pub input: String,
}

fn axis_spec_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)-([A-Za-z0-9_]+)\.txt$").unwrap())
}

impl AxisTarget {
    /// Parse `'31-steps.txt'` into node `31`, input `steps`. Only the file
    /// name component is considered, so callers may pass a path.
    pub fn parse_spec(axis: AxisId, spec: &str) -> Result<Self, ConfigError> {
        let base = Path::new(spec)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(spec);
        let caps = axis_spec_re()
            .captures(base)
            .ok_or_else(|| ConfigError::BadAxisSpec {
                axis,
                spec: spec.to_string(),
            })?;
        Ok(AxisTarget {
            node_id: caps[1].to_string(),
            input: caps[2].to_string(),
        })
    }
}

// ============================================================================
// Value files
// ============================================================================

/// Read a line-delimited values file. Blank lines and lines whose first
/// non-whitespace character is `#` are ignored; everything else is coerced
/// per `kind`. Line numbers in errors are 1-based.
pub fn read_values_file(
    path: &Path,
    kind: ValueKind,
    axis: AxisId,
) -> Result<Vec<AxisValue>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::ValuesFileMissing {
            axis,
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| ConfigError::ValuesFileRead {
        axis,
        path: path.to_path_buf(),
        source,
    })?;

    let mut values = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match kind.coerce(line) {
            Ok(v) => values.push(v),
            Err(message) => {
                return Err(ConfigError::BadValue {
                    axis,
                    line: i + 1,
                    path: path.to_path_buf(),
                    message,
                });
            }
        }
    }
    if values.is_empty() {
        return Err(ConfigError::EmptyValues {
            axis,
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(axis = %axis, count = values.len(), path = %path.display(), "axis values loaded");
    Ok(values)
}

// ============================================================================
// AxisSet
// ============================================================================

/// How to load one axis: the spec file name (under the params dir) plus the
/// type hint for coercion.
#[derive(Debug, Clone)]
pub struct AxisSpec {
    pub file_name: String,
    pub kind: ValueKind,
}

/// One fully loaded sweep dimension.
#[derive(Debug, Clone)]
pub struct Axis {
    pub id: AxisId,
    pub target: AxisTarget,
    /// Never empty.
    pub values: Vec<AxisValue>,
}

/// The seven axis slots in canonical order; absent axes hold `None`.
#[derive(Debug, Clone, Default)]
pub struct AxisSet {
    slots: [Option<Axis>; AxisId::COUNT],
}

impl AxisSet {
    /// Load and validate every supplied axis.
    ///
    /// Validation order per axis: spec shape, addressed node exists in the
    /// workflow, values file loads non-empty. Required axes (`s`, `t`) must
    /// be supplied at all.
    pub fn load(
        specs: [Option<AxisSpec>; AxisId::COUNT],
        params_dir: &Path,
        workflow: &Value,
    ) -> Result<AxisSet, ConfigError> {
        for id in AxisId::REQUIRED {
            if specs[id.slot()].is_none() {
                return Err(ConfigError::MissingRequiredAxis { axis: id });
            }
        }

        let mut slots: [Option<Axis>; AxisId::COUNT] = Default::default();
        for id in AxisId::ALL {
            let Some(spec) = &specs[id.slot()] else {
                continue;
            };
            let target = AxisTarget::parse_spec(id, &spec.file_name)?;
            if workflow.get(&target.node_id).is_none() {
                return Err(ConfigError::UnknownNode {
                    axis: id,
                    node_id: target.node_id,
                });
            }
            let values = read_values_file(&params_dir.join(&spec.file_name), spec.kind, id)?;
            slots[id.slot()] = Some(Axis { id, target, values });
        }
        Ok(AxisSet { slots })
    }

    /// Construct directly from loaded axes (each placed in its own slot).
    pub fn from_axes(axes: Vec<Axis>) -> AxisSet {
        let mut slots: [Option<Axis>; AxisId::COUNT] = Default::default();
        for axis in axes {
            let slot = axis.id.slot();
            slots[slot] = Some(axis);
        }
        AxisSet { slots }
    }

    pub fn get(&self, id: AxisId) -> Option<&Axis> {
        self.slots[id.slot()].as_ref()
    }

    /// Present axes in canonical order.
    pub fn present(&self) -> impl Iterator<Item = &Axis> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Value count per slot; absent axes contribute a single implicit
    /// "no value" entry.
    pub(crate) fn slot_len(&self, id: AxisId) -> usize {
        self.get(id).map_or(1, |a| a.values.len())
    }
}

// ============================================================================
// Tests
// ============================================================================
