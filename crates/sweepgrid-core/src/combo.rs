//! Cartesian enumeration and segment-key encoding.
//!
//! Enumeration order is a contract: combinations come out in lexicographic
//! order of their index tuples with the axes in canonical order, so `s` is
//! the outermost loop and `z` varies fastest. Absent axes contribute a
//! single implicit index.
//!
//! The segment key is the canonical on-disk identity of a combination:
//! `node-input-value--node-input-value...`, one segment per addressed slot.
//! When two axes target the same `(node, input)` slot the later axis wins
//! and the slot is emitted once, at its first-appearance position.

use crate::axis::{AxisId, AxisSet, AxisTarget, AxisValue};
use std::fmt;

// ============================================================================
// Combinations
// ============================================================================

/// One element of the cartesian product: a value index per axis slot.
/// Absent axes are pinned at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    indices: [usize; AxisId::COUNT],
}

impl Combination {
    pub fn index(&self, id: AxisId) -> usize {
        self.indices[id.slot()]
    }
}

/// Lazy odometer over the full product, in the documented order.
pub struct Combinations {
    lens: [usize; AxisId::COUNT],
    next: Option<[usize; AxisId::COUNT]>,
    remaining: usize,
}

impl Iterator for Combinations {
    type Item = Combination;

    fn next(&mut self) -> Option<Combination> {
        let current = self.next?;
        self.remaining -= 1;

        // Odometer increment from the last (fastest-varying) axis.
        let mut following = current;
        let mut done = true;
        for slot in (0..AxisId::COUNT).rev() {
            following[slot] += 1;
            if following[slot] < self.lens[slot] {
                done = false;
                break;
            }
            following[slot] = 0;
        }
        self.next = if done { None } else { Some(following) };

        Some(Combination { indices: current })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Combinations {}

impl AxisSet {
    /// Total number of combinations: the product of present-axis value
    /// counts (absent axes contribute factor 1).
    pub fn combination_count(&self) -> usize {
        AxisId::ALL.iter().map(|id| self.slot_len(*id)).product()
    }

    pub fn combinations(&self) -> Combinations {
        let mut lens = [1usize; AxisId::COUNT];
        for id in AxisId::ALL {
            lens[id.slot()] = self.slot_len(id);
        }
        let remaining = lens.iter().product();
        Combinations {
            lens,
            next: Some([0; AxisId::COUNT]),
            remaining,
        }
    }

    /// Canonical encoding of one combination's final slot values.
    ///
    /// Pure and deterministic: the same axis definitions and combination
    /// always yield a byte-identical key.
    pub fn segment_key(&self, combo: &Combination) -> SegmentKey {
        // Final value per (node, input) slot, first-appearance order,
        // later axis overriding earlier on collision.
        let mut slots: Vec<(&AxisTarget, &AxisValue)> = Vec::new();
        for axis in self.present() {
            let value = &axis.values[combo.index(axis.id)];
            match slots.iter_mut().find(|(t, _)| **t == axis.target) {
                Some(entry) => entry.1 = value,
                None => slots.push((&axis.target, value)),
            }
        }
        let parts: Vec<String> = slots
            .iter()
            .map(|(t, v)| format!("{}-{}-{}", t.node_id, t.input, encode_value(v)))
            .collect();
        SegmentKey(parts.join("--"))
    }
}

// ============================================================================
// Segment keys
// ============================================================================

/// The encoded identifier stem for one combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentKey(String);

impl SegmentKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The expected output file name.
    ///
    /// Known fidelity limitation: the counter is always `_00001`, i.e. one
    /// output image per submission is assumed. A server emitting more than
    /// one image per prompt would not be fully detected by resume.
    pub fn output_file_name(&self) -> String {
        format!("{}_00001.png", self.0)
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render one value as a filename-safe token.
///
/// Ints and strings render literally. Floats render with 15 fractional
/// digits, then trailing zeros and a dangling point are stripped, keeping at
/// least one digit after the point (`2.0` stays `2.0`, never `2`). Finally
/// every `.` becomes `_`.
pub fn encode_value(value: &AxisValue) -> String {
    let rendered = match value {
        AxisValue::Int(i) => i.to_string(),
        AxisValue::Str(s) => s.clone(),
        AxisValue::Float(f) => {
            let mut s = format!("{f:.15}");
            while s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.pop();
            }
            if !s.contains('.') {
                s.push_str(".0");
            }
            s
        }
    };
    rendered.replace('.', "_")
}

// ============================================================================
// Tests
// ============================================================================
