//! Core models for the stepwise library
//!
//! This module contains the step validation rules, the append-only history
//! store, and the response derivation logic for recorded reasoning steps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Raw step payload as submitted by a caller, before validation.
///
/// Every field is optional so that a structurally incomplete payload still
/// deserializes, letting the validator report all offending fields at once
/// instead of failing on the first missing one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub text: Option<String>,
    pub sequence_needed: Option<bool>,
    pub index: Option<i64>,
    pub estimated_total: Option<i64>,
    pub is_revision: Option<bool>,
    pub revision_of: Option<i64>,
    pub branch_point: Option<i64>,
    pub branch_label: Option<String>,
    pub more_steps_needed: Option<bool>,
}

impl StepInput {
    /// Parses an untyped JSON payload into a `StepInput`.
    ///
    /// A payload that doesn't match the recognized shape at all (wrong types,
    /// not an object) is reported as a schema failure rather than a transport
    /// error, so the caller sees the same error taxonomy either way.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value)
            .map_err(|e| ValidationError::Schema(vec![format!("unrecognized payload: {}", e)]))
    }
}

/// A validated reasoning step, immutable once accepted.
///
/// `index` is the step's own declared position; it is not required to match
/// its physical position in the history, and the store never renumbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub text: String,
    pub sequence_needed: bool,
    pub index: u64,
    pub estimated_total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_revision: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_of: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_point: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_steps_needed: Option<bool>,
}

impl Step {
    /// Whether this step amends an earlier one
    pub fn is_revision(&self) -> bool {
        self.revision_of.is_some()
    }

    /// Whether this step opens or continues a named branch
    pub fn is_branch(&self) -> bool {
        self.branch_point.is_some()
    }
}

/// Validation failures for a submitted step.
///
/// All three are local and recoverable per call; adapters convert them into
/// the failure response shape, never relying on unwinding. Validation fully
/// precedes mutation, so a rejected step leaves the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Malformed, missing, or mistyped fields; lists every offending field.
    #[error("invalid step payload: {}", .0.join("; "))]
    Schema(Vec<String>),

    /// Revision reference violates ordering.
    #[error("cannot revise a future or non-positive step: revisionOf {revision_of} must be in [1, {index})")]
    Revision { revision_of: i64, index: u64 },

    /// Branch reference violates ordering, or its label is missing/empty.
    #[error("branch point must precede current step and carry a label: {reason}")]
    Branch { reason: String },
}

impl ValidationError {
    /// Stable marker distinguishing the three failure classes.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Schema(_) => "SchemaError",
            ValidationError::Revision { .. } => "RevisionError",
            ValidationError::Branch { .. } => "BranchError",
        }
    }
}

/// Failure payload shared by every adapter boundary.
///
/// `status` is always `"failed"`, tagging the payload so a transport can mark
/// the call as failed without the core knowing transport-specific codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub error: String,
    pub status: String,
}

impl From<&ValidationError> for Failure {
    fn from(err: &ValidationError) -> Self {
        Self {
            error: err.to_string(),
            status: "failed".to_string(),
        }
    }
}

/// Validates a raw payload into a [`Step`].
///
/// Checks run in order: shape, revision reference, branch reference, then the
/// upward normalization of `estimatedTotal`. The validator reads nothing but
/// the payload itself — referential bounds are checked against the step's own
/// declared `index`, not the store's content — so it stays O(1) regardless of
/// history size and performs no I/O.
pub fn validate(input: StepInput) -> Result<Step, ValidationError> {
    let mut offenses = Vec::new();

    match input.text.as_deref() {
        None => offenses.push("text: required non-empty string".to_string()),
        Some("") => offenses.push("text: must not be empty".to_string()),
        Some(_) => {}
    }
    if input.sequence_needed.is_none() {
        offenses.push("sequenceNeeded: required boolean".to_string());
    }
    match input.index {
        None => offenses.push("index: required integer >= 1".to_string()),
        Some(i) if i < 1 => offenses.push(format!("index: must be >= 1, got {}", i)),
        Some(_) => {}
    }
    match input.estimated_total {
        None => offenses.push("estimatedTotal: required integer >= 1".to_string()),
        Some(t) if t < 1 => offenses.push(format!("estimatedTotal: must be >= 1, got {}", t)),
        Some(_) => {}
    }

    if !offenses.is_empty() {
        return Err(ValidationError::Schema(offenses));
    }

    let (Some(text), Some(sequence_needed), Some(index), Some(estimated_total)) = (
        input.text,
        input.sequence_needed,
        input.index,
        input.estimated_total,
    ) else {
        // All four were just checked above; this arm is unreachable.
        return Err(ValidationError::Schema(vec![
            "incomplete payload".to_string()
        ]));
    };
    let index = index as u64;

    // Revision reference: never forward, never self, never non-positive.
    if let Some(revision_of) = input.revision_of {
        if revision_of < 1 || revision_of as u64 >= index {
            return Err(ValidationError::Revision { revision_of, index });
        }
    }

    // Branch reference and its label are biconditional.
    match (input.branch_point, input.branch_label.as_deref()) {
        (Some(point), label) => {
            if point < 1 || point as u64 >= index {
                return Err(ValidationError::Branch {
                    reason: format!("branchPoint {} must be in [1, {})", point, index),
                });
            }
            if !label.is_some_and(|l| !l.is_empty()) {
                return Err(ValidationError::Branch {
                    reason: "branchLabel must be a non-empty string when branchPoint is set"
                        .to_string(),
                });
            }
        }
        (None, Some(_)) => {
            return Err(ValidationError::Branch {
                reason: "branchLabel supplied without a branchPoint".to_string(),
            });
        }
        (None, None) => {}
    }

    // Silent upward correction: a step numbered past the estimate raises the
    // estimate, never the other way around.
    let estimated_total = (estimated_total as u64).max(index);

    Ok(Step {
        text,
        sequence_needed,
        index,
        estimated_total,
        is_revision: input.is_revision,
        revision_of: input.revision_of.map(|r| r as u64),
        branch_point: input.branch_point.map(|b| b as u64),
        branch_label: input.branch_label,
        more_steps_needed: input.more_steps_needed,
    })
}

/// Result derived from an accepted step and the post-append store state.
///
/// Optional fields mirror the input: absent on the input means absent here,
/// so the response's shape communicates which behaviors were exercised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recorded {
    pub index: u64,
    pub estimated_total: u64,
    pub sequence_needed: bool,
    pub branches: Vec<String>,
    pub history_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_revision: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_of: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_point: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more_steps_needed: Option<bool>,
}

impl Recorded {
    fn derive(step: &Step, history: &History) -> Self {
        Self {
            index: step.index,
            estimated_total: step.estimated_total,
            sequence_needed: step.sequence_needed,
            branches: history.branch_labels(),
            history_length: history.len(),
            is_revision: step.is_revision,
            revision_of: step.revision_of,
            branch_point: step.branch_point,
            branch_label: step.branch_label.clone(),
            more_steps_needed: step.more_steps_needed,
        }
    }
}

/// The append-only in-memory record of accepted steps and branch buckets.
///
/// `sequence` keeps steps in acceptance order (not necessarily sorted by
/// their declared `index`); `branches` maps a label to the subsequence of
/// steps carrying it. No eviction, no capacity limit, no deduplication.
#[derive(Debug, Default)]
pub struct History {
    sequence: Vec<Step>,
    branches: HashMap<String, Vec<Step>>,
}

impl History {
    /// Creates an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an already-validated step, returning the derived result.
    ///
    /// This cannot fail: rejection is the validator's job, and by the time a
    /// `Step` exists its referential fields are known to be coherent.
    pub fn record(&mut self, step: Step) -> Recorded {
        if let (Some(_), Some(label)) = (step.branch_point, step.branch_label.as_ref()) {
            self.branches
                .entry(label.clone())
                .or_default()
                .push(step.clone());
        }
        let recorded_at = self.sequence.len();
        self.sequence.push(step);
        Recorded::derive(&self.sequence[recorded_at], self)
    }

    /// Snapshot of known branch labels, sorted for deterministic output
    pub fn branch_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.branches.keys().cloned().collect();
        labels.sort();
        labels
    }

    /// Number of accepted steps
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// All accepted steps in acceptance order
    pub fn sequence(&self) -> &[Step] {
        &self.sequence
    }

    /// The steps recorded under a given branch label, in acceptance order
    pub fn branch(&self, label: &str) -> Option<&[Step]> {
        self.branches.get(label).map(|steps| steps.as_slice())
    }

    /// Clears the sequence and all branch buckets.
    ///
    /// Used only between independent test runs or by explicit operator
    /// action; nothing in the record path ever calls this implicitly.
    pub fn reset(&mut self) {
        self.sequence.clear();
        self.branches.clear();
    }
}

/// Shared handle over a single history, safe to clone into adapters.
///
/// The store itself is single-writer and runs each record to completion, but
/// hosts that dispatch requests concurrently need mutual exclusion around the
/// append; the mutex here provides exactly that.
#[derive(Clone, Default)]
pub struct Core {
    inner: Arc<Mutex<History>>,
}

impl Core {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(History::new())),
        }
    }

    // Helper method to safely access the history store
    fn with_history<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut History) -> R,
    {
        let mut history = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut history)
    }

    /// Validates and records a candidate step as one atomic unit.
    ///
    /// On success the step has been appended (and bucketed if branching) and
    /// the derived result reflects the post-append state. On failure the
    /// store is exactly as it was before the call.
    pub fn record_step(&self, input: StepInput) -> Result<Recorded, ValidationError> {
        let step = validate(input)?;
        Ok(self.record(step))
    }

    /// Appends an already-validated step
    pub fn record(&self, step: Step) -> Recorded {
        self.with_history(|history| history.record(step))
    }

    /// Snapshot of known branch labels
    pub fn branch_labels(&self) -> Vec<String> {
        self.with_history(|history| history.branch_labels())
    }

    /// Current sequence length
    pub fn history_len(&self) -> usize {
        self.with_history(|history| history.len())
    }

    /// Snapshot of all accepted steps in acceptance order
    pub fn steps(&self) -> Vec<Step> {
        self.with_history(|history| history.sequence().to_vec())
    }

    /// Snapshot of the steps under a branch label, if the label is known
    pub fn branch(&self, label: &str) -> Option<Vec<Step>> {
        self.with_history(|history| history.branch(label).map(|steps| steps.to_vec()))
    }

    /// Explicitly clears the history; never called implicitly
    pub fn reset(&self) {
        self.with_history(|history| history.reset());
    }
}
