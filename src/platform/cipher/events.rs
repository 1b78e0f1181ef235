//! Structured decision trail for extraction, classification and apply steps

use super::extract::ExtractionStage;
use super::ops::{OpKind, PrimitiveOp};
use std::fmt;
use std::sync::Mutex;
use tracing::debug;

/// One decision made while building or running a decipherer
#[derive(Debug, Clone, PartialEq)]
pub enum CipherEvent {
    /// A recognizer was run against the script
    PatternTried {
        stage: ExtractionStage,
        index: usize,
        name: String,
        matched: bool,
    },
    /// A helper body was classified (`None` means no shape matched)
    Classified {
        helper: String,
        kind: Option<OpKind>,
    },
    /// A plan step ran against the token
    StepApplied {
        index: usize,
        helper: String,
        op: PrimitiveOp,
        len_before: usize,
        len_after: usize,
    },
    /// A plan step could not run; the apply call is aborted
    StepFailed {
        index: usize,
        helper: String,
        reason: String,
    },
}

impl fmt::Display for CipherEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherEvent::PatternTried {
                stage,
                index,
                name,
                matched,
            } => write!(
                f,
                "{} pattern #{} ({}): {}",
                stage,
                index + 1,
                name,
                if *matched { "matched" } else { "no match" }
            ),
            CipherEvent::Classified { helper, kind } => match kind {
                Some(kind) => write!(f, "helper {} => {}", helper, kind),
                None => write!(f, "helper {} => unknown shape", helper),
            },
            CipherEvent::StepApplied {
                index,
                helper,
                op,
                len_before,
                len_after,
            } => write!(
                f,
                "step {}: {} as {} ({} -> {} chars)",
                index + 1,
                helper,
                op,
                len_before,
                len_after
            ),
            CipherEvent::StepFailed {
                index,
                helper,
                reason,
            } => write!(f, "step {}: {} failed: {}", index + 1, helper, reason),
        }
    }
}

/// Receiver for [`CipherEvent`]s, passed in through configuration
pub trait EventSink: Send + Sync {
    fn record(&self, event: &CipherEvent);
}

/// Forwards every event to `tracing` at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &CipherEvent) {
        match event {
            CipherEvent::PatternTried {
                stage,
                index,
                name,
                matched,
            } => debug!(
                target: "ryt_cipher::cipher",
                stage = %stage,
                index = *index,
                pattern = %name,
                matched = *matched,
                "pattern tried"
            ),
            CipherEvent::Classified { helper, kind } => debug!(
                target: "ryt_cipher::cipher",
                helper = %helper,
                kind = ?kind,
                "helper classified"
            ),
            CipherEvent::StepApplied {
                index,
                helper,
                op,
                len_before,
                len_after,
            } => debug!(
                target: "ryt_cipher::cipher",
                step = *index,
                helper = %helper,
                op = %op,
                len_before = *len_before,
                len_after = *len_after,
                "step applied"
            ),
            CipherEvent::StepFailed {
                index,
                helper,
                reason,
            } => debug!(
                target: "ryt_cipher::cipher",
                step = *index,
                helper = %helper,
                reason = %reason,
                "step failed"
            ),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &CipherEvent) {}
}

/// Keeps events in memory so the trail can be inspected afterwards
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CipherEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<CipherEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drain recorded events
    pub fn take(&self) -> Vec<CipherEvent> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &CipherEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
