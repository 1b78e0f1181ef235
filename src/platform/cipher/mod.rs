//! Signature cipher deciphering for video platform
//!
//! The player script scrambles stream signatures with a short routine built
//! from three helpers (reverse, splice, swap). Instead of running the
//! script, the routine is located with ordered regex recognizers, its helpers
//! are classified by shape, and the resulting plan is interpreted natively.
//!
//! ```text
//! script -> Extractor -> (entry, plan text, table text)
//!        -> build_plan / build_table -> Decipherer -> apply(token)
//! ```

pub mod builder;
pub mod classify;
pub mod decipherer;
pub mod events;
pub mod extract;
pub mod ops;
pub mod session;

pub use builder::{OperationCall, OperationTable, TransformPlan};
pub use classify::classify;
pub use decipherer::{CipherConfig, Decipherer};
pub use events::{CipherEvent, EventSink, MemorySink, NullSink, TracingSink};
pub use extract::{ExtractionStage, Extractor, Recognizer, RecognizerChain};
pub use ops::{OpKind, PrimitiveOp};
pub use session::{ScriptFingerprint, SessionCache};

/// Minimal player script with every helper shape, shared by unit tests
#[cfg(test)]
pub(crate) const SAMPLE_PLAYER_JS: &str = r#"var Qr={wR:function(a){a.reverse()},
Dd:function(a,b){a.splice(0,b)},
kT:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}};
Xy=function(a){a=a.split("");Qr.wR(a,33);Qr.kT(a,2);Qr.Dd(a,1);return a.join("")};
var w=function(c,a,d){c&&a.set(d,encodeURIComponent(Xy(decodeURIComponent(c.s))))};"#;
