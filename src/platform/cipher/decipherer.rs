//! The assembled plan + table and the interpreter that runs it

use super::builder::{build_plan, build_table, helper_object_name, OperationTable, TransformPlan};
use super::events::{CipherEvent, EventSink, TracingSink};
use super::extract::Extractor;
use crate::error::CipherError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How decipherers are built and where their decision trail goes
#[derive(Clone)]
pub struct CipherConfig {
    sink: Arc<dyn EventSink>,
    extractor: Extractor,
}

impl CipherConfig {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(TracingSink),
            extractor: Extractor::new(),
        }
    }

    /// Send build and apply events to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use custom recognizer lists
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CipherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherConfig")
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

/// Immutable signature decipherer for one player script.
///
/// `apply` only reads the plan and table, so one instance can serve any
/// number of threads at once.
pub struct Decipherer {
    plan: TransformPlan,
    table: OperationTable,
    sink: Arc<dyn EventSink>,
}

impl Decipherer {
    /// Extract and build everything needed from a player script
    pub fn build(script: &str, config: &CipherConfig) -> Result<Self, CipherError> {
        if script.trim().is_empty() {
            return Err(CipherError::EmptyScript);
        }
        let sink = config.sink().as_ref();
        let extractor = config.extractor();

        let entry_name = extractor.find_entry_name(script, sink)?;
        debug!(entry = %entry_name, "found signature entry routine");

        let plan_text = extractor.find_plan_text(script, &entry_name, sink)?;
        let plan = build_plan(&plan_text)?;

        let object_name = helper_object_name(&plan_text)?;
        let table_text = extractor.find_table_text(script, &object_name, sink)?;
        let table = build_table(&table_text, sink)?;

        debug!(
            entry = %entry_name,
            object = %object_name,
            steps = plan.len(),
            helpers = table.len(),
            "decipherer built"
        );

        Ok(Self {
            plan,
            table,
            sink: Arc::clone(config.sink()),
        })
    }

    /// Assemble from an already built plan and table
    pub fn from_parts(plan: TransformPlan, table: OperationTable) -> Self {
        Self {
            plan,
            table,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn plan(&self) -> &TransformPlan {
        &self.plan
    }

    pub fn table(&self) -> &OperationTable {
        &self.table
    }

    /// Run the plan over `input` and return the deciphered token.
    ///
    /// Any failing step aborts the call; no partially transformed token is
    /// ever returned.
    pub fn apply(&self, input: &str) -> Result<String, CipherError> {
        let mut token: Vec<char> = input.chars().collect();

        for (index, call) in self.plan.steps().iter().enumerate() {
            let Some(kind) = self.table.get(&call.helper) else {
                let err = CipherError::UnknownHelper {
                    name: call.helper.clone(),
                };
                self.step_failed(index, &call.helper, &err);
                return Err(err);
            };

            let op = kind.bind(call.argument);
            let len_before = token.len();
            if let Err(err) = op.apply(&mut token) {
                self.step_failed(index, &call.helper, &err);
                return Err(err);
            }

            self.sink.record(&CipherEvent::StepApplied {
                index,
                helper: call.helper.clone(),
                op,
                len_before,
                len_after: token.len(),
            });
        }

        Ok(token.into_iter().collect())
    }

    fn step_failed(&self, index: usize, helper: &str, err: &CipherError) {
        self.sink.record(&CipherEvent::StepFailed {
            index,
            helper: helper.to_string(),
            reason: err.to_string(),
        });
    }
}

impl fmt::Debug for Decipherer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decipherer")
            .field("plan", &self.plan)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
