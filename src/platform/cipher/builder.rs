//! Turns extracted plan and table text into structured form

use super::classify::classify;
use super::events::{CipherEvent, EventSink};
use super::extract::ExtractionStage;
use super::ops::OpKind;
use crate::error::{CipherError, StructuralKind};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

/// Separates statements in the plan text
const STATEMENT_SEPARATOR: char = ';';
/// Closes one helper definition and opens the next inside the object literal
const ENTRY_SEPARATOR: &str = "},";
/// Separates a helper's name from its body
const NAME_SEPARATOR: char = ':';

/// `receiver.helper(param,123)`, possibly behind an assignment
const CALL_SHAPE: &str = r"([\w$]+)\.([\w$]+)\(\s*[\w$]+\s*,\s*(\d+)\s*\)";

/// One plan step as written, before it is resolved against the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationCall {
    pub helper: String,
    pub argument: usize,
}

impl OperationCall {
    pub fn new(helper: impl Into<String>, argument: usize) -> Self {
        Self {
            helper: helper.into(),
            argument,
        }
    }
}

/// Ordered, non-empty list of plan steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformPlan {
    steps: Vec<OperationCall>,
}

impl TransformPlan {
    /// Wrap already parsed steps; an empty list is rejected like an empty extraction
    pub fn new(steps: Vec<OperationCall>) -> Result<Self, CipherError> {
        if steps.is_empty() {
            return Err(CipherError::Extraction {
                stage: ExtractionStage::PlanText,
            });
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[OperationCall] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Helper name to operation family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationTable {
    entries: HashMap<String, OpKind>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a helper
    pub fn insert(&mut self, helper: impl Into<String>, kind: OpKind) -> Option<OpKind> {
        self.entries.insert(helper.into(), kind)
    }

    pub fn get(&self, helper: &str) -> Option<OpKind> {
        self.entries.get(helper).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, OpKind)> for OperationTable {
    fn from_iter<I: IntoIterator<Item = (S, OpKind)>>(iter: I) -> Self {
        let mut table = OperationTable::new();
        for (helper, kind) in iter {
            table.insert(helper, kind);
        }
        table
    }
}

fn call_shape() -> Result<&'static Regex, CipherError> {
    static CALL: OnceLock<Regex> = OnceLock::new();

    if let Some(regex) = CALL.get() {
        return Ok(regex);
    }
    let regex = Regex::new(CALL_SHAPE)?;
    Ok(CALL.get_or_init(|| regex))
}

fn statements(plan_text: &str) -> impl Iterator<Item = &str> {
    plan_text
        .split(STATEMENT_SEPARATOR)
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
}

/// Receiver, helper and argument text of one call statement
fn call_parts(statement: &str) -> Result<(&str, &str, &str), CipherError> {
    let too_few = || CipherError::structural(StructuralKind::TooFewFields, statement);
    let captures = call_shape()?.captures(statement).ok_or_else(too_few)?;

    match (captures.get(1), captures.get(2), captures.get(3)) {
        (Some(receiver), Some(helper), Some(argument)) => {
            Ok((receiver.as_str(), helper.as_str(), argument.as_str()))
        }
        _ => Err(too_few()),
    }
}

/// Parse one statement such as `Qr.kT(a,2)`
pub fn parse_call(statement: &str) -> Result<OperationCall, CipherError> {
    let (_, helper, argument) = call_parts(statement)?;
    let argument = argument
        .parse::<usize>()
        .map_err(|_| CipherError::structural(StructuralKind::NotAnInteger, statement))?;

    Ok(OperationCall::new(helper, argument))
}

/// Split the plan text on `;` and parse every statement in order
pub fn build_plan(plan_text: &str) -> Result<TransformPlan, CipherError> {
    let steps = statements(plan_text)
        .map(parse_call)
        .collect::<Result<Vec<_>, _>>()?;
    TransformPlan::new(steps)
}

/// Name of the object the plan calls its helpers on.
///
/// Taken from the first statement: `Qr.kT(a,2)` and `a=Qr.kT(a,2)` both
/// give `Qr`.
pub fn helper_object_name(plan_text: &str) -> Result<String, CipherError> {
    let first = statements(plan_text).next().ok_or(CipherError::Extraction {
        stage: ExtractionStage::PlanText,
    })?;
    let (receiver, _, _) = call_parts(first)?;
    Ok(receiver.to_string())
}

/// Split the object literal body into `name:function(..){..}` entries
pub fn split_table_entries(table_text: &str) -> Vec<String> {
    let pieces: Vec<&str> = table_text.split(ENTRY_SEPARATOR).collect();
    let last = pieces.len().saturating_sub(1);
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| {
            // split() ate the closing brace of every entry but the last
            if i < last {
                format!("{}}}", piece)
            } else {
                piece.to_string()
            }
        })
        .collect()
}

/// Classify every helper in the object literal.
///
/// A single unrecognized helper rejects the whole table.
pub fn build_table(table_text: &str, sink: &dyn EventSink) -> Result<OperationTable, CipherError> {
    let mut table = OperationTable::new();

    for entry in split_table_entries(table_text) {
        let entry = entry.trim();
        let Some((name, body)) = entry.split_once(NAME_SEPARATOR) else {
            return Err(CipherError::structural(StructuralKind::TooFewFields, entry));
        };
        let (name, body) = (name.trim(), body.trim());

        let kind = match classify(body) {
            Ok(kind) => kind,
            Err(err) => {
                sink.record(&CipherEvent::Classified {
                    helper: name.to_string(),
                    kind: None,
                });
                return Err(err);
            }
        };
        sink.record(&CipherEvent::Classified {
            helper: name.to_string(),
            kind: Some(kind),
        });

        if let Some(previous) = table.insert(name, kind) {
            warn!(helper = name, ?previous, ?kind, "helper defined twice, keeping the later one");
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::cipher::events::{MemorySink, NullSink};

    const TABLE: &str = "wR:function(a){a.reverse()}, Dd:function(a,b){a.splice(0,b)}, kT:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}";

    #[test]
    fn test_build_plan_preserves_order() {
        let plan = build_plan("Qr.kT(a,2);Qr.wR(a,33);Qr.Dd(a,1)").unwrap();
        assert_eq!(
            plan.steps(),
            &[
                OperationCall::new("kT", 2),
                OperationCall::new("wR", 33),
                OperationCall::new("Dd", 1),
            ]
        );
    }

    #[test]
    fn test_build_plan_dollar_identifiers_and_spaces() {
        let plan = build_plan(" $Q.a$(a, 7) ; ").unwrap();
        assert_eq!(plan.steps(), &[OperationCall::new("a$", 7)]);
    }

    #[test]
    fn test_build_plan_rejects_missing_argument() {
        let err = build_plan("Qr.kT(a,2);Qr.wR(a)").unwrap_err();
        assert_eq!(
            err,
            CipherError::Structural {
                kind: StructuralKind::TooFewFields,
                fragment: "Qr.wR(a)".to_string()
            }
        );
    }

    #[test]
    fn test_build_plan_rejects_oversized_integer() {
        let err = build_plan("Qr.kT(a,999999999999999999999999)").unwrap_err();
        assert!(matches!(
            err,
            CipherError::Structural {
                kind: StructuralKind::NotAnInteger,
                ..
            }
        ));
    }

    #[test]
    fn test_build_plan_empty_is_extraction_failure() {
        assert_eq!(
            build_plan(" ; ").unwrap_err(),
            CipherError::Extraction {
                stage: ExtractionStage::PlanText
            }
        );
    }

    #[test]
    fn test_helper_object_name() {
        assert_eq!(helper_object_name("Qr.kT(a,2);Zz.wR(a,1)").unwrap(), "Qr");
        assert!(helper_object_name("kT(a,2)").unwrap_err().is_structural());
    }

    #[test]
    fn test_helper_object_name_behind_assignment() {
        assert_eq!(helper_object_name("a=Qr.wR(a,3);Qr.Dd(a,1)").unwrap(), "Qr");
        assert_eq!(helper_object_name(" a = $Q.wR(a, 3)").unwrap(), "$Q");
        assert_eq!(
            build_plan("a=Qr.wR(a,3);Qr.Dd(a,1)").unwrap().steps(),
            &[OperationCall::new("wR", 3), OperationCall::new("Dd", 1)]
        );
    }

    #[test]
    fn test_split_table_entries_restores_braces() {
        let entries = split_table_entries(TABLE);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], "wR:function(a){a.reverse()}");
        assert_eq!(entries[1], " Dd:function(a,b){a.splice(0,b)}");
        assert!(entries[2].ends_with("=c}"));
    }

    #[test]
    fn test_build_table() {
        let sink = MemorySink::new();
        let table = build_table(TABLE, &sink).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("wR"), Some(OpKind::Reverse));
        assert_eq!(table.get("Dd"), Some(OpKind::DropMiddle));
        assert_eq!(table.get("kT"), Some(OpKind::SwapHead));
        assert_eq!(table.get("zz"), None);
        assert_eq!(sink.events().len(), 3);
    }

    #[test]
    fn test_build_table_fails_closed_on_unknown_helper() {
        let text = "wR:function(a){a.reverse()}, Pu:function(a,b){a.push(b)}, Dd:function(a,b){a.splice(0,b)}";
        let sink = MemorySink::new();
        let err = build_table(text, &sink).unwrap_err();
        assert!(err.is_classification());
        assert_eq!(
            sink.events().last(),
            Some(&CipherEvent::Classified {
                helper: "Pu".to_string(),
                kind: None
            })
        );
    }

    #[test]
    fn test_build_table_entry_without_separator() {
        let err = build_table("function(a){a.reverse()}", &NullSink).unwrap_err();
        assert!(matches!(
            err,
            CipherError::Structural {
                kind: StructuralKind::TooFewFields,
                ..
            }
        ));
    }

    #[test]
    fn test_table_from_iter() {
        let table: OperationTable = [("ab", OpKind::Reverse), ("ab", OpKind::SwapHead)]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("ab"), Some(OpKind::SwapHead));
    }
}
