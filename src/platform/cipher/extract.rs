//! Heuristic location of the entry routine, its plan and the helper object
//!
//! Every lookup is an ordered list of [`Recognizer`]s. The first one that
//! matches wins and later ones are never tried. Player scripts are rewritten
//! often, so these lists are where new shapes get added; nothing downstream
//! depends on which recognizer fired.

use super::events::{CipherEvent, EventSink};
use crate::error::CipherError;
use regex::Regex;
use std::fmt;

/// Placeholder replaced by an escaped identifier inside recognizer templates
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Which lookup a recognizer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionStage {
    /// Name of the routine that scrambles/unscrambles the signature
    EntryName,
    /// Statement list inside the entry routine
    PlanText,
    /// Object literal holding the helper routines
    TableText,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStage::EntryName => write!(f, "entry name"),
            ExtractionStage::PlanText => write!(f, "plan text"),
            ExtractionStage::TableText => write!(f, "table text"),
        }
    }
}

/// One candidate pattern.
///
/// The template is a regex; `{name}` is substituted with the identifier the
/// stage is looking for. The captured value is the `value` group when the
/// pattern defines one, group 1 otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognizer {
    name: String,
    template: String,
}

impl Recognizer {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn compile(&self, identifier: Option<&str>) -> Result<Regex, CipherError> {
        let pattern = match identifier {
            Some(identifier) => self
                .template
                .replace(NAME_PLACEHOLDER, &pattern_identifier(identifier)),
            None => self.template.clone(),
        };
        Ok(Regex::new(&pattern)?)
    }

    /// Run against `text`, returning the designated capture on a match
    pub fn recognize(
        &self,
        text: &str,
        identifier: Option<&str>,
    ) -> Result<Option<String>, CipherError> {
        let regex = self.compile(identifier)?;
        Ok(regex.captures(text).and_then(|captures| {
            captures
                .name("value")
                .or_else(|| captures.get(1))
                .map(|m| m.as_str().to_string())
        }))
    }
}

/// Prepare an extracted identifier for embedding inside a pattern.
///
/// Names can arrive percent-encoded, and `$` is common in minified names.
fn pattern_identifier(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    regex::escape(&decoded)
}

/// Ordered recognizers for one stage
#[derive(Debug, Clone)]
pub struct RecognizerChain {
    stage: ExtractionStage,
    recognizers: Vec<Recognizer>,
}

impl RecognizerChain {
    pub fn new(stage: ExtractionStage, recognizers: Vec<Recognizer>) -> Self {
        Self { stage, recognizers }
    }

    pub fn stage(&self) -> ExtractionStage {
        self.stage
    }

    pub fn recognizers(&self) -> &[Recognizer] {
        &self.recognizers
    }

    /// Try each recognizer in order and return the first capture
    pub fn first_match(
        &self,
        text: &str,
        identifier: Option<&str>,
        sink: &dyn EventSink,
    ) -> Result<String, CipherError> {
        for (index, recognizer) in self.recognizers.iter().enumerate() {
            let found = recognizer.recognize(text, identifier)?;
            sink.record(&CipherEvent::PatternTried {
                stage: self.stage,
                index,
                name: recognizer.name().to_string(),
                matched: found.is_some(),
            });
            if let Some(value) = found {
                return Ok(value);
            }
        }

        Err(CipherError::Extraction { stage: self.stage })
    }
}

/// The three lookups the build pipeline needs
#[derive(Debug, Clone)]
pub struct Extractor {
    entry: RecognizerChain,
    plan: RecognizerChain,
    table: RecognizerChain,
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            entry: RecognizerChain::new(ExtractionStage::EntryName, entry_name_recognizers()),
            plan: RecognizerChain::new(ExtractionStage::PlanText, plan_recognizers()),
            table: RecognizerChain::new(ExtractionStage::TableText, table_recognizers()),
        }
    }

    /// Replace the entry name recognizers
    pub fn with_entry_patterns(mut self, recognizers: Vec<Recognizer>) -> Self {
        self.entry = RecognizerChain::new(ExtractionStage::EntryName, recognizers);
        self
    }

    /// Replace the plan text recognizers; templates should use `{name}`
    pub fn with_plan_patterns(mut self, recognizers: Vec<Recognizer>) -> Self {
        self.plan = RecognizerChain::new(ExtractionStage::PlanText, recognizers);
        self
    }

    /// Replace the table text recognizers; templates should use `{name}`
    pub fn with_table_patterns(mut self, recognizers: Vec<Recognizer>) -> Self {
        self.table = RecognizerChain::new(ExtractionStage::TableText, recognizers);
        self
    }

    pub fn chain(&self, stage: ExtractionStage) -> &RecognizerChain {
        match stage {
            ExtractionStage::EntryName => &self.entry,
            ExtractionStage::PlanText => &self.plan,
            ExtractionStage::TableText => &self.table,
        }
    }

    /// Name of the routine applied to the scrambled signature
    pub fn find_entry_name(
        &self,
        script: &str,
        sink: &dyn EventSink,
    ) -> Result<String, CipherError> {
        self.entry.first_match(script, None, sink)
    }

    /// `;`-separated statements of the entry routine between split and join
    pub fn find_plan_text(
        &self,
        script: &str,
        entry_name: &str,
        sink: &dyn EventSink,
    ) -> Result<String, CipherError> {
        self.plan.first_match(script, Some(entry_name), sink)
    }

    /// Body of the object literal named `object_name`.
    ///
    /// The literal usually spans several lines, so line breaks are collapsed
    /// to spaces before matching.
    pub fn find_table_text(
        &self,
        script: &str,
        object_name: &str,
        sink: &dyn EventSink,
    ) -> Result<String, CipherError> {
        let flattened = script.replace(['\r', '\n'], " ");
        self.table.first_match(&flattened, Some(object_name), sink)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Signature function locators, most specific first
pub fn entry_name_recognizers() -> Vec<Recognizer> {
    vec![
        Recognizer::new(
            "set-encode-cs",
            r#"\b[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*encodeURIComponent\s*\(\s*(?P<value>[a-zA-Z0-9$]+)\("#,
        ),
        Recognizer::new(
            "set-encode-any",
            r#"\b[a-zA-Z0-9]+\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*encodeURIComponent\s*\(\s*(?P<value>[a-zA-Z0-9$]+)\("#,
        ),
        Recognizer::new(
            "split-two-char",
            r#"(?:\b|[^a-zA-Z0-9$])(?P<value>[a-zA-Z0-9$]{2})\s*=\s*function\(\s*a\s*\)\s*\{\s*a\s*=\s*a\.split\(\s*""\s*\)"#,
        ),
        Recognizer::new(
            "split-any",
            r#"(?P<value>[a-zA-Z0-9$]+)\s*=\s*function\(\s*a\s*\)\s*\{\s*a\s*=\s*a\.split\(\s*""\s*\)"#,
        ),
        Recognizer::new(
            "signature-literal",
            r#"(["'])signature["']\s*,\s*(?P<value>[a-zA-Z0-9$]+)\("#,
        ),
        Recognizer::new("sig-or", r#"\.sig\|\|(?P<value>[a-zA-Z0-9$]+)\("#),
        Recognizer::new(
            "akamaized",
            r#"yt\.akamaized\.net/\)\s*\|\|\s*.*?\s*[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*(?:encodeURIComponent\s*\()?\s*(?P<value>[a-zA-Z0-9$]+)\("#,
        ),
        Recognizer::new(
            "set-cs",
            r#"\b[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*(?P<value>[a-zA-Z0-9$]+)\("#,
        ),
        Recognizer::new(
            "set-any",
            r#"\b[a-zA-Z0-9]+\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*(?P<value>[a-zA-Z0-9$]+)\("#,
        ),
        Recognizer::new(
            "set-wrapped-c-a",
            r#"\bc\s*&&\s*a\.set\([^,]+\s*,\s*\([^)]*\)\s*\(\s*(?P<value>[a-zA-Z0-9$]+)\("#,
        ),
        Recognizer::new(
            "set-wrapped-c-any",
            r#"\bc\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*\([^)]*\)\s*\(\s*(?P<value>[a-zA-Z0-9$]+)\("#,
        ),
    ]
}

/// Entry routine body locators
pub fn plan_recognizers() -> Vec<Recognizer> {
    vec![
        Recognizer::new(
            "assign-split-join",
            r#"(?:^|[^a-zA-Z0-9$]){name}\s*=\s*function\(\s*\w+\s*\)\s*\{\s*\w+\s*=\s*\w+\.split\(\s*""\s*\)\s*;(?P<value>.*?);\s*return\s+\w+\.join\(\s*""\s*\)\s*\}"#,
        ),
        Recognizer::new(
            "declaration-split-join",
            r#"function\s+{name}\s*\(\s*\w+\s*\)\s*\{\s*\w+\s*=\s*\w+\.split\(\s*""\s*\)\s*;(?P<value>.*?);\s*return\s+\w+\.join\(\s*""\s*\)\s*\}"#,
        ),
        Recognizer::new(
            "legacy-greedy",
            r#"{name}=function\(\w\)\{[a-z=\.\("\)]*;(?P<value>.*);(?:return.+)\}"#,
        ),
    ]
}

/// Helper object literal locators (run on newline-collapsed text).
///
/// Bodies are matched lazily so the capture ends at this object's closing
/// brace, not at a later object's.
pub fn table_recognizers() -> Vec<Recognizer> {
    vec![
        Recognizer::new(
            "var-object",
            r#"var {name}=\{(?P<value>[\w$,;%.()\[\]:={}\s]+?)\};"#,
        ),
        Recognizer::new(
            "declared-object",
            r#"(?:var|let|const)\s+{name}\s*=\s*\{(?P<value>[\w$,;%.()\[\]:={}\s]+?)\}\s*;"#,
        ),
        // `},` also separates helpers, so a trailing comma must start another assignment
        Recognizer::new(
            "assigned-object",
            r#"(?:^|[^\w$.]){name}\s*=\s*\{(?P<value>[\w$,;%.()\[\]:={}\s]+?)\}\s*(?:;|,\s*[\w$]+\s*=)"#,
        ),
    ]
}
