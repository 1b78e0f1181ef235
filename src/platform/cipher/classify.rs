//! Recognizes which primitive a helper routine implements from its source

use super::ops::OpKind;
use crate::error::CipherError;
use regex::Regex;
use std::sync::OnceLock;

/// Shape patterns tried in order; the first hit decides the family
const SHAPES: &[(&str, OpKind)] = &[
    // function(a){a.reverse()}
    (r"\w+\.reverse\(\)", OpKind::Reverse),
    // function(a,b){a.splice(0,b)}
    (r"\w+\.splice\(0,\w\)", OpKind::DropMiddle),
    // function(a,b){var c=a[0];a[0]=a[b%a.length];a[b]=c}
    (
        r"var\s\w=\w\[0\];\w\[0\]=\w\[\w%\w\.length\];\w\[\w\]=\w",
        OpKind::SwapHead,
    ),
    // function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}
    (
        r"var\s\w=\w\[0\];\w\[0\]=\w\[\w%\w\.length\];\w\[\w%\w\.length\]=\w",
        OpKind::SwapHead,
    ),
];

fn compiled_shapes() -> Result<&'static [(Regex, OpKind)], CipherError> {
    static COMPILED: OnceLock<Vec<(Regex, OpKind)>> = OnceLock::new();

    if let Some(shapes) = COMPILED.get() {
        return Ok(shapes);
    }
    let shapes = SHAPES
        .iter()
        .map(|(pattern, kind)| Ok((Regex::new(pattern)?, *kind)))
        .collect::<Result<Vec<_>, CipherError>>()?;
    Ok(COMPILED.get_or_init(|| shapes))
}

/// Classify one helper body such as `function(a,b){a.splice(0,b)}`
pub fn classify(helper_body: &str) -> Result<OpKind, CipherError> {
    compiled_shapes()?
        .iter()
        .find(|(shape, _)| shape.is_match(helper_body))
        .map(|(_, kind)| *kind)
        .ok_or_else(|| CipherError::UnknownShape {
            body: helper_body.to_string(),
        })
}
