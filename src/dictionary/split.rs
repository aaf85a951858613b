//! Turning a raw definition into embeddable features.

use std::sync::OnceLock;

use regex::Regex;

use crate::dictionary::types::Feature;

fn reference_regex() -> &'static Regex {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    REFERENCE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").expect("valid regex"))
}

/// Split a raw definition into its non-empty lines, with `[word]`
/// cross-references unwrapped to `word`.
pub fn split_definition(definition: &str) -> Vec<String> {
    definition
        .lines()
        .map(|line| reference_regex().replace_all(line.trim(), "$1").into_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Features for a definition. A single line that is the whole definition is
/// kept verbatim; lines split out of a longer definition are autogenerated.
pub fn definition_features(definition: &str) -> Vec<Feature> {
    let lines = split_definition(definition);
    let whole = definition.trim();
    lines
        .into_iter()
        .map(|line| {
            let autogenerated = line != whole;
            Feature::new(line, autogenerated)
        })
        .collect()
}
