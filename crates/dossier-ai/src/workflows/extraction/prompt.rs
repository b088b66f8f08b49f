//! Prompt assembly for structured field extraction.

use std::fmt::Write as _;

use crate::workflows::dossier::blueprint::{self, SourceKindSpec};
use crate::workflows::dossier::registry;

pub(crate) const EXTRACTION_SYSTEM: &str = "You extract structured fields from scanned \
document text. Respond with a single JSON object and nothing else. Use null for fields \
you cannot find. Never invent values.";

/// Prompt listing the expected keys (with their historical aliases) for one
/// document kind, followed by the raw text.
pub(crate) fn extraction_prompt(spec: &SourceKindSpec, raw_text: &str) -> String {
    let mut prompt = String::new();
    writeln!(
        prompt,
        "Extract the following fields from this {} document.",
        spec.kind.label()
    )
    .expect("write prompt header");
    writeln!(prompt, "Return a JSON object with exactly these keys:").expect("write key header");

    for key in spec.expected_fields {
        let label = blueprint::field_spec(key).map(|f| f.label).unwrap_or(key);
        let aliases = registry::alternates_for(key);
        if aliases.is_empty() {
            writeln!(prompt, "- \"{key}\": {label}").expect("write key line");
        } else {
            writeln!(
                prompt,
                "- \"{key}\": {label} (may appear as {})",
                aliases.join(", ")
            )
            .expect("write key line");
        }
    }

    writeln!(prompt, "\nDocument text:\n---\n{raw_text}\n---").expect("write document text");
    prompt
}
