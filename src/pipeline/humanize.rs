//! The tone-softening transform applied twice per successful run.
//!
//! A humanizer is a pure text-to-text rewrite toward an informal register.
//! Implementations may fail internally, but the pipeline must always end up
//! with usable text, so every call goes through [`humanize_or_keep`], which
//! falls back to the input unchanged. That fallback is a contract, not a
//! nicety: every later stage assumes it receives real text.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct HumanizeError(pub String);

impl fmt::Display for HumanizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "humanize failed: {}", self.0)
    }
}

impl StdError for HumanizeError {}

pub trait Humanizer: Send + Sync {
    fn humanize(&self, text: &str) -> Result<String, HumanizeError>;
}

/// Run one humanizer pass, keeping the input when the pass fails.
pub fn humanize_or_keep(humanizer: &dyn Humanizer, text: &str) -> String {
    match humanizer.humanize(text) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            tracing::warn!("humanizer fell back to its input: {e}");
            text.to_string()
        }
    }
}

/// Built-in humanizer: a handful of mechanical register softeners.
///
/// Swaps stiff connectives for plain ones, drops boilerplate assistant
/// openers, and collapses runs of blank lines. Deliberately conservative —
/// the model-backed review pass does the heavy lifting; this keeps drafts
/// from reading like a memo.
pub struct ToneSoftener;

const OPENERS: &[&str] = &[
    "As an AI language model, ",
    "As an AI assistant, ",
    "Certainly! ",
    "Certainly, ",
    "Of course! ",
];

const SWAPS: &[(&str, &str)] = &[
    ("Furthermore, ", "Also, "),
    ("Moreover, ", "Plus, "),
    ("However, ", "That said, "),
    ("Therefore, ", "So "),
    ("In conclusion, ", "All in all, "),
    ("It is important to note that ", "Worth knowing: "),
    ("utilize", "use"),
    ("Utilize", "Use"),
];

impl Humanizer for ToneSoftener {
    fn humanize(&self, text: &str) -> Result<String, HumanizeError> {
        let mut out = text.trim().to_string();

        for opener in OPENERS {
            if let Some(rest) = out.strip_prefix(opener) {
                out = rest.to_string();
                break;
            }
        }

        for (from, to) in SWAPS {
            if out.contains(from) {
                out = out.replace(from, to);
            }
        }

        // Collapse three-or-more newlines to a paragraph break.
        while out.contains("\n\n\n") {
            out = out.replace("\n\n\n", "\n\n");
        }

        Ok(out.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingHumanizer;

    impl Humanizer for FailingHumanizer {
        fn humanize(&self, _text: &str) -> Result<String, HumanizeError> {
            Err(HumanizeError("boom".to_string()))
        }
    }

    #[test]
    fn fallback_keeps_input_on_error() {
        assert_eq!(humanize_or_keep(&FailingHumanizer, "keep me"), "keep me");
    }

    #[test]
    fn softener_drops_boilerplate_opener() {
        let out = ToneSoftener.humanize("As an AI language model, here you go.").unwrap();
        assert_eq!(out, "here you go.");
    }

    #[test]
    fn softener_swaps_stiff_connectives() {
        let out = ToneSoftener
            .humanize("However, the cache is cold. Furthermore, it is slow.")
            .unwrap();
        assert_eq!(out, "That said, the cache is cold. Also, it is slow.");
    }

    #[test]
    fn softener_collapses_blank_lines() {
        let out = ToneSoftener.humanize("a\n\n\n\nb").unwrap();
        assert_eq!(out, "a\n\nb");
    }

    #[test]
    fn softener_leaves_plain_text_alone() {
        let out = ToneSoftener.humanize("Hi there.").unwrap();
        assert_eq!(out, "Hi there.");
    }
}
