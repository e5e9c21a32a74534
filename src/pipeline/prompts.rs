//! Prompt builders for each pipeline stage.
//!
//! The gateway only takes a finished prompt string, so all phrasing lives
//! here. Gemini gets the friendlier "clear and useful" draft instruction
//! while the OpenRouter-routed backends get the terse direct-answer one; the
//! review and merge instructions are shared.

use crate::gateway::Backend;

/// Initial generation prompt for the single-backend path.
pub fn draft(backend: Backend, user_input: &str) -> String {
    match backend {
        Backend::Gemini => format!(
            "The user asks:\n\u{201c}{user_input}\u{201d}\n\n\
             Answer clearly, precisely, and in a way a person can actually use.\n\
             Keep a warm, friendly tone and make the answer practical."
        ),
        Backend::OpenRouter => format!(
            "Your job is to answer the user's question directly, quickly, and precisely.\n\
             No preamble, no extra commentary, no summary at the end.\n\
             Give only the answer itself and skip anything obvious.\n\n\
             User: {user_input}"
        ),
        Backend::DeepSeek => format!(
            "User: {user_input}\n\n\
             Answer this question quickly and precisely.\n\
             Avoid padding and wind-up. Get straight to the point."
        ),
    }
}

/// Review instruction embedding the draft and the original request.
pub fn review(draft_text: &str, user_input: &str) -> String {
    format!(
        "User: \u{201c}{user_input}\u{201d}\n\
         Generated text: \u{201c}{draft_text}\u{201d}\n\n\
         Check whether this text reads like casual, friendly, everyday conversation.\n\
         If it is too formal, stiff, or bookish, rewrite it so that:\n\
         - it reads like a natural, friendly chat.\n\
         - it uses plain, everyday conversational phrasing (the way you'd talk to a friend).\n\
         - it avoids heavy or literary vocabulary.\n\
         If the text is already conversational enough, return it as is.\n\
         Write only the final text (rewritten or original)."
    )
}

/// Synthesis instruction for the composite strategy. `sources` must already
/// be in fixed source order.
pub fn merge(user_input: &str, sources: &[(&'static str, String)]) -> String {
    let mut combined = String::new();
    for (label, text) in sources {
        if !combined.is_empty() {
            combined.push_str("\n\n");
        }
        combined.push_str(&format!("{label} answered:\n{text}"));
    }

    format!(
        "User:\n{user_input}\n\n\
         {combined}\n\n\
         Review the answers above and produce one final reply that:\n\
         - is precise, simple, and practical\n\
         - keeps a warm, human, easy-to-follow tone\n\
         - contains no padding\n\n\
         Give only the final result, not the reasoning steps."
    )
}

/// Vision request combining the caption with the fixed instruction.
pub fn vision(caption: &str) -> String {
    format!(
        "Look at the attached image and respond to the user's request:\n\
         Request: \u{201c}{caption}\u{201d}\n\
         Write the answer in a friendly, conversational, easy-to-read way."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_embeds_input_for_every_backend() {
        for backend in [Backend::Gemini, Backend::OpenRouter, Backend::DeepSeek] {
            assert!(draft(backend, "why is the sky blue").contains("why is the sky blue"));
        }
    }

    #[test]
    fn review_embeds_both_arguments() {
        let prompt = review("some draft", "the question");
        assert!(prompt.contains("some draft"));
        assert!(prompt.contains("the question"));
    }

    #[test]
    fn merge_keeps_source_order_and_labels() {
        let prompt = merge(
            "q",
            &[
                ("OpenRouter", "first answer".to_string()),
                ("DeepSeek", "second answer".to_string()),
            ],
        );
        let openrouter_at = prompt.find("OpenRouter answered:").unwrap();
        let deepseek_at = prompt.find("DeepSeek answered:").unwrap();
        assert!(openrouter_at < deepseek_at);
        assert!(prompt.contains("first answer"));
        assert!(prompt.contains("second answer"));
    }
}
