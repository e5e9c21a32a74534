//! Splits a finished reply into transport-sized segments.
//!
//! Telegram caps message length, so long replies are cut into ordered
//! segments of at most `max_len` characters. Boundaries prefer sentence ends
//! (terminal punctuation followed by whitespace, including the Arabic
//! question mark), then word boundaries, then a hard cut when a run of text
//! has no whitespace at all. The whole sequence is materialized before
//! delivery starts.

const SENTENCE_ENDERS: [char; 4] = ['.', '!', '?', '\u{061F}'];

/// Split `text` into segments of at most `max_len` characters.
///
/// Always returns at least one element; blank input yields a single empty
/// segment so callers can distinguish "nothing to send" from "no result".
pub fn chunk(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![String::new()];
    }

    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();

    for unit in sentence_units(trimmed) {
        let unit_len = char_len(unit);

        if current.is_empty() {
            if unit_len > max_len {
                current = hard_split(unit, max_len, &mut segments);
            } else {
                current = unit.to_string();
            }
            continue;
        }

        if char_len(&current) + 1 + unit_len <= max_len {
            current.push(' ');
            current.push_str(unit);
        } else {
            segments.push(std::mem::take(&mut current));
            if unit_len > max_len {
                current = hard_split(unit, max_len, &mut segments);
            } else {
                current = unit.to_string();
            }
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    if segments.is_empty() {
        segments.push(trimmed.to_string());
    }
    segments
}

/// Sentence-like units: runs ending in terminal punctuation followed by
/// whitespace. Punctuation stays attached to its sentence.
fn sentence_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((_, c)) = iter.next() {
        if !SENTENCE_ENDERS.contains(&c) {
            continue;
        }
        let boundary = match iter.peek() {
            Some(&(j, next)) if next.is_whitespace() => j,
            _ => continue,
        };
        let unit = text[start..boundary].trim();
        if !unit.is_empty() {
            units.push(unit);
        }
        start = boundary;
        while let Some(&(k, w)) = iter.peek() {
            if w.is_whitespace() {
                iter.next();
                start = k + w.len_utf8();
            } else {
                break;
            }
        }
    }

    if start < text.len() {
        let tail = text[start..].trim();
        if !tail.is_empty() {
            units.push(tail);
        }
    }
    units
}

/// Break an oversized unit into `max_len`-bounded pieces, preferring the
/// last whitespace inside the window and cutting at exactly `max_len` when
/// there is none. Emits full pieces into `segments` and returns the
/// remainder for further accumulation.
fn hard_split(unit: &str, max_len: usize, segments: &mut Vec<String>) -> String {
    let mut rest = unit;
    while char_len(rest) > max_len {
        let window_end = byte_index_at(rest, max_len);
        let window = &rest[..window_end];
        match window
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
        {
            Some((i, _)) if i > 0 => {
                segments.push(window[..i].trim_end().to_string());
                rest = rest[i..].trim_start();
            }
            _ => {
                segments.push(window.to_string());
                rest = &rest[window_end..];
            }
        }
    }
    rest.to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `n`-th character, or the string's end.
fn byte_index_at(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_one_empty_segment() {
        assert_eq!(chunk("", 4000), vec![String::new()]);
        assert_eq!(chunk("   \n ", 4000), vec![String::new()]);
    }

    #[test]
    fn short_text_without_boundary_passes_through() {
        assert_eq!(chunk("hello world", 4000), vec!["hello world"]);
    }

    #[test]
    fn short_reply_is_one_segment() {
        assert_eq!(chunk("Hi there.", 4000), vec!["Hi there."]);
    }

    #[test]
    fn nine_thousand_unbroken_chars_make_three_segments() {
        let input = "x".repeat(9000);
        let segments = chunk(&input, 4000);
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.chars().count() <= 4000));
        assert_eq!(segments.concat(), input);
    }

    #[test]
    fn sentences_accumulate_up_to_the_limit() {
        let segments = chunk("One. Two! Three? Four.", 12);
        assert_eq!(segments, vec!["One. Two!", "Three? Four."]);
    }

    #[test]
    fn arabic_question_mark_is_a_boundary() {
        let segments = chunk("\u{0633}\u{0644}\u{0627}\u{0645}\u{061F} Yes.", 6);
        assert_eq!(segments, vec!["\u{0633}\u{0644}\u{0627}\u{0645}\u{061F}", "Yes."]);
    }

    #[test]
    fn oversized_sentence_splits_at_word_boundaries() {
        let sentence = "alpha beta gamma delta epsilon zeta.";
        let segments = chunk(sentence, 12);
        assert!(segments.len() > 1);
        for segment in &segments {
            assert!(segment.chars().count() <= 12, "oversized: {segment:?}");
        }
        let rejoined = segments.join(" ");
        assert_eq!(rejoined, sentence);
    }

    #[test]
    fn oversized_sentence_after_accumulation_still_splits() {
        let text = format!("Short one. {}", "word ".repeat(10).trim_end());
        let segments = chunk(&text, 15);
        for segment in &segments {
            assert!(segment.chars().count() <= 15, "oversized: {segment:?}");
        }
        assert_eq!(segments[0], "Short one.");
    }

    #[test]
    fn reconstruction_up_to_whitespace_normalization() {
        let text = "First sentence here. Second one follows!  Third,  spaced   oddly? Done.";
        let segments = chunk(text, 25);
        let rejoined = segments.join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&rejoined), normalize(text));
        assert!(segments.iter().all(|s| s.chars().count() <= 25));
        assert!(!segments.is_empty());
    }

    #[test]
    fn segments_preserve_order() {
        let text = "Aaa. Bbb. Ccc. Ddd. Eee.";
        let segments = chunk(text, 9);
        assert_eq!(segments, vec!["Aaa. Bbb.", "Ccc. Ddd.", "Eee."]);
    }
}
