//! Pulling the `FINAL ANSWER:` line out of a model reply.

const MARKER: &str = "FINAL ANSWER:";

/// The text after the last `FINAL ANSWER:` marker, matched case-insensitively.
///
/// Only the rest of that line is taken. Returns `None` when the marker is
/// missing or nothing follows it.
pub fn final_answer(text: &str) -> Option<String> {
    text.lines().rev().find_map(|line| {
        // ASCII upper-casing keeps byte offsets intact.
        let upper = line.to_ascii_uppercase();
        let at = upper.rfind(MARKER)?;
        let answer = line[at + MARKER.len()..].trim();
        if answer.is_empty() {
            None
        } else {
            Some(answer.to_string())
        }
    })
}
