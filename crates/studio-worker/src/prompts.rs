//! Prompts for the text generator and parsers for what comes back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WorkerError, WorkerResult};

pub const VIDEO_SCRIPT_SYSTEM: &str = r#"You write scripts for short vertical videos read aloud by a presenter.
Write 120 to 180 words of plain spoken text. Open with a hook in the first sentence.
No stage directions, no headings, no emojis, no markdown."#;

pub const PODCAST_SCRIPT_SYSTEM: &str = r#"You write two-person podcast dialogues.
Every line starts with "HOST:" or "GUEST:" followed by what that person says.
The host opens and closes the episode. Keep it between 12 and 24 lines.
No stage directions, no sound effects, no markdown."#;

pub const NARRATION_SYSTEM: &str = r#"You adapt written articles for audio narration.
Keep the facts and the order of the article. Remove links, captions, tables and
anything that only makes sense on a page. Return plain text only."#;

pub const QUIZ_SYSTEM: &str = r#"You write multiple-choice comprehension quizzes.
Return a JSON object: {"questions": [{"question": string, "options": [string, string, string, string], "answer_index": number, "explanation": string}]}.
Write 5 questions. answer_index is 0-based."#;

pub const INTERACTIVE_SYSTEM: &str = r#"You write interactive podcast episodes: short spoken segments, each followed by an optional check-in question for the listener.
Return a JSON object: {"segments": [{"speaker": "HOST" or "GUEST", "text": string, "question": string or null}]}.
Write 4 to 8 segments."#;

/// User prompt carrying the source material.
pub fn from_article(title: &str, content: &str) -> String {
    format!("Title: {}\n\nArticle:\n{}", title, content)
}

/// User prompt for a standalone video brief.
pub fn from_brief(title: &str, brief: &str) -> String {
    format!("Title: {}\n\nBrief:\n{}", title, brief)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Speaker {
    Host,
    Guest,
}

/// One spoken line of a dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub speaker: Speaker,
    pub text: String,
}

/// Split a `HOST:` / `GUEST:` script into lines.
///
/// Text before the first tag is dropped; untagged lines continue the
/// previous speaker.
pub fn parse_dialogue(script: &str) -> WorkerResult<Vec<Line>> {
    let mut lines: Vec<Line> = Vec::new();
    for raw in script.lines() {
        let raw = raw.trim().trim_start_matches(['*', '-']).trim();
        if raw.is_empty() {
            continue;
        }
        let tagged = [("HOST:", Speaker::Host), ("GUEST:", Speaker::Guest)]
            .iter()
            .find_map(|(tag, speaker)| {
                raw.get(..tag.len())
                    .filter(|head| head.eq_ignore_ascii_case(tag))
                    .map(|_| (*speaker, raw[tag.len()..].trim_start_matches('*').trim()))
            });
        match (tagged, lines.last_mut()) {
            (Some((speaker, text)), _) if !text.is_empty() => lines.push(Line {
                speaker,
                text: text.to_string(),
            }),
            (Some(_), _) => {}
            (None, Some(last)) => {
                last.text.push(' ');
                last.text.push_str(raw);
            }
            (None, None) => {}
        }
    }
    if lines.is_empty() {
        return Err(WorkerError::invalid_output(
            "podcast script has no HOST:/GUEST: lines",
        ));
    }
    Ok(lines)
}

/// Parse and sanity-check a quiz document.
pub fn parse_quiz(raw: &str) -> WorkerResult<Value> {
    let quiz: Value = serde_json::from_str(strip_fences(raw))?;
    let questions = quiz
        .get("questions")
        .and_then(Value::as_array)
        .ok_or_else(|| WorkerError::invalid_output("quiz has no questions array"))?;
    if questions.is_empty() {
        return Err(WorkerError::invalid_output("quiz has no questions"));
    }
    for (i, q) in questions.iter().enumerate() {
        let options = q.get("options").and_then(Value::as_array).map(Vec::len);
        let answer = q.get("answer_index").and_then(Value::as_u64);
        match (options, answer) {
            (Some(n), Some(a)) if n >= 2 && (a as usize) < n => {}
            _ => {
                return Err(WorkerError::invalid_output(format!(
                    "question {} has no valid options/answer_index",
                    i + 1
                )))
            }
        }
    }
    Ok(quiz)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Segment {
    pub speaker: Speaker,
    pub text: String,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Deserialize)]
struct SegmentDocument {
    segments: Vec<Segment>,
}

/// Parse the interactive podcast segment list.
pub fn parse_segments(raw: &str) -> WorkerResult<Vec<Segment>> {
    let doc: SegmentDocument = serde_json::from_str(strip_fences(raw))?;
    let segments: Vec<Segment> = doc
        .segments
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();
    if segments.is_empty() {
        return Err(WorkerError::invalid_output("no segments with text"));
    }
    Ok(segments)
}

/// Models sometimes wrap JSON in a markdown fence even in JSON mode.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialogue() {
        let script = "Intro music\nHOST: Welcome back.\nGUEST: Thanks for having me.\nIt is great to be here.\n\n**Host:** Let's start.";
        let lines = parse_dialogue(script).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].speaker, Speaker::Host);
        assert_eq!(lines[1].text, "Thanks for having me. It is great to be here.");
        assert_eq!(lines[2].speaker, Speaker::Host);
    }

    #[test]
    fn test_parse_dialogue_requires_tags() {
        assert!(matches!(
            parse_dialogue("Just a monologue."),
            Err(WorkerError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_parse_quiz() {
        let raw = r#"```json
{"questions": [{"question": "Q?", "options": ["a", "b", "c", "d"], "answer_index": 2, "explanation": "c"}]}
```"#;
        let quiz = parse_quiz(raw).unwrap();
        assert_eq!(quiz["questions"].as_array().unwrap().len(), 1);

        let out_of_range = r#"{"questions": [{"question": "Q?", "options": ["a", "b"], "answer_index": 2}]}"#;
        assert!(parse_quiz(out_of_range).is_err());
        assert!(parse_quiz(r#"{"questions": []}"#).is_err());
        assert!(matches!(parse_quiz("not json"), Err(WorkerError::Json(_))));
    }

    #[test]
    fn test_parse_segments_drops_empty_text() {
        let raw = r#"{"segments": [
            {"speaker": "HOST", "text": "Hello", "question": "Ready?"},
            {"speaker": "GUEST", "text": "  "}
        ]}"#;
        let segments = parse_segments(raw).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].question.as_deref(), Some("Ready?"));
    }
}
