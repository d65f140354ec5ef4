use crate::analysis::domain::mood::Mood;
use crate::feedback::domain::feedback_store::CorrectionHistory;

const PREAMBLE: &str = "You are a world-class veterinary behavioral expert with 20+ years of \
experience in canine emotion recognition and animal psychology.

TASK: Analyze the dog's emotional state using scientific behavioral markers.";

const PROTOCOL: &str = "ANALYSIS PROTOCOL:
1. Examine facial features: eyes, ears, mouth, nose, forehead
2. Assess body language: posture, tail position, muscle tension
3. Consider context clues: environment, lighting, positioning
4. Rate confidence based on clarity of behavioral markers

ACCURACY GUIDELINES:
- Only assign high confidence (80%+) when multiple clear indicators align
- Medium confidence (50-79%) for some clear indicators
- Low confidence (20-49%) for ambiguous or unclear signals
- Very low confidence (<20%) for poor image quality or mixed signals

OUTPUT FORMAT (JSON): {\"mood\": \"exact category name\", \"confidence\": number, \
\"reasoning\": \"brief explanation of key indicators observed\"}";

/// Instruction sent alongside the image in the user turn.
pub const USER_INSTRUCTION: &str = "Analyze this dog's emotional state. Focus on the most \
prominent behavioral indicators and provide your confidence level.";

const DEFAULT_CORRECTION_NOTE: &str = "User correction";

/// Renders the classifier system prompt.
///
/// Prior corrections are appended as a learning block only when there are
/// any; an empty history yields the base prompt.
pub fn system_prompt(history: Option<&CorrectionHistory>) -> String {
    let categories: Vec<String> = Mood::ALL
        .iter()
        .map(|m| format!("\u{2022} {}: {}", m.as_str().to_uppercase(), m.criteria()))
        .collect();

    let mut prompt = format!(
        "{PREAMBLE}\n\nMOOD CATEGORIES & CRITERIA:\n{}\n\n{PROTOCOL}",
        categories.join("\n")
    );

    if let Some(history) = history.filter(|h| !h.is_empty()) {
        let lines: Vec<String> = history
            .corrections
            .iter()
            .map(|c| {
                format!(
                    "- Image similar to current: Was predicted as \"{}\", but correct answer was \"{}\". Key difference: {}",
                    c.predicted,
                    c.actual,
                    c.notes.as_deref().unwrap_or(DEFAULT_CORRECTION_NOTE)
                )
            })
            .collect();
        prompt.push_str(
            "\n\nLEARNING CONTEXT: Previous analyses have been corrected as follows:\n",
        );
        prompt.push_str(&lines.join("\n"));
        prompt.push_str("\n\nApply these learnings to improve accuracy.");
    }
    prompt
}
