use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Relaxed,
    Anxious,
    Fearful,
    Angry,
    Confused,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mood '{0}'")]
pub struct UnknownMood(pub String);

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Happy,
        Mood::Relaxed,
        Mood::Anxious,
        Mood::Fearful,
        Mood::Angry,
        Mood::Confused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Relaxed => "relaxed",
            Mood::Anxious => "anxious",
            Mood::Fearful => "fearful",
            Mood::Angry => "angry",
            Mood::Confused => "confused",
        }
    }

    /// Observable behavioral markers the classifier is asked to look for.
    pub fn criteria(&self) -> &'static str {
        match self {
            Mood::Happy => {
                "Relaxed facial muscles, mouth slightly open, tongue possibly visible, \
                 bright alert eyes, ears in natural position, overall relaxed body posture"
            }
            Mood::Relaxed => {
                "Soft eyes, ears in natural position, mouth closed or slightly open, \
                 calm breathing, lying down or sitting comfortably, no tension in facial muscles"
            }
            Mood::Anxious => {
                "Tense facial muscles, ears back or pinned, wide eyes, panting without heat, \
                 restless movement, avoiding eye contact, tucked tail"
            }
            Mood::Fearful => {
                "Wide eyes showing whites, ears flat against head, cowering posture, \
                 trembling, tail tucked, trying to hide or escape"
            }
            Mood::Angry => {
                "Raised lips showing teeth, wrinkled forehead, direct stare, ears forward, \
                 stiff body posture, growling expression"
            }
            Mood::Confused => {
                "Head tilted, ears perked asymmetrically, questioning expression, \
                 alert but uncertain posture, focused attention"
            }
        }
    }

    /// Capitalized form for display.
    pub fn title(&self) -> String {
        let s = self.as_str();
        let mut out = s[..1].to_ascii_uppercase();
        out.push_str(&s[1..]);
        out
    }
}

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodResult {
    pub mood: Mood,
    /// Always within 1..=100.
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    /// Prompt version reported by the classifier, when it sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
