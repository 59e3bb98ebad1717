//! Age-level profiles and prompt assembly

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audience an explanation is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeLevel {
    Preschool,
    Middleschool,
    College,
    Professional,
}

/// Label and tone instruction for one age level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeProfile {
    pub label: &'static str,
    pub instruction: &'static str,
}

impl AgeLevel {
    pub const ALL: [AgeLevel; 4] = [
        AgeLevel::Preschool,
        AgeLevel::Middleschool,
        AgeLevel::College,
        AgeLevel::Professional,
    ];

    /// Level used when a request names an unknown one
    pub const DEFAULT: AgeLevel = AgeLevel::Middleschool;

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeLevel::Preschool => "preschool",
            AgeLevel::Middleschool => "middleschool",
            AgeLevel::College => "college",
            AgeLevel::Professional => "professional",
        }
    }

    /// Strict parse, for validating requests before anything is stored
    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == value)
            .ok_or_else(|| AppError::Validation {
                message: format!(
                    "ageLevel must be one of: {}",
                    Self::ALL.map(|l| l.as_str()).join(", ")
                ),
                field: Some("ageLevel".to_string()),
            })
    }

    /// Lenient lookup: anything unrecognised resolves to [`AgeLevel::DEFAULT`]
    pub fn resolve(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::parse(v).ok())
            .unwrap_or(Self::DEFAULT)
    }

    pub fn profile(&self) -> AgeProfile {
        match self {
            AgeLevel::Preschool => AgeProfile {
                label: "Preschool",
                instruction: "Explain like I am 5. Use very basic words, short sentences, and compare things to toys or animals.",
            },
            AgeLevel::Middleschool => AgeProfile {
                label: "12 Years Old",
                instruction: "Explain like I am 12. Use relatable analogies about school, sports, or games. No jargon.",
            },
            AgeLevel::College => AgeProfile {
                label: "College",
                instruction: "Explain like a college student. Keep it academic but remove the dense filler. Focus on logic.",
            },
            AgeLevel::Professional => AgeProfile {
                label: "Professional",
                instruction: "Executive summary. Focus on ROI, technical breakthroughs, and practical implementation.",
            },
        }
    }
}

impl fmt::Display for AgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the four-section explanation prompt
pub fn build_prompt(filename: &str, level: AgeLevel) -> String {
    let profile = level.profile();

    format!(
        "Research Paper: \"{filename}\".\n\
         Target Audience: {label}.\n\
         Instruction: {instruction}\n\
         \n\
         Please provide:\n\
         1. SUMMARY: A high-level overview.\n\
         2. THE ANALOGY: A real-world comparison.\n\
         3. THE IMPACT: Why this paper matters.\n\
         4. KEY TAKEAWAYS: 3 short points.\n\
         \n\
         IMPORTANT: Do NOT use markdown symbols like * or #. Use plain text only. \
         Use clear section headers in ALL CAPS.",
        filename = filename,
        label = profile.label,
        instruction = profile.instruction,
    )
}
