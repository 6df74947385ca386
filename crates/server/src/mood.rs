use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mood tag a parent attaches to a journal entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "mood", rename_all = "snake_case")]
pub enum Mood {
    Joyful,
    Content,
    Calm,
    Tired,
    Anxious,
    Frustrated,
    Overwhelmed,
    Sad,
    Proud,
    Grateful,
}

impl Mood {
    pub const ALL: [Mood; 10] = [
        Mood::Joyful,
        Mood::Content,
        Mood::Calm,
        Mood::Tired,
        Mood::Anxious,
        Mood::Frustrated,
        Mood::Overwhelmed,
        Mood::Sad,
        Mood::Proud,
        Mood::Grateful,
    ];

    /// Numeric wellbeing score, 1 (struggling) to 5 (thriving).
    pub fn score(self) -> u8 {
        match self {
            Mood::Joyful | Mood::Proud | Mood::Grateful => 5,
            Mood::Content | Mood::Calm => 4,
            Mood::Tired => 3,
            Mood::Anxious | Mood::Frustrated => 2,
            Mood::Overwhelmed | Mood::Sad => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Joyful => "joyful",
            Mood::Content => "content",
            Mood::Calm => "calm",
            Mood::Tired => "tired",
            Mood::Anxious => "anxious",
            Mood::Frustrated => "frustrated",
            Mood::Overwhelmed => "overwhelmed",
            Mood::Sad => "sad",
            Mood::Proud => "proud",
            Mood::Grateful => "grateful",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mood `{0}`")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == normalized)
            .ok_or(UnknownMood(s.to_string()))
    }
}

/// Average score over the moods present, `None` when there are none.
pub fn average_score<I>(moods: I) -> Option<f64>
where
    I: IntoIterator<Item = Mood>,
{
    let (sum, count) = moods
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), mood| {
            (sum + u32::from(mood.score()), count + 1)
        });
    (count > 0).then(|| f64::from(sum) / f64::from(count))
}
