//! Rule-based self-care suggestions.
//!
//! Templates from [`library::LIBRARY`] are matched against a [`WellnessContext`]
//! built from recent entries. Low-priority templates that did not match can
//! still slip through at random, which keeps the list from going stale.

pub mod library;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{db::entries::JournalEntry, llm::LlmClient, mood};

/// Hard ceiling on suggestions per request regardless of the caller's setting.
pub const SUGGESTION_CAP: usize = 2;

/// A random draw above this lets an unmatched low-priority template through.
pub const PASS_THROUGH_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Breathing,
    Movement,
    Connection,
    Rest,
    Reflection,
    SelfCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::from_hour(now.with_timezone(&offset).hour())
    }
}

/// Conditions under which a template applies. Any single hit is enough.
#[derive(Debug, Clone, Copy)]
pub struct Trigger {
    pub mood_below: Option<f64>,
    pub mood_above: Option<f64>,
    pub keywords: &'static [&'static str],
    pub time_of_day: Option<TimeOfDay>,
}

impl Trigger {
    pub const NEVER: Trigger = Trigger {
        mood_below: None,
        mood_above: None,
        keywords: &[],
        time_of_day: None,
    };

    pub fn matches(&self, ctx: &WellnessContext) -> bool {
        if let (Some(limit), Some(avg)) = (self.mood_below, ctx.mood_average)
            && avg < limit
        {
            return true;
        }
        if let (Some(limit), Some(avg)) = (self.mood_above, ctx.mood_average)
            && avg > limit
        {
            return true;
        }
        if self
            .keywords
            .iter()
            .any(|keyword| ctx.recent_text.contains(keyword))
        {
            return true;
        }
        self.time_of_day == Some(ctx.time_of_day)
    }
}

#[derive(Debug, Clone)]
pub struct WellnessContext {
    pub mood_average: Option<f64>,
    /// Lowercased text of recent entries, searched for trigger keywords.
    pub recent_text: String,
    pub time_of_day: TimeOfDay,
}

impl WellnessContext {
    pub fn from_entries(entries: &[JournalEntry], time_of_day: TimeOfDay) -> Self {
        let recent_text = entries
            .iter()
            .flat_map(|e| [e.title.as_deref().unwrap_or_default(), e.content.as_str()])
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase();

        Self {
            mood_average: mood::average_score(entries.iter().filter_map(|e| e.mood)),
            recent_text,
            time_of_day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: SuggestionCategory,
    pub priority: Priority,
    pub duration_minutes: u16,
    #[serde(default)]
    pub personalized: bool,
}

impl From<&library::SuggestionTemplate> for Suggestion {
    fn from(t: &library::SuggestionTemplate) -> Self {
        Self {
            id: t.id.to_string(),
            title: t.title.to_string(),
            description: t.description.to_string(),
            category: t.category,
            priority: t.priority,
            duration_minutes: t.duration_minutes,
            personalized: false,
        }
    }
}

/// Effective cap for a caller-supplied per-day maximum.
pub fn effective_limit(max_per_day: usize) -> usize {
    max_per_day.min(SUGGESTION_CAP)
}

/// Pick at most `min(max_per_day, 2)` suggestions, highest priority first.
pub fn select_suggestions<R: Rng>(
    templates: &[library::SuggestionTemplate],
    ctx: &WellnessContext,
    max_per_day: usize,
    rng: &mut R,
) -> Vec<Suggestion> {
    let mut picked: Vec<&library::SuggestionTemplate> = templates
        .iter()
        .filter(|t| {
            t.trigger.matches(ctx)
                || (t.priority == Priority::Low
                    && rng.random::<f64>() > PASS_THROUGH_THRESHOLD)
        })
        .collect();

    // stable: library order breaks ties within a tier
    picked.sort_by_key(|t| t.priority);
    picked
        .into_iter()
        .take(effective_limit(max_per_day))
        .map(Suggestion::from)
        .collect()
}

const PERSONALIZED_SYSTEM_PROMPT: &str = "You are a warm, practical coach for parents. \
Reply with a JSON object with keys title, description, category \
(one of breathing, movement, connection, rest, reflection, self_care) and duration_minutes.";

/// One LLM-written suggestion, `None` when the call or the parse fails.
pub async fn personalized_suggestion(
    llm: &dyn LlmClient,
    ctx: &WellnessContext,
) -> Option<Suggestion> {
    let mood = ctx
        .mood_average
        .map(|avg| format!("{avg:.1} out of 5"))
        .unwrap_or_else(|| "unknown".to_string());
    let excerpt: String = ctx.recent_text.chars().take(1500).collect();
    let prompt = format!(
        "Average mood this week: {mood}. Time of day: {:?}. Recent journal excerpts:\n{excerpt}\n\
         Suggest one short self-care activity.",
        ctx.time_of_day
    );

    match llm.complete_json(PERSONALIZED_SYSTEM_PROMPT, &prompt).await {
        Ok(value) => parse_personalized(&value),
        Err(error) => {
            tracing::warn!(?error, "personalized suggestion request failed");
            None
        }
    }
}

pub fn parse_personalized(value: &Value) -> Option<Suggestion> {
    #[derive(Deserialize)]
    struct Raw {
        title: String,
        description: String,
        category: SuggestionCategory,
        #[serde(default = "default_duration")]
        duration_minutes: u16,
    }

    fn default_duration() -> u16 {
        5
    }

    let raw: Raw = match serde_json::from_value(value.clone()) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(?error, "personalized suggestion had unexpected shape");
            return None;
        }
    };

    if raw.title.trim().is_empty() {
        return None;
    }

    Some(Suggestion {
        id: "personalized".to_string(),
        title: raw.title,
        description: raw.description,
        category: raw.category,
        priority: Priority::High,
        duration_minutes: raw.duration_minutes,
        personalized: true,
    })
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::{library::LIBRARY, *};
    use crate::{analytics::tests::entry_at, mood::Mood};

    fn ctx(mood_average: Option<f64>, text: &str, time_of_day: TimeOfDay) -> WellnessContext {
        WellnessContext {
            mood_average,
            recent_text: text.to_lowercase(),
            time_of_day,
        }
    }

    #[test]
    fn test_never_exceeds_cap() {
        let stressed = ctx(Some(1.0), "overwhelmed, yelled, exhausted, tired, lonely", TimeOfDay::Evening);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            for max in [0, 1, 2, 3, 10] {
                let picked = select_suggestions(LIBRARY, &stressed, max, &mut rng);
                assert!(picked.len() <= max.min(SUGGESTION_CAP));
            }
        }
    }

    #[test]
    fn test_high_priority_first() {
        let stressed = ctx(Some(1.5), "so overwhelmed today", TimeOfDay::Morning);
        let mut rng = StdRng::seed_from_u64(7);
        let picked = select_suggestions(LIBRARY, &stressed, 5, &mut rng);
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|s| s.priority == Priority::High));
        assert_eq!(picked[0].id, "box-breathing");
    }

    #[test]
    fn test_time_of_day_trigger() {
        let morning = ctx(Some(4.0), "", TimeOfDay::Morning);
        let template = LIBRARY.iter().find(|t| t.id == "morning-intention").unwrap();
        assert!(template.trigger.matches(&morning));
        let night = ctx(Some(4.0), "", TimeOfDay::Night);
        assert!(!template.trigger.matches(&night));
    }

    #[test]
    fn test_keyword_substring_trigger() {
        let template = LIBRARY.iter().find(|t| t.id == "walk-outside").unwrap();
        assert!(template.trigger.matches(&ctx(None, "so frustrating", TimeOfDay::Night)));
        assert!(!template.trigger.matches(&ctx(None, "lovely day", TimeOfDay::Night)));
    }

    #[test]
    fn test_never_trigger_only_passes_through_randomly() {
        let hydrate = &LIBRARY.iter().find(|t| t.id == "hydrate").unwrap();
        assert!(!hydrate.trigger.matches(&ctx(Some(3.0), "", TimeOfDay::Afternoon)));
    }

    #[test]
    fn test_context_from_entries() {
        let now = Utc::now();
        let mut a = entry_at(now, Some(Mood::Sad));
        a.title = Some("Rough NIGHT".to_string());
        let b = entry_at(now, Some(Mood::Joyful));
        let context = WellnessContext::from_entries(&[a, b], TimeOfDay::Night);
        assert_eq!(context.mood_average, Some(3.0));
        assert!(context.recent_text.contains("rough night"));
        assert!(context.recent_text.contains("pillow fort"));
    }

    #[test]
    fn test_time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(13), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(2), TimeOfDay::Night);
    }

    #[test]
    fn test_parse_personalized() {
        let value = serde_json::json!({
            "title": "Stretch with your toddler",
            "description": "Turn bedtime into a silly yoga session.",
            "category": "movement",
            "duration_minutes": 10
        });
        let suggestion = parse_personalized(&value).unwrap();
        assert!(suggestion.personalized);
        assert_eq!(suggestion.category, SuggestionCategory::Movement);

        assert!(parse_personalized(&serde_json::json!({"title": "x"})).is_none());
    }
}
