use super::{Priority, SuggestionCategory, TimeOfDay, Trigger};

/// A fixed self-care prompt and the conditions that surface it.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: SuggestionCategory,
    pub priority: Priority,
    pub duration_minutes: u16,
    pub trigger: Trigger,
}

pub const LIBRARY: &[SuggestionTemplate] = &[
    SuggestionTemplate {
        id: "box-breathing",
        title: "Two minutes of box breathing",
        description: "Breathe in for four counts, hold for four, out for four, hold for four. Repeat until the timer ends.",
        category: SuggestionCategory::Breathing,
        priority: Priority::High,
        duration_minutes: 2,
        trigger: Trigger {
            mood_below: Some(2.5),
            keywords: &["overwhelm", "stress", "anxious", "panic"],
            ..Trigger::NEVER
        },
    },
    SuggestionTemplate {
        id: "tag-out",
        title: "Ask for a tag-out",
        description: "Hand over to your partner or a trusted adult for twenty minutes and step outside.",
        category: SuggestionCategory::Rest,
        priority: Priority::High,
        duration_minutes: 20,
        trigger: Trigger {
            mood_below: Some(2.0),
            keywords: &["exhausted", "burnout", "can't cope", "no sleep"],
            ..Trigger::NEVER
        },
    },
    SuggestionTemplate {
        id: "repair-conversation",
        title: "Plan a repair conversation",
        description: "After a hard moment, tell your child what you felt and what you will try next time. Repair matters more than perfection.",
        category: SuggestionCategory::Connection,
        priority: Priority::High,
        duration_minutes: 5,
        trigger: Trigger {
            keywords: &["yelled", "shouted", "lost my temper", "guilty"],
            ..Trigger::NEVER
        },
    },
    SuggestionTemplate {
        id: "morning-intention",
        title: "Set one intention for today",
        description: "Before the house wakes up, write down one thing you want to feel today.",
        category: SuggestionCategory::Reflection,
        priority: Priority::Medium,
        duration_minutes: 3,
        trigger: Trigger {
            time_of_day: Some(TimeOfDay::Morning),
            ..Trigger::NEVER
        },
    },
    SuggestionTemplate {
        id: "evening-wind-down",
        title: "Screen-free wind down",
        description: "Put the phone in another room for the last half hour before bed.",
        category: SuggestionCategory::Rest,
        priority: Priority::Medium,
        duration_minutes: 30,
        trigger: Trigger {
            time_of_day: Some(TimeOfDay::Evening),
            keywords: &["tired", "sleep", "bedtime"],
            ..Trigger::NEVER
        },
    },
    SuggestionTemplate {
        id: "walk-outside",
        title: "Take a short walk outside",
        description: "Ten minutes of daylight and movement, with or without the kids.",
        category: SuggestionCategory::Movement,
        priority: Priority::Medium,
        duration_minutes: 10,
        trigger: Trigger {
            mood_below: Some(3.5),
            keywords: &["restless", "cooped", "frustrat"],
            ..Trigger::NEVER
        },
    },
    SuggestionTemplate {
        id: "celebrate-win",
        title: "Write down today's win",
        description: "Good days are worth remembering. Note what went well and why.",
        category: SuggestionCategory::Reflection,
        priority: Priority::Medium,
        duration_minutes: 3,
        trigger: Trigger {
            mood_above: Some(4.0),
            keywords: &["proud", "milestone", "first time"],
            ..Trigger::NEVER
        },
    },
    SuggestionTemplate {
        id: "gratitude-three",
        title: "Three good things",
        description: "List three small things from today you are thankful for.",
        category: SuggestionCategory::Reflection,
        priority: Priority::Low,
        duration_minutes: 5,
        trigger: Trigger {
            keywords: &["grateful", "thankful"],
            ..Trigger::NEVER
        },
    },
    SuggestionTemplate {
        id: "hydrate",
        title: "Drink a glass of water",
        description: "A small reset that is easy to skip on busy days.",
        category: SuggestionCategory::SelfCare,
        priority: Priority::Low,
        duration_minutes: 1,
        trigger: Trigger::NEVER,
    },
    SuggestionTemplate {
        id: "text-a-friend",
        title: "Text a friend",
        description: "Send a quick message to someone who gets it.",
        category: SuggestionCategory::Connection,
        priority: Priority::Low,
        duration_minutes: 2,
        trigger: Trigger {
            keywords: &["lonely", "alone", "isolated"],
            ..Trigger::NEVER
        },
    },
];
