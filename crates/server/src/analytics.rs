//! In-memory aggregation over journal entries: streaks, weekly progress,
//! dashboard summaries and the advanced-search filter.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{db::entries::JournalEntry, mood::Mood};

/// The streak scan never looks further back than this many days.
pub const MAX_STREAK_LOOKBACK_DAYS: u32 = 30;

pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Consecutive days with at least one entry, counting back from `today`.
///
/// A day without entries ends the streak, including `today` itself. The scan
/// stops after [`MAX_STREAK_LOOKBACK_DAYS`].
pub fn current_streak(entry_days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    for back in 0..MAX_STREAK_LOOKBACK_DAYS {
        let day = today - Duration::days(i64::from(back));
        if !entry_days.contains(&day) {
            break;
        }
        streak += 1;
    }
    streak
}

pub fn entry_days(entries: &[JournalEntry], offset: FixedOffset) -> HashSet<NaiveDate> {
    entries
        .iter()
        .map(|e| local_date(e.created_at, offset))
        .collect()
}

/// Entries created in the seven days ending at `now`.
pub fn entries_this_week(entries: &[JournalEntry], now: DateTime<Utc>) -> usize {
    let since = now - Duration::days(7);
    entries
        .iter()
        .filter(|e| e.created_at >= since && e.created_at <= now)
        .count()
}

/// Mood with the highest count; ties go to the mood listed first in the vocabulary.
pub fn most_frequent_mood<I>(moods: I) -> Option<Mood>
where
    I: IntoIterator<Item = Mood>,
{
    let mut counts: BTreeMap<Mood, u32> = BTreeMap::new();
    for mood in moods {
        *counts.entry(mood).or_default() += 1;
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(Mood, u32)>, (mood, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((mood, count)),
        })
        .map(|(mood, _)| mood)
}

/// Numbers shown in the weekly progress email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyProgress {
    pub entries_this_week: usize,
    pub streak_days: u32,
    pub top_mood: Option<Mood>,
}

/// `entries` should cover at least the streak lookback window.
pub fn weekly_progress(
    entries: &[JournalEntry],
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> WeeklyProgress {
    let week_start = now - Duration::days(7);
    WeeklyProgress {
        entries_this_week: entries_this_week(entries, now),
        streak_days: current_streak(&entry_days(entries, offset), local_date(now, offset)),
        top_mood: most_frequent_mood(
            entries
                .iter()
                .filter(|e| e.created_at >= week_start)
                .filter_map(|e| e.mood),
        ),
    }
}

/// Advanced search. Every populated field narrows the result; empty fields match all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryFilter {
    pub mood: Option<Mood>,
    /// Inclusive local date.
    pub from: Option<NaiveDate>,
    /// Inclusive local date.
    pub to: Option<NaiveDate>,
    #[serde(rename = "q")]
    pub keyword: Option<String>,
    pub child_id: Option<Uuid>,
    #[serde(default)]
    pub favorites_only: bool,
}

impl EntryFilter {
    pub fn matches(&self, entry: &JournalEntry, offset: FixedOffset) -> bool {
        if let Some(mood) = self.mood
            && entry.mood != Some(mood)
        {
            return false;
        }

        let day = local_date(entry.created_at, offset);
        if self.from.is_some_and(|from| day < from) || self.to.is_some_and(|to| day > to) {
            return false;
        }

        if let Some(child_id) = self.child_id
            && entry.child_id != Some(child_id)
        {
            return false;
        }

        if self.favorites_only && !entry.is_favorite {
            return false;
        }

        match self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            Some(keyword) => {
                let needle = keyword.to_lowercase();
                entry.content.to_lowercase().contains(&needle)
                    || entry
                        .title
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }

    /// UTC `[since, until)` covering the date range, used to narrow the database fetch.
    pub fn bounds(&self, offset: FixedOffset) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let midnight = |date: NaiveDate| {
            date.and_time(NaiveTime::MIN)
                .and_local_timezone(offset)
                .single()
                .map(|at| at.with_timezone(&Utc))
        };
        (
            self.from.and_then(midnight),
            self.to
                .and_then(|to| to.succ_opt())
                .and_then(midnight),
        )
    }

    pub fn apply(&self, entries: Vec<JournalEntry>, offset: FixedOffset) -> Vec<JournalEntry> {
        entries
            .into_iter()
            .filter(|e| self.matches(e, offset))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub days: u32,
    pub total_entries: usize,
    pub entries_per_day: Vec<DailyCount>,
    pub mood_distribution: BTreeMap<Mood, usize>,
    pub average_mood_score: Option<f64>,
    /// Mean of the per-entry Daily Check-In averages, over entries that have one.
    pub average_check_in: Option<f64>,
    pub favorite_count: usize,
    pub entries_per_child: HashMap<Uuid, usize>,
    pub current_streak: u32,
    pub most_frequent_mood: Option<Mood>,
}

fn average_check_in(entries: &[JournalEntry]) -> Option<f64> {
    let averages: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.check_in.as_ref().map(|check_in| check_in.average()))
        .collect();
    (!averages.is_empty()).then(|| averages.iter().sum::<f64>() / averages.len() as f64)
}

/// Summary of `entries`, which the caller has already limited to the window.
pub fn summarize(
    entries: &[JournalEntry],
    days: u32,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> AnalyticsSummary {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut mood_distribution: BTreeMap<Mood, usize> = BTreeMap::new();
    let mut entries_per_child: HashMap<Uuid, usize> = HashMap::new();

    for entry in entries {
        *per_day.entry(local_date(entry.created_at, offset)).or_default() += 1;
        if let Some(mood) = entry.mood {
            *mood_distribution.entry(mood).or_default() += 1;
        }
        if let Some(child_id) = entry.child_id {
            *entries_per_child.entry(child_id).or_default() += 1;
        }
    }

    AnalyticsSummary {
        days,
        total_entries: entries.len(),
        entries_per_day: per_day
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect(),
        average_mood_score: crate::mood::average_score(entries.iter().filter_map(|e| e.mood)),
        most_frequent_mood: most_frequent_mood(entries.iter().filter_map(|e| e.mood)),
        average_check_in: average_check_in(entries),
        mood_distribution,
        favorite_count: entries.iter().filter(|e| e.is_favorite).count(),
        entries_per_child,
        current_streak: current_streak(&entry_days(entries, offset), local_date(now, offset)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::entries::DailyCheckIn;

    pub(crate) fn entry_at(created_at: DateTime<Utc>, mood: Option<Mood>) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            family_id: Uuid::nil(),
            author_id: Uuid::nil(),
            child_id: None,
            title: None,
            content: "We built a pillow fort".to_string(),
            mood,
            is_favorite: false,
            has_ai_feedback: false,
            ai_feedback: None,
            developmental_insight: None,
            check_in: None,
            created_at,
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_streak_stops_at_first_gap() {
        let days: HashSet<_> = [day(10), day(9), day(8), day(6)].into_iter().collect();
        assert_eq!(current_streak(&days, day(10)), 3);
    }

    #[test]
    fn test_streak_is_zero_without_entry_today() {
        let days: HashSet<_> = [day(9), day(8)].into_iter().collect();
        assert_eq!(current_streak(&days, day(10)), 0);
    }

    #[test]
    fn test_streak_capped_at_lookback() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let days: HashSet<_> = (0..60).map(|i| today - Duration::days(i)).collect();
        assert_eq!(current_streak(&days, today), MAX_STREAK_LOOKBACK_DAYS);
    }

    #[test]
    fn test_streak_uses_local_dates() {
        // 02:30 UTC on the 11th is still the 10th in UTC-5.
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let entries = vec![
            entry_at(Utc.with_ymd_and_hms(2026, 3, 11, 2, 30, 0).unwrap(), None),
            entry_at(Utc.with_ymd_and_hms(2026, 3, 9, 15, 0, 0).unwrap(), None),
        ];
        let days = entry_days(&entries, offset);
        assert_eq!(current_streak(&days, day(10)), 2);
    }

    #[test]
    fn test_most_frequent_mood() {
        assert_eq!(most_frequent_mood(Vec::<Mood>::new()), None);
        assert_eq!(
            most_frequent_mood([Mood::Tired, Mood::Calm, Mood::Tired]),
            Some(Mood::Tired)
        );
        // tie resolves to vocabulary order
        assert_eq!(
            most_frequent_mood([Mood::Sad, Mood::Joyful]),
            Some(Mood::Joyful)
        );
    }

    #[test]
    fn test_weekly_progress() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap();
        let entries = vec![
            entry_at(now - Duration::hours(1), Some(Mood::Calm)),
            entry_at(now - Duration::days(1), Some(Mood::Tired)),
            entry_at(now - Duration::days(2), Some(Mood::Calm)),
            entry_at(now - Duration::days(10), Some(Mood::Sad)),
        ];
        let progress = weekly_progress(&entries, now, utc());
        assert_eq!(progress.entries_this_week, 3);
        assert_eq!(progress.streak_days, 3);
        assert_eq!(progress.top_mood, Some(Mood::Calm));
    }

    #[test]
    fn test_filter_is_intersection_of_active_filters() {
        let base = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let mut bedtime = entry_at(base, Some(Mood::Frustrated));
        bedtime.content = "Bedtime battle again".to_string();
        let mut park = entry_at(base - Duration::days(3), Some(Mood::Frustrated));
        park.content = "Park trip, then a bedtime meltdown".to_string();
        let mut calm_bedtime = entry_at(base, Some(Mood::Calm));
        calm_bedtime.title = Some("Bedtime went well".to_string());

        let entries = vec![bedtime.clone(), park.clone(), calm_bedtime.clone()];

        let by_mood = EntryFilter {
            mood: Some(Mood::Frustrated),
            ..Default::default()
        };
        assert_eq!(by_mood.apply(entries.clone(), utc()).len(), 2);

        let by_keyword = EntryFilter {
            keyword: Some("BEDTIME".to_string()),
            ..Default::default()
        };
        assert_eq!(by_keyword.apply(entries.clone(), utc()).len(), 3);

        let all = EntryFilter {
            mood: Some(Mood::Frustrated),
            from: Some(day(9)),
            to: Some(day(10)),
            keyword: Some("bedtime".to_string()),
            ..Default::default()
        };
        let result = all.apply(entries, utc());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, bedtime.id);
    }

    #[test]
    fn test_filter_favorites_and_child() {
        let now = Utc::now();
        let child = Uuid::new_v4();
        let mut fav = entry_at(now, None);
        fav.is_favorite = true;
        fav.child_id = Some(child);
        let other = entry_at(now, None);

        let filter = EntryFilter {
            favorites_only: true,
            child_id: Some(child),
            ..Default::default()
        };
        let result = filter.apply(vec![fav.clone(), other], utc());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, fav.id);
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let entries = vec![entry_at(Utc::now(), None), entry_at(Utc::now(), None)];
        assert_eq!(EntryFilter::default().apply(entries, utc()).len(), 2);
    }

    #[test]
    fn test_filter_bounds_cover_whole_local_days() {
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let filter = EntryFilter {
            from: Some(day(2)),
            to: Some(day(3)),
            ..Default::default()
        };
        let (since, until) = filter.bounds(eastern);
        assert_eq!(since, Some(Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 0).unwrap()));
        assert_eq!(until, Some(Utc.with_ymd_and_hms(2026, 3, 4, 5, 0, 0).unwrap()));
        assert_eq!(EntryFilter::default().bounds(eastern), (None, None));
    }

    #[test]
    fn test_summarize() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();
        let child = Uuid::new_v4();
        let mut first = entry_at(now, Some(Mood::Joyful));
        first.is_favorite = true;
        first.child_id = Some(child);
        first.check_in = Some(sqlx::types::Json(DailyCheckIn {
            energy: 2,
            patience: 3,
            connection: 5,
            self_care: 2,
            gratitude: None,
            intentions: None,
        }));
        let entries = vec![
            first,
            entry_at(now - Duration::hours(2), Some(Mood::Sad)),
            entry_at(now - Duration::days(1), None),
        ];

        let summary = summarize(&entries, 30, now, utc());
        assert_eq!(summary.total_entries, 3);
        assert_eq!(summary.entries_per_day.len(), 2);
        assert_eq!(summary.entries_per_day[1].count, 2);
        assert_eq!(summary.average_mood_score, Some(3.0));
        // entries without a check-in are left out of the mean
        assert_eq!(summary.average_check_in, Some(3.0));
        assert_eq!(summary.favorite_count, 1);
        assert_eq!(summary.entries_per_child.get(&child), Some(&1));
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.mood_distribution.get(&Mood::Sad), Some(&1));
    }
}
