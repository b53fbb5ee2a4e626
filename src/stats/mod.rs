// Aggregation engine - derived statistics over the entries collection
//
// Every function here is a pure reducer over a borrowed slice of entries:
// no I/O, no mutation, no shared state. The HTTP layer loads a collection,
// hands it to these functions, and serializes whatever comes back. The
// effective input is only as fresh as the latest successful save, which is
// all a single-user deployment needs.
//
// Rates are percentages in [0, 100]. Division by an empty schedule is
// guarded everywhere and yields 0, never NaN.

use crate::models::{AdditionalData, CompletedHabit, DailyStats, Entry, ScheduledHabit};
use chrono::{Datelike, Days, Local, NaiveDate, Timelike};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Weekday labels, Sunday-first to match `num_days_from_sunday`
const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Completion rate per weekday, for `GET /stats/insights`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayRate {
    pub day: &'static str,
    pub completion_rate: f64,
}

/// Completion count per time-of-day bucket
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeSlot {
    pub time: &'static str,
    pub count: u32,
}

/// The habit with the best scheduled-to-completed ratio
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HabitConsistency {
    pub name: String,
    pub percentage: f64,
}

/// One day of the 7-day trend window
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendPoint {
    pub date: String,
    pub percentage: f64,
}

/// On-demand aggregate view over the whole entry log
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub best_days: Vec<DayRate>,
    pub best_time: Vec<TimeSlot>,
    pub longest_streak: u32,
    pub completion_trends: BTreeMap<String, f64>,
    pub mood_correlations: BTreeMap<String, f64>,
    pub weather_impact: BTreeMap<String, f64>,
}

/// Aggregates over one calendar month of entries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub monthly_completion: f64,
    pub longest_streak: u32,
    pub perfect_days: usize,
    pub most_consistent: Option<HabitConsistency>,
    pub weekly_trend: Vec<TrendPoint>,
    pub best_time_of_day: Vec<TimeSlot>,
}

/// `100 * completed / scheduled`, 0 when nothing was scheduled
fn percentage(completed: usize, scheduled: usize) -> f64 {
    if scheduled == 0 {
        return 0.0;
    }
    completed as f64 / scheduled as f64 * 100.0
}

/// Per-entry completion rate from the raw habit lists
fn entry_rate(entry: &Entry) -> f64 {
    percentage(entry.completed_habits.len(), entry.scheduled_habits.len())
}

/// Parse an entry date key (YYYY-MM-DD)
pub(crate) fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Compute the embedded daily statistics for a new entry.
///
/// Runs once at entry creation; updates never recompute it. Completions are
/// bucketed by the local-time hour of their timestamp (before 12 = morning,
/// before 18 = afternoon, else evening); completions without a timestamp
/// are counted in the rate but not bucketed.
pub fn compute_daily_stats(
    scheduled: &[ScheduledHabit],
    completed: &[CompletedHabit],
    extra: &AdditionalData,
) -> DailyStats {
    let mut morning = 0;
    let mut afternoon = 0;
    let mut evening = 0;

    for habit in completed {
        let Some(ts) = habit.completed_at else {
            continue;
        };
        let hour = ts.with_timezone(&Local).hour();
        if hour < 12 {
            morning += 1;
        } else if hour < 18 {
            afternoon += 1;
        } else {
            evening += 1;
        }
    }

    DailyStats {
        completion_rate: percentage(completed.len(), scheduled.len()),
        morning,
        afternoon,
        evening,
        total_minutes_spent: extra.minutes_spent.unwrap_or(0),
        mood: extra.mood.clone(),
        energy: extra.energy.clone(),
        streak: completed.iter().map(|h| h.streak).max().unwrap_or(0),
        weather: extra.weather.clone(),
    }
}

/// Completion rate per weekday, best first.
///
/// Only weekdays that actually have entries appear in the result. A weekday
/// where nothing was scheduled reports a rate of 0.
pub fn best_days_of_week(entries: &[Entry]) -> Vec<DayRate> {
    // (scheduled, completed) per weekday, Sunday first; None = no entries
    let mut totals: [Option<(usize, usize)>; 7] = [None; 7];

    for entry in entries {
        let Some(date) = parse_date(&entry.date) else {
            continue;
        };
        let slot = totals[date.weekday().num_days_from_sunday() as usize].get_or_insert((0, 0));
        slot.0 += entry.scheduled_habits.len();
        slot.1 += entry.completed_habits.len();
    }

    let mut days: Vec<DayRate> = totals
        .iter()
        .enumerate()
        .filter_map(|(day, counts)| {
            counts.map(|(scheduled, completed)| DayRate {
                day: DAY_NAMES[day],
                completion_rate: percentage(completed, scheduled),
            })
        })
        .collect();

    days.sort_by(|a, b| {
        b.completion_rate
            .partial_cmp(&a.completion_rate)
            .unwrap_or(Ordering::Equal)
    });
    days
}

/// Total completions per time-of-day bucket, busiest first.
///
/// Sums the stats stored on each entry at creation time rather than
/// re-deriving from raw timestamps.
pub fn best_time_of_day(entries: &[Entry]) -> Vec<TimeSlot> {
    let (morning, afternoon, evening) = entries.iter().fold((0, 0, 0), |(m, a, e), entry| {
        (
            m + entry.stats.morning,
            a + entry.stats.afternoon,
            e + entry.stats.evening,
        )
    });

    let mut slots = vec![
        TimeSlot {
            time: "morning",
            count: morning,
        },
        TimeSlot {
            time: "afternoon",
            count: afternoon,
        },
        TimeSlot {
            time: "evening",
            count: evening,
        },
    ];
    slots.sort_by(|a, b| b.count.cmp(&a.count));
    slots
}

/// Highest streak recorded on any completion, 0 when there are none
pub fn longest_streak(entries: &[Entry]) -> u32 {
    entries
        .iter()
        .flat_map(|entry| entry.completed_habits.iter().map(|h| h.streak))
        .max()
        .unwrap_or(0)
}

/// Days where everything scheduled was completed (empty days don't count)
pub fn perfect_days_count(entries: &[Entry]) -> usize {
    entries
        .iter()
        .filter(|entry| {
            !entry.scheduled_habits.is_empty()
                && entry.scheduled_habits.len() == entry.completed_habits.len()
        })
        .count()
}

/// The habit name with the highest completed/scheduled percentage.
///
/// Counts every scheduled occurrence and every same-name completion, in
/// entry order. Ties resolve to the habit scheduled first.
pub fn most_consistent_habit(entries: &[Entry]) -> Option<HabitConsistency> {
    // Vec keeps first-scheduled order, which is what breaks ties
    let mut counts: Vec<(String, usize, usize)> = Vec::new();

    for entry in entries {
        for habit in &entry.scheduled_habits {
            match counts.iter_mut().find(|(name, ..)| *name == habit.name) {
                Some((_, scheduled, _)) => *scheduled += 1,
                None => counts.push((habit.name.clone(), 1, 0)),
            }
        }
        for habit in &entry.completed_habits {
            if let Some((_, _, completed)) =
                counts.iter_mut().find(|(name, ..)| *name == habit.name)
            {
                *completed += 1;
            }
        }
    }

    let mut best: Option<HabitConsistency> = None;
    for (name, scheduled, completed) in counts {
        let pct = percentage(completed, scheduled);
        if best.as_ref().is_none_or(|b| pct > b.percentage) {
            best = Some(HabitConsistency {
                name,
                percentage: pct,
            });
        }
    }
    best
}

/// Completion rate for each of the 7 days ending at `reference`, oldest
/// first. Days without an entry (or with an empty schedule) report 0.
pub fn weekly_trend(entries: &[Entry], reference: NaiveDate) -> Vec<TrendPoint> {
    (0..7u64)
        .rev()
        .map(|back| {
            let day = reference - Days::new(back);
            let entry = entries.iter().find(|e| parse_date(&e.date) == Some(day));
            TrendPoint {
                date: day.format("%Y-%m-%d").to_string(),
                percentage: entry.map_or(0.0, entry_rate),
            }
        })
        .collect()
}

/// Entries whose date falls in the given year and 1-based month.
/// Entries with unparseable dates never match.
pub fn month_filter(entries: &[Entry], year: i32, month: u32) -> Vec<Entry> {
    entries
        .iter()
        .filter(|entry| {
            parse_date(&entry.date).is_some_and(|d| d.year() == year && d.month() == month)
        })
        .cloned()
        .collect()
}

/// Aggregate completion rate over a set of entries: total completed over
/// total scheduled, 0 when nothing was scheduled
pub fn monthly_completion(entries: &[Entry]) -> f64 {
    let scheduled = entries.iter().map(|e| e.scheduled_habits.len()).sum();
    let completed = entries.iter().map(|e| e.completed_habits.len()).sum();
    percentage(completed, scheduled)
}

/// Group entries by a derived key and average the per-entry completion rate
/// within each group. Entries without a key are skipped.
fn mean_rate_by<F>(entries: &[Entry], key: F) -> BTreeMap<String, f64>
where
    F: Fn(&Entry) -> Option<String>,
{
    let mut groups: BTreeMap<String, (f64, u32)> = BTreeMap::new();

    for entry in entries {
        let Some(group) = key(entry) else {
            continue;
        };
        let (sum, count) = groups.entry(group).or_insert((0.0, 0));
        *sum += entry_rate(entry);
        *count += 1;
    }

    groups
        .into_iter()
        .map(|(group, (sum, count))| (group, sum / count as f64))
        .collect()
}

/// Group key for a free-form metadata value: the string itself for strings,
/// the JSON rendering for anything else
fn metadata_key(value: &Option<Value>) -> Option<String> {
    value.as_ref().map(|v| match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    })
}

/// Average completion rate per recorded weather value
pub fn weather_impact(entries: &[Entry]) -> BTreeMap<String, f64> {
    mean_rate_by(entries, |e| metadata_key(&e.metadata.weather))
}

/// Average completion rate per recorded mood value
pub fn mood_correlations(entries: &[Entry]) -> BTreeMap<String, f64> {
    mean_rate_by(entries, |e| metadata_key(&e.metadata.mood))
}

/// Average completion rate per calendar month (YYYY-MM keys, ascending)
pub fn completion_trends(entries: &[Entry]) -> BTreeMap<String, f64> {
    mean_rate_by(entries, |e| {
        parse_date(&e.date).map(|d| d.format("%Y-%m").to_string())
    })
}

/// Assemble the full insights view for `GET /stats/insights`
pub fn insights(entries: &[Entry]) -> Insights {
    Insights {
        best_days: best_days_of_week(entries),
        best_time: best_time_of_day(entries),
        longest_streak: longest_streak(entries),
        completion_trends: completion_trends(entries),
        mood_correlations: mood_correlations(entries),
        weather_impact: weather_impact(entries),
    }
}

/// Assemble the monthly report for `GET /stats/monthly/:year/:month`.
/// The weekly trend window ends at `reference` (today, for the live route).
pub fn monthly_report(
    entries: &[Entry],
    year: i32,
    month: u32,
    reference: NaiveDate,
) -> MonthlyReport {
    let month_entries = month_filter(entries, year, month);
    MonthlyReport {
        monthly_completion: monthly_completion(&month_entries),
        longest_streak: longest_streak(&month_entries),
        perfect_days: perfect_days_count(&month_entries),
        most_consistent: most_consistent_habit(&month_entries),
        weekly_trend: weekly_trend(&month_entries, reference),
        best_time_of_day: best_time_of_day(&month_entries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyStats, EntryMetadata};
    use chrono::TimeZone;
    use serde_json::{json, Map};

    fn scheduled(name: &str) -> ScheduledHabit {
        ScheduledHabit {
            id: None,
            name: name.to_string(),
            extra: Map::new(),
        }
    }

    fn completed(name: &str, streak: u32) -> CompletedHabit {
        CompletedHabit {
            id: None,
            name: name.to_string(),
            completed_at: None,
            streak,
            extra: Map::new(),
        }
    }

    /// Completion stamped at the given local hour, so bucketing is
    /// deterministic regardless of the host timezone
    fn completed_at_hour(name: &str, hour: u32) -> CompletedHabit {
        let ts = Local
            .with_ymd_and_hms(2026, 3, 2, hour, 30, 0)
            .single()
            .expect("valid local time");
        CompletedHabit {
            completed_at: Some(ts.fixed_offset()),
            ..completed(name, 0)
        }
    }

    fn entry(date: &str, sched: Vec<ScheduledHabit>, done: Vec<CompletedHabit>) -> Entry {
        Entry {
            date: date.to_string(),
            scheduled_habits: sched,
            completed_habits: done,
            stats: DailyStats::default(),
            metadata: EntryMetadata::default(),
            extra: Map::new(),
        }
    }

    #[test]
    fn completion_rate_is_zero_for_empty_schedule() {
        let stats = compute_daily_stats(&[], &[], &AdditionalData::default());
        assert_eq!(stats.completion_rate, 0.0);
        assert!(!stats.completion_rate.is_nan());
    }

    #[test]
    fn completion_rate_is_a_percentage() {
        let sched = vec![scheduled("a"), scheduled("b"), scheduled("c"), scheduled("d")];
        let done = vec![completed("a", 0)];
        let stats = compute_daily_stats(&sched, &done, &AdditionalData::default());
        assert_eq!(stats.completion_rate, 25.0);
        assert!((0.0..=100.0).contains(&stats.completion_rate));
    }

    #[test]
    fn completions_bucket_by_local_hour() {
        let sched = vec![scheduled("a"), scheduled("b"), scheduled("c"), scheduled("d")];
        let done = vec![
            completed_at_hour("a", 7),
            completed_at_hour("b", 11),
            completed_at_hour("c", 14),
            completed_at_hour("d", 21),
        ];
        let stats = compute_daily_stats(&sched, &done, &AdditionalData::default());
        assert_eq!(stats.morning, 2);
        assert_eq!(stats.afternoon, 1);
        assert_eq!(stats.evening, 1);
    }

    #[test]
    fn untimestamped_completions_count_toward_rate_but_not_buckets() {
        let sched = vec![scheduled("a"), scheduled("b")];
        let done = vec![completed("a", 0), completed("b", 0)];
        let stats = compute_daily_stats(&sched, &done, &AdditionalData::default());
        assert_eq!(stats.completion_rate, 100.0);
        assert_eq!(stats.morning + stats.afternoon + stats.evening, 0);
    }

    #[test]
    fn daily_streak_is_max_of_completions() {
        let sched = vec![scheduled("a"), scheduled("b")];
        let done = vec![completed("a", 3), completed("b", 9)];
        let stats = compute_daily_stats(&sched, &done, &AdditionalData::default());
        assert_eq!(stats.streak, 9);

        let stats = compute_daily_stats(&sched, &[], &AdditionalData::default());
        assert_eq!(stats.streak, 0);
    }

    #[test]
    fn additional_data_passes_through() {
        let extra = AdditionalData {
            minutes_spent: Some(45),
            mood: Some(json!("great")),
            energy: Some(json!(7)),
            weather: Some(json!("sunny")),
            notes: None,
        };
        let stats = compute_daily_stats(&[scheduled("a")], &[], &extra);
        assert_eq!(stats.total_minutes_spent, 45);
        assert_eq!(stats.mood, Some(json!("great")));
        assert_eq!(stats.energy, Some(json!(7)));
        assert_eq!(stats.weather, Some(json!("sunny")));
    }

    #[test]
    fn longest_streak_of_nothing_is_zero() {
        assert_eq!(longest_streak(&[]), 0);
        assert_eq!(longest_streak(&[entry("2026-03-02", vec![scheduled("a")], vec![])]), 0);
    }

    #[test]
    fn longest_streak_spans_entries() {
        let entries = vec![
            entry(
                "2026-03-01",
                vec![],
                vec![completed("a", 3), completed("b", 7)],
            ),
            entry("2026-03-02", vec![], vec![completed("a", 5)]),
        ];
        assert_eq!(longest_streak(&entries), 7);
    }

    #[test]
    fn perfect_days_require_a_nonempty_exact_match() {
        let entries = vec![
            // counts: two scheduled, two completed
            entry(
                "2026-03-01",
                vec![scheduled("a"), scheduled("b")],
                vec![completed("a", 0), completed("b", 0)],
            ),
            // empty day does not count
            entry("2026-03-02", vec![], vec![]),
            // partial day does not count
            entry("2026-03-03", vec![scheduled("a")], vec![]),
        ];
        assert_eq!(perfect_days_count(&entries), 1);
    }

    #[test]
    fn weekly_trend_always_has_seven_points_ending_at_reference() {
        let reference = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let trend = weekly_trend(&[], reference);

        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, "2026-03-02");
        assert_eq!(trend[6].date, "2026-03-08");
        assert!(trend.iter().all(|p| p.percentage == 0.0));
    }

    #[test]
    fn weekly_trend_matches_entries_by_calendar_date() {
        let reference = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let entries = vec![
            entry(
                "2026-03-05",
                vec![scheduled("a"), scheduled("b")],
                vec![completed("a", 0)],
            ),
            // outside the window
            entry(
                "2026-02-27",
                vec![scheduled("a")],
                vec![completed("a", 0)],
            ),
        ];

        let trend = weekly_trend(&entries, reference);
        assert_eq!(trend[3].date, "2026-03-05");
        assert_eq!(trend[3].percentage, 50.0);
        assert!(trend.iter().filter(|p| p.percentage > 0.0).count() == 1);
    }

    #[test]
    fn most_consistent_prefers_first_on_ties() {
        let entries = vec![
            entry(
                "2026-03-01",
                vec![scheduled("lesing"), scheduled("trening")],
                vec![completed("lesing", 0), completed("trening", 0)],
            ),
        ];
        // both at 100%; "lesing" was scheduled first
        let best = most_consistent_habit(&entries).unwrap();
        assert_eq!(best.name, "lesing");
        assert_eq!(best.percentage, 100.0);
    }

    #[test]
    fn most_consistent_ranks_by_percentage() {
        let entries = vec![
            entry(
                "2026-03-01",
                vec![scheduled("lesing"), scheduled("trening")],
                vec![completed("trening", 0)],
            ),
            entry(
                "2026-03-02",
                vec![scheduled("lesing"), scheduled("trening")],
                vec![completed("trening", 0)],
            ),
        ];
        let best = most_consistent_habit(&entries).unwrap();
        assert_eq!(best.name, "trening");
        assert_eq!(best.percentage, 100.0);
    }

    #[test]
    fn most_consistent_of_nothing_is_none() {
        assert!(most_consistent_habit(&[]).is_none());
    }

    #[test]
    fn month_filter_selects_by_year_and_month() {
        let entries = vec![
            entry("2026-03-01", vec![], vec![]),
            entry("2026-03-31", vec![], vec![]),
            entry("2026-04-01", vec![], vec![]),
            entry("2025-03-15", vec![], vec![]),
            entry("not-a-date", vec![], vec![]),
        ];
        let march = month_filter(&entries, 2026, 3);
        assert_eq!(march.len(), 2);
        assert!(march.iter().all(|e| e.date.starts_with("2026-03")));
    }

    #[test]
    fn monthly_completion_aggregates_counts() {
        let entries = vec![
            entry(
                "2026-03-01",
                vec![scheduled("a"), scheduled("b")],
                vec![completed("a", 0)],
            ),
            entry(
                "2026-03-02",
                vec![scheduled("a"), scheduled("b")],
                vec![completed("a", 0), completed("b", 0)],
            ),
        ];
        assert_eq!(monthly_completion(&entries), 75.0);
        assert_eq!(monthly_completion(&[]), 0.0);
    }

    #[test]
    fn best_days_groups_by_weekday_and_sorts_descending() {
        let entries = vec![
            // 2026-03-02 is a Monday
            entry(
                "2026-03-02",
                vec![scheduled("a"), scheduled("b")],
                vec![completed("a", 0)],
            ),
            // the following Monday: 1/1
            entry("2026-03-09", vec![scheduled("a")], vec![completed("a", 0)]),
            // Tuesday: 0/1
            entry("2026-03-03", vec![scheduled("a")], vec![]),
        ];

        let days = best_days_of_week(&entries);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, "Monday");
        // Monday: 2 completed of 3 scheduled across both entries
        assert!((days[0].completion_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(days[1].day, "Tuesday");
        assert_eq!(days[1].completion_rate, 0.0);
    }

    #[test]
    fn best_days_emits_zero_when_weekday_has_no_scheduled() {
        let entries = vec![entry("2026-03-02", vec![], vec![])];
        let days = best_days_of_week(&entries);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].completion_rate, 0.0);
        assert!(!days[0].completion_rate.is_nan());
    }

    #[test]
    fn best_time_sums_stored_buckets() {
        let mut first = entry("2026-03-01", vec![], vec![]);
        first.stats.morning = 2;
        first.stats.evening = 1;
        let mut second = entry("2026-03-02", vec![], vec![]);
        second.stats.evening = 4;

        let slots = best_time_of_day(&[first, second]);
        assert_eq!(slots[0], TimeSlot { time: "evening", count: 5 });
        assert_eq!(slots[1], TimeSlot { time: "morning", count: 2 });
        assert_eq!(slots[2], TimeSlot { time: "afternoon", count: 0 });
    }

    #[test]
    fn weather_impact_averages_rates_per_group() {
        let mut sunny_full = entry(
            "2026-03-01",
            vec![scheduled("a")],
            vec![completed("a", 0)],
        );
        sunny_full.metadata.weather = Some(json!("sunny"));
        let mut sunny_half = entry(
            "2026-03-02",
            vec![scheduled("a"), scheduled("b")],
            vec![completed("a", 0)],
        );
        sunny_half.metadata.weather = Some(json!("sunny"));
        let mut rainy = entry("2026-03-03", vec![scheduled("a")], vec![]);
        rainy.metadata.weather = Some(json!("rain"));
        // no weather recorded: skipped entirely
        let unknown = entry("2026-03-04", vec![scheduled("a")], vec![]);

        let impact = weather_impact(&[sunny_full, sunny_half, rainy, unknown]);
        assert_eq!(impact.len(), 2);
        assert_eq!(impact["sunny"], 75.0);
        assert_eq!(impact["rain"], 0.0);
    }

    #[test]
    fn completion_trends_group_by_month() {
        let entries = vec![
            entry("2026-02-10", vec![scheduled("a")], vec![completed("a", 0)]),
            entry("2026-03-01", vec![scheduled("a")], vec![]),
            entry("2026-03-02", vec![scheduled("a")], vec![completed("a", 0)]),
        ];
        let trends = completion_trends(&entries);
        assert_eq!(trends["2026-02"], 100.0);
        assert_eq!(trends["2026-03"], 50.0);
    }

    #[test]
    fn monthly_report_runs_on_the_filtered_set() {
        let reference = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let entries = vec![
            entry(
                "2026-03-05",
                vec![scheduled("a")],
                vec![completed("a", 4)],
            ),
            // different month, must not leak into the report
            entry(
                "2026-04-05",
                vec![scheduled("a")],
                vec![completed("a", 11)],
            ),
        ];

        let report = monthly_report(&entries, 2026, 3, reference);
        assert_eq!(report.monthly_completion, 100.0);
        assert_eq!(report.longest_streak, 4);
        assert_eq!(report.perfect_days, 1);
        assert_eq!(report.weekly_trend.len(), 7);
        assert_eq!(report.most_consistent.unwrap().name, "a");
    }
}
