// Data model - typed core schema for the two stored collections
//
// The wire format is camelCase JSON, matching what the frontend already
// stores on disk. Clients historically attached arbitrary extra fields to
// habits and entries (schedule descriptions, colors, icons), so every
// record type carries a flattened extension map: unrecognized keys survive
// a load/save round-trip instead of being dropped.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A recurring task definition with its completion statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Server-assigned, unique, monotonically increasing
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub stats: HabitStats,
    /// Free-form fields the client sent that we don't model (schedule,
    /// color, icon, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-habit lifetime statistics, seeded at creation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    #[serde(default)]
    pub total_completed: u32,
    /// Serialized as null until the habit is first completed
    pub last_completed_date: Option<String>,
    #[serde(default)]
    pub streak: u32,
    /// Clients may track extra counters here; keep them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One calendar day's record of scheduled vs completed habits.
///
/// `date` is the collection key (YYYY-MM-DD); at most one entry per date,
/// enforced on create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub date: String,
    #[serde(default)]
    pub scheduled_habits: Vec<ScheduledHabit>,
    #[serde(default)]
    pub completed_habits: Vec<CompletedHabit>,
    /// Computed once at creation, never recomputed on update
    #[serde(default)]
    pub stats: DailyStats,
    #[serde(default)]
    pub metadata: EntryMetadata,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A habit reference inside an entry's schedule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledHabit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A completion record: which habit, when, and the streak it extended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedHabit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    /// RFC 3339 timestamp; hour-of-day bucketing converts to local time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub streak: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Derived per-day statistics, embedded in the entry at creation time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStats {
    /// 0-100, exactly 0 when nothing was scheduled
    pub completion_rate: f64,
    /// Completions before 12:00 local time
    pub morning: u32,
    /// Completions between 12:00 and 18:00 local time
    pub afternoon: u32,
    /// Completions from 18:00 local time onward
    pub evening: u32,
    pub total_minutes_spent: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<Value>,
    /// Max streak among the day's completions
    pub streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Value>,
}

/// Contextual metadata recorded alongside an entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Value>,
}

/// Optional context sent with POST /entries (`additionalData`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdditionalData {
    pub minutes_spent: Option<u32>,
    pub mood: Option<Value>,
    pub energy: Option<Value>,
    pub weather: Option<Value>,
    pub notes: Option<Value>,
}
