//! Entry collection handlers
//!
//! One entry per calendar day, keyed by its YYYY-MM-DD date string. The
//! daily statistics embedded in each entry are computed exactly once, at
//! creation - replacing or patching an entry later does not recompute them.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::auth::require_api_key;
use super::error::ApiError;
use super::state::AppState;
use crate::models::{AdditionalData, CompletedHabit, Entry, EntryMetadata, ScheduledHabit};
use crate::stats;

/// POST /entries request body. Everything is optional at the serde level so
/// that missing fields produce our 400s, not a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct NewEntry {
    date: Option<String>,
    scheduled_habits: Option<Vec<ScheduledHabit>>,
    completed_habits: Option<Vec<CompletedHabit>>,
    additional_data: Option<AdditionalData>,
}

/// GET /entries - the full entry log
pub async fn get_entries(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Entry>>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let entries = state.store.load_entries()?;
    Ok(Json(entries))
}

/// GET /entries/month/:year/:month - entries for one calendar month
pub async fn get_entries_by_month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
    headers: HeaderMap,
) -> Result<Json<Vec<Entry>>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let entries = state.store.load_entries()?;
    Ok(Json(stats::month_filter(&entries, year, month)))
}

/// GET /entries/:date
pub async fn get_entry(
    State(state): State<AppState>,
    Path(date): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Entry>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let entries = state.store.load_entries()?;
    entries
        .into_iter()
        .find(|e| e.date == date)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Entry not found".to_string()))
}

/// POST /entries - record a day. Rejects duplicates of an existing date and
/// computes the embedded daily stats.
pub async fn create_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Entry>), ApiError> {
    require_api_key(&headers, &state.config)?;

    let body: NewEntry = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("Invalid entry: {}", e)))?;

    let (Some(date), Some(scheduled)) = (body.date, body.scheduled_habits) else {
        return Err(ApiError::Validation(
            "Date and scheduledHabits are required".to_string(),
        ));
    };
    if stats::parse_date(&date).is_none() {
        return Err(ApiError::Validation(
            "Date must be formatted YYYY-MM-DD".to_string(),
        ));
    }

    let mut entries = state.store.load_entries()?;
    if entries.iter().any(|e| e.date == date) {
        return Err(ApiError::Validation(
            "Entry for this date already exists".to_string(),
        ));
    }

    let completed = body.completed_habits.unwrap_or_default();
    let extra = body.additional_data.unwrap_or_default();
    let daily_stats = stats::compute_daily_stats(&scheduled, &completed, &extra);

    let entry = Entry {
        date,
        scheduled_habits: scheduled,
        completed_habits: completed,
        stats: daily_stats,
        metadata: EntryMetadata {
            weather: extra.weather,
            mood: extra.mood,
            notes: extra.notes,
        },
        extra: Map::new(),
    };

    entries.push(entry.clone());
    state.store.save_entries(&entries)?;

    tracing::info!("Created entry for {}", entry.date);
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /entries/:date - full replace, inserting if the date is new.
/// The path date is the collection key and wins over any date in the body.
pub async fn replace_entry(
    State(state): State<AppState>,
    Path(date): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Entry>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let Value::Object(mut body) = body else {
        return Err(ApiError::Validation(
            "Request body must be a JSON object".to_string(),
        ));
    };
    body.insert("date".to_string(), Value::from(date.clone()));

    let entry: Entry = serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::Validation(format!("Invalid entry: {}", e)))?;

    let mut entries = state.store.load_entries()?;
    match entries.iter().position(|e| e.date == date) {
        Some(pos) => entries[pos] = entry.clone(),
        None => entries.push(entry.clone()),
    }
    state.store.save_entries(&entries)?;

    Ok(Json(entry))
}

/// PATCH /entries/:date - merge a habit list into the day's schedule by
/// habit id: update matching ids, append the rest. Creates the entry when
/// the date is new. This is the legacy bulk-edit path the frontend's
/// planning view uses.
pub async fn patch_entry_habits(
    State(state): State<AppState>,
    Path(date): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Entry>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let new_habits: Vec<ScheduledHabit> = body
        .get("habits")
        .cloned()
        .and_then(|habits| serde_json::from_value(habits).ok())
        .ok_or_else(|| ApiError::Validation("Habits must be an array".to_string()))?;

    let mut entries = state.store.load_entries()?;
    let updated = match entries.iter_mut().find(|e| e.date == date) {
        Some(entry) => {
            for habit in new_habits {
                match entry
                    .scheduled_habits
                    .iter_mut()
                    .find(|existing| existing.id == habit.id)
                {
                    Some(existing) => *existing = habit,
                    None => entry.scheduled_habits.push(habit),
                }
            }
            entry.clone()
        }
        None => {
            let daily_stats =
                stats::compute_daily_stats(&new_habits, &[], &AdditionalData::default());
            let entry = Entry {
                date: date.clone(),
                scheduled_habits: new_habits,
                completed_habits: Vec::new(),
                stats: daily_stats,
                metadata: EntryMetadata::default(),
                extra: Map::new(),
            };
            entries.push(entry.clone());
            entry
        }
    };
    state.store.save_entries(&entries)?;

    Ok(Json(updated))
}

/// DELETE /entries/:date - remove and return the entry
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(date): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Entry>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let mut entries = state.store.load_entries()?;
    let pos = entries
        .iter()
        .position(|e| e.date == date)
        .ok_or_else(|| ApiError::NotFound("Entry not found".to_string()))?;

    let removed = entries.remove(pos);
    state.store.save_entries(&entries)?;

    tracing::info!("Deleted entry for {}", removed.date);
    Ok(Json(removed))
}
