//! Habit collection handlers
//!
//! Habits are free-form records: the typed fields are what the server
//! manages (id, completion flags, stats) and everything else the client
//! sends rides along in the extension map. Updates are a shallow merge of
//! the request body over the stored record, with `stats` merged one level
//! deep so a client can bump `streak` without wiping `totalCompleted`.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{Map, Value};

use super::auth::require_api_key;
use super::error::ApiError;
use super::state::AppState;
use crate::models::{Habit, HabitStats};

/// GET /habits - list all habits. Intentionally unauthenticated.
pub async fn get_habits(State(state): State<AppState>) -> Result<Json<Vec<Habit>>, ApiError> {
    let habits = state.store.load_habits()?;
    Ok(Json(habits))
}

/// POST /habits - create a habit with a server-assigned id
pub async fn create_habit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Habit>), ApiError> {
    require_api_key(&headers, &state.config)?;

    let mut habits = state.store.load_habits()?;

    // Ids are monotonic and gap-tolerant: always one past the current max,
    // never reusing a deleted id
    let next_id = habits.iter().map(|h| h.id).max().unwrap_or(0) + 1;
    let habit = build_habit(next_id, body)?;

    habits.push(habit.clone());
    state.store.save_habits(&habits)?;

    tracing::info!("Created habit {} ({})", habit.id, habit.name);
    Ok((StatusCode::CREATED, Json(habit)))
}

/// PUT /habits/:id - shallow-merge the body over the stored habit
pub async fn update_habit(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Habit>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let Value::Object(patch) = body else {
        return Err(ApiError::Validation(
            "Request body must be a JSON object".to_string(),
        ));
    };

    let mut habits = state.store.load_habits()?;
    let pos = habits
        .iter()
        .position(|h| h.id == id)
        .ok_or_else(|| ApiError::NotFound("Habit not found".to_string()))?;

    let updated = merge_habit(&habits[pos], patch)?;
    habits[pos] = updated.clone();
    state.store.save_habits(&habits)?;

    Ok(Json(updated))
}

/// DELETE /habits/:id - remove and return the habit
pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Result<Json<Habit>, ApiError> {
    require_api_key(&headers, &state.config)?;

    let mut habits = state.store.load_habits()?;
    let pos = habits
        .iter()
        .position(|h| h.id == id)
        .ok_or_else(|| ApiError::NotFound("Habit not found".to_string()))?;

    let removed = habits.remove(pos);
    state.store.save_habits(&habits)?;

    tracing::info!("Deleted habit {} ({})", removed.id, removed.name);
    Ok(Json(removed))
}

/// Build a new habit from a request body: server-assigned id, completion
/// flags reset, default stats seeded under any client-provided stats fields
fn build_habit(id: u64, body: Value) -> Result<Habit, ApiError> {
    let Value::Object(mut body) = body else {
        return Err(ApiError::Validation(
            "Request body must be a JSON object".to_string(),
        ));
    };

    body.insert("id".to_string(), Value::from(id));
    body.insert("completed".to_string(), Value::from(false));
    body.insert("done".to_string(), Value::from(false));

    // Seed defaults, then let client-provided stats fields win (one level)
    let mut stats = to_object(serde_json::to_value(HabitStats::default()))?;
    if let Some(Value::Object(given)) = body.remove("stats") {
        for (key, value) in given {
            stats.insert(key, value);
        }
    }
    body.insert("stats".to_string(), Value::Object(stats));

    serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::Validation(format!("Invalid habit: {}", e)))
}

/// Shallow-merge a patch over an existing habit. `id` is immutable and
/// `stats` merges one level deep; everything else is replaced wholesale.
fn merge_habit(existing: &Habit, mut patch: Map<String, Value>) -> Result<Habit, ApiError> {
    let mut merged = to_object(serde_json::to_value(existing))?;

    // id is immutable; drop whatever the client sent
    patch.remove("id");

    if let Some(patch_stats) = patch.remove("stats") {
        let combined = match (merged.get("stats"), patch_stats) {
            (Some(Value::Object(current)), Value::Object(given)) => {
                let mut stats = current.clone();
                stats.extend(given);
                Value::Object(stats)
            }
            // Either side not an object: replace wholesale and let
            // deserialization validate
            (_, other) => other,
        };
        merged.insert("stats".to_string(), combined);
    }

    for (key, value) in patch {
        merged.insert(key, value);
    }

    serde_json::from_value(Value::Object(merged))
        .map_err(|e| ApiError::Validation(format!("Invalid habit: {}", e)))
}

fn to_object(value: serde_json::Result<Value>) -> Result<Map<String, Value>, ApiError> {
    match value {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::Validation(
            "Habit did not serialize to an object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use tempfile::TempDir;

    const KEY: &str = "test-key";

    fn test_state() -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            api_key: Some(KEY.to_string()),
            ..Config::default()
        };
        (AppState::new(config), dir)
    }

    fn auth_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", KEY.parse().unwrap());
        headers
    }

    async fn create(state: &AppState, body: Value) -> Habit {
        let response = create_habit(State(state.clone()), auth_headers(), Json(body))
            .await
            .expect("create should succeed");
        let (_, Json(habit)) = response;
        habit
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_gap_tolerant() {
        let (state, _dir) = test_state();

        for name in ["Lesing", "Trening", "Meditasjon"] {
            create(&state, json!({ "name": name })).await;
        }

        // Delete id 2, then create again: next id is 4, not a reused 2
        delete_habit(State(state.clone()), Path(2), auth_headers())
            .await
            .unwrap();
        let habit = create(&state, json!({ "name": "Journal" })).await;
        assert_eq!(habit.id, 4);
    }

    #[tokio::test]
    async fn create_seeds_flags_and_stats() {
        let (state, _dir) = test_state();

        let habit = create(
            &state,
            json!({
                "name": "Lesing",
                "completed": true,
                "stats": { "streak": 5 },
                "color": "#aabbcc"
            }),
        )
        .await;

        // Server owns the completion flags
        assert!(!habit.completed);
        assert!(!habit.done);
        // Client stats merge over the seeded defaults
        assert_eq!(habit.stats.streak, 5);
        assert_eq!(habit.stats.total_completed, 0);
        assert_eq!(habit.stats.last_completed_date, None);
        // Unrecognized fields survive
        assert_eq!(habit.extra["color"], json!("#aabbcc"));
    }

    #[tokio::test]
    async fn create_without_name_is_rejected() {
        let (state, _dir) = test_state();
        let result = create_habit(State(state), auth_headers(), Json(json!({ "done": true }))).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn update_merges_shallow_with_nested_stats() {
        let (state, _dir) = test_state();
        create(&state, json!({ "name": "Lesing", "color": "red" })).await;

        let Json(updated) = update_habit(
            State(state.clone()),
            Path(1),
            auth_headers(),
            Json(json!({
                "id": 99,
                "name": "Kveldslesing",
                "stats": { "streak": 3 }
            })),
        )
        .await
        .unwrap();

        // id is immutable, name replaced, untouched fields kept
        assert_eq!(updated.id, 1);
        assert_eq!(updated.name, "Kveldslesing");
        assert_eq!(updated.extra["color"], json!("red"));
        assert_eq!(updated.stats.streak, 3);
        assert_eq!(updated.stats.total_completed, 0);

        // And the merge was persisted
        let stored = state.store.load_habits().unwrap();
        assert_eq!(stored[0], updated);
    }

    #[tokio::test]
    async fn update_and_delete_missing_habit_is_404() {
        let (state, _dir) = test_state();

        let update = update_habit(
            State(state.clone()),
            Path(7),
            auth_headers(),
            Json(json!({ "name": "x" })),
        )
        .await;
        assert!(matches!(update, Err(ApiError::NotFound(_))));

        let delete = delete_habit(State(state), Path(7), auth_headers()).await;
        assert!(matches!(delete, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_returns_the_removed_habit() {
        let (state, _dir) = test_state();
        create(&state, json!({ "name": "Lesing" })).await;

        let Json(removed) = delete_habit(State(state.clone()), Path(1), auth_headers())
            .await
            .unwrap();
        assert_eq!(removed.name, "Lesing");
        assert!(state.store.load_habits().unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_needs_no_key_but_mutations_do() {
        let (state, _dir) = test_state();

        // No key on the listing: fine
        assert!(get_habits(State(state.clone())).await.is_ok());

        // No key on create: 401
        let result = create_habit(
            State(state),
            HeaderMap::new(),
            Json(json!({ "name": "Lesing" })),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }
}
