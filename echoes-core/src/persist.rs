//! Save, load and script import.
//!
//! Saves are the `AppState` JSON as is, with no version field. Scripts are a
//! JSON array of segments forming a graph through `nextSceneId`.

use crate::state::AppState;
use crate::storage::{Storage, StorageError};
use crate::story::StorySegment;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Storage key of the single autosave slot.
pub const AUTOSAVE_KEY: &str = "echoes_autosave_v1";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Not a JSON file: {0}")]
    NotJsonFile(PathBuf),

    #[error("Invalid save format: {0}")]
    InvalidSave(String),

    #[error("Invalid script format: {0}")]
    InvalidScript(String),

    #[error("Cannot export while a request is running or an error is shown")]
    ExportBlocked,
}

/// Write the autosave if the state is in a savable moment.
///
/// Returns whether anything was written.
pub async fn autosave(storage: &dyn Storage, state: &AppState) -> Result<bool, PersistError> {
    if !state.is_autosavable() {
        return Ok(false);
    }
    let json = serde_json::to_string(state)?;
    storage.set(AUTOSAVE_KEY, &json).await?;
    Ok(true)
}

/// Read the autosave, if one exists.
pub async fn load_autosave(storage: &dyn Storage) -> Result<Option<AppState>, PersistError> {
    match storage.get(AUTOSAVE_KEY).await? {
        Some(json) => Ok(Some(parse_save(&json)?)),
        None => Ok(None),
    }
}

pub async fn has_autosave(storage: &dyn Storage) -> bool {
    matches!(storage.get(AUTOSAVE_KEY).await, Ok(Some(_)))
}

pub async fn clear_autosave(storage: &dyn Storage) -> Result<(), PersistError> {
    storage.remove(AUTOSAVE_KEY).await?;
    Ok(())
}

/// File name for an export made at `at`.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("echoes_save_{}.json", at.format("%Y-%m-%dT%H-%M-%S"))
}

/// Write the full state as pretty JSON into `dir`, returning the file path.
pub async fn export_save(state: &AppState, dir: impl AsRef<Path>) -> Result<PathBuf, PersistError> {
    if state.is_loading || state.error.is_some() {
        return Err(PersistError::ExportBlocked);
    }
    let dir = dir.as_ref();
    fs::create_dir_all(dir).await?;

    let path = dir.join(export_file_name(Utc::now()));
    let content = serde_json::to_string_pretty(state)?;
    fs::write(&path, content).await?;
    Ok(path)
}

/// Parse a save. Requires `history` and `status`; clears loading and error.
pub fn parse_save(json: &str) -> Result<AppState, PersistError> {
    let value: Value = serde_json::from_str(json)?;
    let obj = value
        .as_object()
        .ok_or_else(|| PersistError::InvalidSave("expected a JSON object".to_string()))?;
    for field in ["history", "status"] {
        if obj.get(field).map_or(true, Value::is_null) {
            return Err(PersistError::InvalidSave(format!("missing {field:?}")));
        }
    }

    let state: AppState = serde_json::from_value(value)?;
    Ok(AppState {
        is_loading: false,
        error: None,
        ..state
    })
}

/// Read and parse a save file.
pub async fn read_save_file(path: impl AsRef<Path>) -> Result<AppState, PersistError> {
    let path = path.as_ref();
    ensure_json_extension(path)?;
    let content = fs::read_to_string(path).await?;
    parse_save(&content)
}

/// An imported script: its entry node and every node by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptGraph {
    pub entry: StorySegment,
    pub nodes: BTreeMap<String, StorySegment>,
}

/// Parse a script array. Segments without an id get `auto_scene_<index>`.
pub fn parse_script(json: &str) -> Result<ScriptGraph, PersistError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| PersistError::InvalidScript(e.to_string()))?;
    let items = value
        .as_array()
        .ok_or_else(|| PersistError::InvalidScript("expected a JSON array".to_string()))?;
    if items.is_empty() {
        return Err(PersistError::InvalidScript("script is empty".to_string()));
    }

    let mut segments = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if item.get("lines").map_or(true, Value::is_null) {
            return Err(PersistError::InvalidScript(format!(
                "scene {index} has no \"lines\""
            )));
        }
        let mut segment: StorySegment = serde_json::from_value(item.clone())
            .map_err(|e| PersistError::InvalidScript(format!("scene {index}: {e}")))?;
        if segment.id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            segment.id = Some(format!("auto_scene_{index}"));
        }
        segments.push(segment);
    }

    let mut nodes = BTreeMap::new();
    for segment in &segments {
        let id = segment.id.clone().unwrap_or_default();
        if nodes.insert(id.clone(), segment.clone()).is_some() {
            tracing::warn!(scene = %id, "Duplicate scene id in script, later scene wins");
        }
    }

    let entry = segments.swap_remove(0);
    Ok(ScriptGraph { entry, nodes })
}

/// Read and parse a script file.
pub async fn read_script_file(path: impl AsRef<Path>) -> Result<ScriptGraph, PersistError> {
    let path = path.as_ref();
    ensure_json_extension(path)?;
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| PersistError::InvalidScript(format!("{}: {e}", path.display())))?;
    parse_script(&content)
}

fn ensure_json_extension(path: &Path) -> Result<(), PersistError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(())
    } else {
        Err(PersistError::NotJsonFile(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameStatus;
    use crate::storage::MemoryStorage;
    use crate::story::{Choice, DialogueLine, Protagonist};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn playing_state() -> AppState {
        let entry = StorySegment::new("hall")
            .with_id("a")
            .with_line(DialogueLine::new("旁白", "开场"))
            .with_choice(Choice::new("go", "继续"));
        AppState::new().begin(Protagonist::Female, entry, Vec::new(), BTreeMap::new())
    }

    #[test]
    fn test_export_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(export_file_name(at), "echoes_save_2024-03-09T07-05-01.json");
    }

    #[tokio::test]
    async fn test_autosave_skips_menu_and_loading() {
        let storage = MemoryStorage::new();
        assert!(!autosave(&storage, &AppState::new()).await.unwrap());
        assert!(!autosave(&storage, &playing_state().loading()).await.unwrap());
        assert!(!has_autosave(&storage).await);

        assert!(autosave(&storage, &playing_state()).await.unwrap());
        let loaded = load_autosave(&storage).await.unwrap().unwrap();
        assert_eq!(loaded.status, GameStatus::Playing);
        assert_eq!(loaded.history.len(), 1);

        clear_autosave(&storage).await.unwrap();
        assert!(load_autosave(&storage).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_export_blocked_by_error() {
        let temp = TempDir::new().unwrap();
        let state = playing_state().fail("网络连接中断，请重新选择。");
        assert!(matches!(
            export_save(&state, temp.path()).await,
            Err(PersistError::ExportBlocked)
        ));
    }

    #[tokio::test]
    async fn test_export_then_read() {
        let temp = TempDir::new().unwrap();
        let state = playing_state();
        let path = export_save(&state, temp.path().join("exports")).await.unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("echoes_save_"));

        let loaded = read_save_file(&path).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_parse_save_requires_fields() {
        assert!(matches!(
            parse_save(r#"{"status":"PLAYING"}"#),
            Err(PersistError::InvalidSave(_))
        ));
        assert!(matches!(
            parse_save(r#"{"history":[]}"#),
            Err(PersistError::InvalidSave(_))
        ));
        assert!(matches!(parse_save("[]"), Err(PersistError::InvalidSave(_))));
        assert!(matches!(parse_save("{oops"), Err(PersistError::Json(_))));
    }

    #[test]
    fn test_parse_save_clears_transient_flags() {
        let json = r#"{"status":"PLAYING","history":[],"isLoading":true,"error":"x",
            "customApiKey":"ignored"}"#;
        let state = parse_save(json).unwrap();
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_json_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("save.txt");
        tokio::fs::write(&path, "{}").await.unwrap();
        assert!(matches!(
            read_save_file(&path).await,
            Err(PersistError::NotJsonFile(_))
        ));
        assert!(matches!(
            read_script_file(&path).await,
            Err(PersistError::NotJsonFile(_))
        ));
    }

    #[test]
    fn test_parse_script_assigns_ids() {
        let json = r#"[
            {"id": "a", "visualDescription": "gate", "lines": [{"speaker": "旁白", "text": "一"}],
             "choices": [{"id": "c", "text": "进", "nextSceneId": "auto_scene_1"}]},
            {"lines": [{"speaker": "旁白", "text": "二"}], "choices": []}
        ]"#;
        let script = parse_script(json).unwrap();
        assert_eq!(script.entry.id.as_deref(), Some("a"));
        assert_eq!(script.nodes.len(), 2);
        assert!(script.nodes.contains_key("auto_scene_1"));
    }

    #[test]
    fn test_parse_script_rejections() {
        assert!(matches!(parse_script("[]"), Err(PersistError::InvalidScript(_))));
        assert!(matches!(parse_script("{}"), Err(PersistError::InvalidScript(_))));
        assert!(matches!(
            parse_script(r#"[{"id": "a", "choices": []}]"#),
            Err(PersistError::InvalidScript(_))
        ));
        assert!(matches!(parse_script("[{oops"), Err(PersistError::InvalidScript(_))));
        assert!(matches!(
            parse_script(r#"[{"id": "a", "lines": 7}]"#),
            Err(PersistError::InvalidScript(_))
        ));
    }

    #[test]
    fn test_parse_script_accepts_null_tags() {
        let script = parse_script(
            r#"[{"id": "a", "lines": [{"speaker": "x", "text": "y", "emotion": null}],
                "choices": [{"id": "c", "text": "go", "type": null}]}]"#,
        )
        .unwrap();
        assert_eq!(script.entry.lines[0].emotion, crate::story::Emotion::Neutral);
        assert_eq!(script.entry.choices[0].kind, crate::story::ChoiceKind::Continue);
    }
}
