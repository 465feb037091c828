//! Save sinks and snapshot loading.
//!
//! The engine itself never persists anything; on save it hands the
//! serialized workout to a [`WorkoutSink`]. The file sink writes atomically
//! with locking so a concurrent reader never sees a half-written workout.

use crate::{Error, Result, SerializedWorkout, WorkoutSnapshot};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Receiver of the serialized workout on save
pub trait WorkoutSink {
    fn save(&mut self, workout: &SerializedWorkout) -> Result<()>;
}

/// On-disk envelope written by [`JsonFileSink`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedWorkout {
    pub saved_at: DateTime<Utc>,
    pub workout: SerializedWorkout,
}

/// Keeps every save in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub saved: Vec<SerializedWorkout>,
}

impl WorkoutSink for MemorySink {
    fn save(&mut self, workout: &SerializedWorkout) -> Result<()> {
        self.saved.push(workout.clone());
        Ok(())
    }
}

/// Writes the latest save to a JSON file, replacing the previous one
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkoutSink for JsonFileSink {
    /// Atomically writes the envelope by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn save(&mut self, workout: &SerializedWorkout) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let envelope = SavedWorkout {
            saved_at: Utc::now(),
            workout: workout.clone(),
        };

        let temp = NamedTempFile::new_in(&parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(&envelope)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved workout to {:?}", self.path);
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Saved(SavedWorkout),
    Serialized(SerializedWorkout),
    Bare(WorkoutSnapshot),
}

/// Load the persisted workout a session starts from.
///
/// Accepts a bare snapshot, a bare [`SerializedWorkout`] or a
/// [`SavedWorkout`] envelope. A missing file is an empty workout; an
/// unreadable one, or an object with fields none of these know, is an error.
pub fn load_snapshot(path: &Path) -> Result<WorkoutSnapshot> {
    if !path.exists() {
        tracing::info!("No workout file at {:?}, starting empty", path);
        return Ok(WorkoutSnapshot::default());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    let snapshot = match serde_json::from_str::<SnapshotFile>(&contents) {
        Ok(SnapshotFile::Saved(saved)) => {
            tracing::debug!("Loaded workout saved at {}", saved.saved_at);
            saved.workout.into_snapshot()
        }
        Ok(SnapshotFile::Serialized(workout)) => workout.into_snapshot(),
        Ok(SnapshotFile::Bare(snapshot)) => snapshot,
        Err(e) => {
            return Err(Error::Input(format!(
                "Failed to parse workout {:?}: {}",
                path, e
            )))
        }
    };

    tracing::debug!(
        "Loaded {} flat entries and {} groups from {:?}",
        snapshot.ordered_ids.len(),
        snapshot.groups.len(),
        path
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExerciseGroup, GroupKind, ItemId, SetGroup};

    fn workout() -> SerializedWorkout {
        let mut workout = SerializedWorkout {
            flat_order: vec!["sq".into(), "sq".into(), "bp".into()],
            groups: vec![ExerciseGroup {
                id: "g1".into(),
                kind: GroupKind::Superset,
                number: 1,
                member_indices: vec![0, 1, 2],
            }],
            special_ids: vec!["bp".into()],
            ..Default::default()
        };
        workout
            .item_order_indices
            .insert(ItemId::from("a"), vec![0, 1]);
        workout
            .item_order_indices
            .insert(ItemId::from("b"), vec![2]);
        workout
            .item_set_groups
            .insert(ItemId::from("a"), vec![SetGroup::new(2, false)]);
        workout
            .item_set_groups
            .insert(ItemId::from("b"), vec![SetGroup::new(1, true)]);
        workout
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("workout.json");

        let mut sink = JsonFileSink::new(&path);
        sink.save(&workout()).unwrap();

        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.ordered_ids, vec!["sq", "sq", "bp"]);
        assert_eq!(snapshot.groups.len(), 1);
        assert_eq!(snapshot.item_set_groups.len(), 2);
        assert_eq!(snapshot.grouped_summaries.len(), 2);
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("workout.json");

        let mut sink = JsonFileSink::new(&path);
        sink.save(&workout()).unwrap();
        sink.save(&workout()).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "workout.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only workout.json, found extras: {:?}",
            extras
        );
    }

    #[test]
    fn test_load_bare_snapshot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("legacy.json");
        std::fs::write(
            &path,
            r#"{
                "ordered_ids": ["sq", "sq", "bp"],
                "groups": [
                    { "id": "g1", "kind": "superset", "number": 1, "member_indices": [0, 1] }
                ]
            }"#,
        )
        .unwrap();

        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.ordered_ids.len(), 3);
        assert_eq!(snapshot.groups[0].member_indices, vec![0, 1]);
        assert!(snapshot.item_order_indices.is_empty());
    }

    #[test]
    fn test_load_missing_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let snapshot = load_snapshot(&temp_dir.path().join("nope.json")).unwrap();
        assert_eq!(snapshot, WorkoutSnapshot::default());
    }

    #[test]
    fn test_load_corrupted_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(load_snapshot(&path), Err(Error::Input(_))));
    }

    #[test]
    fn test_load_bare_serialized_workout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("serialized.json");
        std::fs::write(&path, serde_json::to_string(&workout()).unwrap()).unwrap();

        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.ordered_ids, vec!["sq", "sq", "bp"]);
        assert_eq!(snapshot.item_order_indices.len(), 2);

        let catalog = crate::ExerciseCatalog::from_exercises(["sq", "bp"].iter().map(|id| {
            crate::ExerciseRef {
                id: id.to_string(),
                name: id.to_string(),
                category: None,
            }
        }));
        assert_eq!(crate::reconstruct(&snapshot, &catalog).items().count(), 2);
    }

    #[test]
    fn test_load_unknown_shape_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("other.json");
        std::fs::write(&path, r#"{ "flat_order": ["sq"], "sessions": [] }"#).unwrap();

        assert!(matches!(load_snapshot(&path), Err(Error::Input(_))));
    }

    #[test]
    fn test_memory_sink_collects() {
        let mut sink = MemorySink::default();
        sink.save(&workout()).unwrap();
        sink.save(&SerializedWorkout::default()).unwrap();
        assert_eq!(sink.saved.len(), 2);
    }
}
