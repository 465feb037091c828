//! Exercise catalog lookup.
//!
//! The catalog is owned by an external collaborator; the engine only reads
//! `id -> ExerciseRef` from it. A JSON loader is provided for the CLI.

use crate::{Error, ExerciseRef, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Read-only exercise lookup used during reconstruction
pub trait ExerciseLookup {
    fn lookup(&self, exercise_id: &str) -> Option<&ExerciseRef>;
}

impl ExerciseLookup for HashMap<String, ExerciseRef> {
    fn lookup(&self, exercise_id: &str) -> Option<&ExerciseRef> {
        self.get(exercise_id)
    }
}

/// The set of known exercises, keyed by id
#[derive(Clone, Debug, Default)]
pub struct ExerciseCatalog {
    exercises: HashMap<String, ExerciseRef>,
}

impl ExerciseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of exercises; later duplicates win
    pub fn from_exercises(exercises: impl IntoIterator<Item = ExerciseRef>) -> Self {
        let mut catalog = Self::new();
        for exercise in exercises {
            catalog.insert(exercise);
        }
        catalog
    }

    pub fn insert(&mut self, exercise: ExerciseRef) {
        self.exercises.insert(exercise.id.clone(), exercise);
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Load a catalog from a JSON array of exercises
    ///
    /// The file is validated before use; any problem is reported as a
    /// single `CatalogValidation` error listing every issue.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let exercises: Vec<ExerciseRef> = serde_json::from_str(&contents)?;

        let errors = validate_exercises(&exercises);
        if !errors.is_empty() {
            return Err(Error::CatalogValidation(errors.join("; ")));
        }

        tracing::info!("Loaded {} exercises from {:?}", exercises.len(), path);
        Ok(Self::from_exercises(exercises))
    }

    /// Validate catalog integrity
    ///
    /// Returns a list of validation errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (key, exercise) in &self.exercises {
            if key != &exercise.id {
                errors.push(format!(
                    "Exercise key '{}' doesn't match exercise.id '{}'",
                    key, exercise.id
                ));
            }
        }
        let mut values: Vec<ExerciseRef> = self.exercises.values().cloned().collect();
        values.sort_by(|a, b| a.id.cmp(&b.id));
        errors.extend(validate_exercises(&values));
        errors
    }
}

impl ExerciseLookup for ExerciseCatalog {
    fn lookup(&self, exercise_id: &str) -> Option<&ExerciseRef> {
        self.exercises.get(exercise_id)
    }
}

fn validate_exercises(exercises: &[ExerciseRef]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for exercise in exercises {
        if exercise.id.trim().is_empty() {
            errors.push(format!("Exercise '{}' has empty id", exercise.name));
            continue;
        }
        if exercise.name.trim().is_empty() {
            errors.push(format!("Exercise '{}' has empty name", exercise.id));
        }
        if !seen.insert(exercise.id.as_str()) {
            errors.push(format!("Duplicate exercise id '{}'", exercise.id));
        }
    }

    errors
}
