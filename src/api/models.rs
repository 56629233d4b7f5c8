//! Response shapes returned by the fitness REST API

use serde::{Deserialize, Serialize};

/// Library exercise as listed by `/exercises`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "muscle_groups")]
    pub muscle_groups: Vec<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Muscle groups come back as an array, older records as a comma-separated string
fn muscle_groups<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Groups {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Groups>::deserialize(deserializer)? {
        Some(Groups::List(list)) => list,
        Some(Groups::Joined(joined)) => joined
            .split(',')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect(),
        None => Vec::new(),
    })
}

/// Reusable template of library exercises
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Routine {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub exercises: Vec<ExerciseSummary>,
}

/// Previously saved workout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredWorkout {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    /// Minutes
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub exercises: Vec<StoredExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredExercise {
    #[serde(default)]
    pub exercise: Option<ExerciseSummary>,
    #[serde(default)]
    pub custom_exercise_name: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub sets: Vec<StoredSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSet {
    #[serde(default)]
    pub id: Option<i64>,
    pub set_number: u32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub reps: Option<i64>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// Workout an instructor assigned to a class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignedWorkout {
    pub id: i64,
    #[serde(default)]
    pub class_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub workout_template: Option<WorkoutTemplate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTemplate {
    #[serde(default)]
    pub exercises: Vec<TemplateExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    #[serde(default)]
    pub exercise_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub target_sets: Option<u32>,
    #[serde(default)]
    pub target_reps: Option<TargetReps>,
}

/// Instructors enter either a count or free text such as "8-12"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TargetReps {
    Count(u32),
    Text(String),
}

impl std::fmt::Display for TargetReps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetReps::Count(n) => write!(f, "{}", n),
            TargetReps::Text(s) => f.write_str(s),
        }
    }
}

/// Returned by login and register
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub user: serde_json::Value,
}

/// Minimal view of a created workout
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WorkoutRef {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExercisesEnvelope {
    pub exercises: Vec<ExerciseSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoutineEnvelope {
    pub routine: Routine,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkoutEnvelope<T> {
    pub workout: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignedEnvelope {
    pub assigned_workout: AssignedWorkout,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}
