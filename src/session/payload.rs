//! Request bodies built from a session at submission time

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::input::{parse_float_prefix, parse_int_prefix};
use super::{ExerciseEntry, SetEntry, WorkoutSession};

/// Rejections reported back to the user; the session stays as it was
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please add at least one exercise")]
    NoExercises,
}

/// Body of `POST /workouts` and `PUT /workouts/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutPayload {
    pub name: String,
    /// Whole minutes
    pub duration: u64,
    pub total_volume: f64,
    pub date: String,
    pub exercises: Vec<ExercisePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExercisePayload {
    pub exercise_id: Option<i64>,
    pub custom_exercise_name: Option<String>,
    pub order: usize,
    pub sets: Vec<SetPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetPayload {
    pub set_number: u32,
    pub weight: f64,
    pub reps: i64,
    pub completed: bool,
}

/// Body of `POST /classes/{class}/assigned-workouts/{id}/complete`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionPayload {
    pub duration: u64,
    pub total_volume: f64,
    pub workout_data: CompletionData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionData {
    pub duration: u64,
    pub total_volume: f64,
    pub exercises: Vec<ExercisePayload>,
}

/// weight x reps for a completed set whose fields both parse
fn set_volume(set: &SetEntry) -> f64 {
    if !set.completed {
        return 0.0;
    }
    match (parse_float_prefix(&set.weight), parse_int_prefix(&set.reps)) {
        (Some(weight), Some(reps)) => weight * reps as f64,
        _ => 0.0,
    }
}

fn exercise_payload(order: usize, entry: &ExerciseEntry) -> ExercisePayload {
    ExercisePayload {
        exercise_id: entry.exercise_id(),
        custom_exercise_name: entry.is_custom().then(|| entry.name().to_string()),
        order,
        sets: entry
            .sets()
            .iter()
            .map(|set| SetPayload {
                set_number: set.number,
                weight: parse_float_prefix(&set.weight).unwrap_or(0.0),
                reps: parse_int_prefix(&set.reps).unwrap_or(0),
                completed: set.completed,
            })
            .collect(),
    }
}

impl WorkoutSession {
    /// Sum of weight x reps over completed sets. Sets left uncompleted count
    /// for nothing even when filled in.
    pub fn total_volume(&self) -> f64 {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .map(set_volume)
            .sum()
    }

    pub fn duration_minutes(&self) -> u64 {
        self.elapsed_seconds / 60
    }

    fn exercise_payloads(&self) -> Result<Vec<ExercisePayload>, ValidationError> {
        if self.exercises.is_empty() {
            return Err(ValidationError::NoExercises);
        }
        Ok(self
            .exercises
            .iter()
            .enumerate()
            .map(|(order, entry)| exercise_payload(order, entry))
            .collect())
    }

    pub fn build_submission_payload(&self, date: DateTime<Utc>) -> Result<WorkoutPayload, ValidationError> {
        let exercises = self.exercise_payloads()?;
        Ok(WorkoutPayload {
            name: self.name.clone(),
            duration: self.duration_minutes(),
            total_volume: self.total_volume(),
            date: date.to_rfc3339_opts(SecondsFormat::Millis, true),
            exercises,
        })
    }

    pub fn build_completion_payload(&self) -> Result<CompletionPayload, ValidationError> {
        let exercises = self.exercise_payloads()?;
        let duration = self.duration_minutes();
        let total_volume = self.total_volume();
        Ok(CompletionPayload {
            duration,
            total_volume,
            workout_data: CompletionData {
                duration,
                total_volume,
                exercises,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ExerciseRef, SetField};
    use chrono::TimeZone;
    use serde_json::json;

    fn two_exercise_session() -> WorkoutSession {
        WorkoutSession::new("Upper")
            .add_exercise(ExerciseRef::Library { id: 1, name: "Squat".to_string() })
            .add_exercise(ExerciseRef::custom("Sled push"))
            .update_set_field(0, 0, SetField::Weight, "100")
            .update_set_field(0, 0, SetField::Reps, "5")
            .toggle_set_completed(0, 0)
            .update_set_field(1, 0, SetField::Weight, "50")
            .update_set_field(1, 0, SetField::Reps, "10")
    }

    #[test]
    fn test_uncompleted_sets_excluded_from_volume() {
        let session = two_exercise_session();
        let payload = session.build_submission_payload(Utc::now()).unwrap();
        assert_eq!(payload.total_volume, 500.0);
    }

    #[test]
    fn test_incomplete_fields_contribute_zero() {
        let session = WorkoutSession::default()
            .add_exercise(ExerciseRef::custom("Carry"))
            .update_set_field(0, 0, SetField::Weight, "40")
            .toggle_set_completed(0, 0)
            .add_set(0)
            .update_set_field(0, 1, SetField::Weight, ".")
            .update_set_field(0, 1, SetField::Reps, "12")
            .toggle_set_completed(0, 1);
        assert_eq!(session.total_volume(), 0.0);
    }

    #[test]
    fn test_oversized_reps_still_count() {
        let session = WorkoutSession::default()
            .add_exercise(ExerciseRef::custom("Jump rope"))
            .update_set_field(0, 0, SetField::Weight, "1")
            .update_set_field(0, 0, SetField::Reps, "99999999999999999999")
            .toggle_set_completed(0, 0);
        let payload = session.build_submission_payload(Utc::now()).unwrap();
        assert_eq!(payload.exercises[0].sets[0].reps, i64::MAX);
        assert_eq!(payload.total_volume, i64::MAX as f64);
    }

    #[test]
    fn test_empty_session_is_rejected() {
        let session = WorkoutSession::default();
        assert_eq!(
            session.build_submission_payload(Utc::now()),
            Err(ValidationError::NoExercises)
        );
        assert_eq!(session.build_completion_payload(), Err(ValidationError::NoExercises));
    }

    #[test]
    fn test_duration_is_whole_minutes() {
        let mut session = two_exercise_session().set_timer_running(true);
        for _ in 0..179 {
            session = session.tick();
        }
        assert_eq!(session.duration_minutes(), 2);
    }

    #[test]
    fn test_submission_wire_shape() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let payload = two_exercise_session().build_submission_payload(date).unwrap();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "name": "Upper",
                "duration": 0,
                "total_volume": 500.0,
                "date": "2024-01-02T03:04:05.000Z",
                "exercises": [
                    {
                        "exercise_id": 1,
                        "custom_exercise_name": null,
                        "order": 0,
                        "sets": [{ "set_number": 1, "weight": 100.0, "reps": 5, "completed": true }]
                    },
                    {
                        "exercise_id": null,
                        "custom_exercise_name": "Sled push",
                        "order": 1,
                        "sets": [{ "set_number": 1, "weight": 50.0, "reps": 10, "completed": false }]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_completion_payload_wraps_workout_data() {
        let payload = two_exercise_session().build_completion_payload().unwrap();
        assert_eq!(payload.duration, payload.workout_data.duration);
        assert_eq!(payload.total_volume, 500.0);
        assert_eq!(payload.workout_data.total_volume, 500.0);
        assert_eq!(payload.workout_data.exercises.len(), 2);
    }
}
