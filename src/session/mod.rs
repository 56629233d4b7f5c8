//! Session module - in-progress workout held by a logging screen
//!
//! Every mutation returns a new `WorkoutSession`; the previous value is left
//! untouched. Index-based operations ignore out-of-range indices.

pub mod input;
pub mod payload;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::models::{AssignedWorkout, ExerciseSummary, Routine, StoredWorkout};

pub use payload::{CompletionPayload, ExercisePayload, SetPayload, ValidationError, WorkoutPayload};

pub const DEFAULT_WORKOUT_NAME: &str = "New Workout";

/// Sets created for an assigned exercise without a target
const DEFAULT_TARGET_SETS: u32 = 3;

/// Which exercise an entry logs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ExerciseRef {
    /// Backed by an id in the shared exercise library
    Library { id: i64, name: String },
    /// Exists only inside this workout
    Custom(String),
}

impl ExerciseRef {
    pub fn custom(name: &str) -> Self {
        ExerciseRef::Custom(name.trim().to_string())
    }

    pub fn exercise_id(&self) -> Option<i64> {
        match self {
            ExerciseRef::Library { id, .. } => Some(*id),
            ExerciseRef::Custom(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ExerciseRef::Library { name, .. } => name,
            ExerciseRef::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, ExerciseRef::Custom(_))
    }
}

impl From<&ExerciseSummary> for ExerciseRef {
    fn from(exercise: &ExerciseSummary) -> Self {
        ExerciseRef::Library {
            id: exercise.id,
            name: exercise.name.clone(),
        }
    }
}

/// One set as typed by the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetEntry {
    /// 1-based position within its exercise
    pub number: u32,
    pub weight: String,
    pub reps: String,
    pub completed: bool,
}

impl SetEntry {
    pub fn blank(number: u32) -> Self {
        Self {
            number,
            weight: String::new(),
            reps: String::new(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetField {
    Weight,
    Reps,
}

/// Exercise inside a session, always holding at least one set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseEntry {
    exercise: ExerciseRef,
    sets: Vec<SetEntry>,
}

impl ExerciseEntry {
    pub fn new(exercise: ExerciseRef) -> Self {
        Self::with_sets(exercise, Vec::new())
    }

    /// Renumbers the given sets and adds a blank one if there are none
    fn with_sets(exercise: ExerciseRef, sets: Vec<SetEntry>) -> Self {
        let mut entry = Self { exercise, sets };
        if entry.sets.is_empty() {
            entry.sets.push(SetEntry::blank(1));
        }
        entry.renumber();
        entry
    }

    pub fn exercise(&self) -> &ExerciseRef {
        &self.exercise
    }

    pub fn exercise_id(&self) -> Option<i64> {
        self.exercise.exercise_id()
    }

    pub fn name(&self) -> &str {
        self.exercise.name()
    }

    pub fn is_custom(&self) -> bool {
        self.exercise.is_custom()
    }

    pub fn sets(&self) -> &[SetEntry] {
        &self.sets
    }

    fn renumber(&mut self) {
        for (idx, set) in self.sets.iter_mut().enumerate() {
            set.number = idx as u32 + 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimerState {
    #[default]
    Stopped,
    Running,
}

/// Editable workout owned by one logging screen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    name: String,
    elapsed_seconds: u64,
    timer: TimerState,
    exercises: Vec<ExerciseEntry>,
}

impl Default for WorkoutSession {
    fn default() -> Self {
        Self::new(DEFAULT_WORKOUT_NAME)
    }
}

impl WorkoutSession {
    /// Empty session with a stopped timer at zero
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            elapsed_seconds: 0,
            timer: TimerState::Stopped,
            exercises: Vec::new(),
        }
    }

    /// One blank set per routine exercise
    pub fn from_routine(routine: &Routine) -> Self {
        let mut session = Self::new(&routine.name);
        session.exercises = routine
            .exercises
            .iter()
            .map(|ex| ExerciseEntry::new(ex.into()))
            .collect();
        session
    }

    /// Rebuild an editable session from a saved workout. The timer resumes
    /// from the stored duration but stays stopped.
    pub fn from_workout(workout: &StoredWorkout) -> Self {
        let mut session = Self::new(&workout.name);
        session.elapsed_seconds = workout.duration.unwrap_or(0).saturating_mul(60);
        session.exercises = workout
            .exercises
            .iter()
            .map(|ex| {
                let exercise = match &ex.exercise {
                    Some(library) => ExerciseRef::from(library),
                    None => ExerciseRef::Custom(ex.custom_exercise_name.clone().unwrap_or_default()),
                };
                let sets = ex
                    .sets
                    .iter()
                    .map(|s| SetEntry {
                        number: s.set_number,
                        weight: s.weight.map(|w| w.to_string()).unwrap_or_default(),
                        reps: s.reps.map(|r| r.to_string()).unwrap_or_default(),
                        completed: s.completed.unwrap_or(false),
                    })
                    .collect();
                ExerciseEntry::with_sets(exercise, sets)
            })
            .collect();
        session
    }

    /// Pre-fill target sets and reps from a class assignment
    pub fn from_assigned(assigned: &AssignedWorkout) -> Self {
        let mut session = Self::new(&assigned.name);
        let template = assigned.workout_template.clone().unwrap_or_default();
        session.exercises = template
            .exercises
            .iter()
            .map(|ex| {
                let exercise = match ex.exercise_id {
                    Some(id) => ExerciseRef::Library { id, name: ex.name.clone() },
                    None => ExerciseRef::Custom(ex.name.clone()),
                };
                let target_sets = ex.target_sets.filter(|n| *n > 0).unwrap_or(DEFAULT_TARGET_SETS);
                let reps = ex.target_reps.as_ref().map(|r| r.to_string()).unwrap_or_default();
                let sets = (1..=target_sets)
                    .map(|number| SetEntry {
                        reps: reps.clone(),
                        ..SetEntry::blank(number)
                    })
                    .collect();
                ExerciseEntry::with_sets(exercise, sets)
            })
            .collect();
        session
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn timer(&self) -> TimerState {
        self.timer
    }

    pub fn timer_running(&self) -> bool {
        self.timer == TimerState::Running
    }

    pub fn exercises(&self) -> &[ExerciseEntry] {
        &self.exercises
    }

    #[must_use]
    pub fn rename(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// Append an exercise with one blank set
    #[must_use]
    pub fn add_exercise(&self, exercise: ExerciseRef) -> Self {
        let mut next = self.clone();
        next.exercises.push(ExerciseEntry::new(exercise));
        next
    }

    /// Unconditional; confirmation is the caller's job
    #[must_use]
    pub fn remove_exercise(&self, index: usize) -> Self {
        let mut next = self.clone();
        if index < next.exercises.len() {
            next.exercises.remove(index);
        } else {
            debug!(index, "remove_exercise: index out of range");
        }
        next
    }

    /// Append a set carrying forward the previous set's weight and reps
    #[must_use]
    pub fn add_set(&self, exercise_index: usize) -> Self {
        self.with_exercise(exercise_index, |entry| {
            let (weight, reps) = entry
                .sets
                .last()
                .map(|last| (last.weight.clone(), last.reps.clone()))
                .unwrap_or_default();
            entry.sets.push(SetEntry {
                number: entry.sets.len() as u32 + 1,
                weight,
                reps,
                completed: false,
            });
        })
    }

    /// Remove a set unless it is the only one left, then renumber
    #[must_use]
    pub fn remove_set(&self, exercise_index: usize, set_index: usize) -> Self {
        self.with_exercise(exercise_index, |entry| {
            if entry.sets.len() > 1 && set_index < entry.sets.len() {
                entry.sets.remove(set_index);
                entry.renumber();
            }
        })
    }

    /// Store the raw text; parsing is deferred to submission
    #[must_use]
    pub fn update_set_field(&self, exercise_index: usize, set_index: usize, field: SetField, raw: &str) -> Self {
        self.with_set(exercise_index, set_index, |set| match field {
            SetField::Weight => set.weight = raw.to_string(),
            SetField::Reps => set.reps = raw.to_string(),
        })
    }

    #[must_use]
    pub fn toggle_set_completed(&self, exercise_index: usize, set_index: usize) -> Self {
        self.with_set(exercise_index, set_index, |set| set.completed = !set.completed)
    }

    /// One second elapsed; ignored while stopped
    #[must_use]
    pub fn tick(&self) -> Self {
        let mut next = self.clone();
        if next.timer_running() {
            next.elapsed_seconds += 1;
        }
        next
    }

    #[must_use]
    pub fn set_timer_running(&self, running: bool) -> Self {
        Self {
            timer: if running { TimerState::Running } else { TimerState::Stopped },
            ..self.clone()
        }
    }

    #[must_use]
    pub fn reset_timer(&self) -> Self {
        Self {
            elapsed_seconds: 0,
            timer: TimerState::Stopped,
            ..self.clone()
        }
    }

    fn with_exercise(&self, exercise_index: usize, f: impl FnOnce(&mut ExerciseEntry)) -> Self {
        let mut next = self.clone();
        match next.exercises.get_mut(exercise_index) {
            Some(entry) => f(entry),
            None => debug!(exercise_index, "exercise index out of range"),
        }
        next
    }

    fn with_set(&self, exercise_index: usize, set_index: usize, f: impl FnOnce(&mut SetEntry)) -> Self {
        self.with_exercise(exercise_index, |entry| match entry.sets.get_mut(set_index) {
            Some(set) => f(set),
            None => debug!(exercise_index, set_index, "set index out of range"),
        })
    }
}
