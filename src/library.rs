//! Exercise library search for the exercise picker

use crate::api::models::ExerciseSummary;

fn contains(field: Option<&str>, query: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(query))
}

/// Does the exercise match a lowercase query in any searchable field
fn matches(exercise: &ExerciseSummary, query: &str) -> bool {
    contains(Some(&exercise.name), query)
        || contains(exercise.description.as_deref(), query)
        || contains(exercise.category.as_deref(), query)
        || exercise.muscle_groups.join(",").to_lowercase().contains(query)
        || contains(exercise.equipment.as_deref(), query)
}

/// Case-insensitive search; a blank query keeps everything
pub fn filter_exercises<'a>(exercises: &'a [ExerciseSummary], query: &str) -> Vec<&'a ExerciseSummary> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return exercises.iter().collect();
    }
    exercises.iter().filter(|e| matches(e, &query)).collect()
}
