//! Logging screen controller - owns one session, its timer task and submission

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::models::WorkoutRef;
use crate::api::{ApiError, WorkoutApi};
use crate::session::{ValidationError, WorkoutSession};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Where the session came from decides how it is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    New,
    Edit(i64),
    Assigned { class_id: i64, assignment_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submitted {
    Created(WorkoutRef),
    Updated(i64),
    Completed(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Background task ticking the session once per second. Aborted on drop.
struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    fn spawn(session: Arc<Mutex<WorkoutSession>>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut current = session.lock().await;
                if !current.timer_running() {
                    break;
                }
                *current = current.tick();
            }
        });
        Self { handle }
    }

    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct LogScreen<A: WorkoutApi> {
    api: Arc<A>,
    origin: Origin,
    session: Arc<Mutex<WorkoutSession>>,
    ticker: Option<Ticker>,
}

impl<A: WorkoutApi> LogScreen<A> {
    pub fn new(api: Arc<A>, session: WorkoutSession, origin: Origin) -> Self {
        Self {
            api,
            origin,
            session: Arc::new(Mutex::new(session)),
            ticker: None,
        }
    }

    /// Blank workout, optionally named after a routine
    pub fn open_new(api: Arc<A>, name: Option<&str>) -> Self {
        let session = name.map(WorkoutSession::new).unwrap_or_default();
        Self::new(api, session, Origin::New)
    }

    pub async fn open_routine(api: Arc<A>, routine_id: i64) -> Result<Self, ApiError> {
        info!("Loading routine: {}", routine_id);
        let routine = api.get_routine(routine_id).await?;
        let session = WorkoutSession::from_routine(&routine);
        Ok(Self::new(api, session, Origin::New))
    }

    pub async fn open_workout(api: Arc<A>, workout_id: i64) -> Result<Self, ApiError> {
        info!("Loading workout: {}", workout_id);
        let workout = api.get_workout(workout_id).await?;
        let session = WorkoutSession::from_workout(&workout);
        Ok(Self::new(api, session, Origin::Edit(workout_id)))
    }

    pub async fn open_assigned(api: Arc<A>, class_id: i64, assignment_id: i64) -> Result<Self, ApiError> {
        info!("Loading assigned workout {} of class {}", assignment_id, class_id);
        let assigned = api.get_assigned_workout(class_id, assignment_id).await?;
        let session = WorkoutSession::from_assigned(&assigned);
        Ok(Self::new(api, session, Origin::Assigned { class_id, assignment_id }))
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub async fn snapshot(&self) -> WorkoutSession {
        self.session.lock().await.clone()
    }

    /// Replace the session with the result of one mutation. The timer state
    /// is owned by the screen and survives the mutation unchanged.
    pub async fn apply(&self, mutate: impl FnOnce(&WorkoutSession) -> WorkoutSession) {
        let mut current = self.session.lock().await;
        let running = current.timer_running();
        let next = mutate(&current);
        *current = if next.timer_running() == running {
            next
        } else {
            next.set_timer_running(running)
        };
    }

    async fn replace(&self, mutate: impl FnOnce(&WorkoutSession) -> WorkoutSession) {
        let mut current = self.session.lock().await;
        *current = mutate(&current);
    }

    pub async fn start_timer(&mut self) {
        self.replace(|s| s.set_timer_running(true)).await;
        if self.ticker.as_ref().is_none_or(Ticker::is_finished) {
            debug!("Timer started");
            self.ticker = Some(Ticker::spawn(self.session.clone()));
        }
    }

    pub async fn pause_timer(&mut self) {
        self.ticker = None;
        self.replace(|s| s.set_timer_running(false)).await;
        debug!("Timer paused");
    }

    pub async fn toggle_timer(&mut self) {
        if self.session.lock().await.timer_running() {
            self.pause_timer().await;
        } else {
            self.start_timer().await;
        }
    }

    /// Zero and stop; callers confirm with the user first
    pub async fn reset_timer(&mut self) {
        self.ticker = None;
        self.replace(WorkoutSession::reset_timer).await;
        debug!("Timer reset");
    }

    /// Send the session to the API. On failure the session is kept as is so
    /// the user can retry.
    pub async fn submit(&self) -> Result<Submitted, SubmitError> {
        let session = self.snapshot().await;

        let result = match self.origin {
            Origin::New => {
                let payload = session.build_submission_payload(chrono::Utc::now())?;
                self.api.create_workout(&payload).await.map(Submitted::Created)
            }
            Origin::Edit(id) => {
                let payload = session.build_submission_payload(chrono::Utc::now())?;
                self.api.update_workout(id, &payload).await.map(|_| Submitted::Updated(id))
            }
            Origin::Assigned { class_id, assignment_id } => {
                let payload = session.build_completion_payload()?;
                self.api
                    .complete_assigned_workout(class_id, assignment_id, &payload)
                    .await
                    .map(|_| Submitted::Completed(assignment_id))
            }
        };

        if let Err(e) = &result {
            warn!("Error saving workout: {}", e);
        }
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{AssignedWorkout, ExerciseSummary, Routine, StoredWorkout};
    use crate::session::{CompletionPayload, ExerciseRef, SetField, WorkoutPayload};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeApi {
        fail_with: Option<u16>,
        created: StdMutex<Vec<WorkoutPayload>>,
        updated: StdMutex<Vec<(i64, WorkoutPayload)>>,
        completed: StdMutex<Vec<(i64, i64, CompletionPayload)>>,
    }

    impl FakeApi {
        fn failing(status: u16) -> Self {
            Self {
                fail_with: Some(status),
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), ApiError> {
            match self.fail_with {
                Some(401) => Err(ApiError::Unauthorized("expired".to_string())),
                Some(status) => Err(ApiError::Status {
                    status,
                    message: "boom".to_string(),
                }),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl WorkoutApi for FakeApi {
        async fn get_exercises(&self) -> Result<Vec<ExerciseSummary>, ApiError> {
            self.check()?;
            Ok(vec![])
        }

        async fn get_routine(&self, id: i64) -> Result<Routine, ApiError> {
            self.check()?;
            Ok(Routine {
                id,
                name: "Legs".to_string(),
                description: None,
                exercises: vec![ExerciseSummary {
                    id: 1,
                    name: "Squat".to_string(),
                    description: None,
                    category: None,
                    muscle_groups: vec![],
                    equipment: None,
                    instructions: None,
                }],
            })
        }

        async fn get_workout(&self, id: i64) -> Result<StoredWorkout, ApiError> {
            self.check()?;
            Ok(StoredWorkout {
                id: Some(id),
                name: "Old".to_string(),
                duration: Some(2),
                total_volume: None,
                date: None,
                exercises: vec![],
            })
        }

        async fn create_workout(&self, payload: &WorkoutPayload) -> Result<WorkoutRef, ApiError> {
            self.check()?;
            self.created.lock().unwrap().push(payload.clone());
            Ok(WorkoutRef { id: 42 })
        }

        async fn update_workout(&self, id: i64, payload: &WorkoutPayload) -> Result<(), ApiError> {
            self.check()?;
            self.updated.lock().unwrap().push((id, payload.clone()));
            Ok(())
        }

        async fn get_assigned_workout(&self, class_id: i64, id: i64) -> Result<AssignedWorkout, ApiError> {
            self.check()?;
            Ok(AssignedWorkout {
                id,
                class_id: Some(class_id),
                name: "Homework".to_string(),
                description: None,
                workout_template: None,
            })
        }

        async fn complete_assigned_workout(
            &self,
            class_id: i64,
            id: i64,
            payload: &CompletionPayload,
        ) -> Result<(), ApiError> {
            self.check()?;
            self.completed.lock().unwrap().push((class_id, id, payload.clone()));
            Ok(())
        }
    }

    async fn with_one_set(screen: &LogScreen<FakeApi>) {
        screen
            .apply(|s| {
                s.add_exercise(ExerciseRef::custom("Curl"))
                    .update_set_field(0, 0, SetField::Weight, "20")
                    .update_set_field(0, 0, SetField::Reps, "12")
                    .toggle_set_completed(0, 0)
            })
            .await;
    }

    #[tokio::test]
    async fn test_submit_new_creates_workout() {
        let api = Arc::new(FakeApi::default());
        let screen = LogScreen::open_new(api.clone(), None);
        with_one_set(&screen).await;

        let result = screen.submit().await.unwrap();
        assert_eq!(result, Submitted::Created(WorkoutRef { id: 42 }));

        let created = api.created.lock().unwrap();
        assert_eq!(created[0].name, "New Workout");
        assert_eq!(created[0].total_volume, 240.0);
    }

    #[tokio::test]
    async fn test_submit_empty_session_is_rejected() {
        let api = Arc::new(FakeApi::default());
        let screen = LogScreen::open_new(api.clone(), Some("Empty"));

        let err = screen.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Validation(ValidationError::NoExercises)));
        assert!(api.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_session() {
        let api = Arc::new(FakeApi::failing(500));
        let screen = LogScreen::open_new(api, None);
        with_one_set(&screen).await;
        let before = screen.snapshot().await;

        let err = screen.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Api(ApiError::Status { status: 500, .. })));
        assert_eq!(screen.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_unauthorized_is_passed_through() {
        let api = Arc::new(FakeApi::failing(401));
        let screen = LogScreen::open_new(api, None);
        with_one_set(&screen).await;

        let err = screen.submit().await.unwrap_err();
        assert!(matches!(err, SubmitError::Api(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_edit_updates_existing_workout() {
        let api = Arc::new(FakeApi::default());
        let screen = LogScreen::open_workout(api.clone(), 5).await.unwrap();
        assert_eq!(screen.origin(), Origin::Edit(5));
        assert_eq!(screen.snapshot().await.elapsed_seconds(), 120);
        with_one_set(&screen).await;

        assert_eq!(screen.submit().await.unwrap(), Submitted::Updated(5));
        let updated = api.updated.lock().unwrap();
        assert_eq!(updated[0].0, 5);
        assert_eq!(updated[0].1.duration, 2);
    }

    #[tokio::test]
    async fn test_assigned_workout_completes() {
        let api = Arc::new(FakeApi::default());
        let screen = LogScreen::open_assigned(api.clone(), 3, 9).await.unwrap();
        with_one_set(&screen).await;

        assert_eq!(screen.submit().await.unwrap(), Submitted::Completed(9));
        let completed = api.completed.lock().unwrap();
        assert_eq!((completed[0].0, completed[0].1), (3, 9));
        assert_eq!(completed[0].2.workout_data.total_volume, 240.0);
    }

    #[tokio::test]
    async fn test_open_routine_failure_propagates() {
        let api = Arc::new(FakeApi::failing(404));
        let result = LogScreen::open_routine(api, 1).await;
        assert!(matches!(result, Err(ApiError::Status { status: 404, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_until_paused() {
        let api = Arc::new(FakeApi::default());
        let mut screen = LogScreen::open_routine(api, 1).await.unwrap();
        assert!(!screen.snapshot().await.timer_running());

        screen.start_timer().await;
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(screen.snapshot().await.elapsed_seconds(), 3);

        screen.pause_timer().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(screen.snapshot().await.elapsed_seconds(), 3);

        screen.toggle_timer().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(screen.snapshot().await.elapsed_seconds(), 4);

        screen.reset_timer().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        let session = screen.snapshot().await;
        assert_eq!(session.elapsed_seconds(), 0);
        assert!(!session.timer_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_cannot_stop_running_timer() {
        let api = Arc::new(FakeApi::default());
        let mut screen = LogScreen::open_new(api, None);

        screen.start_timer().await;
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(screen.snapshot().await.elapsed_seconds(), 2);

        screen.apply(|s| s.set_timer_running(false)).await;
        assert!(screen.snapshot().await.timer_running());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(screen.snapshot().await.elapsed_seconds(), 4);

        screen.start_timer().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(screen.snapshot().await.elapsed_seconds(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_keeps_stopped_timer_stopped() {
        let api = Arc::new(FakeApi::default());
        let screen = LogScreen::open_new(api, None);

        screen.apply(|s| s.set_timer_running(true).rename("Push")).await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let session = screen.snapshot().await;
        assert_eq!(session.name(), "Push");
        assert!(!session.timer_running());
        assert_eq!(session.elapsed_seconds(), 0);
    }
}
