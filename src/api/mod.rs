//! API module - REST client for the fitness backend
//!
//! Every request carries the stored bearer token when there is one. A 401
//! response clears the stored credentials and signs the user out before the
//! error reaches the caller; nothing is retried.

pub mod models;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::auth::AuthWatch;
use crate::session::{CompletionPayload, WorkoutPayload};
use crate::store::{AUTH_TOKEN_KEY, KeyValueStore, USER_KEY};
use models::{
    AssignedEnvelope, AssignedWorkout, AuthResponse, ErrorBody, ExerciseSummary, ExercisesEnvelope, Routine,
    RoutineEnvelope, StoredWorkout, WorkoutEnvelope, WorkoutRef,
};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Local storage error: {0}")]
    Store(String),
}

impl ApiError {
    fn store(e: anyhow::Error) -> Self {
        ApiError::Store(e.to_string())
    }
}

/// Calls the workout logging screens depend on
#[async_trait]
pub trait WorkoutApi: Send + Sync {
    async fn get_exercises(&self) -> Result<Vec<ExerciseSummary>, ApiError>;
    async fn get_routine(&self, id: i64) -> Result<Routine, ApiError>;
    async fn get_workout(&self, id: i64) -> Result<StoredWorkout, ApiError>;
    async fn create_workout(&self, payload: &WorkoutPayload) -> Result<WorkoutRef, ApiError>;
    async fn update_workout(&self, id: i64, payload: &WorkoutPayload) -> Result<(), ApiError>;
    async fn get_assigned_workout(&self, class_id: i64, id: i64) -> Result<AssignedWorkout, ApiError>;
    async fn complete_assigned_workout(
        &self,
        class_id: i64,
        id: i64,
        payload: &CompletionPayload,
    ) -> Result<(), ApiError>;
}

/// HTTP implementation backed by reqwest
pub struct ApiClient {
    base_url: String,
    http: Client,
    store: Arc<dyn KeyValueStore>,
    auth: AuthWatch,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn KeyValueStore>,
        auth: AuthWatch,
    ) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            store,
            auth,
        })
    }

    pub fn auth(&self) -> &AuthWatch {
        &self.auth
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and keep the token for later requests
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let req = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }));
        let auth: AuthResponse = self.send(req).await?;
        self.save_credentials(&auth)?;
        info!("Logged in as {}", email);
        Ok(auth)
    }

    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let req = self.http.post(self.url("/auth/register")).json(&json!({
            "email": email,
            "username": username,
            "password": password,
        }));
        let auth: AuthResponse = self.send(req).await?;
        self.save_credentials(&auth)?;
        info!("Registered {}", username);
        Ok(auth)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.store.remove_item(AUTH_TOKEN_KEY).map_err(ApiError::store)?;
        self.store.remove_item(USER_KEY).map_err(ApiError::store)?;
        self.auth.sign_out();
        Ok(())
    }

    fn save_credentials(&self, auth: &AuthResponse) -> Result<(), ApiError> {
        self.store
            .set_item(AUTH_TOKEN_KEY, &auth.access_token)
            .map_err(ApiError::store)?;
        self.store
            .set_item(USER_KEY, &auth.user.to_string())
            .map_err(ApiError::store)?;
        self.auth.sign_in();
        Ok(())
    }

    /// Expired or invalid token; failures here only get logged
    fn clear_credentials(&self) {
        info!("Clearing invalid auth token due to 401");
        for key in [AUTH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove_item(key) {
                warn!("Failed to remove {}: {}", key, e);
            }
        }
        self.auth.sign_out();
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.store.get_item(AUTH_TOKEN_KEY) {
            Ok(Some(token)) => req.bearer_auth(token),
            Ok(None) => req,
            Err(e) => {
                warn!("Auth token error: {}", e);
                req
            }
        }
    }

    /// Send and return the raw body of a successful response
    async fn execute(&self, req: RequestBuilder) -> Result<String, ApiError> {
        let resp = self.authorize(req).send().await?;
        let status = resp.status();
        let url = resp.url().to_string();
        let body = resp.text().await?;

        if status.is_success() {
            debug!(%status, %url, "API response");
            return Ok(body);
        }

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
        error!(%status, %url, "API error: {}", message);

        if status == StatusCode::UNAUTHORIZED {
            self.clear_credentials();
            return Err(ApiError::Unauthorized(message));
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let body = self.execute(req).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl WorkoutApi for ApiClient {
    async fn get_exercises(&self) -> Result<Vec<ExerciseSummary>, ApiError> {
        let envelope: ExercisesEnvelope = self.send(self.http.get(self.url("/exercises"))).await?;
        Ok(envelope.exercises)
    }

    async fn get_routine(&self, id: i64) -> Result<Routine, ApiError> {
        let path = format!("/workouts/routines/{}", id);
        let envelope: RoutineEnvelope = self.send(self.http.get(self.url(&path))).await?;
        Ok(envelope.routine)
    }

    async fn get_workout(&self, id: i64) -> Result<StoredWorkout, ApiError> {
        let path = format!("/workouts/{}", id);
        let envelope: WorkoutEnvelope<StoredWorkout> = self.send(self.http.get(self.url(&path))).await?;
        Ok(envelope.workout)
    }

    async fn create_workout(&self, payload: &WorkoutPayload) -> Result<WorkoutRef, ApiError> {
        let req = self.http.post(self.url("/workouts")).json(payload);
        let envelope: WorkoutEnvelope<WorkoutRef> = self.send(req).await?;
        info!("Workout saved (id: {})", envelope.workout.id);
        Ok(envelope.workout)
    }

    async fn update_workout(&self, id: i64, payload: &WorkoutPayload) -> Result<(), ApiError> {
        let path = format!("/workouts/{}", id);
        self.execute(self.http.put(self.url(&path)).json(payload)).await?;
        info!("Workout {} updated", id);
        Ok(())
    }

    async fn get_assigned_workout(&self, class_id: i64, id: i64) -> Result<AssignedWorkout, ApiError> {
        let path = format!("/classes/{}/assigned-workouts/{}", class_id, id);
        let envelope: AssignedEnvelope = self.send(self.http.get(self.url(&path))).await?;
        Ok(envelope.assigned_workout)
    }

    async fn complete_assigned_workout(
        &self,
        class_id: i64,
        id: i64,
        payload: &CompletionPayload,
    ) -> Result<(), ApiError> {
        let path = format!("/classes/{}/assigned-workouts/{}/complete", class_id, id);
        self.execute(self.http.post(self.url(&path)).json(payload)).await?;
        info!("Assigned workout {} completed", id);
        Ok(())
    }
}
