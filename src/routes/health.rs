use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::AppState;

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: String,
    /// Seconds since the server started.
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
}

pub async fn get_health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "healthy".to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: Utc::now(),
    })
}
