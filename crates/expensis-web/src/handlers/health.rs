use axum::Json;

use crate::models::Health;

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        message: "Bank Statement Analyzer API is running",
    })
}
