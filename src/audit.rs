//! Append-only trail of back-office and account actions.

use serde_json::Value;
use uuid::Uuid;

use crate::{error::AppResult, state::AppState};

async fn insert_entry(
    state: &AppState,
    actor_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: &Value,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(state.pool())
    .await?;
    Ok(())
}

/// Audit writes never fail the request that triggered them.
pub async fn record(
    state: &AppState,
    actor_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    match insert_entry(state, actor_id, action, resource, &metadata).await {
        Ok(()) => tracing::debug!(action, resource, "audit entry written"),
        Err(err) => tracing::warn!(error = %err, action, resource, "audit log failed"),
    }
}
