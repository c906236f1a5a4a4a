// [apps/orchestrator/src/handlers/quota.rs]
/*!
 * =================================================================
 * APARATO: QUOTA HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: EXPOSICIÓN DE LA VISTA DE CUOTA DERIVADA
 * =================================================================
 */

use crate::handlers::{internal_fault, resolve_user_id, ApiRejection};
use crate::services::quota_gate;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct QuotaQuery {
    pub tg_id: Option<i64>,
    pub user_id: Option<i64>,
}

pub struct QuotaHandler;

impl QuotaHandler {
    /// Endpoint: GET /quota — tarifa, tope, consumo y remanente del día MSK.
    pub async fn handle_get(
        State(state): State<AppState>,
        Query(query): Query<QuotaQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, query.tg_id, query.user_id).await?;

        let quota = quota_gate::quota_view_for_user(&state, user_id)
            .await
            .map_err(|fault| internal_fault("quota", fault))?;

        Ok(Json(json!({
            "tg_id": query.tg_id,
            "user_id": user_id,
            "tariff": quota.tariff.as_label(),
            "limit": quota.daily_cap,
            "hard_cap": quota.hard_cap,
            "used": quota.used_today,
            "remaining": quota.remaining,
            "reset_time_msk": quota.reset_label,
        })))
    }
}
