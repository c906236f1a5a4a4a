// [apps/orchestrator/src/handlers/subscriptions.rs]
/*!
 * =================================================================
 * APARATO: SUBSCRIPTIONS HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: ESTADO DE SUSCRIPCIÓN PARA EL FRONTEND
 *
 * Contrato de tolerancia: este endpoint nunca responde 500; ante
 * cualquier fallo degrada al paquete "free/inactive".
 * =================================================================
 */

use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use postulante_domain_models::SubscriptionStatus;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct MessengerQuery {
    pub tg_id: i64,
}

fn free_pack() -> serde_json::Value {
    json!({ "plan": "free", "status": "inactive", "expires_at": null, "days_left": null })
}

pub struct SubscriptionsHandler;

impl SubscriptionsHandler {
    /// Endpoint: GET /subscriptions/current
    pub async fn handle_current(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Json<serde_json::Value> {
        match Self::resolve_current(&state, query.tg_id).await {
            Ok(pack) => Json(pack),
            Err(fault) => {
                warn!("💳 [SUBSCRIPTIONS]: Current-state check degraded for tg {}: {}", query.tg_id, fault);
                Json(free_pack())
            }
        }
    }

    async fn resolve_current(state: &AppState, tg_id: i64) -> anyhow::Result<serde_json::Value> {
        let Some(user_id) = state.user_repository.resolve_user_id(tg_id).await? else {
            return Ok(free_pack());
        };

        let Some(subscription) = state.subscription_repository.current_for_user(user_id).await? else {
            return Ok(free_pack());
        };

        let now_utc = Utc::now();
        let mut status_label = subscription.status.as_label().to_string();
        // Una activa ya vencida se reporta como expirada aunque el
        // notificador aún no la haya transicionado.
        if subscription.status == SubscriptionStatus::Active && subscription.expires_at <= now_utc {
            status_label = "expired".to_string();
        }

        let plan_label = state
            .subscription_repository
            .find_tariff_by_id(subscription.tariff_id)
            .await?
            .map(|tariff| tariff.title)
            .unwrap_or_else(|| "free".to_string());

        Ok(json!({
            "plan": plan_label,
            "status": status_label,
            "expires_at": subscription.expires_at.to_rfc3339(),
            "days_left": subscription.ceil_days_left(now_utc),
        }))
    }
}
