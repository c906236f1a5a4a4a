// [apps/orchestrator/src/handlers/referrals.rs]
/*!
 * =================================================================
 * APARATO: REFERRALS HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: RESUMEN DE RED, GENERACIÓN Y TRACKING DE CÓDIGOS
 * =================================================================
 */

use crate::handlers::{internal_fault, reject, resolve_user_id, ApiRejection};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use postulante_domain_models::ReferralSummary;
use serde::Deserialize;
use serde_json::json;

/// Piso de retiro mostrado en el frontend, en unidades enteras.
const MIN_WITHDRAWAL_UNITS: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct MessengerQuery {
    pub tg_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    pub tg_id: i64,
    pub code: String,
}

fn bot_deep_link(bot_username: &str, ref_code: &str) -> String {
    let username = bot_username.trim_start_matches('@').trim();
    if username.is_empty() {
        return String::new();
    }
    format!("https://t.me/{}?start=ref_{}", username, ref_code)
}

pub struct ReferralsHandler;

impl ReferralsHandler {
    /// Endpoint: GET /referrals/me — enlace propio, niveles y saldos.
    pub async fn handle_me(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<ReferralSummary>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let ref_code = state
            .user_repository
            .ensure_ref_code(user_id)
            .await
            .map_err(|fault| internal_fault("referrals/me code", fault))?;

        let (level1, level2, level3) = state
            .referral_repository
            .count_by_level(user_id)
            .await
            .map_err(|fault| internal_fault("referrals/me levels", fault))?;

        let balance_cents = state
            .referral_repository
            .balance_cents(user_id)
            .await
            .map_err(|fault| internal_fault("referrals/me balance", fault))?;
        let income_cents = state
            .referral_repository
            .income_cents(user_id)
            .await
            .map_err(|fault| internal_fault("referrals/me income", fault))?;

        Ok(Json(ReferralSummary {
            link: bot_deep_link(&state.settings.bot_username, &ref_code),
            level1,
            level2,
            level3,
            income: income_cents / 100,
            balance: balance_cents / 100,
            min_withdrawal: MIN_WITHDRAWAL_UNITS,
        }))
    }

    /// Endpoint: POST /referrals/generate — garantiza el código propio.
    pub async fn handle_generate(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let ref_code = state
            .user_repository
            .ensure_ref_code(user_id)
            .await
            .map_err(|fault| internal_fault("referrals/generate", fault))?;

        Ok(Json(json!({ "ok": true, "code": ref_code })))
    }

    /**
     * Endpoint: POST /referrals/track — guarda el código ajeno como
     * pendiente. Auto-códigos y refs ya sellados son no-ops amables.
     */
    pub async fn handle_track(
        State(state): State<AppState>,
        Query(query): Query<TrackQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let incoming_code = query.code.trim().to_uppercase();
        if incoming_code.len() < 3 {
            return Err(reject(StatusCode::BAD_REQUEST, "code too short"));
        }

        // El usuario se garantiza como en /users/seen.
        let user_id = state
            .user_repository
            .upsert_seen(query.tg_id, None)
            .await
            .map_err(|fault| internal_fault("referrals/track upsert", fault))?;

        let code_owner = state
            .user_repository
            .find_by_ref_code(&incoming_code)
            .await
            .map_err(|fault| internal_fault("referrals/track lookup", fault))?;
        let Some(owner_id) = code_owner else {
            return Err(reject(StatusCode::NOT_FOUND, "ref code not found"));
        };

        if owner_id == user_id {
            return Ok(Json(json!({ "ok": true, "self": true })));
        }

        let stored = state
            .user_repository
            .store_pending_ref(user_id, &incoming_code)
            .await
            .map_err(|fault| internal_fault("referrals/track store", fault))?;

        if !stored {
            return Ok(Json(json!({ "ok": true, "note": "ref already set" })));
        }
        Ok(Json(json!({ "ok": true })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_link_strips_at_sign() {
        assert_eq!(bot_deep_link("@my_bot", "ABC123"), "https://t.me/my_bot?start=ref_ABC123");
    }

    #[test]
    fn empty_bot_username_yields_empty_link() {
        assert_eq!(bot_deep_link("", "ABC123"), "");
    }
}
