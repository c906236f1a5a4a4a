// [apps/orchestrator/src/handlers/users.rs]
/*!
 * =================================================================
 * APARATO: USERS HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: UPSERT DE USUARIOS, ATRIBUCIÓN UTM Y PERFIL
 * =================================================================
 */

use crate::handlers::{internal_fault, reject, resolve_user_id, ApiRejection};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SeenPayload {
    pub tg_id: i64,
    pub username: Option<String>,
    /// Código referral ajeno capturado en /start (pendiente de anclaje).
    #[serde(rename = "ref")]
    pub ref_code: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UtmPayload {
    pub tg_id: i64,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub tg_id: i64,
}

pub struct UsersHandler;

impl UsersHandler {
    /**
     * Endpoint: POST /users/seen
     * Upsert idempotente + UTM first-write-wins + ref pendiente.
     */
    pub async fn handle_seen(
        State(state): State<AppState>,
        Json(payload): Json<SeenPayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = state
            .user_repository
            .upsert_seen(payload.tg_id, payload.username.as_deref())
            .await
            .map_err(|fault| internal_fault("users/seen", fault))?;

        state
            .user_repository
            .apply_utm_first_write(
                payload.tg_id,
                payload.utm_source.as_deref(),
                payload.utm_medium.as_deref(),
                payload.utm_campaign.as_deref(),
            )
            .await
            .map_err(|fault| internal_fault("users/seen utm", fault))?;

        if let Some(pending_code) = payload.ref_code.as_deref().filter(|c| !c.trim().is_empty()) {
            state
                .user_repository
                .store_pending_ref(user_id, pending_code)
                .await
                .map_err(|fault| internal_fault("users/seen ref", fault))?;
        }

        Ok(Json(json!({ "ok": true })))
    }

    /// Endpoint: POST /users/register — compatibilidad con /seen, retorna el id.
    pub async fn handle_register(
        State(state): State<AppState>,
        Json(payload): Json<SeenPayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = state
            .user_repository
            .upsert_seen(payload.tg_id, payload.username.as_deref())
            .await
            .map_err(|fault| internal_fault("users/register", fault))?;

        Ok(Json(json!({ "ok": true, "user_id": user_id })))
    }

    /// Endpoint: POST /users/utm — atribución tardía, first-write-wins.
    pub async fn handle_utm(
        State(state): State<AppState>,
        Json(payload): Json<UtmPayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        resolve_user_id(&state, Some(payload.tg_id), None).await?;

        state
            .user_repository
            .apply_utm_first_write(
                payload.tg_id,
                payload.utm_source.as_deref(),
                payload.utm_medium.as_deref(),
                payload.utm_campaign.as_deref(),
            )
            .await
            .map_err(|fault| internal_fault("users/utm", fault))?;

        Ok(Json(json!({ "ok": true })))
    }

    /// Endpoint: GET /users/profile — vínculo HH + vigencia del token.
    pub async fn handle_profile(
        State(state): State<AppState>,
        Query(query): Query<ProfileQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let Some(user) = state
            .user_repository
            .find_by_tg(query.tg_id)
            .await
            .map_err(|fault| internal_fault("users/profile", fault))?
        else {
            return Err(reject(StatusCode::NOT_FOUND, "user not found"));
        };

        let token = state
            .token_repository
            .find_by_user(user.id)
            .await
            .map_err(|fault| internal_fault("users/profile token", fault))?;

        Ok(Json(json!({
            "tg_id": user.tg_id,
            "user_id": user.id,
            "username": user.username,
            "created_at": user.created_at.to_rfc3339(),
            "last_seen": user.last_seen_at.map(|ts| ts.to_rfc3339()),
            "hh_connected": token.is_some(),
            "hh_account_id": user.hh_account_id,
            "hh_account_name": user.hh_account_name,
            "hh_expires_at": token.map(|t| t.expires_at.to_rfc3339()),
        })))
    }
}
