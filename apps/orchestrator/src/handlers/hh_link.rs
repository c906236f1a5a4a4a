// [apps/orchestrator/src/handlers/hh_link.rs]
/*!
 * =================================================================
 * APARATO: HH LINK HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: CIRCUITO OAUTH (LOGIN, CALLBACK, STATUS, UNLINK)
 *
 * El contrato no trivial es el callback: state = "tg:<id>:<nonce>",
 * de donde se extrae el id del mensajero antes de delegar al Token
 * Guard. Los mensajes de bienvenida son best-effort.
 * =================================================================
 */

use crate::handlers::{internal_fault, reject, resolve_user_id, ApiRejection};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MessengerQuery {
    pub tg_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Extrae el id del mensajero del state opaco ("tg:<id>:<nonce>" o un id crudo).
fn parse_messenger_id(raw_state: &str) -> Option<i64> {
    if let Some(rest) = raw_state.strip_prefix("tg:") {
        return rest.split(':').next().and_then(|id| id.parse::<i64>().ok());
    }
    raw_state.parse::<i64>().ok()
}

pub struct HhLinkHandler;

impl HhLinkHandler {
    /// Endpoint: GET /hh/login — construye la URL de autorización.
    pub async fn handle_login(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let nonce = Uuid::new_v4().simple().to_string();
        let oauth_state = format!("tg:{}:{}", query.tg_id, nonce);
        let auth_url = state.hh_client.authorize_url(&oauth_state);

        Ok(Json(json!({ "auth_url": auth_url })))
    }

    /**
     * Endpoint: GET /hh/callback
     * Canje del code + efectos post-vínculo; redirección a la landing
     * configurada y mensaje de bienvenida oportunista.
     */
    pub async fn handle_callback(
        State(state): State<AppState>,
        Query(query): Query<CallbackQuery>,
    ) -> Result<impl IntoResponse, ApiRejection> {
        let Some(code) = query.code.filter(|c| !c.is_empty()) else {
            return Err(reject(StatusCode::BAD_REQUEST, "missing code"));
        };

        let Some(messenger_id) = query.state.as_deref().and_then(parse_messenger_id) else {
            return Err(reject(StatusCode::BAD_REQUEST, "unparseable state"));
        };

        let link_outcome = state
            .token_guard
            .on_oauth_completed(messenger_id, &code)
            .await
            .map_err(|fault| {
                warn!("🔗 [HH_CALLBACK]: Link failed for messenger {}: {}", messenger_id, fault);
                reject(StatusCode::BAD_GATEWAY, "hh token exchange failed")
            })?;

        info!("🔗 [HH_CALLBACK]: Messenger {} linked as user {}.", messenger_id, link_outcome.user_id);

        // Bienvenida best-effort: su fallo no afecta la redirección.
        if state.telegram_gateway.is_enabled() {
            let _ = state
                .telegram_gateway
                .send_message(messenger_id, "✅ Аккаунт привязан. Готовы откликаться на вакансии!")
                .await;
        }

        let landing = state.settings.landing_redirect_url.clone();
        if landing.is_empty() {
            return Ok(Json(json!({ "ok": true, "user_id": link_outcome.user_id })).into_response());
        }
        Ok(Redirect::temporary(&landing).into_response())
    }

    /// Endpoint: GET /hh/link-status — ¿hay token? (sin importar frescura).
    pub async fn handle_link_status(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let token = state
            .token_repository
            .find_by_user(user_id)
            .await
            .map_err(|fault| internal_fault("hh/link-status", fault))?;

        let hh_account_id = state
            .user_repository
            .find_by_id(user_id)
            .await
            .map_err(|fault| internal_fault("hh/link-status user", fault))?
            .and_then(|user| user.hh_account_id)
            .and_then(|raw| raw.parse::<i64>().ok());

        Ok(Json(json!({
            "linked": token.is_some(),
            "hh_user_id": hh_account_id,
        })))
    }

    /// Endpoint: POST /hh/refresh — rotación explícita del material.
    pub async fn handle_refresh(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        match state.token_guard.force_refresh(user_id).await {
            Ok(Some(_)) => Ok(Json(json!({ "ok": true, "refreshed": true }))),
            Ok(None) => Err(reject(StatusCode::NOT_FOUND, "no tokens")),
            Err(fault) => Err(internal_fault("hh/refresh", fault)),
        }
    }

    /// Endpoint: POST /hh/unlink — incinera el token y limpia el rastro HH.
    pub async fn handle_unlink(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let unlinked = state
            .token_guard
            .unlink(user_id)
            .await
            .map_err(|fault| internal_fault("hh/unlink", fault))?;

        Ok(Json(json!({ "ok": true, "unlinked": unlinked })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_with_prefix_and_nonce_parses() {
        assert_eq!(parse_messenger_id("tg:12345:abcdef"), Some(12345));
    }

    #[test]
    fn bare_numeric_state_parses() {
        assert_eq!(parse_messenger_id("777"), Some(777));
    }

    #[test]
    fn garbage_state_is_rejected() {
        assert_eq!(parse_messenger_id("tg:abc:def"), None);
        assert_eq!(parse_messenger_id("oauth-csrf"), None);
    }
}
