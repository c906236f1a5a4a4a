// [apps/orchestrator/src/handlers/resumes.rs]
/*!
 * =================================================================
 * APARATO: RESUMES HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: LECTURA Y SINCRONIZACIÓN DEL CACHÉ DE CURRÍCULUMS
 * =================================================================
 */

use crate::handlers::{internal_fault, resolve_user_id, ApiRejection};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct MessengerQuery {
    pub tg_id: i64,
}

pub struct ResumesHandler;

impl ResumesHandler {
    /// Endpoint: GET /hh/resumes — snapshots cacheados del usuario.
    pub async fn handle_list(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let snapshots = state
            .resume_repository
            .list_for_user(user_id)
            .await
            .map_err(|fault| internal_fault("hh/resumes", fault))?;

        Ok(Json(json!({ "items": snapshots })))
    }

    /// Endpoint: POST /hh/resumes/sync — refresco explícito desde HH.
    pub async fn handle_sync(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let saved = state
            .token_guard
            .sync_resumes(user_id)
            .await
            .map_err(|fault| internal_fault("hh/resumes/sync", fault))?;

        Ok(Json(json!({ "ok": true, "saved": saved })))
    }
}
