// [apps/orchestrator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLER TOPOLOGY
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: ADAPTADORES FINOS SOBRE SERVICIOS Y REPOSITORIOS
 * =================================================================
 */

pub mod applications;
pub mod campaigns;
pub mod hh_link;
pub mod payments;
pub mod quota;
pub mod referrals;
pub mod resumes;
pub mod saved_requests;
pub mod subscriptions;
pub mod users;

use crate::state::AppState;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tracing::error;

/// Rechazo uniforme de la superficie: (status, {"detail": ...}).
pub type ApiRejection = (StatusCode, Json<serde_json::Value>);

pub(crate) fn reject(status: StatusCode, detail: &str) -> ApiRejection {
    (status, Json(json!({ "detail": detail })))
}

/// Fallo interno: registro estructurado + 500 opaco.
pub(crate) fn internal_fault(context: &str, fault: impl std::fmt::Display) -> ApiRejection {
    error!("💥 [API_FAULT]: {} -> {}", context, fault);
    reject(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

/// Resuelve el usuario: preferencia por el id interno, si no por tg_id.
pub(crate) async fn resolve_user_id(
    state: &AppState,
    tg_id: Option<i64>,
    user_id: Option<i64>,
) -> Result<i64, ApiRejection> {
    if let Some(internal_id) = user_id {
        return Ok(internal_id);
    }

    let Some(messenger_id) = tg_id else {
        return Err(reject(StatusCode::BAD_REQUEST, "tg_id or user_id is required"));
    };

    match state.user_repository.resolve_user_id(messenger_id).await {
        Ok(Some(internal_id)) => Ok(internal_id),
        Ok(None) => Err(reject(StatusCode::NOT_FOUND, "user not found")),
        Err(fault) => Err(internal_fault("resolve_user_id", fault)),
    }
}
