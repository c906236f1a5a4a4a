// [apps/orchestrator/src/handlers/campaigns.rs]
/*!
 * =================================================================
 * APARATO: CAMPAIGNS HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: CICLO DE VIDA DE CAMPAÑAS Y RUTAS MANUALES
 *
 * Activar exige vínculo HH y respeta el invariante de campaña única;
 * el conflicto del índice parcial sale como 409.
 * =================================================================
 */

use crate::handlers::{internal_fault, reject, resolve_user_id, ApiRejection};
use crate::services::{quota_gate, CampaignScheduler};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use postulante_domain_quota::HARD_DAILY_CAP;
use postulante_infra_db::DbError;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub tg_id: Option<i64>,
    pub user_id: Option<i64>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}
fn default_page_size() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct UpsertPayload {
    pub tg_id: Option<i64>,
    pub user_id: Option<i64>,
    pub title: String,
    pub saved_request_id: i64,
    pub resume_id: String,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: i64,
}

fn default_daily_limit() -> i64 {
    HARD_DAILY_CAP
}

#[derive(Debug, Deserialize)]
pub struct CampaignIdPayload {
    pub id: i64,
    pub tg_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendNowPayload {
    pub id: i64,
    pub tg_id: Option<i64>,
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
}

pub struct CampaignsHandler;

impl CampaignsHandler {
    /// Endpoint: GET /hh/campaigns — listado paginado con agregados.
    pub async fn handle_list(
        State(state): State<AppState>,
        Query(query): Query<ListQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, query.tg_id, query.user_id).await?;
        let page = query.page.max(1);
        let page_size = query.page_size.clamp(1, 100);
        let offset = (page - 1) * page_size;

        let summaries = state
            .campaign_repository
            .list_summaries_for_user(user_id, page_size, offset)
            .await
            .map_err(|fault| internal_fault("campaigns list", fault))?;

        Ok(Json(json!({
            "items": summaries,
            "page": page,
            "page_size": page_size,
        })))
    }

    /// Endpoint: POST /hh/campaigns/upsert
    pub async fn handle_upsert(
        State(state): State<AppState>,
        Json(payload): Json<UpsertPayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        if payload.title.trim().is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "title is required"));
        }
        if payload.resume_id.trim().is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "resume_id is required"));
        }

        let user_id = resolve_user_id(&state, payload.tg_id, payload.user_id).await?;
        let bounded_limit = payload.daily_limit.clamp(1, HARD_DAILY_CAP);

        let campaign_id = state
            .campaign_repository
            .upsert(
                user_id,
                payload.title.trim(),
                payload.saved_request_id,
                payload.resume_id.trim(),
                bounded_limit,
            )
            .await
            .map_err(|fault| internal_fault("campaigns upsert", fault))?;

        Ok(Json(json!({ "id": campaign_id })))
    }

    /// Endpoint: POST /hh/campaigns/start — exige vínculo HH; 409 si ya hay activa.
    pub async fn handle_start(
        State(state): State<AppState>,
        Json(payload): Json<CampaignIdPayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, payload.tg_id, payload.user_id).await?;

        let token = state
            .token_repository
            .find_by_user(user_id)
            .await
            .map_err(|fault| internal_fault("campaigns start token", fault))?;
        if token.is_none() {
            return Err(reject(StatusCode::BAD_REQUEST, "hh account is not linked"));
        }

        match state.campaign_repository.start(payload.id, user_id).await {
            Ok(()) => Ok(Json(json!({ "ok": true }))),
            Err(DbError::Conflict(_)) => {
                Err(reject(StatusCode::CONFLICT, "another active campaign exists"))
            }
            Err(DbError::NotFound) => Err(reject(StatusCode::NOT_FOUND, "campaign not found")),
            Err(fault) => Err(internal_fault("campaigns start", fault)),
        }
    }

    /// Endpoint: POST /hh/campaigns/stop — idempotente.
    pub async fn handle_stop(
        State(state): State<AppState>,
        Json(payload): Json<CampaignIdPayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, payload.tg_id, payload.user_id).await?;

        match state.campaign_repository.stop(payload.id, user_id).await {
            Ok(()) => Ok(Json(json!({ "ok": true }))),
            Err(DbError::NotFound) => Err(reject(StatusCode::NOT_FOUND, "campaign not found")),
            Err(fault) => Err(internal_fault("campaigns stop", fault)),
        }
    }

    /// Endpoint: POST /hh/campaigns/delete
    pub async fn handle_delete(
        State(state): State<AppState>,
        Json(payload): Json<CampaignIdPayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, payload.tg_id, payload.user_id).await?;

        let deleted = state
            .campaign_repository
            .delete(payload.id, user_id)
            .await
            .map_err(|fault| internal_fault("campaigns delete", fault))?;

        if !deleted {
            return Err(reject(StatusCode::NOT_FOUND, "campaign not found"));
        }
        Ok(Json(json!({ "ok": true, "deleted_id": payload.id })))
    }

    /// Endpoint: POST /hh/campaigns/send_now — una pasada manual acotada.
    pub async fn handle_send_now(
        State(state): State<AppState>,
        Json(payload): Json<SendNowPayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, payload.tg_id, payload.user_id).await?;

        let scheduler = CampaignScheduler::new(state.clone());
        let enqueued = scheduler
            .send_now(payload.id, user_id, payload.limit)
            .await
            .map_err(|fault| {
                if fault.to_string().contains("campaign not found") {
                    reject(StatusCode::NOT_FOUND, "campaign not found")
                } else {
                    internal_fault("campaigns send_now", fault)
                }
            })?;

        let quota = quota_gate::quota_view_for_user(&state, user_id)
            .await
            .map_err(|fault| internal_fault("campaigns send_now quota", fault))?;

        Ok(Json(json!({
            "enqueued": enqueued,
            "remaining_quota": quota.remaining,
        })))
    }

    /// Endpoint: POST /hh/campaigns/auto_tick — un tick completo bajo demanda.
    pub async fn handle_auto_tick(
        State(state): State<AppState>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let scheduler = CampaignScheduler::new(state.clone());
        let enqueued = scheduler
            .run_tick()
            .await
            .map_err(|fault| internal_fault("campaigns auto_tick", fault))?;

        Ok(Json(json!({ "enqueued": enqueued })))
    }
}
