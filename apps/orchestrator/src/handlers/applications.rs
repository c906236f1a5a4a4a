// [apps/orchestrator/src/handlers/applications.rs]
/*!
 * =================================================================
 * APARATO: APPLICATIONS HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: ENCOLADO MANUAL, TICK DE DESPACHO Y ESTADÍSTICAS
 *
 * El encolado manual respeta la cuota del día: el lote se recorta al
 * remanente y con remanente cero responde {queued: 0} y dispara el
 * aviso único de cuota.
 * =================================================================
 */

use crate::handlers::{internal_fault, reject, resolve_user_id, ApiRejection};
use crate::services::{notifier, quota_gate, DispatchEngine};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use postulante_domain_models::{ApplicationKind, ApplicationStatus, DispatchStats};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct QueuePayload {
    pub tg_id: i64,
    pub vacancies: Vec<i64>,
    pub resume_id: String,
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub kind: Option<ApplicationKind>,
    pub campaign_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DispatchQuery {
    #[serde(default = "default_dispatch_limit")]
    pub limit: i64,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dispatch_limit() -> i64 {
    50
}
fn default_dry_run() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct MessengerQuery {
    pub tg_id: i64,
}

pub struct ApplicationsHandler;

impl ApplicationsHandler {
    /// Endpoint: POST /hh/applications/queue — lote manual dentro de cuota.
    pub async fn handle_queue(
        State(state): State<AppState>,
        Json(payload): Json<QueuePayload>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        if payload.vacancies.is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "vacancies is empty"));
        }
        if payload.resume_id.trim().is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "resume_id is required"));
        }

        let user_id = resolve_user_id(&state, Some(payload.tg_id), None).await?;

        let quota = quota_gate::quota_view_for_user(&state, user_id)
            .await
            .map_err(|fault| internal_fault("applications/queue quota", fault))?;

        if quota.is_exhausted() {
            notifier::notify_quota_exhausted_once(&state, user_id, &quota.reset_label, quota.tariff)
                .await
                .map_err(|fault| internal_fault("applications/queue notify", fault))?;
            return Ok(Json(json!({ "queued": 0 })));
        }

        let bounded: Vec<i64> = payload
            .vacancies
            .iter()
            .copied()
            .take(quota.remaining as usize)
            .collect();

        let cover_letter = payload
            .cover_letter
            .as_deref()
            .map(str::trim)
            .filter(|letter| !letter.is_empty());

        let inserted = state
            .application_repository
            .enqueue_batch(
                user_id,
                &bounded,
                payload.resume_id.trim(),
                cover_letter,
                payload.kind.unwrap_or(ApplicationKind::Manual),
                payload.campaign_id,
            )
            .await
            .map_err(|fault| internal_fault("applications/queue", fault))?;

        Ok(Json(json!({ "queued": inserted })))
    }

    /// Endpoint: POST /hh/applications/dispatch — un tick bajo demanda.
    pub async fn handle_dispatch(
        State(state): State<AppState>,
        Query(query): Query<DispatchQuery>,
    ) -> Result<Json<DispatchStats>, ApiRejection> {
        let bounded_limit = query.limit.clamp(1, 500);

        let engine = DispatchEngine::new(state.clone());
        let stats = engine
            .run_tick(bounded_limit, query.dry_run)
            .await
            .map_err(|fault| internal_fault("applications/dispatch", fault))?;

        Ok(Json(stats))
    }

    /// Endpoint: GET /hh/applications/stats — conteos por estado.
    pub async fn handle_stats(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let by_status = state
            .application_repository
            .stats_for_user(user_id)
            .await
            .map_err(|fault| internal_fault("applications/stats", fault))?;

        let mut queued = 0i64;
        let mut sent = 0i64;
        let mut errored = 0i64;
        for (status, count) in by_status {
            match status {
                ApplicationStatus::Queued | ApplicationStatus::Retry => queued += count,
                ApplicationStatus::Sent => sent += count,
                ApplicationStatus::Error => errored += count,
            }
        }

        Ok(Json(json!({ "queued": queued, "sent": sent, "error": errored })))
    }
}
