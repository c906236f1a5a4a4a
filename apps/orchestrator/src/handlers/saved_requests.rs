// [apps/orchestrator/src/handlers/saved_requests.rs]
/*!
 * =================================================================
 * APARATO: SAVED REQUESTS HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: CRUD DE ESPECIFICACIONES DE BÚSQUEDA
 *
 * La forma canónica del query-string se normaliza en la escritura;
 * si llega vacía se construye desde los campos estructurados.
 * =================================================================
 */

use crate::handlers::{internal_fault, reject, resolve_user_id, ApiRejection};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use postulante_domain_models::SavedRequest;
use postulante_infra_hh::query::{build_query_params, normalize_query_params};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct MessengerQuery {
    pub tg_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SavedRequestPayload {
    pub title: String,
    #[serde(default)]
    pub query: String,
    pub area: Option<i64>,
    #[serde(default)]
    pub employment: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<String>,
    #[serde(default)]
    pub professional_roles: Vec<i64>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub cover_letter: String,
    #[serde(default)]
    pub query_params: String,
}

pub struct SavedRequestsHandler;

impl SavedRequestsHandler {
    /// Endpoint: GET /saved-requests
    pub async fn handle_list(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<Vec<SavedRequest>>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let requests = state
            .saved_request_repository
            .list_for_user(user_id)
            .await
            .map_err(|fault| internal_fault("saved-requests list", fault))?;

        Ok(Json(requests))
    }

    /// Endpoint: POST /saved-requests
    pub async fn handle_create(
        State(state): State<AppState>,
        Query(query): Query<MessengerQuery>,
        Json(payload): Json<SavedRequestPayload>,
    ) -> Result<Json<SavedRequest>, ApiRejection> {
        if payload.title.trim().is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "title is required"));
        }

        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        // Forma canónica: normalizar lo recibido o construir desde partes.
        let mut canonical_query = normalize_query_params(&payload.query_params);
        if canonical_query.is_empty() {
            canonical_query = build_query_params(
                &payload.query,
                payload.area,
                &payload.employment,
                &payload.schedule,
                &payload.professional_roles,
                &payload.search_fields,
            );
        }

        let now_utc = Utc::now();
        let draft = SavedRequest {
            id: 0,
            user_id,
            title: payload.title.trim().to_string(),
            query: payload.query,
            area: payload.area,
            employment: payload.employment,
            schedule: payload.schedule,
            professional_roles: payload.professional_roles,
            search_fields: payload.search_fields,
            cover_letter: payload.cover_letter,
            query_params: canonical_query,
            created_at: now_utc,
            updated_at: now_utc,
        };

        let created = state
            .saved_request_repository
            .create(&draft)
            .await
            .map_err(|fault| internal_fault("saved-requests create", fault))?;

        Ok(Json(created))
    }

    /// Endpoint: DELETE /saved-requests/{id}
    pub async fn handle_delete(
        State(state): State<AppState>,
        Path(request_id): Path<i64>,
        Query(query): Query<MessengerQuery>,
    ) -> Result<Json<serde_json::Value>, ApiRejection> {
        let user_id = resolve_user_id(&state, Some(query.tg_id), None).await?;

        let deleted = state
            .saved_request_repository
            .delete(request_id, user_id)
            .await
            .map_err(|fault| internal_fault("saved-requests delete", fault))?;

        if !deleted {
            return Err(reject(StatusCode::NOT_FOUND, "not found"));
        }
        Ok(Json(json!({ "ok": true })))
    }
}
