// [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: ROUTING MATRIX
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TOPOLOGÍA DE LA SUPERFICIE HTTP DE CONTROL
 * =================================================================
 */

use crate::handlers::{
    applications::ApplicationsHandler, campaigns::CampaignsHandler, hh_link::HhLinkHandler,
    payments::PaymentWebhooksHandler, quota::QuotaHandler, referrals::ReferralsHandler,
    resumes::ResumesHandler, saved_requests::SavedRequestsHandler,
    subscriptions::SubscriptionsHandler, users::UsersHandler,
};
use crate::state::AppState;
use axum::http::{header, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_router(application_shared_state: AppState) -> Router {
    // Escudo de red para el frontend del bot y herramientas de operación.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO DE IDENTIDAD: usuarios y atribución.
    let users_stratum = Router::new()
        .route("/seen", post(UsersHandler::handle_seen))
        .route("/register", post(UsersHandler::handle_register))
        .route("/utm", post(UsersHandler::handle_utm))
        .route("/profile", get(UsersHandler::handle_profile));

    // ESTRATO HH: OAuth, currículums, campañas y postulaciones.
    let hh_stratum = Router::new()
        .route("/login", get(HhLinkHandler::handle_login))
        .route("/callback", get(HhLinkHandler::handle_callback))
        .route("/link-status", get(HhLinkHandler::handle_link_status))
        .route("/refresh", post(HhLinkHandler::handle_refresh))
        .route("/unlink", post(HhLinkHandler::handle_unlink))
        .route("/resumes", get(ResumesHandler::handle_list))
        .route("/resumes/sync", post(ResumesHandler::handle_sync))
        .route("/campaigns", get(CampaignsHandler::handle_list))
        .route("/campaigns/upsert", post(CampaignsHandler::handle_upsert))
        .route("/campaigns/start", post(CampaignsHandler::handle_start))
        .route("/campaigns/stop", post(CampaignsHandler::handle_stop))
        .route("/campaigns/delete", post(CampaignsHandler::handle_delete))
        .route("/campaigns/send_now", post(CampaignsHandler::handle_send_now))
        .route("/campaigns/auto_tick", post(CampaignsHandler::handle_auto_tick))
        .route("/applications/queue", post(ApplicationsHandler::handle_queue))
        .route("/applications/dispatch", post(ApplicationsHandler::handle_dispatch))
        .route("/applications/stats", get(ApplicationsHandler::handle_stats));

    // ESTRATO REFERRAL
    let referrals_stratum = Router::new()
        .route("/me", get(ReferralsHandler::handle_me))
        .route("/generate", post(ReferralsHandler::handle_generate))
        .route("/track", post(ReferralsHandler::handle_track));

    // ESTRATO DE PAGOS (webhooks firmados del proveedor)
    let payments_stratum = Router::new()
        .route("/check", post(PaymentWebhooksHandler::handle_check))
        .route("/pay", post(PaymentWebhooksHandler::handle_pay))
        .route("/fail", post(PaymentWebhooksHandler::handle_fail));

    // COMPOSICIÓN GLOBAL
    Router::new()
        .route("/healthz", get(|| async { "STATUS_OK" }))
        .nest("/users", users_stratum)
        .nest("/hh", hh_stratum)
        .nest("/referrals", referrals_stratum)
        .nest("/cp", payments_stratum)
        .route("/quota", get(QuotaHandler::handle_get))
        .route("/subscriptions/current", get(SubscriptionsHandler::handle_current))
        .route("/saved-requests", get(SavedRequestsHandler::handle_list).post(SavedRequestsHandler::handle_create))
        .route("/saved-requests/:id", delete(SavedRequestsHandler::handle_delete))
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
