// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION STATE HUB
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS, CLIENTES Y GUARDIAS
 *
 * Placa base del orquestador: repositorios pre-hidratados, el enlace
 * HH, el canal de salida y el guardián de tokens, todo compartido
 * entre handlers y daemons vía Arc.
 * =================================================================
 */

use crate::config::Settings;
use crate::services::token_guard::TokenGuard;
use postulante_infra_db::repositories::{
    ApplicationRepository, CampaignRepository, NotificationRepository, PaymentRepository,
    ReferralRepository, ResumeRepository, SavedRequestRepository, SubscriptionRepository,
    TokenRepository, UserRepository,
};
use postulante_infra_db::DbClient;
use postulante_infra_hh::client::HhClientConfig;
use postulante_infra_hh::HhClient;
use postulante_infra_telegram::TelegramGateway;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub database_client: DbClient,

    // --- ENLACES EXTERNOS ---
    pub hh_client: Arc<HhClient>,
    pub telegram_gateway: TelegramGateway,

    // --- GUARDIAS Y SEÑALES ---
    pub token_guard: Arc<TokenGuard>,
    /// Bandera cooperativa de apagado: los daemons dejan de reclamar
    /// trabajo nuevo y terminan el vuelo en curso.
    pub shutdown_flag: Arc<AtomicBool>,

    // --- REPOSITORIOS PRE-HIDRATADOS (L3) ---
    pub user_repository: Arc<UserRepository>,
    pub token_repository: Arc<TokenRepository>,
    pub resume_repository: Arc<ResumeRepository>,
    pub saved_request_repository: Arc<SavedRequestRepository>,
    pub campaign_repository: Arc<CampaignRepository>,
    pub application_repository: Arc<ApplicationRepository>,
    pub notification_repository: Arc<NotificationRepository>,
    pub subscription_repository: Arc<SubscriptionRepository>,
    pub referral_repository: Arc<ReferralRepository>,
    pub payment_repository: Arc<PaymentRepository>,
}

impl AppState {
    /// Forja el estado maestro inyectando todas las dependencias.
    pub fn new(database_client: DbClient, settings: Settings) -> anyhow::Result<Self> {
        debug!("🧬 [APP_STATE]: Executing ignition sequence...");

        let shared_settings = Arc::new(settings);

        let hh_client = Arc::new(HhClient::new(HhClientConfig {
            api_base: shared_settings.hh_api_base.clone(),
            oauth_base: shared_settings.hh_oauth_base.clone(),
            client_id: shared_settings.hh_client_id.clone(),
            client_secret: shared_settings.hh_client_secret.clone(),
            redirect_uri: shared_settings.hh_redirect_uri.clone(),
            scope: shared_settings.hh_scope.clone(),
            user_agent: shared_settings.hh_user_agent.clone(),
        })?);

        let telegram_gateway = TelegramGateway::new(shared_settings.telegram_bot_token.clone())?;

        let token_guard = Arc::new(TokenGuard::new(database_client.clone(), hh_client.clone()));

        Ok(Self {
            settings: shared_settings,
            hh_client,
            telegram_gateway,
            token_guard,
            shutdown_flag: Arc::new(AtomicBool::new(false)),

            user_repository: Arc::new(UserRepository::new(database_client.clone())),
            token_repository: Arc::new(TokenRepository::new(database_client.clone())),
            resume_repository: Arc::new(ResumeRepository::new(database_client.clone())),
            saved_request_repository: Arc::new(SavedRequestRepository::new(database_client.clone())),
            campaign_repository: Arc::new(CampaignRepository::new(database_client.clone())),
            application_repository: Arc::new(ApplicationRepository::new(database_client.clone())),
            notification_repository: Arc::new(NotificationRepository::new(database_client.clone())),
            subscription_repository: Arc::new(SubscriptionRepository::new(database_client.clone())),
            referral_repository: Arc::new(ReferralRepository::new(database_client.clone())),
            payment_repository: Arc::new(PaymentRepository::new(database_client.clone())),

            database_client,
        })
    }
}
