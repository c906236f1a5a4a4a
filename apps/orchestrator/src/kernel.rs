// [apps/orchestrator/src/kernel.rs]
/**
 * =================================================================
 * APARATO: ORCHESTRATOR KERNEL
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * Placa base donde se conectan todos los servicios: la base de datos
 * se solidifica antes de levantar daemons, y los daemons antes del
 * socket TCP. El apagado es cooperativo: Ctrl-C iza la bandera, los
 * bucles dejan de reclamar trabajo y el vuelo en curso concluye.
 * =================================================================
 */

use crate::config::Settings;
use crate::routes::create_router;
use crate::services::{CampaignScheduler, DispatchEngine, NotifierService};
use crate::state::AppState;
use postulante_infra_db::DbClient;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};

pub struct OrchestratorKernel {
    pub application_shared_state: AppState,
}

impl OrchestratorKernel {
    /**
     * Ignición del cliente de base de datos y del estado maestro.
     * El esquema queda aplicado antes de cualquier servicio.
     */
    pub async fn ignite(settings: Settings) -> anyhow::Result<Self> {
        let database_client =
            DbClient::connect(&settings.database_url, settings.turso_auth_token.clone()).await?;

        let application_shared_state = AppState::new(database_client, settings)?;
        Ok(Self { application_shared_state })
    }

    /**
     * Lanza los daemons de fondo y el servidor HTTP principal.
     * Bloquea hasta el colapso del transporte o el apagado cooperativo.
     */
    pub async fn launch_operations(self) -> anyhow::Result<()> {
        let shared_state = self.application_shared_state;

        // --- 1. SEÑAL DE APAGADO COOPERATIVO ---
        let shutdown_flag = shared_state.shutdown_flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⚠️ [SIGNAL]: Termination requested by host. Draining in-flight work...");
                shutdown_flag.store(true, Ordering::SeqCst);
            }
        });

        // --- 2. DAEMON A: PLANIFICADOR DE CAMPAÑAS ---
        let state_ref = shared_state.clone();
        tokio::spawn(async move {
            let scheduler = CampaignScheduler::new(state_ref);
            scheduler.spawn_scheduler_daemon().await;
        });

        // --- 3. DAEMON B: MOTOR DE DESPACHO ---
        let state_ref = shared_state.clone();
        tokio::spawn(async move {
            let engine = DispatchEngine::new(state_ref);
            engine.spawn_dispatch_daemon().await;
        });

        // --- 4. DAEMON C: NOTIFICADOR ---
        let state_ref = shared_state.clone();
        tokio::spawn(async move {
            let notifier = NotifierService::new(state_ref);
            notifier.spawn_notifier_daemon().await;
        });

        // --- 5. IGNICIÓN DEL TRANSPORTE HTTP (AXUM) ---
        let listening_port = shared_state.settings.listening_port;
        let control_router = create_router(shared_state);

        let bind_address = SocketAddr::new("0.0.0.0".parse::<IpAddr>()?, listening_port);
        info!("🚀 [KERNEL_ONLINE]: Control surface listening at {}.", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address).await?;

        if let Err(server_fault) = axum::serve(tcp_listener, control_router).await {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_fault);
            anyhow::bail!("http transport collapsed: {}", server_fault);
        }

        Ok(())
    }
}
