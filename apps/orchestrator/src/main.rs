// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN DEL KERNEL
 * =================================================================
 */

use dotenvy::dotenv;
use postulante_orchestrator::prelude::*;
use postulante_shared_heimdall::init_tracing;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // 1. CARGA DE ENTORNO: hidrata .env en el espacio del proceso.
    dotenv().ok();

    // 2. OBSERVABILIDAD
    init_tracing("postulante_orchestrator");

    // 3. RUNTIME
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        info!("🛰️ [COMMAND_CENTER]: Global ignition sequence starting...");

        let settings = Settings::from_env()?;
        let kernel = OrchestratorKernel::ignite(settings).await?;

        info!("🧩 [COMMAND_CENTER]: Ledger level. Launching daemons and transport.");
        kernel.launch_operations().await
    })
}
