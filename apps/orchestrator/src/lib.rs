// [apps/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR LIBRARY ROOT
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: TOPOLOGÍA DE MÓDULOS DEL CENTRO DE MANDO
 * =================================================================
 */

pub mod config;
pub mod handlers;
pub mod kernel;
pub mod routes;
pub mod services;
pub mod state;

pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::kernel::OrchestratorKernel;
    pub use crate::state::AppState;
}
