// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICE TOPOLOGY
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L1-APP)
 * RESPONSABILIDAD: DAEMONS PERIÓDICOS Y GUARDIAS DEL PIPELINE
 * =================================================================
 */

/// Planificador de campañas: descubrimiento y encolado dentro de cuota.
pub mod campaign_scheduler;
/// Motor de despacho: reclamo, intento HH y máquina de estados.
pub mod dispatch_engine;
/// Notificador: recordatorios de suscripción y entrega saliente.
pub mod notifier;
/// Vista de cuota derivada del Ledger.
pub mod quota_gate;
/// Rutina de payout referral (colaborador de contrato estrecho).
pub mod referral_payouts;
/// Guardián del ciclo de vida OAuth.
pub mod token_guard;

pub use campaign_scheduler::CampaignScheduler;
pub use dispatch_engine::DispatchEngine;
pub use notifier::NotifierService;
pub use token_guard::TokenGuard;
