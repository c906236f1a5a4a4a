// [apps/orchestrator/src/services/dispatch_engine.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH ENGINE
 * CLASIFICACIÓN: BACKGROUND SERVICE (ESTRATO L1-APP)
 * RESPONSABILIDAD: CONSUMO DE LA COLA Y MÁQUINA DE ESTADOS DE ENVÍO
 *
 * Patrón reclamar-ejecutar-persistir: ninguna transacción del Ledger
 * queda abierta a través de una llamada de red. El reclamo empuja un
 * lease corto; las transiciones llevan guardia de estado y son
 * monótonas (sent/error jamás retroceden).
 * =================================================================
 */

use crate::services::{notifier, quota_gate};
use crate::state::AppState;
use anyhow::Result;
use chrono::{Duration, Utc};
use postulante_core_clock::day_bounds_msk;
use postulante_domain_models::{Application, DispatchStats};
use postulante_infra_hh::errors::truncate_detail;
use postulante_infra_hh::{ApplyOutcome, HhError};
use std::sync::atomic::Ordering;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument, warn};

/// Calendario de backoff (índice de intento en base 0, con tope).
const BACKOFF_SECONDS: [i64; 5] = [60, 300, 900, 3600, 86_400];
/// Intentos máximos antes de sellar la fila como error.
const MAX_ATTEMPTS: i64 = 5;
/// Lease del reclamo: cubre el timeout HH (~20 s) con margen holgado.
const CLAIM_LEASE_SECONDS: i64 = 120;

fn backoff_delay(attempt_index: i64) -> Duration {
    let clamped = attempt_index.clamp(0, BACKOFF_SECONDS.len() as i64 - 1) as usize;
    Duration::seconds(BACKOFF_SECONDS[clamped])
}

pub struct DispatchEngine {
    application_shared_state: AppState,
}

impl DispatchEngine {
    pub fn new(application_state: AppState) -> Self {
        Self { application_shared_state: application_state }
    }

    /// Bucle perpetuo del daemon de despacho.
    pub async fn spawn_dispatch_daemon(self) {
        let tick_interval = self.application_shared_state.settings.dispatch_every_sec;
        let batch_size = self.application_shared_state.settings.dispatch_batch_size;
        info!("🚚 [DISPATCH_DAEMON]: Queue consumer online (every {}s, batch {}).", tick_interval, batch_size);

        loop {
            tokio::time::sleep(StdDuration::from_secs(tick_interval)).await;

            if self.application_shared_state.shutdown_flag.load(Ordering::SeqCst) {
                info!("🏁 [DISPATCH_DAEMON]: Shutdown flag observed, exiting loop.");
                break;
            }

            match self.run_tick(batch_size, false).await {
                Ok(stats) if stats.taken > 0 => {
                    info!(
                        "📊 [DISPATCH_DAEMON]: taken={} sent={} retried={} failed={} skipped={}",
                        stats.taken, stats.sent, stats.retried, stats.failed, stats.skipped
                    );
                }
                Ok(_) => {}
                Err(tick_fault) => error!("❌ [DISPATCH_DAEMON]: Tick collapsed: {}", tick_fault),
            }
        }
    }

    /**
     * Un tick de despacho: selecciona el lote elegible y avanza cada
     * fila por la máquina de estados. `dry_run` cuenta sin ejecutar.
     */
    #[instrument(skip(self))]
    pub async fn run_tick(&self, batch_limit: i64, dry_run: bool) -> Result<DispatchStats> {
        let state = &self.application_shared_state;
        let now_utc = Utc::now();

        let due_batch = state.application_repository.select_due_batch(now_utc, batch_limit).await?;

        let mut stats = DispatchStats { taken: due_batch.len() as u32, ..Default::default() };

        for application in due_batch {
            // El apagado cooperativo detiene los reclamos nuevos.
            if state.shutdown_flag.load(Ordering::SeqCst) {
                break;
            }

            if dry_run {
                stats.skipped += 1;
                continue;
            }

            match self.dispatch_one(&application).await {
                Ok(outcome) => outcome.accumulate(&mut stats),
                Err(row_fault) => {
                    // Fallos inesperados siguen la ruta de reintento defensivo.
                    error!(
                        application_id = application.id,
                        "💥 [DISPATCH]: Unexpected row failure: {}", row_fault
                    );
                    let attempt = application.attempt_count + 1;
                    let detail = truncate_detail(&format!("unexpected: {}", row_fault));
                    if attempt >= MAX_ATTEMPTS {
                        state
                            .application_repository
                            .mark_error_with_attempt(application.id, &detail, attempt)
                            .await?;
                        stats.failed += 1;
                    } else {
                        state
                            .application_repository
                            .schedule_retry(application.id, &detail, attempt, Utc::now() + backoff_delay(attempt - 1))
                            .await?;
                        stats.retried += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Avanza UNA fila: reclamo, guardias de token y cuota, intento HH
    /// y transición final.
    async fn dispatch_one(&self, application: &Application) -> Result<RowOutcome> {
        let state = &self.application_shared_state;
        let now_utc = Utc::now();

        // 1. RECLAMO CON LEASE (cero filas = otro worker la avanzó)
        let claimed = state
            .application_repository
            .claim_for_dispatch(application.id, now_utc, now_utc + Duration::seconds(CLAIM_LEASE_SECONDS))
            .await?;
        if !claimed {
            return Ok(RowOutcome::Skipped);
        }

        // 2. TOKEN DEL USUARIO
        let Some(access_grant) = state.token_guard.ensure_fresh_access(application.user_id).await? else {
            state
                .application_repository
                .mark_error(application.id, "no hh access_token for user")
                .await?;
            return Ok(RowOutcome::Failed);
        };

        // 3. GUARDIA DE CUOTA: aparcar hasta la frontera del día MSK
        let quota = quota_gate::quota_view_for_user(state, application.user_id).await?;
        if quota.is_exhausted() {
            let (_, day_end_utc) = day_bounds_msk(now_utc);
            state.application_repository.park_until(application.id, day_end_utc).await?;
            notifier::notify_quota_exhausted_once(state, application.user_id, &quota.reset_label, quota.tariff)
                .await?;
            debug!(application_id = application.id, "⏳ [DISPATCH]: Quota exhausted, parked to day end.");
            return Ok(RowOutcome::Skipped);
        }

        // 4. INTENTO DE NEGOCIACIÓN
        let attempt_result = state
            .hh_client
            .apply(
                &access_grant.access_token,
                application.vacancy_id,
                &application.resume_id,
                application.cover_letter.as_deref(),
            )
            .await;

        let attempt_result = match attempt_result {
            // 401: un refresh forzado y una única repetición en el mismo tick.
            Err(HhError::Unauthorized(first_detail)) => {
                match state.token_guard.force_refresh(application.user_id).await? {
                    Some(fresh_access) => {
                        state
                            .hh_client
                            .apply(
                                &fresh_access,
                                application.vacancy_id,
                                &application.resume_id,
                                application.cover_letter.as_deref(),
                            )
                            .await
                    }
                    None => Err(HhError::Unauthorized(first_detail)),
                }
            }
            other => other,
        };

        self.transition_from_attempt(application, attempt_result).await
    }

    /// Traduce el desenlace del intento a la transición de la fila.
    async fn transition_from_attempt(
        &self,
        application: &Application,
        attempt_result: Result<ApplyOutcome, HhError>,
    ) -> Result<RowOutcome> {
        let repository = &self.application_shared_state.application_repository;

        match attempt_result {
            Ok(ApplyOutcome::Submitted) => {
                repository.mark_sent(application.id, None).await?;
                Ok(RowOutcome::Sent)
            }

            Ok(ApplyOutcome::AlreadyApplied(reason)) => {
                // Éxito idempotente: razón corta preservada en `error`.
                let note = truncate_detail(&format!("already_applied: {}", reason));
                repository.mark_sent(application.id, Some(&note)).await?;
                Ok(RowOutcome::Sent)
            }

            Err(HhError::NonRetryable { code, detail }) => {
                if matches!(code.as_str(), "test_required" | "letter_required" | "vacancy_not_found") {
                    // Salto de negocio: terminal con código estable, sin tocar intentos.
                    info!(
                        application_id = application.id,
                        user_id = application.user_id,
                        vacancy_id = application.vacancy_id,
                        "⏭️ [DISPATCH]: Skipped, reason={}", code
                    );
                    repository.mark_error(application.id, &code).await?;
                    Ok(RowOutcome::Skipped)
                } else {
                    let sealed = truncate_detail(&format!("non-retryable: {}", detail));
                    repository.mark_error(application.id, &sealed).await?;
                    Ok(RowOutcome::Failed)
                }
            }

            Err(HhError::Unauthorized(detail)) => {
                // El refresh del próximo tick repara el material; backoff normal.
                let attempt = application.attempt_count + 1;
                let sealed = truncate_detail(&format!("401 unauthorized: {}", detail));
                repository
                    .schedule_retry(application.id, &sealed, attempt, Utc::now() + backoff_delay(attempt - 1))
                    .await?;
                Ok(RowOutcome::Retried)
            }

            Err(transient_fault) => {
                let attempt = application.attempt_count + 1;
                let detail = truncate_detail(&transient_fault.to_string());

                if attempt >= MAX_ATTEMPTS {
                    let sealed = truncate_detail(&format!("max attempts; last: {}", detail));
                    repository.mark_error_with_attempt(application.id, &sealed, attempt).await?;
                    warn!(application_id = application.id, "🧱 [DISPATCH]: Attempt budget exhausted.");
                    Ok(RowOutcome::Failed)
                } else {
                    repository
                        .schedule_retry(application.id, &detail, attempt, Utc::now() + backoff_delay(attempt - 1))
                        .await?;
                    Ok(RowOutcome::Retried)
                }
            }
        }
    }
}

/// Desenlace contable de una fila dentro del tick.
enum RowOutcome {
    Sent,
    Retried,
    Failed,
    Skipped,
}

impl RowOutcome {
    fn accumulate(&self, stats: &mut DispatchStats) {
        match self {
            RowOutcome::Sent => stats.sent += 1,
            RowOutcome::Retried => stats.retried += 1,
            RowOutcome::Failed => stats.failed += 1,
            RowOutcome::Skipped => stats.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_is_clamped() {
        assert_eq!(backoff_delay(0).num_seconds(), 60);
        assert_eq!(backoff_delay(1).num_seconds(), 300);
        assert_eq!(backoff_delay(4).num_seconds(), 86_400);
        // Más allá del calendario: se mantiene el tope de 24 h.
        assert_eq!(backoff_delay(40).num_seconds(), 86_400);
        // Índices negativos defensivos caen al primer escalón.
        assert_eq!(backoff_delay(-3).num_seconds(), 60);
    }
}
