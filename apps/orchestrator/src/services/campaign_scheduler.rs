// [apps/orchestrator/src/services/campaign_scheduler.rs]
/*!
 * =================================================================
 * APARATO: CAMPAIGN SCHEDULER
 * CLASIFICACIÓN: BACKGROUND SERVICE (ESTRATO L1-APP)
 * RESPONSABILIDAD: DESCUBRIMIENTO DE VACANTES Y ENCOLADO EN CUOTA
 *
 * Por cada campaña activa y por tick: verificación de propiedad del
 * currículum, token fresco, presupuesto permitido, ventana de
 * búsqueda con cursor, y encolado por lote idempotente. La unicidad
 * (user, vacancy) absorbe los duplicados entre ticks.
 * =================================================================
 */

use crate::services::{notifier, quota_gate, token_guard::TokenGuard};
use crate::state::AppState;
use anyhow::Result;
use chrono::{Duration, Utc};
use postulante_core_clock::{day_bounds_msk, msk_day_stamp};
use postulante_domain_models::{ApplicationKind, Campaign};
use postulante_infra_hh::query::{build_query_params, normalize_query_params, with_search_window};
use std::sync::atomic::Ordering;
use std::time::Duration as StdDuration;
use tracing::{error, info, instrument, warn};

/// Tope del lote inicial de la ruta manual "enviar ahora".
const SEND_NOW_DEFAULT_CAP: i64 = 150;
/// Sobremuestreo del buscador antes del filtro de ya-postulados.
const SEARCH_OVERSAMPLE_FACTOR: usize = 2;
/// Saludo sustituto cuando la búsqueda guardada no trae carta propia.
/// Ninguna postulación de campaña se almacena sin mensaje: las vacantes
/// con carta obligatoria rechazarían el envío vacío (letter_required).
const DEFAULT_COVER_LETTER: &str = "Здравствуйте! Откликаюсь на вакансию.";

pub struct CampaignScheduler {
    application_shared_state: AppState,
}

impl CampaignScheduler {
    pub fn new(application_state: AppState) -> Self {
        Self { application_shared_state: application_state }
    }

    /// Bucle perpetuo del daemon en el reactor de Tokio.
    pub async fn spawn_scheduler_daemon(self) {
        let poll_interval = self.application_shared_state.settings.auto_poll_every_sec;
        info!("🗓️ [SCHEDULER_DAEMON]: Campaign discovery online (every {}s).", poll_interval);

        loop {
            tokio::time::sleep(StdDuration::from_secs(poll_interval)).await;

            if self.application_shared_state.shutdown_flag.load(Ordering::SeqCst) {
                info!("🏁 [SCHEDULER_DAEMON]: Shutdown flag observed, exiting loop.");
                break;
            }

            match self.run_tick().await {
                Ok(queued_total) if queued_total > 0 => {
                    info!("📬 [SCHEDULER_DAEMON]: Tick queued {} applications.", queued_total);
                }
                Ok(_) => {}
                Err(tick_fault) => error!("❌ [SCHEDULER_DAEMON]: Tick collapsed: {}", tick_fault),
            }
        }
    }

    /**
     * Un tick completo: reset de contadores al cambiar el día MSK y
     * procesamiento de cada campaña activa. Retorna el total encolado.
     */
    #[instrument(skip(self))]
    pub async fn run_tick(&self) -> Result<u64> {
        let state = &self.application_shared_state;
        let today_msk = msk_day_stamp(Utc::now());

        state.campaign_repository.reset_daily_counters(&today_msk).await?;

        let active_campaigns = state.campaign_repository.list_active().await?;
        let mut queued_total = 0u64;

        for campaign in active_campaigns {
            if state.shutdown_flag.load(Ordering::SeqCst) {
                break;
            }

            match self.process_campaign(&campaign, None, ApplicationKind::Auto).await {
                Ok(inserted) => queued_total += inserted,
                Err(campaign_fault) => {
                    // El fallo de una campaña no detiene el resto del tick.
                    error!(
                        campaign_id = campaign.id,
                        user_id = campaign.user_id,
                        "❌ [SCHEDULER]: Campaign processing failed: {}", campaign_fault
                    );
                }
            }
        }

        Ok(queued_total)
    }

    /**
     * Ruta manual "enviar ahora": el mismo procedimiento, una vez, con
     * tope min(cap, 150) y sin exceder jamás el remanente del usuario.
     * Las filas se sellan con kind=manual y no mueven los contadores
     * automáticos de la campaña.
     */
    #[instrument(skip(self))]
    pub async fn send_now(&self, campaign_id: i64, user_id: i64, cap: Option<i64>) -> Result<u64> {
        let state = &self.application_shared_state;
        let Some(campaign) = state.campaign_repository.find_by_id(campaign_id, user_id).await? else {
            anyhow::bail!("campaign not found");
        };

        let manual_cap = cap.unwrap_or(SEND_NOW_DEFAULT_CAP).clamp(1, SEND_NOW_DEFAULT_CAP);
        self.process_campaign(&campaign, Some(manual_cap), ApplicationKind::Manual).await
    }

    /**
     * Procedimiento núcleo por campaña. Retorna el número de filas
     * realmente insertadas (el tamaño autoritativo del lote).
     */
    async fn process_campaign(
        &self,
        campaign: &Campaign,
        manual_cap: Option<i64>,
        kind: ApplicationKind,
    ) -> Result<u64> {
        let state = &self.application_shared_state;

        // 1. EL CURRÍCULUM DEBE SEGUIR SIENDO DEL DUEÑO
        let resume_is_owned = state
            .resume_repository
            .belongs_to_user(campaign.user_id, &campaign.resume_id)
            .await?;
        if !resume_is_owned {
            warn!(
                campaign_id = campaign.id,
                "📄 [SCHEDULER]: Resume {} no longer belongs to user {}, skipping.",
                campaign.resume_id, campaign.user_id
            );
            return Ok(0);
        }

        // 2. TOKEN FRESCO VÍA EL GUARDIÁN
        let guard: &TokenGuard = &state.token_guard;
        let Some(access_grant) = guard.ensure_fresh_access(campaign.user_id).await? else {
            warn!(campaign_id = campaign.id, "🔑 [SCHEDULER]: No HH token for user {}, skipping.", campaign.user_id);
            return Ok(0);
        };

        // 3. PRESUPUESTO PERMITIDO = min(campaña, usuario)
        let quota = quota_gate::quota_view_for_user(state, campaign.user_id).await?;
        if quota.is_exhausted() {
            notifier::notify_quota_exhausted_once(state, campaign.user_id, &quota.reset_label, quota.tariff)
                .await?;
            return Ok(0);
        }

        let allowed = match kind {
            ApplicationKind::Auto => campaign.remaining_for_today().min(quota.remaining),
            // La ruta manual respeta solo el tope explícito y el remanente del usuario.
            ApplicationKind::Manual => manual_cap.unwrap_or(SEND_NOW_DEFAULT_CAP).min(quota.remaining),
        };
        if allowed <= 0 {
            return Ok(0);
        }

        // 4. CURSOR DE BÚSQUEDA (solo la ruta automática pagina por ventana)
        let now_utc = Utc::now();
        let date_from = match kind {
            ApplicationKind::Auto => {
                let (day_start_utc, _) = day_bounds_msk(now_utc);
                let latest_auto = state
                    .application_repository
                    .latest_auto_created_at(campaign.id)
                    .await?;
                let cursor_base = latest_auto.map_or(day_start_utc, |latest| latest.max(day_start_utc));
                let tick_seconds = state.settings.auto_poll_every_sec as i64;
                Some(cursor_base - Duration::seconds(2 * tick_seconds))
            }
            ApplicationKind::Manual => None,
        };

        // 5. FORMA CANÓNICA DE LA BÚSQUEDA + VENTANA
        let Some(saved_request_id) = campaign.saved_request_id else {
            warn!(campaign_id = campaign.id, "🔖 [SCHEDULER]: Campaign without saved request, skipping.");
            return Ok(0);
        };
        let Some(saved_request) = state
            .saved_request_repository
            .find_by_id(saved_request_id, campaign.user_id)
            .await?
        else {
            warn!(campaign_id = campaign.id, "🔖 [SCHEDULER]: Saved request {} vanished, skipping.", saved_request_id);
            return Ok(0);
        };

        let mut canonical_query = normalize_query_params(&saved_request.query_params);
        if canonical_query.is_empty() {
            canonical_query = build_query_params(
                &saved_request.query,
                saved_request.area,
                &saved_request.employment,
                &saved_request.schedule,
                &saved_request.professional_roles,
                &saved_request.search_fields,
            );
        }
        if canonical_query.is_empty() {
            return Ok(0);
        }
        let windowed_query = with_search_window(&canonical_query, date_from);

        // 6. DESCUBRIMIENTO Y FILTRO DE YA-POSTULADOS
        let oversampled_limit = (allowed as usize).saturating_mul(SEARCH_OVERSAMPLE_FACTOR);
        let discovered_ids = state
            .hh_client
            .collect_vacancy_ids(&access_grant.access_token, &windowed_query, oversampled_limit)
            .await?;
        if discovered_ids.is_empty() {
            return Ok(0);
        }

        let known_ids = state
            .application_repository
            .filter_known_vacancies(campaign.user_id, &discovered_ids)
            .await?;
        let fresh_ids: Vec<i64> = discovered_ids
            .into_iter()
            .filter(|vacancy_id| !known_ids.contains(vacancy_id))
            .take(allowed as usize)
            .collect();
        if fresh_ids.is_empty() {
            return Ok(0);
        }

        // 7. ENCOLADO ATÓMICO + CONTADORES
        let cover_letter = if saved_request.cover_letter.trim().is_empty() {
            DEFAULT_COVER_LETTER
        } else {
            saved_request.cover_letter.trim_end()
        };

        let inserted = state
            .application_repository
            .enqueue_batch(
                campaign.user_id,
                &fresh_ids,
                &campaign.resume_id,
                Some(cover_letter),
                kind,
                Some(campaign.id),
            )
            .await?;

        if inserted > 0 && kind == ApplicationKind::Auto {
            state
                .campaign_repository
                .bump_counters(campaign.id, inserted as i64, &msk_day_stamp(now_utc))
                .await?;
        }

        info!(
            campaign_id = campaign.id,
            user_id = campaign.user_id,
            "📨 [SCHEDULER]: {} applications queued (allowed {}).", inserted, allowed
        );
        Ok(inserted)
    }
}
