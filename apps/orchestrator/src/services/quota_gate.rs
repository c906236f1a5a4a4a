// [apps/orchestrator/src/services/quota_gate.rs]
/*!
 * =================================================================
 * APARATO: QUOTA GATE
 * CLASIFICACIÓN: APPLICATION SERVICE (ESTRATO L1-APP)
 * RESPONSABILIDAD: VISTA DE CUOTA DERIVADA, CONSULTADA EN CADA TICK
 *
 * Sin contadores desnormalizados: la única fuente de verdad es la
 * tabla de postulaciones acotada al día MSK.
 * =================================================================
 */

use crate::state::AppState;
use anyhow::Result;
use chrono::Utc;
use postulante_core_clock::day_bounds_msk;
use postulante_domain_quota::{quota_view, QuotaView};

/// Compone la vista de cuota del usuario para el instante actual.
pub async fn quota_view_for_user(state: &AppState, user_id: i64) -> Result<QuotaView> {
    let now_utc = Utc::now();
    let (window_start, window_end) = day_bounds_msk(now_utc);

    let has_active_subscription = state
        .subscription_repository
        .has_active_unexpired(user_id, now_utc)
        .await?;

    let used_today = state
        .application_repository
        .count_effective_in_window(user_id, window_start, window_end)
        .await?;

    Ok(quota_view(has_active_subscription, used_today, now_utc))
}
