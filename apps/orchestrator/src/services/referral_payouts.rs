// [apps/orchestrator/src/services/referral_payouts.rs]
/*!
 * =================================================================
 * APARATO: REFERRAL PAYOUT ROUTINE
 * CLASIFICACIÓN: APPLICATION SERVICE (ESTRATO L1-APP)
 * RESPONSABILIDAD: BONOS L1..L3 SOBRE PAGOS CONFIRMADOS
 *
 * Colaborador de contrato estrecho: el núcleo lo invoca con
 * (pagador, tarifa, precio) SOLO en el primer tránsito del pago a
 * 'paid' y trata su resultado como consultivo — un fallo aquí jamás
 * rompe el webhook.
 * =================================================================
 */

use crate::state::AppState;
use anyhow::Result;
use postulante_domain_models::ReferralEdge;
use tracing::{info, instrument};

/// Porcentajes por nivel de ascendencia (L1, L2, L3).
const PAYOUT_PERCENTS: [f64; 3] = [20.0, 10.0, 5.0];

/**
 * Acredita los bonos de la cadena de uplines del pagador.
 *
 * # Returns:
 * El número de apuntes creados (diagnóstico del llamador).
 */
#[instrument(skip(state))]
pub async fn payout_on_payment(
    state: &AppState,
    payer_user_id: i64,
    tariff_id: i64,
    price_cents: i64,
) -> Result<u32> {
    if payer_user_id <= 0 || tariff_id <= 0 || price_cents <= 0 {
        return Ok(0);
    }

    // Ancestros materializados; si el grafo está vacío se reconstruye
    // la cadena por referred_by (vínculos previos a la materialización).
    let mut uplines = state.referral_repository.uplines(payer_user_id).await?;
    if uplines.is_empty() {
        uplines = walk_referred_by_chain(state, payer_user_id).await?;
    }

    let mut created = 0u32;
    for edge in uplines {
        let percent = match edge.level {
            1..=3 => PAYOUT_PERCENTS[(edge.level - 1) as usize],
            _ => continue,
        };

        let reward_cents = ((price_cents as f64) * (percent / 100.0)).round() as i64;
        if reward_cents <= 0 {
            continue;
        }

        state
            .referral_repository
            .add_transaction(edge.parent_user_id, reward_cents, &format!("bonus_l{}", edge.level), payer_user_id)
            .await?;
        state.referral_repository.add_balance(edge.parent_user_id, reward_cents).await?;
        created += 1;
    }

    if created > 0 {
        info!(
            "🎁 [REFERRAL_PAYOUT]: {} bonus entries credited for payer {} (tariff {}).",
            created, payer_user_id, tariff_id
        );
    }
    Ok(created)
}

async fn walk_referred_by_chain(state: &AppState, payer_user_id: i64) -> Result<Vec<ReferralEdge>> {
    let mut chain = Vec::new();
    let mut cursor = payer_user_id;

    for level in 1..=3i64 {
        match state.user_repository.referred_by(cursor).await? {
            Some(ancestor_id) => {
                chain.push(ReferralEdge { user_id: payer_user_id, parent_user_id: ancestor_id, level });
                cursor = ancestor_id;
            }
            None => break,
        }
    }
    Ok(chain)
}
