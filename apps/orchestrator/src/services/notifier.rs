// [apps/orchestrator/src/services/notifier.rs]
/*!
 * =================================================================
 * APARATO: NOTIFIER SERVICE
 * CLASIFICACIÓN: BACKGROUND SERVICE (ESTRATO L1-APP)
 * RESPONSABILIDAD: RECORDATORIOS DE SUSCRIPCIÓN Y ENTREGA SALIENTE
 *
 * Disciplina at-most-once: primero el marcador con clave única, y
 * solo si el INSERT creó fila se encola el efecto visible. El aviso
 * de cuota agotada es único por usuario y día MSK, detectado por el
 * substring canónico del cuerpo.
 * =================================================================
 */

use crate::state::AppState;
use anyhow::Result;
use chrono::{Duration, Utc};
use postulante_core_clock::day_bounds_msk;
use postulante_domain_models::{Notification, NotificationScope, ReminderKind, Subscription, SubscriptionStatus};
use postulante_domain_quota::Tariff;
use std::sync::atomic::Ordering;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument, warn};

/// Substring canónico del aviso de cuota (clave de idempotencia diaria).
/// Debe permanecer estable entre versiones o los avisos del día se duplicarían.
pub const QUOTA_EXHAUSTED_MARKER: &str = "Дневной лимит откликов и автооткликов исчерпан";
/// Horizonte de escaneo de suscripciones por vencer.
const REMINDER_HORIZON_DAYS: i64 = 4;
/// Lote de entrega por tick.
const DELIVERY_BATCH_SIZE: i64 = 25;
/// Pausa entre envíos de una difusión (amortiguador de rate-limit).
const FANOUT_PAUSE_MILLIS: u64 = 50;

/**
 * Aviso de cuota agotada, a lo sumo una vez por usuario y día MSK.
 * Lo disparan tanto el planificador como el despachador.
 */
#[instrument(skip(state, reset_label))]
pub async fn notify_quota_exhausted_once(
    state: &AppState,
    user_id: i64,
    reset_label: &str,
    tariff: Tariff,
) -> Result<()> {
    let (day_start_utc, _) = day_bounds_msk(Utc::now());

    let already_notified = state
        .notification_repository
        .has_marker_since(user_id, QUOTA_EXHAUSTED_MARKER, day_start_utc)
        .await?;
    if already_notified {
        return Ok(());
    }

    let body = match tariff {
        Tariff::Free => format!(
            "⏳ {}.\nЛимит обновится в {} (МСК).\n\n\
             Увеличьте лимит до 200 откликов в день. Подписка → /payment",
            QUOTA_EXHAUSTED_MARKER, reset_label
        ),
        Tariff::Paid => format!(
            "⏳ {}.\nЛимит обновится в {} (МСК).",
            QUOTA_EXHAUSTED_MARKER, reset_label
        ),
    };

    state.notification_repository.enqueue_for_user(user_id, &body).await?;
    info!("🔔 [NOTIFIER]: Quota-exhausted notice queued for user {}.", user_id);
    Ok(())
}

pub struct NotifierService {
    application_shared_state: AppState,
}

impl NotifierService {
    pub fn new(application_state: AppState) -> Self {
        Self { application_shared_state: application_state }
    }

    /// Bucle perpetuo: recordatorios + entrega, cada tick.
    pub async fn spawn_notifier_daemon(self) {
        let state = &self.application_shared_state;

        if !state.settings.notifier_enabled {
            info!("🔕 [NOTIFIER_DAEMON]: Disabled by configuration, not starting.");
            return;
        }
        if !state.telegram_gateway.is_enabled() {
            warn!("🔕 [NOTIFIER_DAEMON]: Bot token missing, notifier disabled.");
            return;
        }

        let tick_interval = state.settings.notifier_every_sec;
        info!("🔔 [NOTIFIER_DAEMON]: Reminder & delivery loop online (every {}s).", tick_interval);

        loop {
            tokio::time::sleep(StdDuration::from_secs(tick_interval)).await;

            if state.shutdown_flag.load(Ordering::SeqCst) {
                info!("🏁 [NOTIFIER_DAEMON]: Shutdown flag observed, exiting loop.");
                break;
            }

            if let Err(reminder_fault) = self.schedule_subscription_reminders().await {
                error!("❌ [NOTIFIER_DAEMON]: Reminder scheduling collapsed: {}", reminder_fault);
            }

            match self.deliver_pending().await {
                Ok(delivered) if delivered > 0 => {
                    info!("📨 [NOTIFIER_DAEMON]: {} notifications delivered.", delivered);
                }
                Ok(_) => {}
                Err(delivery_fault) => {
                    error!("❌ [NOTIFIER_DAEMON]: Delivery pass collapsed: {}", delivery_fault);
                }
            }
        }
    }

    /**
     * Recordatorios automáticos: D3/D1 para las que vencen pronto y
     * EXPIRED (con transición de estado) para las vencidas. Marcador
     * primero; efecto solo si el marcador se creó en esta pasada.
     */
    #[instrument(skip(self))]
    pub async fn schedule_subscription_reminders(&self) -> Result<u32> {
        let state = &self.application_shared_state;
        let now_utc = Utc::now();
        let horizon = now_utc + Duration::days(REMINDER_HORIZON_DAYS);

        let expiring = state.subscription_repository.scan_expiring(horizon).await?;
        let mut created = 0u32;

        for subscription in expiring {
            if subscription.expires_at <= now_utc {
                created += self.handle_expired_subscription(&subscription).await?;
                continue;
            }

            if subscription.status != SubscriptionStatus::Active {
                continue;
            }

            let days_left = subscription.ceil_days_left(now_utc);
            let reminder_kind = match days_left {
                3 => ReminderKind::D3,
                1 => ReminderKind::D1,
                _ => continue,
            };

            let marker_created = state
                .subscription_repository
                .insert_reminder_marker(subscription.id, reminder_kind)
                .await?;
            if !marker_created {
                continue;
            }

            let body = format!(
                "⚠️ Подписка заканчивается через {}.\n\
                 Чтобы не потерять лимит 200 откликов в сутки — продлите сейчас → /payment",
                plural_days_ru(days_left)
            );
            state
                .notification_repository
                .enqueue_for_user(subscription.user_id, &body)
                .await?;
            created += 1;
        }

        Ok(created)
    }

    async fn handle_expired_subscription(&self, subscription: &Subscription) -> Result<u32> {
        let state = &self.application_shared_state;

        if subscription.status == SubscriptionStatus::Active {
            state.subscription_repository.mark_expired(subscription.id).await?;
            info!("⌛ [NOTIFIER]: Subscription {} transitioned to expired.", subscription.id);
        }

        let marker_created = state
            .subscription_repository
            .insert_reminder_marker(subscription.id, ReminderKind::Expired)
            .await?;
        if !marker_created {
            return Ok(0);
        }

        let body = "⚠️ Подписка закончилась.\n\
                    Ваш лимит откликов: 10 в сутки\n\
                    Верните 200 откликов в сутки → /payment";
        state
            .notification_repository
            .enqueue_for_user(subscription.user_id, body)
            .await?;
        Ok(1)
    }

    /**
     * Entrega de pendientes vencidas: reclamo guardado por fila,
     * resolución de destinatarios por alcance y envío por el canal.
     */
    #[instrument(skip(self))]
    pub async fn deliver_pending(&self) -> Result<u32> {
        let state = &self.application_shared_state;
        let now_utc = Utc::now();

        let pending = state
            .notification_repository
            .select_pending_due(now_utc, DELIVERY_BATCH_SIZE)
            .await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut delivered = 0u32;

        for notification in pending {
            if state.shutdown_flag.load(Ordering::SeqCst) {
                break;
            }

            // Reclamo pending -> queued: cero filas = otro worker la tomó.
            if !state.notification_repository.claim_for_delivery(notification.id).await? {
                continue;
            }

            match self.deliver_one(&notification).await {
                Ok(()) => {
                    state.notification_repository.mark_sent(notification.id).await?;
                    delivered += 1;
                }
                Err(delivery_fault) => {
                    state
                        .notification_repository
                        .mark_failed(notification.id, &delivery_fault.to_string())
                        .await?;
                    warn!(
                        notification_id = notification.id,
                        "📭 [NOTIFIER]: Delivery failed: {}", delivery_fault
                    );
                }
            }
        }

        Ok(delivered)
    }

    async fn deliver_one(&self, notification: &Notification) -> Result<()> {
        let state = &self.application_shared_state;

        let recipient_ids = self.resolve_recipients(notification).await?;
        if recipient_ids.is_empty() {
            anyhow::bail!("no recipients resolved for scope {}", notification.scope.as_label());
        }

        let is_fanout = recipient_ids.len() > 1;
        for messenger_id in recipient_ids {
            state.telegram_gateway.send_message(messenger_id, &notification.body).await?;
            if is_fanout {
                tokio::time::sleep(StdDuration::from_millis(FANOUT_PAUSE_MILLIS)).await;
            }
        }
        Ok(())
    }

    async fn resolve_recipients(&self, notification: &Notification) -> Result<Vec<i64>> {
        let state = &self.application_shared_state;

        match &notification.scope {
            NotificationScope::User => {
                let Some(user_id) = notification.user_id else {
                    anyhow::bail!("user-scoped notification without user_id");
                };
                let Some(user) = state.user_repository.find_by_id(user_id).await? else {
                    anyhow::bail!("user {} not found", user_id);
                };
                Ok(vec![user.tg_id])
            }
            NotificationScope::All => Ok(state.user_repository.list_messenger_ids().await?),
            NotificationScope::Segment(segment_key) => {
                let recipients = state
                    .notification_repository
                    .segment_recipient_ids(segment_key)
                    .await?;
                debug!("👥 [NOTIFIER]: Segment '{}' resolved to {} recipients.", segment_key, recipients.len());
                Ok(recipients)
            }
        }
    }
}

/// Plural ruso de "día" para los cuerpos de recordatorio.
fn plural_days_ru(days: i64) -> String {
    let n = days.abs();
    if n % 10 == 1 && n % 100 != 11 {
        format!("{} день", n)
    } else if (2..=4).contains(&(n % 10)) && !(12..=14).contains(&(n % 100)) {
        format!("{} дня", n)
    } else {
        format!("{} дней", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn russian_day_plurals_follow_declension() {
        assert_eq!(plural_days_ru(1), "1 день");
        assert_eq!(plural_days_ru(3), "3 дня");
        assert_eq!(plural_days_ru(5), "5 дней");
        assert_eq!(plural_days_ru(11), "11 дней");
        assert_eq!(plural_days_ru(21), "21 день");
    }
}
