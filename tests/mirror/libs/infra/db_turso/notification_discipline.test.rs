// [tests/mirror/libs/infra/db_turso/notification_discipline.test.rs]
/**
 * =================================================================
 * APARATO: NOTIFICATION DISCIPLINE TEST
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: AT-MOST-ONCE EN AVISOS DIARIOS Y RECORDATORIOS
 * =================================================================
 */

use chrono::{Duration, Utc};
use postulante_core_clock::day_bounds_msk;
use postulante_domain_models::ReminderKind;
use postulante_infra_db::repositories::{
    NotificationRepository, SubscriptionRepository, UserRepository,
};
use postulante_infra_db::DbClient;

async fn memory_client(name: &str) -> DbClient {
    DbClient::connect(&format!("file:{}?mode=memory&cache=shared", name), None)
        .await
        .expect("memory ledger ignition failed")
}

const QUOTA_MARKER: &str = "Дневной лимит откликов и автооткликов исчерпан";

#[tokio::test]
async fn certify_quota_marker_window_is_per_msk_day() {
    println!("\n🔔 [PROVING_GROUNDS]: Auditing daily quota-notice marker...");

    let client = memory_client("notify_marker_test").await;
    let users = UserRepository::new(client.clone());
    let notifications = NotificationRepository::new(client.clone());

    let user_id = users.upsert_seen(3001, None).await.unwrap();
    let (day_start, _) = day_bounds_msk(Utc::now());

    // Fase 1: sin aviso previo el marcador no existe.
    assert!(!notifications.has_marker_since(user_id, QUOTA_MARKER, day_start).await.unwrap());

    // Fase 2: tras encolar el aviso, la ventana del día lo detecta.
    let body = format!("⏳ {}.\nЛимит обновится в 00:00 02.08.2026 (МСК).", QUOTA_MARKER);
    notifications.enqueue_for_user(user_id, &body).await.unwrap();
    assert!(notifications.has_marker_since(user_id, QUOTA_MARKER, day_start).await.unwrap());

    // Fase 3: una ventana futura (el día siguiente) no lo ve.
    let tomorrow = day_start + Duration::days(1);
    assert!(!notifications.has_marker_since(user_id, QUOTA_MARKER, tomorrow).await.unwrap());

    println!("   ✅ [SUCCESS]: Marker detection bounded to the MSK day window.");
}

#[tokio::test]
async fn certify_delivery_claim_is_exclusive() {
    println!("\n📨 [PROVING_GROUNDS]: Auditing guarded delivery claim...");

    let client = memory_client("notify_claim_test").await;
    let users = UserRepository::new(client.clone());
    let notifications = NotificationRepository::new(client.clone());

    let user_id = users.upsert_seen(3002, None).await.unwrap();
    let notification_id = notifications.enqueue_for_user(user_id, "ping").await.unwrap();

    let pending = notifications.select_pending_due(Utc::now() + Duration::seconds(1), 10).await.unwrap();
    assert_eq!(pending.len(), 1);

    // Fase 1: primer reclamo pasa, el segundo encuentra la fila tomada.
    assert!(notifications.claim_for_delivery(notification_id).await.unwrap());
    assert!(!notifications.claim_for_delivery(notification_id).await.unwrap());

    // Fase 2: sellada como enviada desaparece del lote pendiente.
    notifications.mark_sent(notification_id).await.unwrap();
    let drained = notifications.select_pending_due(Utc::now() + Duration::seconds(1), 10).await.unwrap();
    assert!(drained.is_empty());

    println!("   ✅ [SUCCESS]: pending -> queued claim admits exactly one worker.");
}

#[tokio::test]
async fn certify_subscription_reminder_markers_are_unique() {
    println!("\n⏰ [PROVING_GROUNDS]: Auditing D3/D1/EXPIRED marker uniqueness...");

    let client = memory_client("notify_reminder_test").await;
    let users = UserRepository::new(client.clone());
    let subscriptions = SubscriptionRepository::new(client.clone());

    let user_id = users.upsert_seen(3003, None).await.unwrap();
    let tariff = subscriptions.find_tariff_by_code("week").await.unwrap().unwrap();
    subscriptions
        .extend_or_create(user_id, tariff.id, tariff.period_days, Utc::now(), "test")
        .await
        .unwrap();

    let subscription = subscriptions.current_for_user(user_id).await.unwrap().unwrap();

    // Fase 1: cada clase entra una única vez en la vida de la suscripción.
    assert!(subscriptions.insert_reminder_marker(subscription.id, ReminderKind::D3).await.unwrap());
    assert!(!subscriptions.insert_reminder_marker(subscription.id, ReminderKind::D3).await.unwrap());

    assert!(subscriptions.insert_reminder_marker(subscription.id, ReminderKind::D1).await.unwrap());
    assert!(subscriptions.insert_reminder_marker(subscription.id, ReminderKind::Expired).await.unwrap());
    assert!(!subscriptions.insert_reminder_marker(subscription.id, ReminderKind::Expired).await.unwrap());

    println!("   ✅ [SUCCESS]: (subscription, kind) admits a single reminder ever.");
}

#[tokio::test]
async fn certify_segment_queries_resolve_expected_recipients() {
    println!("\n👥 [PROVING_GROUNDS]: Auditing segment recipient resolution...");

    let client = memory_client("notify_segment_test").await;
    let users = UserRepository::new(client.clone());
    let notifications = NotificationRepository::new(client.clone());
    let subscriptions = SubscriptionRepository::new(client.clone());

    let premium_user = users.upsert_seen(4001, Some("premium")).await.unwrap();
    let free_user = users.upsert_seen(4002, Some("free")).await.unwrap();

    let tariff = subscriptions.find_tariff_by_code("month").await.unwrap().unwrap();
    subscriptions
        .extend_or_create(premium_user, tariff.id, tariff.period_days, Utc::now(), "test")
        .await
        .unwrap();

    let premium_ids = notifications.segment_recipient_ids("premium").await.unwrap();
    assert_eq!(premium_ids, vec![4001]);

    let free_ids = notifications.segment_recipient_ids("no_subscription").await.unwrap();
    assert_eq!(free_ids, vec![4002]);

    // Ambos usuarios acaban de ser vistos: los dos están activos a 30 días.
    let mut active_ids = notifications.segment_recipient_ids("active_30d").await.unwrap();
    active_ids.sort();
    assert_eq!(active_ids, vec![4001, 4002]);

    // Clave desconocida: cero destinatarios, jamás un fallo.
    assert!(notifications.segment_recipient_ids("made_up_segment").await.unwrap().is_empty());

    let _ = free_user;
    println!("   ✅ [SUCCESS]: Predefined segment queries resolve correctly.");
}
