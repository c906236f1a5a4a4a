// [tests/mirror/libs/infra/db_turso/referral_ledger.test.rs]
/**
 * =================================================================
 * APARATO: REFERRAL & PAYMENT LEDGER TEST
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: GRAFO IDEMPOTENTE, PAGOS ÚNICOS Y EXTENSIONES
 * =================================================================
 */

use chrono::{Duration, Timelike, Utc};
use postulante_infra_db::repositories::{
    PaymentRepository, ReferralRepository, SubscriptionRepository, UserRepository,
};
use postulante_infra_db::DbClient;

async fn memory_client(name: &str) -> DbClient {
    DbClient::connect(&format!("file:{}?mode=memory&cache=shared", name), None)
        .await
        .expect("memory ledger ignition failed")
}

#[tokio::test]
async fn certify_referral_graph_idempotency() {
    println!("\n🤝 [PROVING_GROUNDS]: Auditing referral edge idempotency...");

    let client = memory_client("referral_graph_test").await;
    let users = UserRepository::new(client.clone());
    let referrals = ReferralRepository::new(client.clone());

    let grandparent = users.upsert_seen(5001, None).await.unwrap();
    let parent = users.upsert_seen(5002, None).await.unwrap();
    let child = users.upsert_seen(5003, None).await.unwrap();

    // Fase 1: anclaje de la cadena parent -> grandparent y child -> parent.
    assert!(users.set_parent_once(parent, grandparent).await.unwrap());
    assert!(users.set_parent_once(child, parent).await.unwrap());
    // El re-anclaje es un no-op.
    assert!(!users.set_parent_once(child, grandparent).await.unwrap());

    // Fase 2: materialización de niveles con conflicto-skip.
    assert!(referrals.insert_edge(child, parent, 1).await.unwrap());
    assert!(referrals.insert_edge(child, grandparent, 2).await.unwrap());
    assert!(!referrals.insert_edge(child, parent, 1).await.unwrap(), "replay inserts nothing");
    assert!(!referrals.insert_edge(child, child, 1).await.unwrap(), "self edges rejected");

    let (level1, level2, level3) = referrals.count_by_level(parent).await.unwrap();
    assert_eq!((level1, level2, level3), (1, 0, 0));
    let (g1, g2, _) = referrals.count_by_level(grandparent).await.unwrap();
    assert_eq!((g1, g2), (1, 1));

    let uplines = referrals.uplines(child).await.unwrap();
    assert_eq!(uplines.len(), 2);
    assert_eq!((uplines[0].level, uplines[0].parent_user_id), (1, parent));
    assert_eq!((uplines[1].level, uplines[1].parent_user_id), (2, grandparent));

    println!("   ✅ [SUCCESS]: Graph triples unique, self-edges refused.");
}

#[tokio::test]
async fn certify_referral_codes_are_stable_and_unique() {
    println!("\n🎟️ [PROVING_GROUNDS]: Auditing referral code generation...");

    let client = memory_client("referral_code_test").await;
    let users = UserRepository::new(client.clone());

    let user_id = users.upsert_seen(5004, None).await.unwrap();

    let first = users.ensure_ref_code(user_id).await.unwrap();
    let second = users.ensure_ref_code(user_id).await.unwrap();
    assert_eq!(first, second, "ensure must be stable per user");
    assert_eq!(first.len(), 8);
    assert!(first.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    assert_eq!(users.find_by_ref_code(&first).await.unwrap(), Some(user_id));

    // Ref pendiente: first-write-wins.
    assert!(users.store_pending_ref(user_id, "abc123xy").await.unwrap());
    assert!(!users.store_pending_ref(user_id, "OTHER111").await.unwrap());
    let profile = users.find_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(profile.pending_ref.as_deref(), Some("ABC123XY"));

    println!("   ✅ [SUCCESS]: Codes stable, uppercase, first-write-wins pending ref.");
}

#[tokio::test]
async fn certify_payment_first_paid_transition_gates_effects() {
    println!("\n💰 [PROVING_GROUNDS]: Auditing payment idempotency gate...");

    let client = memory_client("payment_gate_test").await;
    let users = UserRepository::new(client.clone());
    let payments = PaymentRepository::new(client.clone());

    let user_id = users.upsert_seen(5005, None).await.unwrap();

    // Fase 1: primer webhook → tránsito a paid.
    let first = payments
        .upsert_paid(user_id, "cloudpayments", "txn-777", 1, 69_000, "{}", "CP week")
        .await
        .unwrap();
    assert!(first, "first confirmation must report the paid transition");

    // Fase 2: reintentos del proveedor → sin efecto.
    let replay = payments
        .upsert_paid(user_id, "cloudpayments", "txn-777", 1, 69_000, "{}", "CP week")
        .await
        .unwrap();
    assert!(!replay, "provider retries must be absorbed");

    // Fase 3: un fallo previo transiciona a paid una única vez.
    payments.record_failed("cloudpayments", "txn-888", 69_000, "{}").await.unwrap();
    let recovered = payments
        .upsert_paid(user_id, "cloudpayments", "txn-888", 1, 69_000, "{}", "CP week")
        .await
        .unwrap();
    assert!(recovered);

    println!("   ✅ [SUCCESS]: (provider, provider_id) gates effects exactly once.");
}

#[tokio::test]
async fn certify_subscription_extension_stacks_from_expiry() {
    println!("\n📅 [PROVING_GROUNDS]: Auditing subscription extension base...");

    let client = memory_client("subscription_extend_test").await;
    let users = UserRepository::new(client.clone());
    let subscriptions = SubscriptionRepository::new(client.clone());

    let user_id = users.upsert_seen(5006, None).await.unwrap();
    let tariff = subscriptions.find_tariff_by_code("week").await.unwrap().unwrap();
    // Alineado al segundo: el Ledger persiste marcas sin subsegundos.
    let now = Utc::now().with_nanosecond(0).expect("zero nanos is valid");

    // Fase 1: sin suscripción previa la base es `now`.
    let first_expiry = subscriptions
        .extend_or_create(user_id, tariff.id, tariff.period_days, now, "test")
        .await
        .unwrap();
    assert_eq!(first_expiry, now + Duration::days(7));
    assert!(subscriptions.has_active_unexpired(user_id, now).await.unwrap());

    // Fase 2: un segundo pago apila desde el vencimiento vigente.
    let second_expiry = subscriptions
        .extend_or_create(user_id, tariff.id, tariff.period_days, now, "test")
        .await
        .unwrap();
    assert_eq!(second_expiry, first_expiry + Duration::days(7));

    let current = subscriptions.current_for_user(user_id).await.unwrap().unwrap();
    assert_eq!(current.ceil_days_left(now), 14);

    println!("   ✅ [SUCCESS]: Extension base is max(now, current expiry).");
}
