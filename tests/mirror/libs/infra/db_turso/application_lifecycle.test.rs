// [tests/mirror/libs/infra/db_turso/application_lifecycle.test.rs]
/**
 * =================================================================
 * APARATO: APPLICATION LIFECYCLE TEST
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: CERTIFICACIÓN DE ENCOLADO, RECLAMO Y TRANSICIONES
 * =================================================================
 */

use chrono::{Duration, Utc};
use postulante_core_clock::day_bounds_msk;
use postulante_domain_models::{ApplicationKind, ApplicationStatus};
use postulante_infra_db::repositories::{ApplicationRepository, UserRepository};
use postulante_infra_db::DbClient;

async fn memory_client(name: &str) -> DbClient {
    DbClient::connect(&format!("file:{}?mode=memory&cache=shared", name), None)
        .await
        .expect("memory ledger ignition failed")
}

#[tokio::test]
async fn certify_disk_ledger_bootstrap_is_idempotent() {
    println!("\n💽 [PROVING_GROUNDS]: Auditing on-disk schema bootstrap...");

    let scratch_dir = tempfile::tempdir().expect("scratch dir allocation failed");
    let ledger_path = scratch_dir.path().join("ledger.db");
    let ledger_url = ledger_path.to_string_lossy().to_string();

    // Dos igniciones consecutivas sobre el mismo archivo: el esquema
    // idempotente no debe chocar consigo mismo.
    let first_boot = DbClient::connect(&ledger_url, None).await.expect("first ignition failed");
    let users = UserRepository::new(first_boot.clone());
    let user_id = users.upsert_seen(9001, Some("disk")).await.unwrap();
    drop(users);
    drop(first_boot);

    let second_boot = DbClient::connect(&ledger_url, None).await.expect("re-ignition failed");
    let users = UserRepository::new(second_boot.clone());
    let resolved = users.resolve_user_id(9001).await.unwrap();
    assert_eq!(resolved, Some(user_id), "data must survive re-ignition");

    println!("   ✅ [SUCCESS]: Schema bootstrap idempotent on persistent storage.");
}

#[tokio::test]
async fn certify_batch_enqueue_is_idempotent_per_vacancy() {
    println!("\n📥 [PROVING_GROUNDS]: Auditing idempotent batch enqueue...");

    let client = memory_client("app_enqueue_test").await;
    let users = UserRepository::new(client.clone());
    let applications = ApplicationRepository::new(client.clone());

    let user_id = users.upsert_seen(1001, Some("candidate")).await.unwrap();

    // Fase 1: primer lote completo.
    let first_batch = applications
        .enqueue_batch(user_id, &[10, 20, 30], "r-1", Some("Здравствуйте!"), ApplicationKind::Auto, None)
        .await
        .unwrap();
    assert_eq!(first_batch, 3, "first batch must insert every candidate");

    // Fase 2: lote solapado — solo la vacante nueva entra.
    let second_batch = applications
        .enqueue_batch(user_id, &[20, 30, 40], "r-1", None, ApplicationKind::Auto, None)
        .await
        .unwrap();
    assert_eq!(second_batch, 1, "overlapping batch must only insert vacancy 40");

    // Fase 3: repetir el lote exacto no inserta nada.
    let third_batch = applications
        .enqueue_batch(user_id, &[10, 20, 30, 40], "r-1", None, ApplicationKind::Auto, None)
        .await
        .unwrap();
    assert_eq!(third_batch, 0, "exact replay must be absorbed by uniqueness");

    let known = applications.filter_known_vacancies(user_id, &[10, 40, 99]).await.unwrap();
    assert_eq!(known.len(), 2);
    assert!(known.contains(&10) && known.contains(&40));

    println!("   ✅ [SUCCESS]: (user, vacancy) uniqueness absorbed every duplicate.");
}

#[tokio::test]
async fn certify_effective_count_covers_msk_day() {
    println!("\n📊 [PROVING_GROUNDS]: Auditing effective daily count...");

    let client = memory_client("app_count_test").await;
    let users = UserRepository::new(client.clone());
    let applications = ApplicationRepository::new(client.clone());

    let user_id = users.upsert_seen(1002, None).await.unwrap();
    applications
        .enqueue_batch(user_id, &[1, 2, 3, 4, 5], "r-1", None, ApplicationKind::Manual, None)
        .await
        .unwrap();

    let (day_start, day_end) = day_bounds_msk(Utc::now());
    let used_today = applications.count_effective_in_window(user_id, day_start, day_end).await.unwrap();
    assert_eq!(used_today, 5, "all rows created now belong to the current MSK day");

    // Una ventana pasada no captura nada.
    let stale = applications
        .count_effective_in_window(user_id, day_start - Duration::days(2), day_start - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(stale, 0);

    println!("   ✅ [SUCCESS]: Derived quota count bounded to the MSK window.");
}

#[tokio::test]
async fn certify_claim_lease_excludes_concurrent_workers() {
    println!("\n🔒 [PROVING_GROUNDS]: Auditing claim-with-lease exclusivity...");

    let client = memory_client("app_claim_test").await;
    let users = UserRepository::new(client.clone());
    let applications = ApplicationRepository::new(client.clone());

    let user_id = users.upsert_seen(1003, None).await.unwrap();
    applications
        .enqueue_batch(user_id, &[77], "r-1", None, ApplicationKind::Auto, None)
        .await
        .unwrap();

    let now = Utc::now();
    let due = applications.select_due_batch(now, 10).await.unwrap();
    assert_eq!(due.len(), 1, "freshly queued row must be due immediately");
    let row_id = due[0].id;

    // Fase 1: el primer worker reclama.
    let lease_until = now + Duration::seconds(120);
    assert!(applications.claim_for_dispatch(row_id, now, lease_until).await.unwrap());

    // Fase 2: el segundo worker encuentra el lease vigente y salta.
    assert!(!applications.claim_for_dispatch(row_id, now, lease_until).await.unwrap());

    // Fase 3: con el lease vencido la fila vuelve a ser reclamable.
    let after_lease = lease_until + Duration::seconds(1);
    assert!(applications
        .claim_for_dispatch(row_id, after_lease, after_lease + Duration::seconds(120))
        .await
        .unwrap());

    println!("   ✅ [SUCCESS]: Lease semantics mirror FOR UPDATE SKIP LOCKED.");
}

#[tokio::test]
async fn certify_transitions_are_monotone() {
    println!("\n🧭 [PROVING_GROUNDS]: Auditing state machine monotonicity...");

    let client = memory_client("app_transitions_test").await;
    let users = UserRepository::new(client.clone());
    let applications = ApplicationRepository::new(client.clone());

    let user_id = users.upsert_seen(1004, None).await.unwrap();
    applications
        .enqueue_batch(user_id, &[501, 502], "r-1", None, ApplicationKind::Auto, None)
        .await
        .unwrap();

    let due = applications.select_due_batch(Utc::now(), 10).await.unwrap();
    let (first_id, second_id) = (due[0].id, due[1].id);

    // Fase 1: retry con backoff absoluto → la fila deja de ser elegible.
    let next_try = Utc::now() + Duration::seconds(60);
    applications.schedule_retry(first_id, "rate/server: 503", 1, next_try).await.unwrap();

    let retried = applications.find_by_id(first_id).await.unwrap().unwrap();
    assert_eq!(retried.status, ApplicationStatus::Retry);
    assert_eq!(retried.attempt_count, 1);
    assert!(retried.next_try_at.is_some());

    let due_now = applications.select_due_batch(Utc::now(), 10).await.unwrap();
    assert!(due_now.iter().all(|a| a.id != first_id), "parked row must not be due");

    // Fase 2: al vencer el backoff vuelve y culmina en sent.
    let due_later = applications.select_due_batch(next_try + Duration::seconds(1), 10).await.unwrap();
    assert!(due_later.iter().any(|a| a.id == first_id));

    applications.mark_sent(first_id, None).await.unwrap();
    let sent = applications.find_by_id(first_id).await.unwrap().unwrap();
    assert_eq!(sent.status, ApplicationStatus::Sent);
    assert!(sent.sent_at.is_some());
    assert!(sent.error.is_none());

    // Fase 3: los estados terminales ignoran cualquier transición posterior.
    applications.schedule_retry(first_id, "late retry", 9, Utc::now()).await.unwrap();
    applications.mark_error(first_id, "late error").await.unwrap();
    let still_sent = applications.find_by_id(first_id).await.unwrap().unwrap();
    assert_eq!(still_sent.status, ApplicationStatus::Sent);
    assert_eq!(still_sent.attempt_count, 1, "terminal rows never mutate again");

    // Fase 4: salto de negocio terminal con código estable.
    applications.mark_error(second_id, "test_required").await.unwrap();
    let skipped = applications.find_by_id(second_id).await.unwrap().unwrap();
    assert_eq!(skipped.status, ApplicationStatus::Error);
    assert_eq!(skipped.error.as_deref(), Some("test_required"));
    assert_eq!(skipped.attempt_count, 0, "business skips do not consume attempts");

    println!("   ✅ [SUCCESS]: sent/error are terminal, retries monotone.");
}

#[tokio::test]
async fn certify_quota_parking_until_day_end() {
    println!("\n⏳ [PROVING_GROUNDS]: Auditing quota parking to MSK day end...");

    let client = memory_client("app_parking_test").await;
    let users = UserRepository::new(client.clone());
    let applications = ApplicationRepository::new(client.clone());

    let user_id = users.upsert_seen(1005, None).await.unwrap();
    applications
        .enqueue_batch(user_id, &[900], "r-1", None, ApplicationKind::Auto, None)
        .await
        .unwrap();

    let now = Utc::now();
    let (_, day_end) = day_bounds_msk(now);
    let row_id = applications.select_due_batch(now, 1).await.unwrap()[0].id;

    applications.park_until(row_id, day_end).await.unwrap();

    // Antes de la frontera: invisible. Después: elegible de nuevo.
    assert!(applications.select_due_batch(day_end - Duration::seconds(1), 10).await.unwrap().is_empty());
    let after_midnight = applications.select_due_batch(day_end + Duration::seconds(1), 10).await.unwrap();
    assert_eq!(after_midnight.len(), 1);
    assert_eq!(after_midnight[0].id, row_id);

    println!("   ✅ [SUCCESS]: Parked rows resurface at the first tick after midnight.");
}
