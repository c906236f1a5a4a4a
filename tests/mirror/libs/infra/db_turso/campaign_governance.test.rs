// [tests/mirror/libs/infra/db_turso/campaign_governance.test.rs]
/**
 * =================================================================
 * APARATO: CAMPAIGN GOVERNANCE TEST
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: CAMPAÑA ÚNICA ACTIVA, CONTADORES Y RESET DIARIO
 * =================================================================
 */

use chrono::Utc;
use postulante_domain_models::{CampaignStatus, SavedRequest};
use postulante_infra_db::repositories::{CampaignRepository, SavedRequestRepository, UserRepository};
use postulante_infra_db::{DbClient, DbError};

async fn memory_client(name: &str) -> DbClient {
    DbClient::connect(&format!("file:{}?mode=memory&cache=shared", name), None)
        .await
        .expect("memory ledger ignition failed")
}

fn draft_request(user_id: i64, title: &str) -> SavedRequest {
    let now = Utc::now();
    SavedRequest {
        id: 0,
        user_id,
        title: title.to_string(),
        query: "rust developer".to_string(),
        area: Some(1),
        employment: vec!["full".to_string()],
        schedule: vec!["remote".to_string()],
        professional_roles: vec![96],
        search_fields: vec![],
        cover_letter: "Здравствуйте! Откликаюсь на вакансию.".to_string(),
        query_params: "area=1&employment=full&text=rust+developer".to_string(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn certify_single_active_campaign_invariant() {
    println!("\n🚦 [PROVING_GROUNDS]: Auditing one-active-campaign invariant...");

    let client = memory_client("campaign_unique_test").await;
    let users = UserRepository::new(client.clone());
    let requests = SavedRequestRepository::new(client.clone());
    let campaigns = CampaignRepository::new(client.clone());

    let user_id = users.upsert_seen(2001, None).await.unwrap();
    let request_a = requests.create(&draft_request(user_id, "Backend")).await.unwrap();
    let request_b = requests.create(&draft_request(user_id, "QA")).await.unwrap();

    let first = campaigns.upsert(user_id, "Backend hunt", request_a.id, "r-1", 50).await.unwrap();
    let second = campaigns.upsert(user_id, "QA hunt", request_b.id, "r-2", 30).await.unwrap();

    // Fase 1: la primera activación pasa.
    campaigns.start(first, user_id).await.unwrap();

    // Fase 2: la segunda choca con el índice parcial → conflicto lógico.
    match campaigns.start(second, user_id).await {
        Err(DbError::Conflict(_)) => {}
        other => panic!("second activation must conflict, got {:?}", other),
    }

    // Fase 3: detener la primera libera el cupo; stop es idempotente.
    campaigns.stop(first, user_id).await.unwrap();
    campaigns.stop(first, user_id).await.unwrap();
    campaigns.start(second, user_id).await.unwrap();

    let active = campaigns.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second);
    assert_eq!(active[0].status, CampaignStatus::Active);

    println!("   ✅ [SUCCESS]: At most one active campaign per user, always.");
}

#[tokio::test]
async fn certify_counters_bump_and_daily_reset() {
    println!("\n🌅 [PROVING_GROUNDS]: Auditing counters and MSK-day reset...");

    let client = memory_client("campaign_counters_test").await;
    let users = UserRepository::new(client.clone());
    let requests = SavedRequestRepository::new(client.clone());
    let campaigns = CampaignRepository::new(client.clone());

    let user_id = users.upsert_seen(2002, None).await.unwrap();
    let request = requests.create(&draft_request(user_id, "Data")).await.unwrap();
    let campaign_id = campaigns.upsert(user_id, "Data hunt", request.id, "r-9", 40).await.unwrap();

    // Fase 1: dos bumps del mismo día se acumulan.
    campaigns.bump_counters(campaign_id, 5, "2026-08-01").await.unwrap();
    campaigns.bump_counters(campaign_id, 1, "2026-08-01").await.unwrap();

    let snapshot = campaigns.find_by_id(campaign_id, user_id).await.unwrap().unwrap();
    assert_eq!(snapshot.sent_today, 6);
    assert_eq!(snapshot.sent_total, 6);
    assert_eq!(snapshot.remaining_for_today(), 34);

    // Fase 2: el amanecer MSK reinicia sent_today pero preserva el total.
    let reset_count = campaigns.reset_daily_counters("2026-08-02").await.unwrap();
    assert_eq!(reset_count, 1);

    let morning = campaigns.find_by_id(campaign_id, user_id).await.unwrap().unwrap();
    assert_eq!(morning.sent_today, 0);
    assert_eq!(morning.sent_total, 6);
    assert_eq!(morning.counters_date.as_deref(), Some("2026-08-02"));

    // Fase 3: el mismo día no se reinicia dos veces.
    let second_reset = campaigns.reset_daily_counters("2026-08-02").await.unwrap();
    assert_eq!(second_reset, 0);

    println!("   ✅ [SUCCESS]: sent_today bounded to the MSK day, sent_total immutable.");
}

#[tokio::test]
async fn certify_upsert_preserves_identity_and_summaries_aggregate() {
    println!("\n🧾 [PROVING_GROUNDS]: Auditing campaign upsert and summaries...");

    let client = memory_client("campaign_summary_test").await;
    let users = UserRepository::new(client.clone());
    let requests = SavedRequestRepository::new(client.clone());
    let campaigns = CampaignRepository::new(client.clone());

    let user_id = users.upsert_seen(2003, None).await.unwrap();
    let request = requests.create(&draft_request(user_id, "DevOps")).await.unwrap();

    let original = campaigns.upsert(user_id, "DevOps hunt", request.id, "r-3", 20).await.unwrap();
    // Re-upsert por la misma tripleta: misma fila, título y tope nuevos.
    let replayed = campaigns.upsert(user_id, "DevOps hunt v2", request.id, "r-3", 25).await.unwrap();
    assert_eq!(original, replayed);

    let summaries = campaigns.list_summaries_for_user(user_id, 20, 0).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].campaign.title, "DevOps hunt v2");
    assert_eq!(summaries[0].campaign.daily_limit, 25);
    assert_eq!(summaries[0].query_params, "area=1&employment=full&text=rust+developer");
    assert_eq!(summaries[0].sent_count, 0);
    assert_eq!(summaries[0].queued_count, 0);

    println!("   ✅ [SUCCESS]: Upsert keeps identity; summaries join request data.");
}
