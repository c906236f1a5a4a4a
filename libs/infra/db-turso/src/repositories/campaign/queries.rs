// [libs/infra/db-turso/src/repositories/campaign/queries.rs]
/*!
 * =================================================================
 * APARATO: CAMPAIGN SQL STORE
 * CLASIFICACIÓN: INFRASTRUCTURE SQL (ESTRATO L3)
 * RESPONSABILIDAD: SENTENCIAS ATÓMICAS DEL CICLO DE CAMPAÑAS
 *
 * Las transiciones usan guardias de estado en el WHERE para que cada
 * cambio de propiedad sea una operación indivisible del motor.
 * =================================================================
 */

pub const CAMPAIGN_COLUMNS: &str = "id, user_id, title, saved_request_id, resume_id, status, \
                                    daily_limit, sent_today, sent_total, counters_date, \
                                    started_at, stopped_at, created_at, updated_at";

/// Upsert por (user, resume, saved_request): conserva contadores e
/// historial, refresca título y presupuesto.
pub const UPSERT_CAMPAIGN: &str = r#"
    INSERT INTO campaigns (user_id, title, saved_request_id, resume_id, daily_limit,
                           status, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, 'stopped', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
    ON CONFLICT(user_id, resume_id, saved_request_id) DO UPDATE SET
        title = excluded.title,
        daily_limit = excluded.daily_limit,
        updated_at = CURRENT_TIMESTAMP
    RETURNING id
"#;

/// Activación: el índice único parcial rechaza una segunda activa.
pub const START_CAMPAIGN: &str = r#"
    UPDATE campaigns
    SET status = 'active',
        started_at = COALESCE(started_at, CURRENT_TIMESTAMP),
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1 AND user_id = ?2
"#;

/// Detención idempotente.
pub const STOP_CAMPAIGN: &str = r#"
    UPDATE campaigns
    SET status = 'stopped',
        stopped_at = CURRENT_TIMESTAMP,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1 AND user_id = ?2
"#;

pub const DELETE_CAMPAIGN: &str = "DELETE FROM campaigns WHERE id = ?1 AND user_id = ?2";

/// Bump atómico de contadores tras un encolado exitoso.
pub const BUMP_COUNTERS: &str = r#"
    UPDATE campaigns
    SET sent_today = sent_today + ?2,
        sent_total = sent_total + ?2,
        counters_date = ?3,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1
"#;

/// Amanecer MSK: los contadores del día anterior vuelven a cero.
pub const RESET_DAILY_COUNTERS: &str = r#"
    UPDATE campaigns
    SET sent_today = 0,
        counters_date = ?1,
        updated_at = CURRENT_TIMESTAMP
    WHERE counters_date IS NULL OR counters_date <> ?1
"#;

/// Agregados para el listado del frontend: título del currículum,
/// carta y forma canónica de la búsqueda, y conteos de postulaciones.
pub const LIST_SUMMARIES_FOR_USER: &str = r#"
    SELECT
        c.id, c.user_id, c.title, c.saved_request_id, c.resume_id, c.status,
        c.daily_limit, c.sent_today, c.sent_total, c.counters_date,
        c.started_at, c.stopped_at, c.created_at, c.updated_at,
        (SELECT r.title FROM resumes r
          WHERE r.user_id = c.user_id AND r.resume_id = c.resume_id LIMIT 1) AS resume_title,
        COALESCE((SELECT sr.cover_letter FROM saved_requests sr WHERE sr.id = c.saved_request_id), '') AS cover_letter,
        COALESCE((SELECT sr.query_params FROM saved_requests sr WHERE sr.id = c.saved_request_id), '') AS query_params,
        (SELECT COUNT(*) FROM applications a
          WHERE a.campaign_id = c.id AND a.status = 'sent') AS sent_count,
        (SELECT COUNT(*) FROM applications a
          WHERE a.campaign_id = c.id AND a.status IN ('queued', 'retry')) AS queued_count,
        (SELECT MAX(a.sent_at) FROM applications a
          WHERE a.campaign_id = c.id) AS last_sent_at
    FROM campaigns c
    WHERE c.user_id = ?1
    ORDER BY c.id DESC
    LIMIT ?2 OFFSET ?3
"#;
