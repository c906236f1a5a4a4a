// [libs/infra/db-turso/src/repositories/application/queries.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION SQL STORE
 * CLASIFICACIÓN: INFRASTRUCTURE SQL (ESTRATO L3)
 * RESPONSABILIDAD: SENTENCIAS ATÓMICAS DE LA COLA DE POSTULACIONES
 *
 * Las transiciones llevan guardia de estado (WHERE status IN ...):
 * una fila terminal jamás vuelve a mutar, y un reclamo que afecta
 * cero filas significa que otro worker ya avanzó la fila.
 * =================================================================
 */

pub const APPLICATION_COLUMNS: &str = "id, user_id, vacancy_id, resume_id, cover_letter, kind, \
                                       status, attempt_count, next_try_at, error, campaign_id, \
                                       created_at, updated_at, sent_at";

/// Encolado por lote en UNA sentencia (estilo array/unnest vía json_each),
/// saltando conflictos sobre (user_id, vacancy_id). El número de filas
/// afectadas es el tamaño autoritativo del lote.
pub const ENQUEUE_BATCH: &str = r#"
    INSERT INTO applications
        (user_id, vacancy_id, resume_id, cover_letter, kind, status, campaign_id,
         created_at, updated_at)
    SELECT ?1, candidate.value, ?2, ?3, ?4, 'queued', ?5,
           CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
    FROM json_each(?6) AS candidate
    WHERE 1 = 1
    ON CONFLICT(user_id, vacancy_id) DO NOTHING
"#;

/// Vacantes del lote candidato a las que el usuario ya postuló.
pub const FILTER_KNOWN_VACANCIES: &str = r#"
    SELECT candidate.value
    FROM json_each(?2) AS candidate
    WHERE candidate.value IN (SELECT vacancy_id FROM applications WHERE user_id = ?1)
"#;

/// Consumo efectivo del día MSK: todo lo creado en la ventana cuenta,
/// salvo filas canceladas por vía administrativa.
pub const COUNT_EFFECTIVE_IN_WINDOW: &str = r#"
    SELECT COUNT(*)
    FROM applications
    WHERE user_id = ?1
      AND created_at >= ?2
      AND created_at < ?3
      AND LOWER(COALESCE(status, '')) NOT IN ('canceled', 'cancelled')
"#;

/// Lote de filas elegibles, en orden de inserción aproximado (id).
pub const SELECT_DUE_BATCH: &str = r#"
    SELECT id, user_id, vacancy_id, resume_id, cover_letter, kind,
           status, attempt_count, next_try_at, error, campaign_id,
           created_at, updated_at, sent_at
    FROM applications
    WHERE (status = 'queued' AND (next_try_at IS NULL OR next_try_at <= ?1))
       OR (status = 'retry' AND next_try_at IS NOT NULL AND next_try_at <= ?1)
    ORDER BY id
    LIMIT ?2
"#;

/// Reclamo con lease: empuja next_try_at hacia el futuro cercano. Si un
/// worker muere en pleno vuelo, la fila vuelve a ser elegible al expirar
/// el lease. Cero filas afectadas = otro worker ya la reclamó.
pub const CLAIM_WITH_LEASE: &str = r#"
    UPDATE applications
    SET next_try_at = ?2,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1
      AND status IN ('queued', 'retry')
      AND (next_try_at IS NULL OR next_try_at <= ?3)
"#;

/// Transición terminal a 'sent'. `error` guarda la razón corta cuando el
/// éxito es "ya postulado"; NULL en el éxito limpio.
pub const MARK_SENT: &str = r#"
    UPDATE applications
    SET status = 'sent',
        sent_at = COALESCE(sent_at, CURRENT_TIMESTAMP),
        error = ?2,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1 AND status IN ('queued', 'retry')
"#;

/// Transición terminal a 'error' sin tocar el contador de intentos
/// (rechazos de negocio: test_required, letter_required, ...).
pub const MARK_ERROR: &str = r#"
    UPDATE applications
    SET status = 'error',
        error = ?2,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1 AND status IN ('queued', 'retry')
"#;

/// Transición terminal a 'error' sellando el intento que agotó el límite.
pub const MARK_ERROR_WITH_ATTEMPT: &str = r#"
    UPDATE applications
    SET status = 'error',
        error = ?2,
        attempt_count = ?3,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1 AND status IN ('queued', 'retry')
"#;

/// Programa un reintento con backoff absoluto en UTC.
pub const SCHEDULE_RETRY: &str = r#"
    UPDATE applications
    SET status = 'retry',
        error = ?2,
        attempt_count = ?3,
        next_try_at = ?4,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1 AND status IN ('queued', 'retry')
"#;

/// Aparca la fila hasta la frontera del día MSK (cuota agotada); el
/// contador de intentos no se toca.
pub const PARK_UNTIL: &str = r#"
    UPDATE applications
    SET status = 'retry',
        next_try_at = ?2,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?1 AND status IN ('queued', 'retry')
"#;

/// Cursor del planificador: última creación automática de la campaña.
pub const LATEST_AUTO_CREATED_AT: &str = r#"
    SELECT MAX(created_at)
    FROM applications
    WHERE campaign_id = ?1 AND kind = 'auto'
"#;

/// Conteos por estado para la vista de estadísticas del usuario.
pub const STATS_BY_STATUS: &str = r#"
    SELECT status, COUNT(*)
    FROM applications
    WHERE user_id = ?1
    GROUP BY status
"#;
