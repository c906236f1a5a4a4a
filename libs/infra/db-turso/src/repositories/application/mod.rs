// [libs/infra/db-turso/src/repositories/application/mod.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: COLA DE POSTULACIONES Y MÁQUINA DE ESTADOS
 *
 * La unicidad (user_id, vacancy_id) absorbe duplicados del
 * planificador; el reclamo con lease reemplaza el FOR UPDATE SKIP
 * LOCKED de otros motores con una sola sentencia guardada.
 * =================================================================
 */

pub mod queries;

use self::queries as sql_registry;
use crate::errors::DbError;
use crate::repositories::mapping;
use crate::DbClient;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use postulante_core_clock::to_ledger_timestamp;
use postulante_domain_models::{Application, ApplicationKind, ApplicationStatus};
use tracing::{debug, info, instrument};

pub struct ApplicationRepository {
    database_client: DbClient,
}

impl ApplicationRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Encolado por lote, idempotente bajo (user_id, vacancy_id).
     *
     * # Returns:
     * El número de filas realmente insertadas (los conflictos no cuentan).
     */
    #[instrument(skip(self, vacancy_ids, cover_letter), fields(user = user_id, batch = vacancy_ids.len()))]
    pub async fn enqueue_batch(
        &self,
        user_id: i64,
        vacancy_ids: &[i64],
        resume_id: &str,
        cover_letter: Option<&str>,
        kind: ApplicationKind,
        campaign_id: Option<i64>,
    ) -> Result<u64, DbError> {
        if vacancy_ids.is_empty() {
            return Ok(0);
        }

        let connection = self.database_client.get_connection()?;
        let candidates_json = serde_json::to_string(vacancy_ids)
            .map_err(|fault| DbError::MappingError(format!("BATCH_SERIALIZATION_FAULT: {}", fault)))?;

        let inserted = connection
            .execute(
                sql_registry::ENQUEUE_BATCH,
                params![
                    user_id,
                    resume_id,
                    cover_letter,
                    kind.as_label(),
                    campaign_id,
                    candidates_json
                ],
            )
            .await?;

        info!("📥 [APPLICATION_QUEUE]: {} of {} candidates crystallized for user {}.",
            inserted, vacancy_ids.len(), user_id);
        Ok(inserted)
    }

    /// Subconjunto del lote candidato al que el usuario ya postuló.
    pub async fn filter_known_vacancies(
        &self,
        user_id: i64,
        candidates: &[i64],
    ) -> Result<Vec<i64>, DbError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let connection = self.database_client.get_connection()?;
        let candidates_json = serde_json::to_string(candidates)
            .map_err(|fault| DbError::MappingError(format!("BATCH_SERIALIZATION_FAULT: {}", fault)))?;

        let mut rows = connection
            .query(sql_registry::FILTER_KNOWN_VACANCIES, params![user_id, candidates_json])
            .await?;

        let mut known = Vec::new();
        while let Some(row) = rows.next().await? {
            known.push(row.get::<i64>(0)?);
        }
        Ok(known)
    }

    /// Consumo efectivo del usuario dentro de la ventana [start, end) UTC.
    pub async fn count_effective_in_window(
        &self,
        user_id: i64,
        window_start_utc: DateTime<Utc>,
        window_end_utc: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                sql_registry::COUNT_EFFECTIVE_IN_WINDOW,
                params![
                    user_id,
                    to_ledger_timestamp(window_start_utc),
                    to_ledger_timestamp(window_end_utc)
                ],
            )
            .await?;

        let row = rows.next().await?.ok_or(DbError::NotFound)?;
        Ok(row.get::<i64>(0)?)
    }

    /// Lote de filas elegibles para el despachador, en orden por id.
    pub async fn select_due_batch(
        &self,
        now_utc: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Application>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                sql_registry::SELECT_DUE_BATCH,
                params![to_ledger_timestamp(now_utc), limit],
            )
            .await?;

        let mut batch = Vec::new();
        while let Some(row) = rows.next().await? {
            batch.push(map_row_to_application(&row)?);
        }
        Ok(batch)
    }

    /**
     * Reclama una fila para el intento en curso empujando un lease corto
     * en `next_try_at`.
     *
     * # Returns:
     * `false` cuando otro worker ya avanzó la fila: debe saltarse.
     */
    pub async fn claim_for_dispatch(
        &self,
        application_id: i64,
        now_utc: DateTime<Utc>,
        lease_until_utc: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                sql_registry::CLAIM_WITH_LEASE,
                params![
                    application_id,
                    to_ledger_timestamp(lease_until_utc),
                    to_ledger_timestamp(now_utc)
                ],
            )
            .await?;

        if affected == 0 {
            debug!("⏭️ [APPLICATION_QUEUE]: Row {} already advanced by another worker.", application_id);
        }
        Ok(affected > 0)
    }

    /// Transición terminal a 'sent'. `note` conserva la razón corta del
    /// éxito idempotente ("already_applied: ..."); NULL en el éxito limpio.
    pub async fn mark_sent(&self, application_id: i64, note: Option<&str>) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(sql_registry::MARK_SENT, params![application_id, note])
            .await?;
        Ok(())
    }

    /// Transición terminal a 'error' sin tocar el contador de intentos.
    pub async fn mark_error(&self, application_id: i64, error: &str) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(sql_registry::MARK_ERROR, params![application_id, error])
            .await?;
        Ok(())
    }

    /// Transición terminal a 'error' sellando el intento que agotó el límite.
    pub async fn mark_error_with_attempt(
        &self,
        application_id: i64,
        error: &str,
        attempt_count: i64,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                sql_registry::MARK_ERROR_WITH_ATTEMPT,
                params![application_id, error, attempt_count],
            )
            .await?;
        Ok(())
    }

    /// Programa un reintento con `next_try_at` absoluto en UTC.
    pub async fn schedule_retry(
        &self,
        application_id: i64,
        error: &str,
        attempt_count: i64,
        next_try_at_utc: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                sql_registry::SCHEDULE_RETRY,
                params![
                    application_id,
                    error,
                    attempt_count,
                    to_ledger_timestamp(next_try_at_utc)
                ],
            )
            .await?;
        Ok(())
    }

    /// Aparca la fila hasta la frontera del día MSK (cuota agotada).
    pub async fn park_until(&self, application_id: i64, until_utc: DateTime<Utc>) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                sql_registry::PARK_UNTIL,
                params![application_id, to_ledger_timestamp(until_utc)],
            )
            .await?;
        Ok(())
    }

    /// Cursor del planificador: última creación automática de la campaña.
    pub async fn latest_auto_created_at(&self, campaign_id: i64) -> Result<Option<DateTime<Utc>>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(sql_registry::LATEST_AUTO_CREATED_AT, params![campaign_id])
            .await?;

        Ok(rows.next().await?.and_then(|row| mapping::extract_datetime(&row, 0)))
    }

    /// Conteos por estado para la vista de estadísticas.
    pub async fn stats_for_user(&self, user_id: i64) -> Result<Vec<(ApplicationStatus, i64)>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(sql_registry::STATS_BY_STATUS, params![user_id])
            .await?;

        let mut stats = Vec::new();
        while let Some(row) = rows.next().await? {
            let status = ApplicationStatus::from_label(&row.get::<String>(0)?);
            stats.push((status, row.get::<i64>(1)?));
        }
        Ok(stats)
    }

    pub async fn find_by_id(&self, application_id: i64) -> Result<Option<Application>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM applications WHERE id = ?1 LIMIT 1",
                    sql_registry::APPLICATION_COLUMNS
                ),
                params![application_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_application(&row)?)),
            None => Ok(None),
        }
    }
}

fn map_row_to_application(row: &Row) -> Result<Application, DbError> {
    Ok(Application {
        id: row.get::<i64>(0)?,
        user_id: row.get::<i64>(1)?,
        vacancy_id: row.get::<i64>(2)?,
        resume_id: row.get::<String>(3)?,
        cover_letter: mapping::extract_optional_text(row, 4),
        kind: ApplicationKind::from_label(&row.get::<String>(5)?),
        status: ApplicationStatus::from_label(&row.get::<String>(6)?),
        attempt_count: row.get::<i64>(7)?,
        next_try_at: mapping::extract_datetime(row, 8),
        error: mapping::extract_optional_text(row, 9),
        campaign_id: mapping::extract_optional_integer(row, 10),
        created_at: mapping::extract_datetime_or_now(row, 11),
        updated_at: mapping::extract_datetime_or_now(row, 12),
        sent_at: mapping::extract_datetime(row, 13),
    })
}
