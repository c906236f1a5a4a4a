// [libs/infra/db-turso/src/repositories/campaign/mod.rs]
/*!
 * =================================================================
 * APARATO: CAMPAIGN REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CICLO DE VIDA Y CONTADORES DE CAMPAÑAS
 *
 * Invariante central: como máximo una campaña activa por usuario,
 * impuesta por el índice único parcial uq_campaigns_one_active. El
 * intento de segunda activación se reporta como conflicto lógico.
 * =================================================================
 */

pub mod queries;

use self::queries as sql_registry;
use crate::errors::DbError;
use crate::repositories::mapping;
use crate::DbClient;
use libsql::{params, Row};
use postulante_domain_models::{Campaign, CampaignStatus, CampaignSummary};
use tracing::{info, instrument, warn};

pub struct CampaignRepository {
    database_client: DbClient,
}

impl CampaignRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Upsert por (user, resume, saved_request). Retorna el id.
    #[instrument(skip(self, title))]
    pub async fn upsert(
        &self,
        user_id: i64,
        title: &str,
        saved_request_id: i64,
        resume_id: &str,
        daily_limit: i64,
    ) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                sql_registry::UPSERT_CAMPAIGN,
                params![user_id, title, saved_request_id, resume_id, daily_limit],
            )
            .await?;

        let row = rows.next().await?.ok_or(DbError::NotFound)?;
        Ok(row.get::<i64>(0)?)
    }

    /**
     * Activa la campaña del usuario.
     *
     * # Errors:
     * - `DbError::Conflict` si otra campaña del usuario ya está activa
     *   (rechazo del índice único parcial).
     * - `DbError::NotFound` si la campaña no existe o no es del usuario.
     */
    #[instrument(skip(self))]
    pub async fn start(&self, campaign_id: i64, user_id: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        match connection
            .execute(sql_registry::START_CAMPAIGN, params![campaign_id, user_id])
            .await
        {
            Ok(0) => Err(DbError::NotFound),
            Ok(_) => {
                info!("▶️ [CAMPAIGN]: Campaign {} activated for user {}.", campaign_id, user_id);
                Ok(())
            }
            Err(fault) if fault.to_string().to_lowercase().contains("unique") => {
                warn!("⛔ [CAMPAIGN]: User {} already runs an active campaign.", user_id);
                Err(DbError::Conflict("another active campaign exists".into()))
            }
            Err(fault) => Err(DbError::QueryError(fault)),
        }
    }

    /// Detención idempotente: detener lo detenido no es error.
    #[instrument(skip(self))]
    pub async fn stop(&self, campaign_id: i64, user_id: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(sql_registry::STOP_CAMPAIGN, params![campaign_id, user_id])
            .await?;

        if affected == 0 {
            return Err(DbError::NotFound);
        }
        info!("⏹️ [CAMPAIGN]: Campaign {} stopped.", campaign_id);
        Ok(())
    }

    pub async fn delete(&self, campaign_id: i64, user_id: i64) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(sql_registry::DELETE_CAMPAIGN, params![campaign_id, user_id])
            .await?;
        Ok(affected > 0)
    }

    pub async fn find_by_id(&self, campaign_id: i64, user_id: i64) -> Result<Option<Campaign>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM campaigns WHERE id = ?1 AND user_id = ?2 LIMIT 1",
                    sql_registry::CAMPAIGN_COLUMNS
                ),
                params![campaign_id, user_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_campaign(&row)?)),
            None => Ok(None),
        }
    }

    /// Campañas activas de todo el sistema (entrada del planificador).
    pub async fn list_active(&self) -> Result<Vec<Campaign>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM campaigns WHERE status = 'active' ORDER BY id",
                    sql_registry::CAMPAIGN_COLUMNS
                ),
                (),
            )
            .await?;

        let mut campaigns = Vec::new();
        while let Some(row) = rows.next().await? {
            campaigns.push(map_row_to_campaign(&row)?);
        }
        Ok(campaigns)
    }

    /// Bump atómico de contadores tras un encolado. `msk_day` sella a qué
    /// día pertenecen los contadores.
    pub async fn bump_counters(&self, campaign_id: i64, inserted: i64, msk_day: &str) -> Result<(), DbError> {
        if inserted <= 0 {
            return Ok(());
        }
        let connection = self.database_client.get_connection()?;
        connection
            .execute(sql_registry::BUMP_COUNTERS, params![campaign_id, inserted, msk_day])
            .await?;
        Ok(())
    }

    /// Reinicia `sent_today` en todas las campañas cuyo día de contadores
    /// quedó atrás. Retorna cuántas se reiniciaron.
    #[instrument(skip(self))]
    pub async fn reset_daily_counters(&self, msk_day: &str) -> Result<u64, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(sql_registry::RESET_DAILY_COUNTERS, params![msk_day])
            .await?;

        if affected > 0 {
            info!("🌅 [CAMPAIGN]: Daily counters reset for {} campaigns ({}).", affected, msk_day);
        }
        Ok(affected)
    }

    /// Listado con agregados para el frontend.
    pub async fn list_summaries_for_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CampaignSummary>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(sql_registry::LIST_SUMMARIES_FOR_USER, params![user_id, limit, offset])
            .await?;

        let mut summaries = Vec::new();
        while let Some(row) = rows.next().await? {
            summaries.push(CampaignSummary {
                campaign: map_row_to_campaign(&row)?,
                resume_title: mapping::extract_optional_text(&row, 14),
                cover_letter: row.get::<String>(15)?,
                query_params: row.get::<String>(16)?,
                sent_count: row.get::<i64>(17)?,
                queued_count: row.get::<i64>(18)?,
                last_sent_at: mapping::extract_datetime(&row, 19),
            });
        }
        Ok(summaries)
    }
}

fn map_row_to_campaign(row: &Row) -> Result<Campaign, DbError> {
    Ok(Campaign {
        id: row.get::<i64>(0)?,
        user_id: row.get::<i64>(1)?,
        title: row.get::<String>(2)?,
        saved_request_id: mapping::extract_optional_integer(row, 3),
        resume_id: row.get::<String>(4)?,
        status: CampaignStatus::from_label(&row.get::<String>(5)?),
        daily_limit: row.get::<i64>(6)?,
        sent_today: row.get::<i64>(7)?,
        sent_total: row.get::<i64>(8)?,
        counters_date: mapping::extract_optional_text(row, 9),
        started_at: mapping::extract_datetime(row, 10),
        stopped_at: mapping::extract_datetime(row, 11),
        created_at: mapping::extract_datetime_or_now(row, 12),
        updated_at: mapping::extract_datetime_or_now(row, 13),
    })
}
