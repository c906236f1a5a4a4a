// [libs/infra/db-turso/src/repositories/resume.rs]
/*!
 * =================================================================
 * APARATO: RESUME SNAPSHOT REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CACHÉ LOCAL DE CURRÍCULUMS REMOTOS
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::DbClient;
use libsql::params;
use postulante_domain_models::ResumeSnapshot;
use tracing::{info, instrument};

pub struct ResumeRepository {
    database_client: DbClient,
}

impl ResumeRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Upsert de un lote de snapshots. Retorna cuántos se procesaron.
    #[instrument(skip(self, snapshots))]
    pub async fn upsert_batch(&self, user_id: i64, snapshots: &[ResumeSnapshot]) -> Result<usize, DbError> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let connection = self.database_client.get_connection()?;
        let mut processed = 0usize;

        for snapshot in snapshots {
            if snapshot.resume_id.trim().is_empty() {
                continue;
            }
            connection
                .execute(
                    "INSERT INTO resumes (user_id, resume_id, title, area, visible, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(user_id, resume_id) DO UPDATE SET
                         title = excluded.title,
                         area = excluded.area,
                         visible = excluded.visible,
                         updated_at = excluded.updated_at",
                    params![
                        user_id,
                        snapshot.resume_id.trim(),
                        snapshot.title.as_deref(),
                        snapshot.area.as_deref(),
                        snapshot.visible as i64,
                        snapshot.updated_at.as_deref()
                    ],
                )
                .await?;
            processed += 1;
        }

        info!("📄 [RESUME_CACHE]: {} snapshots leveled for user {}.", processed, user_id);
        Ok(processed)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<ResumeSnapshot>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT user_id, resume_id, title, area, visible, updated_at
                 FROM resumes WHERE user_id = ?1 ORDER BY resume_id",
                params![user_id],
            )
            .await?;

        let mut snapshots = Vec::new();
        while let Some(row) = rows.next().await? {
            snapshots.push(ResumeSnapshot {
                user_id: row.get::<i64>(0)?,
                resume_id: row.get::<String>(1)?,
                title: mapping::extract_optional_text(&row, 2),
                area: mapping::extract_optional_text(&row, 3),
                visible: row.get::<i64>(4)? != 0,
                updated_at: mapping::extract_optional_text(&row, 5),
            });
        }
        Ok(snapshots)
    }

    /// Verifica que el currículum pertenezca al usuario (guardia del planificador).
    pub async fn belongs_to_user(&self, user_id: i64, resume_id: &str) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT 1 FROM resumes WHERE user_id = ?1 AND resume_id = ?2 LIMIT 1",
                params![user_id, resume_id],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }
}
