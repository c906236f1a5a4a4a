// [libs/infra/db-turso/src/repositories/token.rs]
/*!
 * =================================================================
 * APARATO: HH TOKEN REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: MATERIAL OAUTH (0..1 FILAS POR USUARIO)
 *
 * Solo el Token Guard muta este estrato. El upsert reemplaza el
 * material previo de forma atómica; el unlink lo incinera.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::DbClient;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use postulante_core_clock::to_ledger_timestamp;
use postulante_domain_models::HhToken;
use tracing::{info, instrument};

pub struct TokenRepository {
    database_client: DbClient,
}

impl TokenRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Crea o reemplaza el material OAuth del usuario.
     * Invariante: (access, refresh, expires_at) siempre no nulos.
     */
    #[instrument(skip(self, access_token, refresh_token))]
    pub async fn upsert(
        &self,
        user_id: i64,
        access_token: &str,
        refresh_token: &str,
        token_type: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        if access_token.is_empty() || refresh_token.is_empty() {
            return Err(DbError::MappingError("TOKEN_MATERIAL_VOID".into()));
        }

        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO hh_tokens (user_id, access_token, refresh_token, token_type, expires_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP)
                 ON CONFLICT(user_id) DO UPDATE SET
                     access_token = excluded.access_token,
                     refresh_token = excluded.refresh_token,
                     token_type = excluded.token_type,
                     expires_at = excluded.expires_at,
                     updated_at = CURRENT_TIMESTAMP",
                params![
                    user_id,
                    access_token,
                    refresh_token,
                    token_type,
                    to_ledger_timestamp(expires_at)
                ],
            )
            .await?;

        info!("🔐 [TOKEN_VAULT]: OAuth material crystallized for user {}.", user_id);
        Ok(())
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Option<HhToken>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT user_id, access_token, refresh_token, token_type, expires_at
                 FROM hh_tokens WHERE user_id = ?1",
                params![user_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_token(&row)?)),
            None => Ok(None),
        }
    }

    /// Borra el material del usuario. Retorna si algo existía.
    pub async fn delete_for_user(&self, user_id: i64) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute("DELETE FROM hh_tokens WHERE user_id = ?1", params![user_id])
            .await?;

        if affected > 0 {
            info!("🗑️ [TOKEN_VAULT]: OAuth material incinerated for user {}.", user_id);
        }
        Ok(affected > 0)
    }
}

fn map_row_to_token(row: &Row) -> Result<HhToken, DbError> {
    Ok(HhToken {
        user_id: row.get::<i64>(0)?,
        access_token: row.get::<String>(1)?,
        refresh_token: row.get::<String>(2)?,
        token_type: row.get::<String>(3)?,
        expires_at: mapping::extract_datetime(row, 4)
            .ok_or_else(|| mapping_fault("hh_tokens.expires_at"))?,
    })
}

fn mapping_fault(column: &str) -> DbError {
    DbError::MappingError(format!("UNPARSEABLE_COLUMN: {}", column))
}
