// [libs/infra/db-turso/src/repositories/user.rs]
/*!
 * =================================================================
 * APARATO: USER REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: IDENTIDAD DE USUARIOS, UTM Y CÓDIGOS REFERRAL
 *
 * Los usuarios se crean en el primer contacto y nunca se destruyen.
 * La atribución UTM es first-write-wins mediante COALESCE.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::DbClient;
use libsql::{params, Row};
use postulante_domain_models::User;
use rand::Rng;
use tracing::{debug, info, instrument};

/// Alfabeto de códigos referral: mayúsculas y dígitos, 8 posiciones.
const REF_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REF_CODE_LENGTH: usize = 8;

const USER_COLUMNS: &str = "id, tg_id, username, hh_account_id, hh_account_name, ref_code, \
                            pending_ref, referred_by, utm_source, utm_medium, utm_campaign, \
                            created_at, last_seen_at";

pub struct UserRepository {
    database_client: DbClient,
}

impl UserRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Upsert idempotente por tg_id. Refresca username (si llega) y el
     * sello de última actividad. Retorna el id interno.
     */
    #[instrument(skip(self, username))]
    pub async fn upsert_seen(&self, tg_id: i64, username: Option<&str>) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;

        let mut rows = connection
            .query(
                "INSERT INTO users (tg_id, username, created_at, last_seen_at)
                 VALUES (?1, ?2, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
                 ON CONFLICT(tg_id) DO UPDATE SET
                     username = COALESCE(excluded.username, users.username),
                     last_seen_at = CURRENT_TIMESTAMP
                 RETURNING id",
                params![tg_id, username],
            )
            .await?;

        let row = rows.next().await?.ok_or(DbError::NotFound)?;
        Ok(row.get::<i64>(0)?)
    }

    /// Atribución UTM first-write-wins: valores ya sellados no se pisan.
    pub async fn apply_utm_first_write(
        &self,
        tg_id: i64,
        utm_source: Option<&str>,
        utm_medium: Option<&str>,
        utm_campaign: Option<&str>,
    ) -> Result<(), DbError> {
        if utm_source.is_none() && utm_medium.is_none() && utm_campaign.is_none() {
            return Ok(());
        }

        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE users SET
                     utm_source = COALESCE(utm_source, ?2),
                     utm_medium = COALESCE(utm_medium, ?3),
                     utm_campaign = COALESCE(utm_campaign, ?4)
                 WHERE tg_id = ?1",
                params![tg_id, utm_source, utm_medium, utm_campaign],
            )
            .await?;
        Ok(())
    }

    pub async fn find_by_tg(&self, tg_id: i64) -> Result<Option<User>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM users WHERE tg_id = ?1 LIMIT 1", USER_COLUMNS),
                params![tg_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM users WHERE id = ?1 LIMIT 1", USER_COLUMNS),
                params![user_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Resuelve el id interno a partir del id del mensajero.
    pub async fn resolve_user_id(&self, tg_id: i64) -> Result<Option<i64>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query("SELECT id FROM users WHERE tg_id = ?1 LIMIT 1", params![tg_id])
            .await?;
        Ok(match rows.next().await? {
            Some(row) => Some(row.get::<i64>(0)?),
            None => None,
        })
    }

    /// Sella id y nombre de la cuenta HH tras el vínculo OAuth.
    pub async fn store_hh_account_info(
        &self,
        user_id: i64,
        account_id: &str,
        full_name: &str,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE users SET hh_account_id = ?2, hh_account_name = ?3 WHERE id = ?1",
                params![user_id, account_id.trim(), full_name.trim()],
            )
            .await?;
        Ok(())
    }

    /// Limpia el rastro HH al desvincular la cuenta.
    pub async fn clear_hh_account_info(&self, user_id: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE users SET hh_account_id = NULL, hh_account_name = NULL WHERE id = ?1",
                params![user_id],
            )
            .await?;
        Ok(())
    }

    // --- ESTRATO REFERRAL ---

    pub async fn find_by_ref_code(&self, ref_code: &str) -> Result<Option<i64>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query("SELECT id FROM users WHERE ref_code = ?1 LIMIT 1", params![ref_code])
            .await?;
        Ok(match rows.next().await? {
            Some(row) => Some(row.get::<i64>(0)?),
            None => None,
        })
    }

    /**
     * Garantiza un código referral propio, único en toda la base.
     *
     * # Logic:
     * Si ya existe lo retorna; si no, genera candidatos de 8 posiciones
     * hasta que el índice único los acepte.
     */
    #[instrument(skip(self))]
    pub async fn ensure_ref_code(&self, user_id: i64) -> Result<String, DbError> {
        let connection = self.database_client.get_connection()?;

        let mut rows = connection
            .query("SELECT ref_code FROM users WHERE id = ?1", params![user_id])
            .await?;
        let row = rows.next().await?.ok_or(DbError::NotFound)?;
        if let Some(existing) = mapping::extract_optional_text(&row, 0) {
            return Ok(existing);
        }

        loop {
            let candidate: String = {
                let mut random_engine = rand::thread_rng();
                (0..REF_CODE_LENGTH)
                    .map(|_| {
                        let position = random_engine.gen_range(0..REF_CODE_ALPHABET.len());
                        REF_CODE_ALPHABET[position] as char
                    })
                    .collect()
            };

            let outcome = connection
                .execute(
                    "UPDATE users SET ref_code = ?2 WHERE id = ?1 AND ref_code IS NULL",
                    params![user_id, candidate.clone()],
                )
                .await;

            match outcome {
                Ok(0) => {
                    // Carrera benigna: otro hilo ya lo selló.
                    let mut refreshed = connection
                        .query("SELECT ref_code FROM users WHERE id = ?1", params![user_id])
                        .await?;
                    let row = refreshed.next().await?.ok_or(DbError::NotFound)?;
                    if let Some(existing) = mapping::extract_optional_text(&row, 0) {
                        return Ok(existing);
                    }
                    return Err(DbError::InvalidState);
                }
                Ok(_) => {
                    info!("🎟️ [REFERRAL]: Code {} crystallized for user {}.", candidate, user_id);
                    return Ok(candidate);
                }
                Err(fault) if fault.to_string().to_lowercase().contains("unique") => {
                    debug!("🎲 [REFERRAL]: Code collision, re-rolling.");
                    continue;
                }
                Err(fault) => return Err(DbError::QueryError(fault)),
            }
        }
    }

    /// Guarda el código referral ajeno pendiente; no pisa uno previo.
    pub async fn store_pending_ref(&self, user_id: i64, ref_code: &str) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE users SET pending_ref = ?2
                 WHERE id = ?1 AND (pending_ref IS NULL OR pending_ref = '')",
                params![user_id, ref_code.trim().to_uppercase()],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Ancla al progenitor exactamente una vez (WHERE referred_by IS NULL).
    pub async fn set_parent_once(&self, user_id: i64, parent_user_id: i64) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE users SET referred_by = ?2 WHERE id = ?1 AND referred_by IS NULL",
                params![user_id, parent_user_id],
            )
            .await?;
        Ok(affected > 0)
    }

    /// Progenitor directo de un usuario (nivel 1 del grafo).
    pub async fn referred_by(&self, user_id: i64) -> Result<Option<i64>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query("SELECT referred_by FROM users WHERE id = ?1", params![user_id])
            .await?;
        Ok(rows.next().await?.and_then(|row| mapping::extract_optional_integer(&row, 0)))
    }

    /// Todos los ids de mensajero conocidos (difusiones scope=all).
    pub async fn list_messenger_ids(&self) -> Result<Vec<i64>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query("SELECT tg_id FROM users WHERE tg_id IS NOT NULL ORDER BY id", ())
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }
        Ok(ids)
    }
}

fn map_row_to_user(row: &Row) -> Result<User, DbError> {
    Ok(User {
        id: row.get::<i64>(0)?,
        tg_id: row.get::<i64>(1)?,
        username: mapping::extract_optional_text(row, 2),
        hh_account_id: mapping::extract_optional_text(row, 3),
        hh_account_name: mapping::extract_optional_text(row, 4),
        ref_code: mapping::extract_optional_text(row, 5),
        pending_ref: mapping::extract_optional_text(row, 6),
        referred_by: mapping::extract_optional_integer(row, 7),
        utm_source: mapping::extract_optional_text(row, 8),
        utm_medium: mapping::extract_optional_text(row, 9),
        utm_campaign: mapping::extract_optional_text(row, 10),
        created_at: mapping::extract_datetime_or_now(row, 11),
        last_seen_at: mapping::extract_datetime(row, 12),
    })
}
