// [libs/infra/db-turso/src/repositories/referral.rs]
/*!
 * =================================================================
 * APARATO: REFERRAL REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: GRAFO DE REFERIDOS Y LEDGER DE BONOS
 *
 * Las aristas (user, parent, level) son únicas por tripleta; los
 * niveles 2 y 3 se materializan al anclar, nunca en lectura. Las
 * auto-aristas se rechazan antes de tocar el motor.
 * =================================================================
 */

use crate::errors::DbError;
use crate::DbClient;
use libsql::params;
use postulante_domain_models::ReferralEdge;
use tracing::{info, instrument};

pub struct ReferralRepository {
    database_client: DbClient,
}

impl ReferralRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Inserta una arista del grafo bajo ON CONFLICT DO NOTHING.
     *
     * # Returns:
     * `true` solo si la arista fue creada en esta llamada.
     */
    #[instrument(skip(self))]
    pub async fn insert_edge(&self, user_id: i64, parent_user_id: i64, level: i64) -> Result<bool, DbError> {
        if user_id == parent_user_id {
            // Auto-arista: rechazo silencioso del grafo.
            return Ok(false);
        }
        if !(1..=3).contains(&level) {
            return Err(DbError::MappingError(format!("REFERRAL_LEVEL_OUT_OF_RANGE: {}", level)));
        }

        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "INSERT OR IGNORE INTO referrals (user_id, parent_user_id, level) VALUES (?1, ?2, ?3)",
                params![user_id, parent_user_id, level],
            )
            .await?;

        if affected > 0 {
            info!("🤝 [REFERRAL_GRAPH]: Edge {} -> {} (L{}) crystallized.", user_id, parent_user_id, level);
        }
        Ok(affected > 0)
    }

    /// Conteo de descendientes directos e indirectos por nivel.
    pub async fn count_by_level(&self, parent_user_id: i64) -> Result<(i64, i64, i64), DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT level, COUNT(*) FROM referrals
                 WHERE parent_user_id = ?1
                 GROUP BY level",
                params![parent_user_id],
            )
            .await?;

        let (mut level1, mut level2, mut level3) = (0i64, 0i64, 0i64);
        while let Some(row) = rows.next().await? {
            match row.get::<i64>(0)? {
                1 => level1 = row.get::<i64>(1)?,
                2 => level2 = row.get::<i64>(1)?,
                3 => level3 = row.get::<i64>(1)?,
                _ => {}
            }
        }
        Ok((level1, level2, level3))
    }

    /// Aristas ascendentes materializadas del usuario, por nivel.
    pub async fn uplines(&self, user_id: i64) -> Result<Vec<ReferralEdge>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT level, parent_user_id FROM referrals
                 WHERE user_id = ?1 AND level IN (1, 2, 3)
                 ORDER BY level",
                params![user_id],
            )
            .await?;

        let mut ancestors = Vec::new();
        while let Some(row) = rows.next().await? {
            ancestors.push(ReferralEdge {
                user_id,
                level: row.get::<i64>(0)?,
                parent_user_id: row.get::<i64>(1)?,
            });
        }
        Ok(ancestors)
    }

    // --- LEDGER DE BONOS ---

    /// Acumula saldo con upsert aditivo.
    pub async fn add_balance(&self, user_id: i64, amount_cents: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO referral_balances (user_id, balance_cents)
                 VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                     balance_cents = referral_balances.balance_cents + excluded.balance_cents",
                params![user_id, amount_cents],
            )
            .await?;
        Ok(())
    }

    /// Apunte inmutable del ledger (kind: bonus_l1 | bonus_l2 | bonus_l3).
    pub async fn add_transaction(
        &self,
        user_id: i64,
        amount_cents: i64,
        kind: &str,
        related_user_id: i64,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO referral_transactions (user_id, amount_cents, kind, related_user_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, amount_cents, kind, related_user_id],
            )
            .await?;
        Ok(())
    }

    pub async fn balance_cents(&self, user_id: i64) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COALESCE(balance_cents, 0) FROM referral_balances WHERE user_id = ?1",
                params![user_id],
            )
            .await?;

        Ok(match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        })
    }

    /// Ingresos históricos: suma de apuntes positivos.
    pub async fn income_cents(&self, user_id: i64) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT COALESCE(SUM(amount_cents), 0) FROM referral_transactions
                 WHERE user_id = ?1 AND amount_cents > 0",
                params![user_id],
            )
            .await?;

        Ok(match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        })
    }
}
