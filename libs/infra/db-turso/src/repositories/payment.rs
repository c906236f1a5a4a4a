// [libs/infra/db-turso/src/repositories/payment.rs]
/*!
 * =================================================================
 * APARATO: PAYMENT REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: IDEMPOTENCIA DE PAGOS POR (provider, provider_id)
 *
 * La suscripción solo se extiende en el PRIMER tránsito a 'paid';
 * los reintentos del webhook del proveedor son no-ops.
 * =================================================================
 */

use crate::errors::DbError;
use crate::DbClient;
use libsql::params;
use tracing::{info, instrument, warn};

pub struct PaymentRepository {
    database_client: DbClient,
}

impl PaymentRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /**
     * Registra un pago confirmado.
     *
     * # Returns:
     * `true` únicamente si esta llamada produjo el PRIMER tránsito a
     * 'paid' (gatillo de extensión de suscripción y payout referral).
     */
    #[instrument(skip(self, raw_payload), fields(provider = provider, txn = provider_transaction_id))]
    pub async fn upsert_paid(
        &self,
        user_id: i64,
        provider: &str,
        provider_transaction_id: &str,
        tariff_id: i64,
        amount_cents: i64,
        raw_payload: &str,
        description: &str,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;

        let mut rows = connection
            .query(
                "SELECT id, status FROM payments WHERE provider = ?1 AND provider_id = ?2 LIMIT 1",
                params![provider, provider_transaction_id],
            )
            .await?;

        match rows.next().await? {
            None => {
                connection
                    .execute(
                        "INSERT INTO payments
                             (user_id, provider, provider_id, tariff_id, amount_cents, status, raw, description)
                         VALUES (?1, ?2, ?3, ?4, ?5, 'paid', ?6, ?7)",
                        params![
                            user_id,
                            provider,
                            provider_transaction_id,
                            tariff_id,
                            amount_cents,
                            raw_payload,
                            description
                        ],
                    )
                    .await?;
                info!("💰 [PAYMENT]: Transaction {} sealed as paid.", provider_transaction_id);
                Ok(true)
            }
            Some(row) => {
                let status: String = row.get::<String>(1)?;
                if status == "paid" {
                    // Reintento del proveedor: nada que hacer.
                    return Ok(false);
                }

                connection
                    .execute(
                        "UPDATE payments
                         SET status = 'paid', user_id = ?3, tariff_id = ?4, amount_cents = ?5,
                             raw = ?6, description = ?7
                         WHERE provider = ?1 AND provider_id = ?2",
                        params![
                            provider,
                            provider_transaction_id,
                            user_id,
                            tariff_id,
                            amount_cents,
                            raw_payload,
                            description
                        ],
                    )
                    .await?;
                info!("💰 [PAYMENT]: Transaction {} transitioned to paid.", provider_transaction_id);
                Ok(true)
            }
        }
    }

    /// Sella un intento fallido reportado por el proveedor.
    pub async fn record_failed(
        &self,
        provider: &str,
        provider_transaction_id: &str,
        amount_cents: i64,
        raw_payload: &str,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO payments (provider, provider_id, amount_cents, status, raw, description)
                 VALUES (?1, ?2, ?3, 'failed', ?4, 'provider fail callback')
                 ON CONFLICT(provider, provider_id) DO UPDATE SET
                     status = 'failed',
                     raw = excluded.raw",
                params![provider, provider_transaction_id, amount_cents, raw_payload],
            )
            .await?;

        warn!("💸 [PAYMENT]: Transaction {} recorded as failed.", provider_transaction_id);
        Ok(())
    }
}
