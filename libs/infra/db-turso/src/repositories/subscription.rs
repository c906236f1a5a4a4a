// [libs/infra/db-turso/src/repositories/subscription.rs]
/*!
 * =================================================================
 * APARATO: SUBSCRIPTION REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DERECHOS PAGADOS, TARIFAS Y MARCADORES D3/D1/EXPIRED
 *
 * Patrón de recordatorio: primero el marcador (clave única
 * subscription_id+kind), y solo si el INSERT creó fila se encola el
 * efecto visible. Sin carreras entre detección y emisión.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::DbClient;
use chrono::{DateTime, Duration, Utc};
use libsql::{params, Row};
use postulante_core_clock::to_ledger_timestamp;
use postulante_domain_models::{ReminderKind, Subscription, SubscriptionStatus, Tariff};
use tracing::{info, instrument};

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, tariff_id, started_at, expires_at, status, source";

pub struct SubscriptionRepository {
    database_client: DbClient,
}

impl SubscriptionRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// ¿Tiene el usuario una suscripción activa sin expirar? (fuente de la tarifa).
    pub async fn has_active_unexpired(&self, user_id: i64, now_utc: DateTime<Utc>) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT 1 FROM subscriptions
                 WHERE user_id = ?1 AND status = 'active' AND expires_at > ?2
                 LIMIT 1",
                params![user_id, to_ledger_timestamp(now_utc)],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Suscripción más relevante del usuario (activa primero, luego la más reciente).
    pub async fn current_for_user(&self, user_id: i64) -> Result<Option<Subscription>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM subscriptions
                     WHERE user_id = ?1
                     ORDER BY (status = 'active') DESC, expires_at DESC
                     LIMIT 1",
                    SUBSCRIPTION_COLUMNS
                ),
                params![user_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_subscription(&row)?)),
            None => Ok(None),
        }
    }

    /**
     * Extiende la suscripción activa o crea una nueva a partir del pago.
     * La base de extensión es max(now, expires_at vigente).
     */
    #[instrument(skip(self))]
    pub async fn extend_or_create(
        &self,
        user_id: i64,
        tariff_id: i64,
        period_days: i64,
        now_utc: DateTime<Utc>,
        source: &str,
    ) -> Result<DateTime<Utc>, DbError> {
        let connection = self.database_client.get_connection()?;

        let mut rows = connection
            .query(
                "SELECT id, expires_at FROM subscriptions
                 WHERE user_id = ?1 AND status = 'active'
                 ORDER BY expires_at DESC
                 LIMIT 1",
                params![user_id],
            )
            .await?;

        let active_row = rows.next().await?;
        let extension_base = active_row
            .as_ref()
            .and_then(|row| mapping::extract_datetime(row, 1))
            .filter(|current_expiry| *current_expiry > now_utc)
            .unwrap_or(now_utc);
        let new_expiry = extension_base + Duration::days(period_days);

        match active_row {
            Some(row) => {
                let subscription_id = row.get::<i64>(0)?;
                connection
                    .execute(
                        "UPDATE subscriptions SET expires_at = ?2, tariff_id = ?3 WHERE id = ?1",
                        params![subscription_id, to_ledger_timestamp(new_expiry), tariff_id],
                    )
                    .await?;
                info!("💳 [SUBSCRIPTION]: Subscription {} extended until {}.", subscription_id, new_expiry);
            }
            None => {
                connection
                    .execute(
                        "INSERT INTO subscriptions (user_id, tariff_id, started_at, expires_at, status, source)
                         VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
                        params![
                            user_id,
                            tariff_id,
                            to_ledger_timestamp(now_utc),
                            to_ledger_timestamp(new_expiry),
                            source
                        ],
                    )
                    .await?;
                info!("💳 [SUBSCRIPTION]: New subscription for user {} until {}.", user_id, new_expiry);
            }
        }

        Ok(new_expiry)
    }

    /// Suscripciones que expiran dentro del horizonte (o ya expiraron).
    pub async fn scan_expiring(
        &self,
        horizon_utc: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM subscriptions
                     WHERE status IN ('active', 'expired') AND expires_at <= ?1
                     ORDER BY expires_at",
                    SUBSCRIPTION_COLUMNS
                ),
                params![to_ledger_timestamp(horizon_utc)],
            )
            .await?;

        let mut expiring = Vec::new();
        while let Some(row) = rows.next().await? {
            expiring.push(map_row_to_subscription(&row)?);
        }
        Ok(expiring)
    }

    /// Transición active -> expired (guardada).
    pub async fn mark_expired(&self, subscription_id: i64) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE subscriptions SET status = 'expired' WHERE id = ?1 AND status = 'active'",
                params![subscription_id],
            )
            .await?;
        Ok(affected > 0)
    }

    /**
     * Marcador de recordatorio (subscription_id, kind), único de por vida.
     *
     * # Returns:
     * `true` solo cuando el INSERT creó la fila: únicamente entonces se
     * encola el efecto visible.
     */
    pub async fn insert_reminder_marker(
        &self,
        subscription_id: i64,
        kind: ReminderKind,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "INSERT OR IGNORE INTO subscription_notifications (subscription_id, kind)
                 VALUES (?1, ?2)",
                params![subscription_id, kind.as_label()],
            )
            .await?;
        Ok(affected > 0)
    }

    // --- CATÁLOGO DE TARIFAS ---

    pub async fn find_tariff_by_code(&self, code: &str) -> Result<Option<Tariff>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT id, code, title, price_cents, period_days, is_active
                 FROM tariffs WHERE code = ?1 AND is_active = 1 LIMIT 1",
                params![code],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_tariff(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn find_tariff_by_id(&self, tariff_id: i64) -> Result<Option<Tariff>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT id, code, title, price_cents, period_days, is_active
                 FROM tariffs WHERE id = ?1 LIMIT 1",
                params![tariff_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row_to_tariff(&row)?)),
            None => Ok(None),
        }
    }
}

fn map_row_to_subscription(row: &Row) -> Result<Subscription, DbError> {
    Ok(Subscription {
        id: row.get::<i64>(0)?,
        user_id: row.get::<i64>(1)?,
        tariff_id: row.get::<i64>(2)?,
        started_at: mapping::extract_datetime_or_now(row, 3),
        expires_at: mapping::extract_datetime(row, 4)
            .ok_or_else(|| DbError::MappingError("UNPARSEABLE_COLUMN: subscriptions.expires_at".into()))?,
        status: SubscriptionStatus::from_label(&row.get::<String>(5)?),
        source: mapping::extract_optional_text(row, 6),
    })
}

fn map_row_to_tariff(row: &Row) -> Result<Tariff, DbError> {
    Ok(Tariff {
        id: row.get::<i64>(0)?,
        code: row.get::<String>(1)?,
        title: row.get::<String>(2)?,
        price_cents: row.get::<i64>(3)?,
        period_days: row.get::<i64>(4)?,
        is_active: row.get::<i64>(5)? != 0,
    })
}
