// [libs/infra/db-turso/src/repositories/notification.rs]
/*!
 * =================================================================
 * APARATO: NOTIFICATION REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: COLA DE MENSAJES SALIENTES Y MARCADORES DIARIOS
 *
 * El reclamo de pendientes transiciona pending -> queued con guardia
 * de estado: cero filas afectadas significa que otro worker ya tomó
 * la fila. El marcador de cuota usa búsqueda por substring dentro de
 * la ventana del día MSK.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::mapping;
use crate::DbClient;
use chrono::{DateTime, Utc};
use libsql::{params, Row};
use postulante_core_clock::to_ledger_timestamp;
use postulante_domain_models::{Notification, NotificationScope, NotificationStatus};
use tracing::{debug, info, instrument};

/// Tope persistible del texto de error de entrega.
const DELIVERY_ERROR_MAX_CHARS: usize = 500;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, scope, body, scheduled_at, sent_at, status, error, created_at";

pub struct NotificationRepository {
    database_client: DbClient,
}

impl NotificationRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Encola una notificación de usuario para entrega inmediata.
    #[instrument(skip(self, body))]
    pub async fn enqueue_for_user(&self, user_id: i64, body: &str) -> Result<i64, DbError> {
        self.enqueue(NotificationScope::User, Some(user_id), body, None).await
    }

    /// Encolado general con alcance y programación arbitrarios.
    pub async fn enqueue(
        &self,
        scope: NotificationScope,
        user_id: Option<i64>,
        body: &str,
        scheduled_at_utc: Option<DateTime<Utc>>,
    ) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;
        let scheduled = scheduled_at_utc.map(to_ledger_timestamp);

        let mut rows = connection
            .query(
                "INSERT INTO notifications (user_id, scope, body, scheduled_at, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, COALESCE(?4, CURRENT_TIMESTAMP), 'pending',
                         CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
                 RETURNING id",
                params![user_id, scope.as_label(), body, scheduled],
            )
            .await?;

        let row = rows.next().await?.ok_or(DbError::NotFound)?;
        let notification_id = row.get::<i64>(0)?;
        debug!("🔔 [NOTIFY_QUEUE]: Notification {} queued (scope {}).", notification_id, scope.as_label());
        Ok(notification_id)
    }

    /**
     * ¿Existe ya una notificación del usuario con el marcador dentro de
     * la ventana del día MSK? Estados contemplados: pending, queued, sent.
     */
    pub async fn has_marker_since(
        &self,
        user_id: i64,
        marker_text: &str,
        window_start_utc: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let like_pattern = format!("%{}%", marker_text);

        let mut rows = connection
            .query(
                "SELECT 1 FROM notifications
                 WHERE user_id = ?1
                   AND created_at >= ?2
                   AND status IN ('pending', 'queued', 'sent')
                   AND body LIKE ?3
                 LIMIT 1",
                params![user_id, to_ledger_timestamp(window_start_utc), like_pattern],
            )
            .await?;

        Ok(rows.next().await?.is_some())
    }

    /// Pendientes vencidas, en orden de programación.
    pub async fn select_pending_due(
        &self,
        now_utc: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM notifications
                     WHERE status = 'pending' AND scheduled_at <= ?1
                     ORDER BY scheduled_at ASC
                     LIMIT ?2",
                    NOTIFICATION_COLUMNS
                ),
                params![to_ledger_timestamp(now_utc), limit],
            )
            .await?;

        let mut pending = Vec::new();
        while let Some(row) = rows.next().await? {
            pending.push(map_row_to_notification(&row)?);
        }
        Ok(pending)
    }

    /// Reclamo guardado pending -> queued. `false` = otro worker la tomó.
    pub async fn claim_for_delivery(&self, notification_id: i64) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE notifications
                 SET status = 'queued', updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?1 AND status = 'pending'",
                params![notification_id],
            )
            .await?;
        Ok(affected > 0)
    }

    pub async fn mark_sent(&self, notification_id: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE notifications
                 SET status = 'sent', sent_at = CURRENT_TIMESTAMP, error = NULL,
                     updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?1",
                params![notification_id],
            )
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, notification_id: i64, error: &str) -> Result<(), DbError> {
        let truncated: String = error.chars().take(DELIVERY_ERROR_MAX_CHARS).collect();
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE notifications
                 SET status = 'failed', error = ?2, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?1",
                params![notification_id, truncated],
            )
            .await?;
        Ok(())
    }

    /**
     * Resuelve los ids de mensajero de un segmento predefinido.
     * Claves desconocidas producen cero destinatarios.
     */
    #[instrument(skip(self))]
    pub async fn segment_recipient_ids(&self, segment_key: &str) -> Result<Vec<i64>, DbError> {
        let segment_sql = match segment_key {
            // Suscripción activa sin expirar.
            "premium" => {
                "SELECT u.tg_id FROM users u
                 WHERE EXISTS (SELECT 1 FROM subscriptions s
                               WHERE s.user_id = u.id AND s.status = 'active'
                                 AND s.expires_at > CURRENT_TIMESTAMP)"
            }
            // Jamás pagaron o todo les venció.
            "no_subscription" => {
                "SELECT u.tg_id FROM users u
                 WHERE NOT EXISTS (SELECT 1 FROM subscriptions s
                                   WHERE s.user_id = u.id AND s.status = 'active'
                                     AND s.expires_at > CURRENT_TIMESTAMP)"
            }
            // Actividad en los últimos 30 días.
            "active_30d" => {
                "SELECT u.tg_id FROM users u
                 WHERE u.last_seen_at IS NOT NULL
                   AND u.last_seen_at >= datetime(CURRENT_TIMESTAMP, '-30 days')"
            }
            // Usuarios con programa de despacho activo.
            "auto_responses" => {
                "SELECT DISTINCT u.tg_id FROM users u
                 JOIN campaigns c ON c.user_id = u.id
                 WHERE c.status = 'active'"
            }
            // Programas que despachan con carta de presentación.
            "ai_responses" => {
                "SELECT DISTINCT u.tg_id FROM users u
                 JOIN campaigns c ON c.user_id = u.id
                 JOIN saved_requests sr ON sr.id = c.saved_request_id
                 WHERE sr.cover_letter <> ''"
            }
            unknown => {
                info!("🤷 [NOTIFY_SEGMENT]: Unknown segment key '{}', zero recipients.", unknown);
                return Ok(Vec::new());
            }
        };

        let connection = self.database_client.get_connection()?;
        let mut rows = connection.query(segment_sql, ()).await?;

        let mut recipient_ids = Vec::new();
        while let Some(row) = rows.next().await? {
            recipient_ids.push(row.get::<i64>(0)?);
        }
        Ok(recipient_ids)
    }
}

fn map_row_to_notification(row: &Row) -> Result<Notification, DbError> {
    Ok(Notification {
        id: row.get::<i64>(0)?,
        user_id: mapping::extract_optional_integer(row, 1),
        scope: NotificationScope::from_label(&row.get::<String>(2)?),
        body: row.get::<String>(3)?,
        scheduled_at: mapping::extract_datetime_or_now(row, 4),
        sent_at: mapping::extract_datetime(row, 5),
        status: NotificationStatus::from_label(&row.get::<String>(6)?),
        error: mapping::extract_optional_text(row, 7),
        created_at: mapping::extract_datetime_or_now(row, 8),
    })
}
