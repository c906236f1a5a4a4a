// [libs/domain/models/src/notification.rs]
/*!
 * =================================================================
 * APARATO: NOTIFICATION DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN ENTITIES (ESTRATO L2)
 * RESPONSABILIDAD: MENSAJES SALIENTES Y RECORDATORIOS DE SUSCRIPCIÓN
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Destinatarios de una notificación.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationScope {
    /// Un único usuario interno.
    User,
    /// Todos los usuarios con mensajero conocido.
    All,
    /// Segmento predefinido (`premium`, `no_subscription`, `active_30d`, `auto_responses`).
    Segment(String),
}

impl NotificationScope {
    pub fn as_label(&self) -> String {
        match self {
            NotificationScope::User => "user".to_string(),
            NotificationScope::All => "all".to_string(),
            NotificationScope::Segment(key) => format!("segment:{}", key),
        }
    }

    pub fn from_label(raw: &str) -> Self {
        match raw {
            "user" => NotificationScope::User,
            "all" => NotificationScope::All,
            other => match other.strip_prefix("segment:") {
                Some(key) => NotificationScope::Segment(key.to_string()),
                None => NotificationScope::User,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Canceled,
}

impl NotificationStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Canceled => "canceled",
        }
    }

    pub fn from_label(raw: &str) -> Self {
        match raw {
            "sent" => NotificationStatus::Sent,
            "failed" => NotificationStatus::Failed,
            "canceled" | "cancelled" => NotificationStatus::Canceled,
            _ => NotificationStatus::Pending,
        }
    }
}

/// Mensaje pendiente de entrega al canal de salida.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// NULL para difusiones (scope != user).
    pub user_id: Option<i64>,
    pub scope: NotificationScope,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: NotificationStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Clase de recordatorio de suscripción. Única por (suscripción, clase):
/// cada recordatorio sale como máximo una vez en la vida de la suscripción.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderKind {
    /// Quedan 3 días.
    D3,
    /// Queda 1 día.
    D1,
    /// La suscripción venció.
    Expired,
}

impl ReminderKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            ReminderKind::D3 => "D3",
            ReminderKind::D1 => "D1",
            ReminderKind::Expired => "EXPIRED",
        }
    }
}
