// [libs/domain/models/src/application.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN ENTITIES (ESTRATO L2)
 * RESPONSABILIDAD: UNIDAD DE TRABAJO DEL DESPACHADOR
 *
 * Invariantes:
 * - (user_id, vacancy_id) es único: como máximo una postulación por
 *   usuario y vacante, para siempre.
 * - Las transiciones de estado son monótonas: `sent` y `error` son
 *   terminales.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origen de la postulación.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationKind {
    Manual,
    Auto,
}

impl ApplicationKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            ApplicationKind::Manual => "manual",
            ApplicationKind::Auto => "auto",
        }
    }

    pub fn from_label(raw: &str) -> Self {
        match raw {
            "auto" => ApplicationKind::Auto,
            _ => ApplicationKind::Manual,
        }
    }
}

/// Estado de la máquina de despacho.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Queued,
    Sent,
    Retry,
    Error,
}

impl ApplicationStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            ApplicationStatus::Queued => "queued",
            ApplicationStatus::Sent => "sent",
            ApplicationStatus::Retry => "retry",
            ApplicationStatus::Error => "error",
        }
    }

    pub fn from_label(raw: &str) -> Self {
        match raw {
            "sent" => ApplicationStatus::Sent,
            "retry" => ApplicationStatus::Retry,
            "error" => ApplicationStatus::Error,
            _ => ApplicationStatus::Queued,
        }
    }

    /// `sent` y `error` nunca vuelven a entrar al despachador.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Sent | ApplicationStatus::Error)
    }
}

/// Una intención de postular a una vacante en nombre de un usuario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub user_id: i64,
    /// Identificador numérico externo de la vacante.
    pub vacancy_id: i64,
    pub resume_id: String,
    pub cover_letter: Option<String>,
    pub kind: ApplicationKind,
    pub status: ApplicationStatus,
    pub attempt_count: i64,
    /// Próximo intento (UTC absoluto). NULL = elegible de inmediato.
    pub next_try_at: Option<DateTime<Utc>>,
    /// Clasificación corta y estable del último fallo.
    pub error: Option<String>,
    /// Referencia débil a la campaña originaria.
    pub campaign_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Resultado agregado de un tick del despachador.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DispatchStats {
    pub taken: u32,
    pub sent: u32,
    pub retried: u32,
    pub failed: u32,
    pub skipped: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_roundtrip_with_ledger_forms() {
        for status in [
            ApplicationStatus::Queued,
            ApplicationStatus::Sent,
            ApplicationStatus::Retry,
            ApplicationStatus::Error,
        ] {
            assert_eq!(ApplicationStatus::from_label(status.as_label()), status);
        }
        // Etiquetas desconocidas degradan al estado inicial.
        assert_eq!(ApplicationStatus::from_label("corrupted"), ApplicationStatus::Queued);
    }

    #[test]
    fn only_sent_and_error_are_terminal() {
        assert!(ApplicationStatus::Sent.is_terminal());
        assert!(ApplicationStatus::Error.is_terminal());
        assert!(!ApplicationStatus::Queued.is_terminal());
        assert!(!ApplicationStatus::Retry.is_terminal());
    }

    #[test]
    fn kind_serde_uses_lowercase_labels() {
        let parsed: ApplicationKind = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(parsed, ApplicationKind::Auto);
        assert_eq!(serde_json::to_string(&ApplicationKind::Manual).unwrap(), "\"manual\"");
    }
}
