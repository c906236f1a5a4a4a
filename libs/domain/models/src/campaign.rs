// [libs/domain/models/src/campaign.rs]
/*!
 * =================================================================
 * APARATO: CAMPAIGN DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN ENTITIES (ESTRATO L2)
 * RESPONSABILIDAD: PROGRAMAS DE DESPACHO AUTOMÁTICO POR USUARIO
 *
 * Invariante: como máximo UNA campaña activa por usuario en todo
 * momento (índice único parcial en el Ledger).
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estado operativo de una campaña.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Stopped,
}

impl CampaignStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Stopped => "stopped",
        }
    }

    pub fn from_label(raw: &str) -> Self {
        match raw {
            "active" => CampaignStatus::Active,
            _ => CampaignStatus::Stopped,
        }
    }
}

/// Programa de despacho: búsqueda guardada + currículum + presupuesto diario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    /// Referencia débil a la SavedRequest (su borrado anula el enlace).
    pub saved_request_id: Option<i64>,
    /// Identificador externo del currículum; debe pertenecer al dueño.
    pub resume_id: String,
    pub status: CampaignStatus,
    /// Presupuesto propio de la campaña, acotado por el tope duro global.
    pub daily_limit: i64,
    pub sent_today: i64,
    pub sent_total: i64,
    /// Día MSK al que pertenecen los contadores `sent_today`.
    pub counters_date: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Presupuesto restante de la campaña para el día MSK vigente.
    pub fn remaining_for_today(&self) -> i64 {
        (self.daily_limit - self.sent_today).max(0)
    }
}

/// Vista de campaña con agregados para el listado del frontend.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub resume_title: Option<String>,
    pub cover_letter: String,
    pub query_params: String,
    pub sent_count: i64,
    pub queued_count: i64,
    pub last_sent_at: Option<DateTime<Utc>>,
}
