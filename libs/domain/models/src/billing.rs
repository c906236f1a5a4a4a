// [libs/domain/models/src/billing.rs]
/*!
 * =================================================================
 * APARATO: BILLING DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN ENTITIES (ESTRATO L2)
 * RESPONSABILIDAD: TARIFAS Y DERECHOS DE USO PAGADOS
 *
 * El núcleo no media pagos: solo reacciona a eventos "pago confirmado"
 * ya verificados por firma; su idempotencia vive en el Ledger bajo la
 * clave (provider, provider_id).
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tarifa comercial del catálogo (`week`, `month`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tariff {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub price_cents: i64,
    pub period_days: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_label(raw: &str) -> Self {
        match raw {
            "active" | "paid" => SubscriptionStatus::Active,
            "cancelled" | "canceled" => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Expired,
        }
    }
}

/// Derecho de uso pagado. El usuario es "paid" mientras exista una
/// suscripción activa con `now < expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub tariff_id: i64,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub source: Option<String>,
}

impl Subscription {
    /// Días restantes por "techo": 0.5 días cuentan como 1.
    pub fn ceil_days_left(&self, now: DateTime<Utc>) -> i64 {
        let seconds = (self.expires_at - now).num_seconds();
        ((seconds + 86_399) / 86_400).max(0)
    }
}

