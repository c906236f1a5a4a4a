// [libs/domain/models/src/identity.rs]
/*!
 * =================================================================
 * APARATO: IDENTITY DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN ENTITIES (ESTRATO L2)
 * RESPONSABILIDAD: USUARIOS, TOKENS OAUTH Y SNAPSHOTS DE CURRÍCULUM
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identidad de un usuario final del despachador.
///
/// Se crea en el primer contacto del mensajero y nunca se destruye.
/// La atribución UTM es first-write-wins: una vez sellada no se pisa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Identificador externo del mensajero (único).
    pub tg_id: i64,
    pub username: Option<String>,
    /// Identificador de la cuenta HH vinculada (se conoce tras el OAuth).
    pub hh_account_id: Option<String>,
    pub hh_account_name: Option<String>,
    /// Código referral propio (único cuando existe).
    pub ref_code: Option<String>,
    /// Código referral ajeno almacenado en /start, pendiente de anclaje.
    pub pending_ref: Option<String>,
    /// Progenitor referral ya anclado (referencia débil a otro User).
    pub referred_by: Option<i64>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Token OAuth de HH. Exactamente 0..1 por usuario.
///
/// Invariante: si la fila existe, (access_token, refresh_token, expires_at)
/// son todos no nulos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HhToken {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl HhToken {
    /// Segundos restantes de vigencia del access token respecto a `now`.
    pub fn seconds_to_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }
}

/// Snapshot cacheado de un currículum remoto del usuario.
/// Se refresca al vincular la cuenta y en la sincronización explícita.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeSnapshot {
    pub user_id: i64,
    /// Identificador externo del currículum (único por usuario).
    pub resume_id: String,
    pub title: Option<String>,
    pub area: Option<String>,
    pub visible: bool,
    pub updated_at: Option<String>,
}
