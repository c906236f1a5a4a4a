// [libs/domain/models/src/search.rs]
/*!
 * =================================================================
 * APARATO: SEARCH REQUEST MODELS
 * CLASIFICACIÓN: DOMAIN ENTITIES (ESTRATO L2)
 * RESPONSABILIDAD: ESPECIFICACIONES DE BÚSQUEDA REUTILIZABLES
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Especificación de búsqueda guardada por el usuario.
///
/// `query_params` es la forma canónica del query-string (claves de la
/// whitelist, ordenadas); los campos estructurados se conservan para
/// reconstruirla cuando falta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRequest {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    /// Texto libre de búsqueda (clave `text` de HH).
    pub query: String,
    pub area: Option<i64>,
    #[serde(default)]
    pub employment: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<String>,
    #[serde(default)]
    pub professional_roles: Vec<i64>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    /// Carta de presentación por defecto para la campaña.
    pub cover_letter: String,
    /// Forma canónica (ordenada, solo claves whitelisted).
    pub query_params: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
