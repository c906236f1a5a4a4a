// [libs/infra/db-turso/src/repositories/mapping.rs]
/*!
 * =================================================================
 * APARATO: ROW MAPPING UTILITIES
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: EXTRACCIÓN TOLERANTE DE TIPOS DESDE EL LEDGER
 *
 * Las marcas temporales viven como TEXT UTC. CURRENT_TIMESTAMP emite
 * '%Y-%m-%d %H:%M:%S'; el parser acepta además RFC3339 por tolerancia.
 * =================================================================
 */

use chrono::{DateTime, TimeZone, Utc};
use libsql::Row;

/// Parsea una marca temporal del Ledger en cualquiera de sus dos formas.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Columna DATETIME opcional.
pub(crate) fn extract_datetime(row: &Row, index: i32) -> Option<DateTime<Utc>> {
    row.get::<Option<String>>(index)
        .ok()
        .flatten()
        .and_then(|raw| parse_timestamp(&raw))
}

/// Columna DATETIME obligatoria; cae al instante actual ante corrupción.
pub(crate) fn extract_datetime_or_now(row: &Row, index: i32) -> DateTime<Utc> {
    extract_datetime(row, index).unwrap_or_else(Utc::now)
}

/// Columna TEXT opcional normalizada (cadenas vacías -> None).
pub(crate) fn extract_optional_text(row: &Row, index: i32) -> Option<String> {
    row.get::<Option<String>>(index)
        .ok()
        .flatten()
        .filter(|value| !value.trim().is_empty())
}

/// Columna INTEGER opcional.
pub(crate) fn extract_optional_integer(row: &Row, index: i32) -> Option<i64> {
    row.get::<Option<i64>>(index).ok().flatten()
}

/// Decodifica una columna TEXT con un arreglo JSON homogéneo.
pub(crate) fn decode_json_array<T: serde::de::DeserializeOwned>(raw: &str) -> Vec<T> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Codifica un arreglo homogéneo a su forma TEXT JSON del Ledger.
pub(crate) fn encode_json_array<T: serde::Serialize>(values: &[T]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}
