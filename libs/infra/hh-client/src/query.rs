// [libs/infra/hh-client/src/query.rs]
/*!
 * =================================================================
 * APARATO: SEARCH QUERY NORMALIZER
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: FORMA CANÓNICA DEL QUERY-STRING DE BÚSQUEDA
 *
 * El vocabulario es una whitelist estricta: toda clave futura debe
 * añadirse aquí Y en la normalización, o será descartada en silencio.
 * `page` y `per_page` pertenecen al cliente y jamás pasan a través.
 * =================================================================
 */

use chrono::{DateTime, SecondsFormat, Utc};
use url::form_urlencoded;

/// Claves de búsqueda admitidas por el vocabulario del job board.
pub const SEARCH_KEY_WHITELIST: &[&str] = &[
    "text",
    "area",
    "professional_role",
    "specialization",
    "experience",
    "employment",
    "schedule",
    "work_format",
    "only_with_salary",
    "salary",
    "currency",
    "search_field",
    "label",
    "order_by",
];

/// Claves reservadas del cliente: nunca sobreviven a la normalización.
const CLIENT_OWNED_KEYS: &[&str] = &["page", "per_page", "date_from"];

fn is_whitelisted(key: &str) -> bool {
    SEARCH_KEY_WHITELIST.contains(&key) && !CLIENT_OWNED_KEYS.contains(&key)
}

/// Normaliza un query-string arbitrario a su forma canónica.
///
/// - descarta claves fuera de la whitelist y valores vacíos,
/// - tolera prefijos `?`/`&` y espacios,
/// - ordena los pares por (clave, valor).
///
/// Es idempotente: `normalize(normalize(qs)) == normalize(qs)`.
pub fn normalize_query_params(raw: &str) -> String {
    let sanitized = raw.trim().trim_start_matches(['?', '&', ' ']);

    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(sanitized.as_bytes())
        .filter(|(key, value)| is_whitelisted(key.as_ref()) && !value.trim().is_empty())
        .map(|(key, value)| (key.into_owned(), value.trim().to_string()))
        .collect();

    pairs.sort();
    pairs.dedup();

    serialize_pairs(&pairs)
}

/// Construye la forma canónica desde los campos estructurados de una
/// SavedRequest (ruta de respaldo cuando `query_params` está vacío).
pub fn build_query_params(
    text: &str,
    area: Option<i64>,
    employment: &[String],
    schedule: &[String],
    professional_roles: &[i64],
    search_fields: &[String],
) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();

    if !text.trim().is_empty() {
        pairs.push(("text".into(), text.trim().to_string()));
    }
    if let Some(area_id) = area {
        pairs.push(("area".into(), area_id.to_string()));
    }
    for role_id in professional_roles {
        pairs.push(("professional_role".into(), role_id.to_string()));
    }
    for value in employment {
        if !value.trim().is_empty() {
            pairs.push(("employment".into(), value.trim().to_string()));
        }
    }
    for value in schedule {
        if !value.trim().is_empty() {
            pairs.push(("schedule".into(), value.trim().to_string()));
        }
    }
    for value in search_fields {
        if !value.trim().is_empty() {
            pairs.push(("search_field".into(), value.trim().to_string()));
        }
    }

    pairs.sort();
    pairs.dedup();

    serialize_pairs(&pairs)
}

/// Anexa la ventana del planificador: `order_by=publication_time` y el
/// cursor `date_from` (UTC ISO). Ambas claves previas se purgan antes.
pub fn with_search_window(canonical: &str, date_from_utc: Option<DateTime<Utc>>) -> String {
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(canonical.as_bytes())
        .filter(|(key, _)| key.as_ref() != "order_by" && key.as_ref() != "date_from")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    pairs.push(("order_by".into(), "publication_time".into()));
    if let Some(cursor) = date_from_utc {
        pairs.push(("date_from".into(), cursor.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }

    serialize_pairs(&pairs)
}

fn serialize_pairs(pairs: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalization_is_idempotent() {
        let raw = "?text=rust+backend&area=1&schedule=remote&bogus=1&employment=full";
        let once = normalize_query_params(raw);
        let twice = normalize_query_params(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn keys_are_sorted_and_foreign_keys_dropped() {
        let raw = "schedule=remote&text=rust&resume=abc&area=1";
        assert_eq!(normalize_query_params(raw), "area=1&schedule=remote&text=rust");
    }

    #[test]
    fn client_owned_keys_never_pass_through() {
        let raw = "text=rust&page=5&per_page=100&date_from=2026-01-01";
        assert_eq!(normalize_query_params(raw), "text=rust");
    }

    #[test]
    fn empty_values_are_stripped() {
        let raw = "text=&area=1&employment=";
        assert_eq!(normalize_query_params(raw), "area=1");
    }

    #[test]
    fn repeated_multi_value_keys_survive() {
        let raw = "employment=full&employment=part&text=qa";
        assert_eq!(normalize_query_params(raw), "employment=full&employment=part&text=qa");
    }

    #[test]
    fn builder_produces_canonical_form() {
        let qs = build_query_params(
            "rust developer",
            Some(1),
            &["full".into()],
            &["remote".into()],
            &[96],
            &["name".into()],
        );
        assert_eq!(
            qs,
            "area=1&employment=full&professional_role=96&schedule=remote&search_field=name&text=rust+developer"
        );
        assert_eq!(normalize_query_params(&qs), qs);
    }

    #[test]
    fn search_window_overrides_prior_cursor() {
        let cursor = chrono::Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        let windowed = with_search_window("order_by=relevance&text=rust", Some(cursor));
        assert_eq!(windowed, "text=rust&order_by=publication_time&date_from=2026-08-01T09%3A00%3A00Z");
    }
}
