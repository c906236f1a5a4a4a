// [libs/infra/hh-client/src/errors.rs]
/*!
 * =================================================================
 * APARATO: HH CLIENT ERROR CATALOG
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CLASIFICACIÓN SEMÁNTICA DE FALLOS DEL JOB BOARD
 *
 * El despachador depende de esta taxonomía: Retryable alimenta el
 * backoff, Unauthorized dispara el refresh, NonRetryable sella la
 * fila como terminal.
 * =================================================================
 */

use thiserror::Error;

/// Longitud máxima de texto libre upstream que se persiste en el Ledger.
pub const ERROR_DETAIL_MAX_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum HhError {
    /// Fallo físico de red o timeout: siempre reintentatable.
    #[error("NETWORK_UNREACHABLE: Failed to reach HH: {0}")]
    NetworkFault(#[from] reqwest::Error),

    /// 401: el access token requiere refresh o re-vinculación.
    #[error("IDENTITY_REVOKED: 401 unauthorized; body={0}")]
    Unauthorized(String),

    /// Rechazo de negocio definitivo (vacancy_not_found, test_required, ...).
    #[error("BUSINESS_REJECTION[{code}]: {detail}")]
    NonRetryable { code: String, detail: String },

    /// 429/5xx o 4xx ambiguo: el calendario de backoff absorbe la ráfaga.
    #[error("UPSTREAM_UNSTABLE: {0}")]
    Retryable(String),

    /// El cuerpo de respuesta no respeta el contrato esperado.
    #[error("ENVELOPE_CORRUPTION: {0}")]
    DecodingFault(String),

    /// Fallo del circuito OAuth (exchange o refresh).
    #[error("OAUTH_FAULT: {0}")]
    OAuthFault(String),
}

impl HhError {
    /// Determina si el fallo merece otra vuelta por el calendario de backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HhError::NetworkFault(_) | HhError::Retryable(_) | HhError::DecodingFault(_)
        )
    }
}

/// Clasificación de un intento de negociación fallido, derivada del
/// par (status HTTP, cuerpo). Es el contrato conductual del despachador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyFailure {
    /// Ya existía una negociación: el despachador lo cuenta como éxito.
    AlreadyApplied(String),
    Unauthorized(String),
    NonRetryable { code: String, detail: String },
    Retryable(String),
}

/// Recorta texto libre upstream al tope persistible, respetando UTF-8.
pub fn truncate_detail(raw: &str) -> String {
    if raw.chars().count() <= ERROR_DETAIL_MAX_CHARS {
        return raw.to_string();
    }
    raw.chars().take(ERROR_DETAIL_MAX_CHARS).collect()
}

/// Extrae `(code, human)` del cuerpo de error de HH.
///
/// HH reporta fallos en dos formas: `errors[{type, value}]` y
/// `bad_arguments[{name}]`; `description` acompaña a veces.
pub fn parse_error_body(body: &str) -> (String, String) {
    let parsed: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return (String::new(), body.to_string()),
    };

    let mut code = String::new();

    if let Some(first_error) = parsed.get("errors").and_then(|e| e.as_array()).and_then(|a| a.first()) {
        code = first_error
            .get("value")
            .or_else(|| first_error.get("type"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
    } else if let Some(first_argument) =
        parsed.get("bad_arguments").and_then(|e| e.as_array()).and_then(|a| a.first())
    {
        code = first_argument
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
    }

    let human = parsed
        .get("description")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| body.to_string());

    (code.trim().to_string(), human)
}

/// Clasifica una respuesta fallida del endpoint de negociaciones.
pub fn classify_apply_failure(status: u16, body: &str) -> ApplyFailure {
    if status == 401 {
        return ApplyFailure::Unauthorized(truncate_detail(body));
    }

    let (code, human) = parse_error_body(body);
    let lowered = human.to_lowercase();

    if code == "already_applied" || code == "already_negotiated" || lowered.contains("already applied") {
        return ApplyFailure::AlreadyApplied(truncate_detail(&human));
    }

    if code == "vacancy_not_found" || code == "resume_not_found" || lowered.contains("vacancy not found") {
        let stable_code = if code.is_empty() { "vacancy_not_found".to_string() } else { code };
        return ApplyFailure::NonRetryable { code: stable_code, detail: truncate_detail(&human) };
    }

    // «Se exige cuestionario» y «carta obligatoria vacía» llegan con formas variadas.
    if code == "test_required" || lowered.contains("test_required") || lowered.contains("must process test first") {
        return ApplyFailure::NonRetryable { code: "test_required".into(), detail: truncate_detail(&human) };
    }
    if code == "message" || lowered.contains("letter required") {
        return ApplyFailure::NonRetryable { code: "letter_required".into(), detail: truncate_detail(&human) };
    }

    if status == 429 || status >= 500 {
        return ApplyFailure::Retryable(format!("rate/server: {}", status));
    }

    // 4xx restantes con código de negocio explícito: terminales.
    if !code.is_empty() && status >= 400 && status < 500 {
        return ApplyFailure::NonRetryable { code, detail: truncate_detail(&human) };
    }

    ApplyFailure::Retryable(truncate_detail(&format!("HH negotiate failed: {}/{}", status, human)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_already_applied_by_code() {
        let body = r#"{"errors":[{"type":"negotiations","value":"already_applied"}]}"#;
        assert!(matches!(classify_apply_failure(403, body), ApplyFailure::AlreadyApplied(_)));
    }

    #[test]
    fn classifies_unauthorized_before_body_inspection() {
        assert!(matches!(classify_apply_failure(401, "whatever"), ApplyFailure::Unauthorized(_)));
    }

    #[test]
    fn classifies_test_required_from_errors_array() {
        let body = r#"{"errors":[{"type":"negotiations","value":"test_required"}]}"#;
        match classify_apply_failure(403, body) {
            ApplyFailure::NonRetryable { code, .. } => assert_eq!(code, "test_required"),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn classifies_letter_required_from_bad_arguments() {
        let body = r#"{"bad_arguments":[{"name":"message"}],"description":"letter required"}"#;
        match classify_apply_failure(400, body) {
            ApplyFailure::NonRetryable { code, .. } => assert_eq!(code, "letter_required"),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn classifies_vacancy_not_found_from_text_marker() {
        let body = r#"{"description":"Vacancy not found"}"#;
        match classify_apply_failure(404, body) {
            ApplyFailure::NonRetryable { code, .. } => assert_eq!(code, "vacancy_not_found"),
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn rate_limit_and_server_faults_are_retryable() {
        assert!(matches!(classify_apply_failure(429, "{}"), ApplyFailure::Retryable(_)));
        assert!(matches!(classify_apply_failure(503, "{}"), ApplyFailure::Retryable(_)));
    }

    #[test]
    fn ambiguous_bad_request_without_code_is_retryable() {
        assert!(matches!(classify_apply_failure(400, "unparseable"), ApplyFailure::Retryable(_)));
    }

    #[test]
    fn detail_is_truncated_to_persistable_length() {
        let long_body = "x".repeat(2_000);
        let truncated = truncate_detail(&long_body);
        assert_eq!(truncated.chars().count(), ERROR_DETAIL_MAX_CHARS);
    }
}
