// [libs/infra/hh-client/src/types.rs]
/*!
 * =================================================================
 * APARATO: HH WIRE CONTRACTS
 * CLASIFICACIÓN: INFRASTRUCTURE DTO (ESTRATO L3)
 * RESPONSABILIDAD: FORMAS DE INTERCAMBIO CON EL JOB BOARD
 * =================================================================
 */

use serde::Deserialize;

/// Material OAuth devuelto por el endpoint de tokens
/// (tanto `authorization_code` como `refresh_token`).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Puede faltar en un refresh: el llamador conserva el anterior.
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    /// Identificador de cuenta HH cuando el grant lo reporta.
    pub user_id: Option<i64>,
}

/// Resumen de currículum de `/resumes/mine`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeItem {
    pub id: String,
    pub title: Option<String>,
    pub area: Option<ResumeArea>,
    pub updated_at: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeArea {
    pub name: Option<String>,
}

/// Perfil de cuenta de `/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeProfile {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl MeProfile {
    /// Nombre completo normalizado para el rastro del usuario.
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .iter()
            .flatten()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Página de búsqueda ya reducida a identificadores.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub vacancy_ids: Vec<i64>,
    /// Total reportado por el job board para el query completo.
    pub found: i64,
}

/// Desenlace de un intento de negociación aceptado por HH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// La negociación fue creada en este intento.
    Submitted,
    /// Ya existía una negociación previa; razón corta preservada.
    AlreadyApplied(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_skips_missing_parts() {
        let profile = MeProfile {
            id: Some("77".into()),
            first_name: Some("  Ivan ".into()),
            last_name: None,
        };
        assert_eq!(profile.full_name(), "Ivan");
    }

    #[test]
    fn resume_visibility_defaults_to_true() {
        let parsed: ResumeItem = serde_json::from_str(r#"{"id":"r1","title":"QA"}"#).unwrap();
        assert!(parsed.visible);
    }
}
