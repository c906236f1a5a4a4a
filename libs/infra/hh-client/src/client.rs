// [libs/infra/hh-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: HH UPLINK CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: NEGOCIACIONES, BÚSQUEDA, CURRÍCULUMS Y CICLO OAUTH
 *
 * Todas las llamadas portan el bearer del usuario y un User-Agent
 * estable (HH exige además la cabecera HH-User-Agent). El endpoint
 * de negociaciones tiene una ruta de respaldo por vacante que se
 * intenta solo ante fallos ambiguos.
 * =================================================================
 */

use crate::errors::{classify_apply_failure, truncate_detail, ApplyFailure, HhError};
use crate::types::{ApplyOutcome, MeProfile, ResumeItem, SearchPage, TokenGrant};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::form_urlencoded;

/// Timeout por petición hacia el job board.
const REQUEST_TIMEOUT_SECONDS: u64 = 20;
/// Tamaño de página máximo admitido por el buscador remoto.
const SEARCH_PAGE_SIZE: u32 = 100;
/// Tope defensivo de paginación por recolección.
const SEARCH_MAX_PAGES: u32 = 10;

/// Parámetros de construcción del enlace con HH.
#[derive(Debug, Clone)]
pub struct HhClientConfig {
    pub api_base: String,
    pub oauth_base: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub user_agent: String,
}

pub struct HhClient {
    network_session_client: Client,
    config: HhClientConfig,
}

impl HhClient {
    /// Construye el cliente con cabeceras y timeouts de grado industrial.
    pub fn new(config: HhClientConfig) -> Result<Self, HhError> {
        let mut header_map = reqwest::header::HeaderMap::new();
        let agent_value = reqwest::header::HeaderValue::from_str(&config.user_agent)
            .map_err(|fault| HhError::OAuthFault(format!("INVALID_USER_AGENT: {}", fault)))?;
        header_map.insert("HH-User-Agent", agent_value);
        header_map.insert(reqwest::header::ACCEPT, reqwest::header::HeaderValue::from_static("application/json"));

        let network_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .user_agent(config.user_agent.clone())
            .default_headers(header_map)
            .build()?;

        Ok(Self {
            network_session_client: network_client,
            config: HhClientConfig {
                api_base: config.api_base.trim_end_matches('/').to_string(),
                oauth_base: config.oauth_base.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    /// URL de autorización OAuth con `state` opaco del llamador.
    pub fn authorize_url(&self, state: &str) -> String {
        let query_string: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", state)
            .append_pair("scope", &self.config.scope)
            .finish();
        format!("{}/oauth/authorize?{}", self.config.oauth_base, query_string)
    }

    // --- CICLO OAUTH ---

    /// Canjea un authorization code por material de tokens.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, HhError> {
        self.request_token_grant(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("redirect_uri", &self.config.redirect_uri),
        ])
        .await
    }

    /// Renueva el access token con el refresh token vigente.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, HhError> {
        self.request_token_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ])
        .await
    }

    async fn request_token_grant(&self, form_pairs: &[(&str, &str)]) -> Result<TokenGrant, HhError> {
        let token_endpoint = format!("{}/oauth/token", self.config.oauth_base);

        let network_response = self
            .network_session_client
            .post(&token_endpoint)
            .form(form_pairs)
            .send()
            .await?;

        let status = network_response.status();
        if status != StatusCode::OK {
            let body = network_response.text().await.unwrap_or_default();
            return Err(HhError::OAuthFault(format!("token endpoint {}: {}", status, truncate_detail(&body))));
        }

        network_response
            .json::<TokenGrant>()
            .await
            .map_err(|fault| HhError::DecodingFault(format!("token grant: {}", fault)))
    }

    // --- PERFIL Y CURRÍCULUMS ---

    #[instrument(skip(self, access_token))]
    pub async fn get_me(&self, access_token: &str) -> Result<MeProfile, HhError> {
        let response = self.authorized_get(access_token, "/me").await?;
        response
            .json::<MeProfile>()
            .await
            .map_err(|fault| HhError::DecodingFault(format!("/me: {}", fault)))
    }

    #[instrument(skip(self, access_token))]
    pub async fn get_resumes(&self, access_token: &str) -> Result<Vec<ResumeItem>, HhError> {
        #[derive(Deserialize)]
        struct ResumesEnvelope {
            #[serde(default)]
            items: Vec<ResumeItem>,
        }

        let response = self.authorized_get(access_token, "/resumes/mine").await?;
        let envelope = response
            .json::<ResumesEnvelope>()
            .await
            .map_err(|fault| HhError::DecodingFault(format!("/resumes/mine: {}", fault)))?;
        Ok(envelope.items)
    }

    async fn authorized_get(&self, access_token: &str, path: &str) -> Result<reqwest::Response, HhError> {
        let response = self
            .network_session_client
            .get(format!("{}{}", self.config.api_base, path))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(HhError::Unauthorized(truncate_detail(&body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(HhError::Retryable(format!("{} {}: {}", path, status, truncate_detail(&body))));
            }
            return Err(HhError::NonRetryable {
                code: format!("http_{}", status.as_u16()),
                detail: truncate_detail(&body),
            });
        }
        Ok(response)
    }

    // --- BÚSQUEDA DE VACANTES ---

    /// Una página del buscador: identificadores + total reportado.
    ///
    /// `page`/`per_page` pertenecen al cliente; el query-string entrante
    /// nunca los trae (la normalización los purga).
    #[instrument(skip(self, access_token, canonical_query))]
    pub async fn search_page(
        &self,
        access_token: &str,
        canonical_query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, HhError> {
        #[derive(Deserialize)]
        struct SearchItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct SearchEnvelope {
            #[serde(default)]
            items: Vec<SearchItem>,
            #[serde(default)]
            found: i64,
        }

        let request_url = format!(
            "{}/vacancies?{}&page={}&per_page={}",
            self.config.api_base,
            canonical_query,
            page,
            per_page.min(SEARCH_PAGE_SIZE)
        );

        let response = self
            .network_session_client
            .get(&request_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(HhError::Unauthorized(truncate_detail(&body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HhError::Retryable(format!("search {}: {}", status, truncate_detail(&body))));
        }

        let envelope = response
            .json::<SearchEnvelope>()
            .await
            .map_err(|fault| HhError::DecodingFault(format!("search envelope: {}", fault)))?;

        let vacancy_ids = envelope
            .items
            .iter()
            .filter_map(|item| item.id.trim().parse::<i64>().ok())
            .collect();

        Ok(SearchPage { vacancy_ids, found: envelope.found })
    }

    /// Recolecta hasta `limit` identificadores paginando el buscador.
    /// Se detiene ante una página vacía o el tope defensivo de páginas.
    #[instrument(skip(self, access_token, canonical_query))]
    pub async fn collect_vacancy_ids(
        &self,
        access_token: &str,
        canonical_query: &str,
        limit: usize,
    ) -> Result<Vec<i64>, HhError> {
        let mut collected: Vec<i64> = Vec::new();
        if limit == 0 {
            return Ok(collected);
        }

        for page in 0..SEARCH_MAX_PAGES {
            let search_page = self
                .search_page(access_token, canonical_query, page, SEARCH_PAGE_SIZE)
                .await?;

            if search_page.vacancy_ids.is_empty() {
                break;
            }

            for vacancy_id in search_page.vacancy_ids {
                if !collected.contains(&vacancy_id) {
                    collected.push(vacancy_id);
                }
                if collected.len() >= limit {
                    debug!("🔎 [HH_SEARCH]: Collected {} ids across {} pages.", collected.len(), page + 1);
                    return Ok(collected);
                }
            }
        }

        Ok(collected)
    }

    // --- NEGOCIACIONES (APPLY) ---

    /// Un intento de postulación. `AlreadyApplied` se devuelve como
    /// desenlace exitoso; el resto de fallos sale clasificado en `HhError`.
    #[instrument(skip(self, access_token, cover_letter), fields(vacancy = vacancy_id))]
    pub async fn apply(
        &self,
        access_token: &str,
        vacancy_id: i64,
        resume_id: &str,
        cover_letter: Option<&str>,
    ) -> Result<ApplyOutcome, HhError> {
        let vacancy_id_text = vacancy_id.to_string();
        let message = cover_letter.map(str::trim).filter(|m| !m.is_empty());

        let mut primary_form: Vec<(&str, &str)> =
            vec![("vacancy_id", vacancy_id_text.as_str()), ("resume_id", resume_id)];
        if let Some(body) = message {
            primary_form.push(("message", body));
        }

        let primary_url = format!("{}/negotiations", self.config.api_base);
        let primary_status;
        match self.post_negotiation(&primary_url, access_token, &primary_form).await? {
            NegotiationAttempt::Accepted => return Ok(ApplyOutcome::Submitted),
            NegotiationAttempt::Rejected { status, body } => {
                match classify_apply_failure(status, &body) {
                    ApplyFailure::AlreadyApplied(reason) => {
                        return Ok(ApplyOutcome::AlreadyApplied(reason));
                    }
                    ApplyFailure::Unauthorized(detail) => return Err(HhError::Unauthorized(detail)),
                    ApplyFailure::NonRetryable { code, detail } => {
                        return Err(HhError::NonRetryable { code, detail });
                    }
                    // Fallo ambiguo: probamos la ruta de respaldo por vacante.
                    ApplyFailure::Retryable(_) => primary_status = status,
                }
            }
        }

        warn!("🔁 [HH_APPLY]: Primary endpoint ambiguous ({}), probing fallback route.", primary_status);

        let mut fallback_form: Vec<(&str, &str)> = vec![("resume_id", resume_id)];
        if let Some(body) = message {
            fallback_form.push(("message", body));
        }

        let fallback_url = format!("{}/vacancies/{}/negotiations", self.config.api_base, vacancy_id);
        match self.post_negotiation(&fallback_url, access_token, &fallback_form).await? {
            NegotiationAttempt::Accepted => {
                info!("✅ [HH_APPLY]: Fallback route accepted vacancy {}.", vacancy_id);
                Ok(ApplyOutcome::Submitted)
            }
            NegotiationAttempt::Rejected { status, body } => match classify_apply_failure(status, &body) {
                ApplyFailure::AlreadyApplied(reason) => Ok(ApplyOutcome::AlreadyApplied(reason)),
                ApplyFailure::Unauthorized(detail) => Err(HhError::Unauthorized(detail)),
                ApplyFailure::NonRetryable { code, detail } => Err(HhError::NonRetryable { code, detail }),
                ApplyFailure::Retryable(_) => Err(HhError::Retryable(format!(
                    "rate/server: main {}, alt {}",
                    primary_status, status
                ))),
            },
        }
    }

    async fn post_negotiation(
        &self,
        target_url: &str,
        access_token: &str,
        form_pairs: &[(&str, &str)],
    ) -> Result<NegotiationAttempt, HhError> {
        let response = self
            .network_session_client
            .post(target_url)
            .bearer_auth(access_token)
            .form(form_pairs)
            .send()
            .await?;

        let status = response.status();
        if matches!(status.as_u16(), 200 | 201 | 202 | 204) {
            return Ok(NegotiationAttempt::Accepted);
        }

        let body = response.text().await.unwrap_or_default();
        Ok(NegotiationAttempt::Rejected { status: status.as_u16(), body })
    }
}

enum NegotiationAttempt {
    Accepted,
    Rejected { status: u16, body: String },
}
