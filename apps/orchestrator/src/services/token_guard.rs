// [apps/orchestrator/src/services/token_guard.rs]
/*!
 * =================================================================
 * APARATO: TOKEN GUARD
 * CLASIFICACIÓN: APPLICATION SERVICE (ESTRATO L1-APP)
 * RESPONSABILIDAD: CICLO DE VIDA OAUTH Y EFECTOS POST-VÍNCULO
 *
 * Único mutador del material OAuth. El refresh se serializa por
 * usuario (protección anti-estampida): N workers concurrentes del
 * despachador producen a lo sumo UN refresh por usuario.
 * =================================================================
 */

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use postulante_infra_db::repositories::{
    ReferralRepository, ResumeRepository, TokenRepository, UserRepository,
};
use postulante_infra_db::DbClient;
use postulante_infra_hh::HhClient;
use postulante_domain_models::ResumeSnapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// Margen de seguridad: un token a menos de este umbral se refresca.
const REFRESH_SKEW_SECONDS: i64 = 60;
/// Vigencia por defecto cuando el grant no reporta expires_in.
const DEFAULT_EXPIRES_IN_SECONDS: i64 = 3600;

/// Access token utilizable + señal de reparación pendiente.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: String,
    /// `true`: el refresh falló y se entrega el último material conocido;
    /// el llamador decide si lo usa o espera la reparación.
    pub needs_refresh: bool,
}

/// Desenlace del callback OAuth.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub user_id: i64,
    pub hh_account_id: Option<String>,
}

pub struct TokenGuard {
    hh_client: Arc<HhClient>,
    user_repository: UserRepository,
    token_repository: TokenRepository,
    resume_repository: ResumeRepository,
    referral_repository: ReferralRepository,
    /// Candados de refresh por usuario (anti-estampida).
    refresh_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl TokenGuard {
    pub fn new(database_client: DbClient, hh_client: Arc<HhClient>) -> Self {
        Self {
            hh_client,
            user_repository: UserRepository::new(database_client.clone()),
            token_repository: TokenRepository::new(database_client.clone()),
            resume_repository: ResumeRepository::new(database_client.clone()),
            referral_repository: ReferralRepository::new(database_client),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    fn per_user_lock(&self, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks_guard = self.refresh_locks.lock().expect("refresh lock map poisoned");
        locks_guard.entry(user_id).or_default().clone()
    }

    // --- ACCESO FRESCO ---

    /**
     * Retorna un access token utilizable para el usuario.
     *
     * # Logic:
     * - Sin fila de token: Ok(None) — el llamador sella su propio error.
     * - Vigente más allá del margen: se entrega tal cual.
     * - Por vencer: refresh serializado por usuario; si el refresh
     *   falla, se entrega el material viejo con needs_refresh=true.
     */
    #[instrument(skip(self))]
    pub async fn ensure_fresh_access(&self, user_id: i64) -> Result<Option<AccessGrant>> {
        let Some(current_token) = self.token_repository.find_by_user(user_id).await? else {
            return Ok(None);
        };

        let now_utc = Utc::now();
        if current_token.seconds_to_expiry(now_utc) >= REFRESH_SKEW_SECONDS {
            return Ok(Some(AccessGrant {
                access_token: current_token.access_token,
                needs_refresh: false,
            }));
        }

        let user_lock = self.per_user_lock(user_id);
        let _refresh_permit = user_lock.lock().await;

        // Relectura bajo candado: otro worker pudo refrescar mientras esperábamos.
        let Some(current_token) = self.token_repository.find_by_user(user_id).await? else {
            return Ok(None);
        };
        if current_token.seconds_to_expiry(Utc::now()) >= REFRESH_SKEW_SECONDS {
            return Ok(Some(AccessGrant {
                access_token: current_token.access_token,
                needs_refresh: false,
            }));
        }

        match self.execute_refresh(user_id, &current_token.refresh_token).await {
            Ok(new_access) => Ok(Some(AccessGrant { access_token: new_access, needs_refresh: false })),
            Err(refresh_fault) => {
                warn!("🔑 [TOKEN_GUARD]: Refresh failed for user {}: {}", user_id, refresh_fault);
                Ok(Some(AccessGrant {
                    access_token: current_token.access_token,
                    needs_refresh: true,
                }))
            }
        }
    }

    /// Refresh forzado (el despachador lo invoca tras un 401).
    #[instrument(skip(self))]
    pub async fn force_refresh(&self, user_id: i64) -> Result<Option<String>> {
        let user_lock = self.per_user_lock(user_id);
        let _refresh_permit = user_lock.lock().await;

        let Some(current_token) = self.token_repository.find_by_user(user_id).await? else {
            return Ok(None);
        };

        match self.execute_refresh(user_id, &current_token.refresh_token).await {
            Ok(new_access) => Ok(Some(new_access)),
            Err(refresh_fault) => {
                warn!("🔑 [TOKEN_GUARD]: Forced refresh failed for user {}: {}", user_id, refresh_fault);
                Ok(None)
            }
        }
    }

    async fn execute_refresh(&self, user_id: i64, refresh_token: &str) -> Result<String> {
        let grant = self.hh_client.refresh_token(refresh_token).await?;

        let new_refresh = grant.refresh_token.clone().unwrap_or_else(|| refresh_token.to_string());
        let token_type = grant.token_type.clone().unwrap_or_else(|| "bearer".to_string());
        let expires_at = expiry_from_grant(grant.expires_in);

        self.token_repository
            .upsert(user_id, &grant.access_token, &new_refresh, &token_type, expires_at)
            .await?;

        info!("♻️ [TOKEN_GUARD]: Access material rotated for user {}.", user_id);
        Ok(grant.access_token)
    }

    // --- CALLBACK OAUTH ---

    /**
     * Completa el vínculo OAuth: canje del code, upsert de usuario y
     * token, y efectos post-vínculo best-effort en orden (perfil,
     * currículums, anclaje referral). Un efecto fallido no rompe el
     * vínculo: se registra y se sigue.
     */
    #[instrument(skip(self, code))]
    pub async fn on_oauth_completed(&self, messenger_id: i64, code: &str) -> Result<LinkOutcome> {
        // 1. CANJE DEL CODE
        let grant = self.hh_client.exchange_code(code).await?;
        let refresh_token = grant
            .refresh_token
            .clone()
            .ok_or_else(|| anyhow!("OAUTH_FAULT: grant without refresh_token"))?;
        let token_type = grant.token_type.clone().unwrap_or_else(|| "bearer".to_string()).to_lowercase();

        // 2. UPSERT DE USUARIO + TOKEN
        let user_id = self.user_repository.upsert_seen(messenger_id, None).await?;
        self.token_repository
            .upsert(
                user_id,
                &grant.access_token,
                &refresh_token,
                &token_type,
                expiry_from_grant(grant.expires_in),
            )
            .await?;

        // 3. EFECTOS POST-VÍNCULO (best-effort, en orden)
        let mut hh_account_id = None;

        match self.hh_client.get_me(&grant.access_token).await {
            Ok(profile) => {
                let account_id = profile.id.clone().unwrap_or_default();
                if let Err(store_fault) = self
                    .user_repository
                    .store_hh_account_info(user_id, &account_id, &profile.full_name())
                    .await
                {
                    warn!("👤 [TOKEN_GUARD]: Profile store failed for user {}: {}", user_id, store_fault);
                } else if !account_id.is_empty() {
                    hh_account_id = Some(account_id);
                }
            }
            Err(profile_fault) => {
                warn!("👤 [TOKEN_GUARD]: /me fetch failed for user {}: {}", user_id, profile_fault);
            }
        }

        if let Err(resume_fault) = self.sync_resumes_with_access(user_id, &grant.access_token).await {
            warn!("📄 [TOKEN_GUARD]: Resume sync failed for user {}: {}", user_id, resume_fault);
        }

        if let Err(referral_fault) = self.attach_referral_links(user_id).await {
            warn!("🤝 [TOKEN_GUARD]: Referral attach failed for user {}: {}", user_id, referral_fault);
        }

        info!("🔗 [TOKEN_GUARD]: Account linked for messenger {} (user {}).", messenger_id, user_id);
        Ok(LinkOutcome { user_id, hh_account_id })
    }

    /// Desvincula la cuenta: incinera el token y limpia el rastro HH.
    pub async fn unlink(&self, user_id: i64) -> Result<bool> {
        let existed = self.token_repository.delete_for_user(user_id).await?;
        self.user_repository.clear_hh_account_info(user_id).await?;
        Ok(existed)
    }

    // --- SINCRONIZACIÓN DE CURRÍCULUMS ---

    /// Sincronización explícita (endpoint /hh/resumes/sync).
    pub async fn sync_resumes(&self, user_id: i64) -> Result<usize> {
        let Some(grant) = self.ensure_fresh_access(user_id).await? else {
            return Err(anyhow!("no hh access_token for user"));
        };
        self.sync_resumes_with_access(user_id, &grant.access_token).await
    }

    async fn sync_resumes_with_access(&self, user_id: i64, access_token: &str) -> Result<usize> {
        let remote_items = self.hh_client.get_resumes(access_token).await?;

        let snapshots: Vec<ResumeSnapshot> = remote_items
            .into_iter()
            .map(|item| ResumeSnapshot {
                user_id,
                resume_id: item.id,
                title: item.title,
                area: item.area.and_then(|a| a.name),
                visible: item.visible,
                updated_at: item.updated_at,
            })
            .collect();

        Ok(self.resume_repository.upsert_batch(user_id, &snapshots).await?)
    }

    // --- ANCLAJE REFERRAL ---

    /**
     * Ancla al usuario con su upline pendiente y materializa los
     * niveles 1..3. Idempotente: re-ejecutar no crea aristas nuevas.
     */
    #[instrument(skip(self))]
    pub async fn attach_referral_links(&self, user_id: i64) -> Result<bool> {
        let Some(user) = self.user_repository.find_by_id(user_id).await? else {
            return Ok(false);
        };
        if user.referred_by.is_some() {
            return Ok(false);
        }
        let Some(pending_code) = user.pending_ref.filter(|code| !code.trim().is_empty()) else {
            return Ok(false);
        };

        let Some(parent_id) = self.user_repository.find_by_ref_code(pending_code.trim()).await? else {
            return Ok(false);
        };
        if parent_id == user_id {
            return Ok(false);
        }

        self.user_repository.set_parent_once(user_id, parent_id).await?;
        self.referral_repository.insert_edge(user_id, parent_id, 1).await?;

        // Niveles 2 y 3 por la cadena de uplines ya anclados.
        if let Some(grandparent_id) = self.user_repository.referred_by(parent_id).await? {
            self.referral_repository.insert_edge(user_id, grandparent_id, 2).await?;

            if let Some(great_grandparent_id) = self.user_repository.referred_by(grandparent_id).await? {
                self.referral_repository.insert_edge(user_id, great_grandparent_id, 3).await?;
            }
        }

        info!("🤝 [TOKEN_GUARD]: Referral chain anchored for user {} (parent {}).", user_id, parent_id);
        Ok(true)
    }
}

fn expiry_from_grant(expires_in: Option<i64>) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECONDS))
}
