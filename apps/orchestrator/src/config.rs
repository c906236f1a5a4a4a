// [apps/orchestrator/src/config.rs]
/*!
 * =================================================================
 * APARATO: ENVIRONMENT SETTINGS
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: MATERIALIZACIÓN ÚNICA DE VARIABLES DE ENTORNO
 *
 * Las variables se leen una sola vez en el arranque. Las obligatorias
 * abortan la ignición con un mensaje nominal si faltan.
 * =================================================================
 */

use anyhow::{bail, Result};
use std::env;

/// Configuración completa del proceso.
#[derive(Debug, Clone)]
pub struct Settings {
    // --- PERSISTENCIA ---
    pub database_url: String,
    pub turso_auth_token: Option<String>,

    // --- TRANSPORTE HTTP ---
    pub listening_port: u16,

    // --- ENLACE HH ---
    pub hh_client_id: String,
    pub hh_client_secret: String,
    pub hh_redirect_uri: String,
    pub hh_oauth_base: String,
    pub hh_api_base: String,
    pub hh_scope: String,
    pub hh_user_agent: String,

    // --- CANAL DE SALIDA ---
    pub telegram_bot_token: String,
    pub bot_username: String,

    // --- PROVEEDOR DE PAGOS ---
    pub cp_public_id: String,
    pub cp_api_secret: String,
    pub pay_return_bot_url: String,

    // --- DESTINO DEL CALLBACK OAUTH ---
    pub landing_redirect_url: String,

    // --- CADENCIAS DE DAEMONS ---
    pub auto_poll_every_sec: u64,
    pub dispatch_every_sec: u64,
    pub notifier_every_sec: u64,
    pub notifier_enabled: bool,
    pub dispatch_batch_size: i64,
}

impl Settings {
    /// Hidrata la configuración desde el entorno del proceso.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            turso_auth_token: optional("TURSO_AUTH_TOKEN"),

            listening_port: parsed_or("PORT", 8000),

            hh_client_id: required("HH_CLIENT_ID")?,
            hh_client_secret: required("HH_CLIENT_SECRET")?,
            hh_redirect_uri: required("HH_REDIRECT_URI")?,
            hh_oauth_base: with_default("HH_OAUTH_BASE", "https://hh.ru"),
            hh_api_base: with_default("HH_API_BASE", "https://api.hh.ru"),
            hh_scope: with_default("HH_SCOPE", "applicant_resumes offline"),
            hh_user_agent: with_default("HH_USER_AGENT", "postulante/1.4"),

            telegram_bot_token: with_default("TELEGRAM_BOT_TOKEN", ""),
            bot_username: with_default("BOT_USERNAME", ""),

            cp_public_id: with_default("CP_PUBLIC_ID", ""),
            cp_api_secret: with_default("CP_API_SECRET", ""),
            pay_return_bot_url: with_default("PAY_RETURN_BOT_URL", ""),

            landing_redirect_url: with_default("LANDING_REDIRECT_URL", ""),

            auto_poll_every_sec: parsed_or("AUTO_POLL_EVERY_SEC", 300),
            dispatch_every_sec: parsed_or("DISPATCH_EVERY_SEC", 5),
            notifier_every_sec: parsed_or("NOTIFIER_EVERY_SEC", 15),
            notifier_enabled: flag("ENABLE_NOTIFIER"),
            dispatch_batch_size: parsed_or("DISPATCH_BATCH_SIZE", 50),
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => bail!("CRITICAL_CONFIG_VOID: {} not defined in runtime environment", name),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn with_default(name: &str, default_value: &str) -> String {
    optional(name).unwrap_or_else(|| default_value.to_string())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default_value: T) -> T {
    optional(name).and_then(|raw| raw.parse().ok()).unwrap_or(default_value)
}

fn flag(name: &str) -> bool {
    matches!(optional(name).as_deref(), Some("1") | Some("true") | Some("TRUE") | Some("yes"))
}
