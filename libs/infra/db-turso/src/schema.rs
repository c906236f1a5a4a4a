// [libs/infra/db-turso/src/schema.rs]
/**
 * =================================================================
 * APARATO: DISPATCHER DATABASE SCHEMA
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * Todos los invariantes se imponen en el momento de creación de las
 * tablas: CHECK de estados, unicidad (user_id, vacancy_id), índice
 * parcial de campaña activa única, claves de recordatorio y de grafo
 * referral. No existen migraciones aditivas.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_USERS", r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tg_id INTEGER NOT NULL UNIQUE,
            username TEXT,
            hh_account_id TEXT,
            hh_account_name TEXT,
            ref_code TEXT UNIQUE,
            pending_ref TEXT,
            referred_by INTEGER REFERENCES users(id),
            utm_source TEXT,
            utm_medium TEXT,
            utm_campaign TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_seen_at DATETIME
        );
    "#),
    ("TABLE_HH_TOKENS", r#"
        CREATE TABLE IF NOT EXISTS hh_tokens (
            user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            access_token TEXT NOT NULL,
            refresh_token TEXT NOT NULL,
            token_type TEXT NOT NULL DEFAULT 'bearer',
            expires_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_RESUMES", r#"
        CREATE TABLE IF NOT EXISTS resumes (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            resume_id TEXT NOT NULL,
            title TEXT,
            area TEXT,
            visible INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT,
            PRIMARY KEY (user_id, resume_id)
        );
    "#),
    ("TABLE_SAVED_REQUESTS", r#"
        CREATE TABLE IF NOT EXISTS saved_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            query TEXT NOT NULL DEFAULT '',
            area INTEGER,
            employment TEXT NOT NULL DEFAULT '[]',
            schedule TEXT NOT NULL DEFAULT '[]',
            professional_roles TEXT NOT NULL DEFAULT '[]',
            search_fields TEXT NOT NULL DEFAULT '[]',
            cover_letter TEXT NOT NULL DEFAULT '',
            query_params TEXT NOT NULL DEFAULT '',
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_CAMPAIGNS", r#"
        CREATE TABLE IF NOT EXISTS campaigns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            saved_request_id INTEGER REFERENCES saved_requests(id) ON DELETE SET NULL,
            resume_id TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'stopped' CHECK (status IN ('active', 'stopped')),
            daily_limit INTEGER NOT NULL DEFAULT 200,
            sent_today INTEGER NOT NULL DEFAULT 0,
            sent_total INTEGER NOT NULL DEFAULT 0,
            counters_date TEXT,
            started_at DATETIME,
            stopped_at DATETIME,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (user_id, resume_id, saved_request_id)
        );
    "#),
    ("TABLE_APPLICATIONS", r#"
        CREATE TABLE IF NOT EXISTS applications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            vacancy_id INTEGER NOT NULL,
            resume_id TEXT NOT NULL DEFAULT '',
            cover_letter TEXT,
            kind TEXT NOT NULL DEFAULT 'manual' CHECK (kind IN ('manual', 'auto')),
            status TEXT NOT NULL DEFAULT 'queued' CHECK (status IN ('queued', 'sent', 'retry', 'error')),
            attempt_count INTEGER NOT NULL DEFAULT 0,
            next_try_at DATETIME,
            error TEXT,
            campaign_id INTEGER REFERENCES campaigns(id) ON DELETE SET NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            sent_at DATETIME,
            UNIQUE (user_id, vacancy_id)
        );
    "#),
    ("TABLE_NOTIFICATIONS", r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
            scope TEXT NOT NULL DEFAULT 'user',
            body TEXT NOT NULL,
            scheduled_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            sent_at DATETIME,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'queued', 'sent', 'failed', 'canceled')),
            error TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_TARIFFS", r#"
        CREATE TABLE IF NOT EXISTS tariffs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            period_days INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );
    "#),
    ("TABLE_SUBSCRIPTIONS", r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            tariff_id INTEGER NOT NULL REFERENCES tariffs(id),
            started_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at DATETIME NOT NULL,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'expired', 'cancelled')),
            source TEXT
        );
    "#),
    ("TABLE_SUBSCRIPTION_NOTIFICATIONS", r#"
        CREATE TABLE IF NOT EXISTS subscription_notifications (
            subscription_id INTEGER NOT NULL REFERENCES subscriptions(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('D3', 'D1', 'EXPIRED')),
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (subscription_id, kind)
        );
    "#),
    ("TABLE_PAYMENTS", r#"
        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
            provider TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            tariff_id INTEGER REFERENCES tariffs(id),
            amount_cents INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('paid', 'failed', 'pending')),
            description TEXT,
            raw TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (provider, provider_id)
        );
    "#),
    ("TABLE_REFERRALS", r#"
        CREATE TABLE IF NOT EXISTS referrals (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            parent_user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            level INTEGER NOT NULL CHECK (level IN (1, 2, 3)),
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (user_id, parent_user_id, level)
        );
    "#),
    ("TABLE_REFERRAL_BALANCES", r#"
        CREATE TABLE IF NOT EXISTS referral_balances (
            user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            balance_cents INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_REFERRAL_TRANSACTIONS", r#"
        CREATE TABLE IF NOT EXISTS referral_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            amount_cents INTEGER NOT NULL,
            kind TEXT NOT NULL,
            related_user_id INTEGER REFERENCES users(id),
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#),
];

/**
 * ESTRATO 2: ENDURECIMIENTO (Índices de corrección bajo carga)
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    // Una sola campaña activa por usuario, impuesta por el motor.
    ("UQ_CAMPAIGNS_ONE_ACTIVE",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_campaigns_one_active ON campaigns(user_id) WHERE status = 'active';"),
    // Elegibilidad de reintentos sin escaneo completo.
    ("IDX_APPLICATIONS_RETRY_DUE",
        "CREATE INDEX IF NOT EXISTS idx_applications_retry_due ON applications(next_try_at) WHERE status = 'retry';"),
    ("IDX_APPLICATIONS_STATUS_CREATED",
        "CREATE INDEX IF NOT EXISTS idx_applications_status_created ON applications(status, created_at);"),
    ("IDX_APPLICATIONS_USER_CREATED",
        "CREATE INDEX IF NOT EXISTS idx_applications_user_created ON applications(user_id, created_at);"),
    // Cursor de búsqueda del planificador por campaña.
    ("IDX_APPLICATIONS_CAMPAIGN_KIND",
        "CREATE INDEX IF NOT EXISTS idx_applications_campaign_kind_created ON applications(campaign_id, kind, created_at DESC);"),
    ("IDX_NOTIFICATIONS_PENDING",
        "CREATE INDEX IF NOT EXISTS idx_notifications_status_scheduled ON notifications(status, scheduled_at);"),
    ("IDX_NOTIFICATIONS_USER_CREATED",
        "CREATE INDEX IF NOT EXISTS idx_notifications_user_created ON notifications(user_id, created_at);"),
    ("IDX_SUBSCRIPTIONS_USER_EXPIRES",
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_user_expires ON subscriptions(user_id, expires_at);"),
    ("IDX_SUBSCRIPTIONS_STATUS_EXPIRES",
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_status_expires ON subscriptions(status, expires_at);"),
    ("IDX_REFERRALS_PARENT_LEVEL",
        "CREATE INDEX IF NOT EXISTS idx_referrals_parent_level ON referrals(parent_user_id, level);"),
];

/**
 * ESTRATO 3: SEMILLAS (Catálogo comercial mínimo)
 */
const SEED_STATEMENTS: &[(&str, &str)] = &[
    ("SEED_TARIFF_WEEK",
        "INSERT OR IGNORE INTO tariffs (code, title, price_cents, period_days, is_active) \
         VALUES ('week', 'Неделя', 69000, 7, 1);"),
    ("SEED_TARIFF_MONTH",
        "INSERT OR IGNORE INTO tariffs (code, title, price_cents, period_days, is_active) \
         VALUES ('month', 'Месяц', 190000, 30, 1);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse.
 */
#[instrument(skip(database_connection))]
pub async fn apply_full_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization...");

    solidify_base_strata(database_connection).await?;
    harden_access_layer(database_connection).await?;
    plant_seed_catalog(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Dispatcher Ledger level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn plant_seed_catalog(db: &Connection) -> Result<()> {
    for (identifier, sql) in SEED_STATEMENTS {
        db.execute(*sql, ())
            .await
            .with_context(|| format!("SEED_FAULT: {}", identifier))?;
    }
    Ok(())
}
