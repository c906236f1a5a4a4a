// [libs/infra/db-turso/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el cluster libSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo de configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el dominio.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    // --- ESTRATO DE CONTROL DE ENTIDADES ---

    /// La entidad solicitada no existe en las tablas activas.
    #[error("[L3_ENTITY_FAULT]: IDENTIFIER_NOT_FOUND")]
    NotFound,

    /// Conflicto lógico: el invariante de unicidad rechaza la operación
    /// (p. ej. segunda campaña activa del mismo usuario).
    #[error("[L3_ENTITY_FAULT]: UNIQUENESS_CONFLICT -> {0}")]
    Conflict(String),

    /// La entidad no está en un estado apto para la transición pedida.
    #[error("[L3_ENTITY_FAULT]: INVALID_STATE_TRANSITION")]
    InvalidState,

    /// Error al comprometer una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,
}

impl DbError {
    /// Detecta violaciones de unicidad reportadas por el motor para
    /// traducirlas al conflicto lógico del dominio.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::QueryError(inner) => inner.to_string().to_lowercase().contains("unique"),
            DbError::Conflict(_) => true,
            _ => false,
        }
    }
}
