// [libs/infra/db-turso/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TACTICAL PERSISTENCE LIBRARY
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ACCESO TIPADO AL LEDGER DEL DESPACHADOR
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::DbClient;
pub use errors::DbError;
