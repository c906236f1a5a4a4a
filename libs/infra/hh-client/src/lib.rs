// [libs/infra/hh-client/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HH UPLINK LIBRARY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENLACE TIPADO CON EL JOB BOARD REMOTO
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod query;
pub mod types;

pub use client::HhClient;
pub use errors::{ApplyFailure, HhError};
pub use query::{build_query_params, normalize_query_params, with_search_window};
pub use types::{ApplyOutcome, MeProfile, ResumeItem, SearchPage, TokenGrant};
