// [libs/infra/db-turso/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE SUBSISTEMAS DE PERSISTENCIA
 *
 * Barrel file: los submódulos permanecen aislados y solo las
 * estructuras de autoridad (Repositories) se exponen al exterior.
 * =================================================================
 */

// --- ESTRATO 1: IDENTIDAD Y VÍNCULO HH ---

/// Usuarios del mensajero, atribución UTM y códigos referral.
pub mod user;
/// Material OAuth de HH (0..1 filas por usuario).
pub mod token;
/// Snapshots cacheados de currículums remotos.
pub mod resume;

// --- ESTRATO 2: PIPELINE DE DESPACHO (TACTICAL) ---

/// Especificaciones de búsqueda reutilizables.
pub mod saved_request;
/// Programas de despacho y sus contadores diarios.
pub mod campaign;
/// Cola de postulaciones: encolado idempotente y reclamos con lease.
pub mod application;

// --- ESTRATO 3: COMUNICACIÓN Y FACTURACIÓN ---

/// Mensajes salientes y marcadores de idempotencia diaria.
pub mod notification;
/// Suscripciones, recordatorios D3/D1/EXPIRED y tarifas.
pub mod subscription;
/// Grafo de referidos, balances y ledger de transacciones.
pub mod referral;
/// Pagos confirmados por el proveedor (idempotencia por transacción).
pub mod payment;

// --- UTILIDADES DE MAPEO (SSoT INTERNO) ---
pub(crate) mod mapping;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use application::ApplicationRepository;
pub use campaign::CampaignRepository;
pub use notification::NotificationRepository;
pub use payment::PaymentRepository;
pub use referral::ReferralRepository;
pub use resume::ResumeRepository;
pub use saved_request::SavedRequestRepository;
pub use subscription::SubscriptionRepository;
pub use token::TokenRepository;
pub use user::UserRepository;
