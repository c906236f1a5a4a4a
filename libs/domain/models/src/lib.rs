// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN ENTITIES (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS TIPADOS ENTRE REPOSITORIOS, SERVICIOS Y API
 * =================================================================
 */

pub mod application;
pub mod billing;
pub mod campaign;
pub mod identity;
pub mod notification;
pub mod referral;
pub mod search;

pub use application::{Application, ApplicationKind, ApplicationStatus, DispatchStats};
pub use billing::{Subscription, SubscriptionStatus, Tariff};
pub use campaign::{Campaign, CampaignStatus, CampaignSummary};
pub use identity::{HhToken, ResumeSnapshot, User};
pub use notification::{Notification, NotificationScope, NotificationStatus, ReminderKind};
pub use referral::{ReferralEdge, ReferralSummary};
pub use search::SavedRequest;
