// [libs/domain/models/src/referral.rs]
/*!
 * =================================================================
 * APARATO: REFERRAL DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN ENTITIES (ESTRATO L2)
 * RESPONSABILIDAD: GRAFO DE REFERIDOS Y RESUMEN PARA EL FRONTEND
 *
 * El grafo se modela como tabla de aristas dirigidas
 * referrals(user, parent, level) con niveles 1..3 materializados en
 * el momento del anclaje (nunca calculados en lectura).
 * =================================================================
 */

use serde::{Deserialize, Serialize};

/// Arista del grafo: `user_id` desciende de `parent_user_id` a distancia `level`.
/// Única por la tripleta completa; las auto-aristas se rechazan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralEdge {
    pub user_id: i64,
    pub parent_user_id: i64,
    pub level: i64,
}

/// Resumen de la red del usuario para `/referrals/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralSummary {
    /// Enlace profundo del bot con el código propio.
    pub link: String,
    pub level1: i64,
    pub level2: i64,
    pub level3: i64,
    /// Ingresos acumulados, en unidades enteras de moneda.
    pub income: i64,
    /// Balance retirable, en unidades enteras de moneda.
    pub balance: i64,
    pub min_withdrawal: i64,
}
