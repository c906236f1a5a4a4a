// [libs/domain/quota/src/lib.rs]
/*!
 * =================================================================
 * APARATO: QUOTA ENGINE
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CUOTA DIARIA EFECTIVA POR USUARIO Y DÍA MSK
 *
 * La cuota es una VISTA DERIVADA: `used_today` se cuenta siempre
 * desde la tabla de postulaciones acotada al día MSK — no existen
 * contadores desnormalizados. Los reintentos y las correcciones
 * administrativas nunca duplican el consumo.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use postulante_core_clock::next_reset_label_msk;
use serde::{Deserialize, Serialize};

/// Tope absoluto de postulaciones por usuario y día MSK, sin importar la tarifa.
pub const HARD_DAILY_CAP: i64 = 200;
/// Tope diario de la tarifa gratuita.
pub const FREE_DAILY_CAP: i64 = 10;
/// Tope diario de la tarifa de pago.
pub const PAID_DAILY_CAP: i64 = 200;

/// Clase de derecho efectiva del usuario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tariff {
    Free,
    Paid,
}

impl Tariff {
    pub fn as_label(&self) -> &'static str {
        match self {
            Tariff::Free => "free",
            Tariff::Paid => "paid",
        }
    }

    /// Tope diario de la tarifa, acotado por el tope duro.
    pub fn daily_cap(&self) -> i64 {
        let tariff_cap = match self {
            Tariff::Free => FREE_DAILY_CAP,
            Tariff::Paid => PAID_DAILY_CAP,
        };
        tariff_cap.min(HARD_DAILY_CAP)
    }
}

/// Snapshot de cuota consultado en cada encolado y en cada tick de despacho.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaView {
    pub tariff: Tariff,
    pub daily_cap: i64,
    pub hard_cap: i64,
    pub used_today: i64,
    pub remaining: i64,
    /// Etiqueta `HH:MM DD.MM.YYYY` (MSK) de la próxima renovación.
    pub reset_label: String,
}

impl QuotaView {
    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }
}

/// Compone la vista de cuota a partir del estado efectivo.
///
/// `has_active_subscription` debe reflejar la existencia de una
/// suscripción activa con `now < expires_at`; `used_today` es el conteo
/// de postulaciones creadas en el día MSK con estado fuera de
/// {canceled, cancelled}.
pub fn quota_view(has_active_subscription: bool, used_today: i64, now_utc: DateTime<Utc>) -> QuotaView {
    let tariff = if has_active_subscription { Tariff::Paid } else { Tariff::Free };
    let daily_cap = tariff.daily_cap();

    QuotaView {
        tariff,
        daily_cap,
        hard_cap: HARD_DAILY_CAP,
        used_today,
        remaining: (daily_cap - used_today).max(0),
        reset_label: next_reset_label_msk(now_utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn free_tariff_caps_at_ten() {
        let view = quota_view(false, 0, noon_utc());
        assert_eq!(view.tariff, Tariff::Free);
        assert_eq!(view.daily_cap, 10);
        assert_eq!(view.remaining, 10);
    }

    #[test]
    fn free_tariff_exhausts_at_ten() {
        let view = quota_view(false, 10, noon_utc());
        assert_eq!(view.remaining, 0);
        assert!(view.is_exhausted());
    }

    #[test]
    fn paid_tariff_caps_at_two_hundred() {
        let view = quota_view(true, 200, noon_utc());
        assert_eq!(view.tariff, Tariff::Paid);
        assert_eq!(view.daily_cap, 200);
        assert_eq!(view.remaining, 0);
    }

    #[test]
    fn remaining_never_goes_negative() {
        // Correcciones administrativas pueden dejar used > cap: el remanente se acota a cero.
        let view = quota_view(false, 37, noon_utc());
        assert_eq!(view.remaining, 0);
    }

    #[test]
    fn mid_day_upgrade_raises_cap_retroactively() {
        // El mismo conteo del día, consultado tras pasar a paid, libera cupo.
        let before = quota_view(false, 10, noon_utc());
        let after = quota_view(true, 10, noon_utc());
        assert_eq!(before.remaining, 0);
        assert_eq!(after.remaining, 190);
    }

    #[test]
    fn reset_label_is_next_msk_midnight() {
        let view = quota_view(false, 0, noon_utc());
        assert_eq!(view.reset_label, "00:00 02.08.2026");
    }
}
