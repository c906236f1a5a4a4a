// [libs/core/msk-clock/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MSK CLOCK ENGINE
 * CLASIFICACIÓN: CORE UTILITY (ESTRATO L1)
 * RESPONSABILIDAD: FRONTERAS DEL DÍA CALENDARIO DE MOSCÚ EN UTC
 *
 * Toda noción de "hoy" en el sistema se resuelve aquí. Las cuotas
 * diarias, el aparcamiento de reintentos y los marcadores de
 * notificación dependen del intervalo semiabierto [00:00, 24:00) MSK.
 * Las funciones reciben el instante actual como parámetro para ser
 * deterministas; los wrappers *_now cierran sobre Utc::now().
 * =================================================================
 */

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Timelike, Utc};

/// Desplazamiento fijo de Moscú: UTC+3, sin horario de verano.
const MSK_OFFSET_SECONDS: i32 = 3 * 3600;

/// Retorna el huso horario fijo de Moscú.
pub fn msk_offset() -> FixedOffset {
    FixedOffset::east_opt(MSK_OFFSET_SECONDS).expect("MSK offset is a valid fixed offset")
}

/// Límites del día calendario MSK que contiene `now_utc`, expresados en UTC.
///
/// Intervalo semiabierto: `[start, end)`. `end` es exactamente la
/// medianoche MSK siguiente.
pub fn day_bounds_msk(now_utc: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let now_msk = now_utc.with_timezone(&msk_offset());
    let start_msk = now_msk
        .with_hour(0)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("midnight is always representable in a fixed offset");
    let end_msk = start_msk + Duration::days(1);
    (start_msk.with_timezone(&Utc), end_msk.with_timezone(&Utc))
}

/// Límites del día MSK actual (wrapper sobre el reloj del sistema).
pub fn day_bounds_msk_now() -> (DateTime<Utc>, DateTime<Utc>) {
    day_bounds_msk(Utc::now())
}

/// Etiqueta `HH:MM DD.MM.YYYY` (hora de Moscú) de la próxima frontera de día.
///
/// Es el texto que ven los usuarios en "el límite se renueva a las …".
pub fn next_reset_label_msk(now_utc: DateTime<Utc>) -> String {
    let (_, end_utc) = day_bounds_msk(now_utc);
    end_utc
        .with_timezone(&msk_offset())
        .format("%H:%M %d.%m.%Y")
        .to_string()
}

/// Etiqueta de la próxima frontera según el reloj del sistema.
pub fn next_reset_label_msk_now() -> String {
    next_reset_label_msk(Utc::now())
}

/// Día calendario MSK en forma `YYYY-MM-DD` (marcador de contadores diarios).
pub fn msk_day_stamp(now_utc: DateTime<Utc>) -> String {
    now_utc.with_timezone(&msk_offset()).format("%Y-%m-%d").to_string()
}

/// Formato canónico de marcas temporales en el Ledger (UTC, ordenable como texto).
pub fn to_ledger_timestamp(instant_utc: DateTime<Utc>) -> String {
    instant_utc.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parsea una marca temporal del Ledger de vuelta a UTC.
pub fn from_ledger_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_bounds_are_midnight_msk_in_utc() {
        // 2026-03-10 14:30 UTC == 17:30 MSK -> el día MSK arranca a las 21:00 UTC del día anterior.
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 14, 30, 0).unwrap();
        let (start, end) = day_bounds_msk(now);

        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 9, 21, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 10, 21, 0, 0).unwrap());
    }

    #[test]
    fn bounds_flip_exactly_at_msk_midnight() {
        // 20:59:59 UTC pertenece al día MSK viejo; 21:00:00 UTC abre el nuevo.
        let before = Utc.with_ymd_and_hms(2026, 3, 9, 20, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 9, 21, 0, 0).unwrap();

        let (_, end_before) = day_bounds_msk(before);
        let (start_after, _) = day_bounds_msk(after);

        assert_eq!(end_before, start_after);
    }

    #[test]
    fn reset_label_formats_next_msk_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 14, 30, 0).unwrap();
        assert_eq!(next_reset_label_msk(now), "00:00 11.03.2026");
    }

    #[test]
    fn day_stamp_follows_msk_not_utc() {
        // 22:00 UTC ya es el día siguiente en Moscú.
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 22, 0, 0).unwrap();
        assert_eq!(msk_day_stamp(now), "2026-03-10");
    }

    #[test]
    fn ledger_timestamp_roundtrip() {
        let instant = Utc.with_ymd_and_hms(2026, 8, 1, 12, 5, 9).unwrap();
        let raw = to_ledger_timestamp(instant);
        assert_eq!(raw, "2026-08-01 12:05:09");
        assert_eq!(from_ledger_timestamp(&raw), Some(instant));
    }
}
