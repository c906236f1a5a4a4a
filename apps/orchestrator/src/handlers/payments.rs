// [apps/orchestrator/src/handlers/payments.rs]
/*!
 * =================================================================
 * APARATO: PAYMENT WEBHOOKS HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: EVENTOS FIRMADOS DEL PROVEEDOR DE PAGOS
 *
 * Verificación: HMAC-SHA256 del cuerpo CRUDO contra el secreto
 * compartido, comparado en base64 con la cabecera Content-HMAC.
 * Efectos solo en el PRIMER tránsito del pago a 'paid': extensión de
 * suscripción desde max(now, expires_at) y payout referral consultivo.
 * =================================================================
 */

use crate::handlers::{reject, ApiRejection};
use crate::services::referral_payouts;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{error, info, instrument, warn};
use url::form_urlencoded;

const PAYMENT_PROVIDER: &str = "cloudpayments";
const DEFAULT_PLAN_CODE: &str = "month";

/// Respuesta de aceptación que el proveedor exige.
fn provider_ok() -> Json<Value> {
    Json(json!({ "code": 0 }))
}

fn signature_header(headers: &HeaderMap) -> String {
    for candidate in ["Content-HMAC", "Content-Hmac", "X-Content-HMAC", "X-Content-Hmac"] {
        if let Some(value) = headers.get(candidate).and_then(|v| v.to_str().ok()) {
            return value.to_string();
        }
    }
    String::new()
}

fn verify_signature(shared_secret: &str, raw_body: &[u8], header_b64: &str) -> bool {
    if header_b64.is_empty() || shared_secret.is_empty() {
        return false;
    }

    let mut mac = match Hmac::<Sha256>::new_from_slice(shared_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(raw_body);
    let expected_b64 = BASE64_STANDARD.encode(mac.finalize().into_bytes());

    expected_b64 == header_b64
}

/// Payload del proveedor: JSON directo o form-urlencoded con `Data` JSON anidado.
fn parse_provider_payload(raw_body: &[u8]) -> Value {
    if let Ok(parsed) = serde_json::from_slice::<Value>(raw_body) {
        return parsed;
    }

    let mut object = serde_json::Map::new();
    for (key, value) in form_urlencoded::parse(raw_body) {
        object.insert(key.into_owned(), Value::String(value.into_owned()));
    }
    if let Some(Value::String(nested)) = object.get("Data").cloned() {
        if let Ok(nested_json) = serde_json::from_str::<Value>(&nested) {
            object.insert("Data".into(), nested_json);
        }
    }
    Value::Object(object)
}

fn as_i64(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number.as_i64().unwrap_or_else(|| {
            number.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .or_else(|_| text.trim().parse::<f64>().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn amount_cents(value: &Value) -> i64 {
    let amount = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    (amount * 100.0).round() as i64
}

pub struct PaymentWebhooksHandler;

impl PaymentWebhooksHandler {
    /// Endpoint: POST /cp/check — validación previa del proveedor.
    pub async fn handle_check(
        State(state): State<AppState>,
        headers: HeaderMap,
        raw_body: Bytes,
    ) -> Result<Json<Value>, ApiRejection> {
        if !verify_signature(&state.settings.cp_api_secret, &raw_body, &signature_header(&headers)) {
            return Err(reject(StatusCode::FORBIDDEN, "bad signature"));
        }
        Ok(provider_ok())
    }

    /**
     * Endpoint: POST /cp/pay — confirmación de pago.
     * Idempotente por (provider, TransactionId); las repeticiones del
     * proveedor reciben el mismo OK sin efectos.
     */
    #[instrument(skip(state, headers, raw_body))]
    pub async fn handle_pay(
        State(state): State<AppState>,
        headers: HeaderMap,
        raw_body: Bytes,
    ) -> Result<Json<Value>, ApiRejection> {
        if !verify_signature(&state.settings.cp_api_secret, &raw_body, &signature_header(&headers)) {
            return Err(reject(StatusCode::FORBIDDEN, "bad signature"));
        }

        let payload = parse_provider_payload(&raw_body);

        let transaction_id = payload
            .get("TransactionId")
            .or_else(|| payload.get("InvoiceId"))
            .map(|v| match v {
                Value::String(s) => s.trim().to_string(),
                other => as_i64(other).to_string(),
            })
            .unwrap_or_default();

        let data = payload.get("Data").cloned().unwrap_or_else(|| json!({}));
        let plan_code = data
            .get("plan")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PLAN_CODE)
            .to_string();

        let messenger_id = payload
            .get("AccountId")
            .map(as_i64)
            .filter(|id| *id > 0)
            .or_else(|| data.get("tg_id").map(as_i64).filter(|id| *id > 0))
            .unwrap_or(0);

        let paid_cents = payload.get("Amount").map(amount_cents).unwrap_or(0);

        if messenger_id == 0 || transaction_id.is_empty() {
            warn!("💳 [CP_PAY]: Missing tg_id or transaction id, acknowledging without effect.");
            return Ok(provider_ok());
        }

        // Resolución de usuario y tarifa; ausencias se reconocen sin efecto.
        let user_id = match state.user_repository.resolve_user_id(messenger_id).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                warn!("💳 [CP_PAY]: User not found for tg_id={}, acknowledging.", messenger_id);
                return Ok(provider_ok());
            }
            Err(fault) => {
                error!("💳 [CP_PAY]: User lookup failed: {}", fault);
                return Ok(provider_ok());
            }
        };

        let tariff = match state.subscription_repository.find_tariff_by_code(&plan_code).await {
            Ok(Some(tariff)) => tariff,
            Ok(None) => {
                warn!("💳 [CP_PAY]: Tariff not found for code={}, acknowledging.", plan_code);
                return Ok(provider_ok());
            }
            Err(fault) => {
                error!("💳 [CP_PAY]: Tariff lookup failed: {}", fault);
                return Ok(provider_ok());
            }
        };

        let effective_cents = if paid_cents > 0 { paid_cents } else { tariff.price_cents };

        let first_paid_transition = match state
            .payment_repository
            .upsert_paid(
                user_id,
                PAYMENT_PROVIDER,
                &transaction_id,
                tariff.id,
                effective_cents,
                &payload.to_string(),
                &format!("CP {}", plan_code),
            )
            .await
        {
            Ok(first) => first,
            Err(fault) => {
                error!("💳 [CP_PAY]: Payment upsert failed: {}", fault);
                return Ok(provider_ok());
            }
        };

        if !first_paid_transition {
            return Ok(provider_ok());
        }

        // --- EFECTOS DEL PRIMER TRÁNSITO A 'paid' ---
        match state
            .subscription_repository
            .extend_or_create(user_id, tariff.id, tariff.period_days, Utc::now(), PAYMENT_PROVIDER)
            .await
        {
            Ok(new_expiry) => {
                info!("💳 [CP_PAY]: Subscription of user {} extended until {}.", user_id, new_expiry);
            }
            Err(fault) => error!("💳 [CP_PAY]: Subscription extension failed: {}", fault),
        }

        // Payout referral: consultivo, jamás rompe el webhook.
        if let Err(payout_fault) =
            referral_payouts::payout_on_payment(&state, user_id, tariff.id, tariff.price_cents).await
        {
            error!("💳 [CP_PAY]: Referral payout routine failed: {}", payout_fault);
        }

        Ok(provider_ok())
    }

    /// Endpoint: POST /cp/fail — rastro del intento fallido.
    pub async fn handle_fail(
        State(state): State<AppState>,
        headers: HeaderMap,
        raw_body: Bytes,
    ) -> Result<Json<Value>, ApiRejection> {
        if !verify_signature(&state.settings.cp_api_secret, &raw_body, &signature_header(&headers)) {
            return Err(reject(StatusCode::FORBIDDEN, "bad signature"));
        }

        let payload = parse_provider_payload(&raw_body);
        let transaction_id = payload
            .get("TransactionId")
            .or_else(|| payload.get("InvoiceId"))
            .map(|v| match v {
                Value::String(s) => s.trim().to_string(),
                other => as_i64(other).to_string(),
            })
            .unwrap_or_default();
        let paid_cents = payload.get("Amount").map(amount_cents).unwrap_or(0);

        if !transaction_id.is_empty() {
            if let Err(fault) = state
                .payment_repository
                .record_failed(PAYMENT_PROVIDER, &transaction_id, paid_cents, &payload.to_string())
                .await
            {
                error!("💳 [CP_FAIL]: Failure record collapsed: {}", fault);
            }
        }

        Ok(provider_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_roundtrip_accepts_valid_mac() {
        let secret = "shared-secret";
        let body = br#"{"TransactionId":"t-1","Amount":19.0}"#;

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let header = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        assert!(verify_signature(secret, body, &header));
        assert!(!verify_signature(secret, b"tampered", &header));
        assert!(!verify_signature(secret, body, ""));
    }

    #[test]
    fn form_payload_with_nested_data_parses() {
        let body = b"TransactionId=tx-9&Amount=19.9&AccountId=555&Data=%7B%22plan%22%3A%22week%22%7D";
        let parsed = parse_provider_payload(body);

        assert_eq!(parsed["TransactionId"], "tx-9");
        assert_eq!(as_i64(&parsed["AccountId"]), 555);
        assert_eq!(parsed["Data"]["plan"], "week");
        assert_eq!(amount_cents(&parsed["Amount"]), 1990);
    }
}
