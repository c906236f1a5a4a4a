// [libs/infra/telegram-gateway/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TELEGRAM OUT-CHANNEL GATEWAY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENTREGA DE MENSAJES SALIENTES AL MENSAJERO
 *
 * El núcleo no renderiza interfaces: este canal entrega texto plano,
 * troceado al límite de 4096 caracteres del API, con la vista previa
 * de enlaces deshabilitada. El renderizado de teclados pertenece al
 * frontend del bot.
 * =================================================================
 */

use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Límite duro de caracteres por mensaje del API de Telegram.
const MESSAGE_CHUNK_CHARS: usize = 4096;
/// Timeout por entrega individual.
const DELIVERY_TIMEOUT_SECONDS: u64 = 15;

#[derive(Error, Debug)]
pub enum TgError {
    #[error("NETWORK_UNREACHABLE: Failed to reach Telegram: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("DELIVERY_REJECTED: Telegram returned {status}: {detail}")]
    DeliveryRejected { status: u16, detail: String },

    #[error("CHANNEL_DISABLED: bot token is not configured")]
    ChannelDisabled,
}

/// Canal de salida hacia el mensajero. Clonable y compartible entre daemons.
#[derive(Clone)]
pub struct TelegramGateway {
    network_session_client: Client,
    /// Vacío = canal deshabilitado (entornos sin bot configurado).
    bot_token: String,
}

impl TelegramGateway {
    pub fn new(bot_token: String) -> Result<Self, TgError> {
        let network_client = Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self { network_session_client: network_client, bot_token: bot_token.trim().to_string() })
    }

    /// El canal está operativo cuando existe token de bot.
    pub fn is_enabled(&self) -> bool {
        !self.bot_token.is_empty()
    }

    /// Entrega texto plano a un chat, troceando al límite del API.
    ///
    /// # Errors:
    /// - `TgError::ChannelDisabled` sin token configurado.
    /// - `TgError::DeliveryRejected` ante un rechazo del API (el primer
    ///   trozo fallido aborta el resto).
    #[instrument(skip(self, body_text), fields(chat = chat_id))]
    pub async fn send_message(&self, chat_id: i64, body_text: &str) -> Result<(), TgError> {
        if !self.is_enabled() {
            return Err(TgError::ChannelDisabled);
        }
        if body_text.is_empty() {
            return Ok(());
        }

        let delivery_url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);

        for chunk in split_message(body_text, MESSAGE_CHUNK_CHARS) {
            let payload = json!({
                "chat_id": chat_id,
                "text": chunk,
                "disable_web_page_preview": true,
            });

            let response = self
                .network_session_client
                .post(&delivery_url)
                .json(&payload)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                warn!("⚠️ [TG_GATEWAY]: Delivery to chat {} rejected: {}", chat_id, status);
                return Err(TgError::DeliveryRejected {
                    status: status.as_u16(),
                    detail: detail.chars().take(300).collect(),
                });
            }
        }

        debug!("📨 [TG_GATEWAY]: Message crystallized for chat {}.", chat_id);
        Ok(())
    }
}

/// Trocea un texto en fragmentos de a lo sumo `max_chars` caracteres,
/// prefiriendo cortar en saltos de línea.
pub fn split_message(body_text: &str, max_chars: usize) -> Vec<String> {
    let total_chars = body_text.chars().count();
    if total_chars <= max_chars {
        return vec![body_text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in body_text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if line_len > max_chars {
            // Línea monstruosa: corte duro por caracteres.
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let mut hard_chunk = String::new();
            for ch in line.chars() {
                hard_chunk.push(ch);
                if hard_chunk.chars().count() == max_chars {
                    chunks.push(std::mem::take(&mut hard_chunk));
                }
            }
            if !hard_chunk.is_empty() {
                current_len = hard_chunk.chars().count();
                current = hard_chunk;
            }
            continue;
        }

        if current_len + line_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_stay_whole() {
        assert_eq!(split_message("hola", 4096), vec!["hola".to_string()]);
    }

    #[test]
    fn long_messages_split_on_line_boundaries() {
        let body = format!("{}\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = split_message(&body, 40);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert!(chunks[1].starts_with('b'));
    }

    #[test]
    fn oversized_line_gets_hard_cut() {
        let body = "x".repeat(100);
        let chunks = split_message(&body, 40);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert_eq!(chunks.concat(), body);
    }

    #[test]
    fn disabled_gateway_reports_channel_state() {
        let gateway = TelegramGateway::new(String::new()).unwrap();
        assert!(!gateway.is_enabled());
    }
}
