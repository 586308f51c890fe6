//! SMS channel over an HTTP gateway.

use crate::config::SmsConfig;
use reqwest::{Client, StatusCode};
use seatbook_core::notification::{
    DeliveryChannel, DeliveryError, DeliveryFuture, NotificationJob,
};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    from: &'a str,
    body: String,
}

/// Sends the plain-text confirmation to the buyer's phone.
#[derive(Clone)]
pub struct SmsChannel {
    client: Client,
    config: SmsConfig,
}

impl SmsChannel {
    /// Create a channel for `config`.
    #[must_use]
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

impl DeliveryChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    fn accepts(&self, job: &NotificationJob) -> bool {
        job.recipients.phone.is_some()
    }

    fn deliver<'a>(&'a self, job: &'a NotificationJob) -> DeliveryFuture<'a> {
        Box::pin(async move {
            let to = job
                .recipients
                .phone
                .as_deref()
                .ok_or_else(|| DeliveryError::Permanent("No phone recipient".to_string()))?;

            let request = SmsRequest {
                to,
                from: &self.config.sender_id,
                body: job.message(),
            };

            let response = self
                .client
                .post(&self.config.gateway_url)
                .bearer_auth(&self.config.api_key)
                .timeout(Duration::from_secs(self.config.timeout))
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_builder() {
                        DeliveryError::Permanent(format!("Invalid SMS request: {e}"))
                    } else {
                        DeliveryError::Transient(format!("SMS gateway unreachable: {e}"))
                    }
                })?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let body = response.text().await.unwrap_or_default();
            Err(classify_status(status, &body))
        })
    }
}

/// Map a non-success gateway status to a delivery error.
fn classify_status(status: StatusCode, body: &str) -> DeliveryError {
    let message = format!("SMS gateway returned {status}: {body}");
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            DeliveryError::Transient(message)
        }
        status if status.is_server_error() => DeliveryError::Transient(message),
        _ => DeliveryError::Permanent(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatbook_core::notification::{DisplayFields, Recipients};
    use seatbook_core::types::{ReservationId, SeatNumber};

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "bad number").is_transient());
        assert!(!classify_status(StatusCode::UNAUTHORIZED, "").is_transient());
    }

    #[test]
    fn test_request_body_shape() {
        let job = NotificationJob {
            reservation_id: ReservationId::new(),
            recipients: Recipients {
                email: None,
                phone: Some("+15550100".to_string()),
            },
            rendered_codes: vec![],
            display_fields: DisplayFields {
                event_title: "Summer Gala".to_string(),
                seat_numbers: vec![SeatNumber::new(7)],
                categories: vec![],
                buyer_name: None,
            },
        };
        let request = SmsRequest {
            to: "+15550100",
            from: "Seatbook",
            body: job.message(),
        };
        let json = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(json["to"], "+15550100");
        assert_eq!(json["from"], "Seatbook");
        assert_eq!(
            json["body"],
            "Your ticket for event \"Summer Gala\" is confirmed. Seat number: 7."
        );
    }
}
