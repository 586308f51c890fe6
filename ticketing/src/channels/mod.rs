//! Delivery channels for confirmation messages.
//!
//! Each channel decides from the job's recipients whether it applies, and
//! classifies its own failures as transient or permanent. The dispatcher owns
//! retries.

mod console;
mod email;
mod sms;

pub use console::ConsoleChannel;
pub use email::EmailChannel;
pub use sms::SmsChannel;

use crate::config::Config;
use seatbook_core::notification::DeliveryChannel;
use std::sync::Arc;

/// Build the channels `config` has credentials for.
///
/// With neither SMTP nor SMS configured, confirmations are logged by the
/// console channel instead.
#[must_use]
pub fn build_channels(config: &Config) -> Vec<Arc<dyn DeliveryChannel>> {
    let mut channels: Vec<Arc<dyn DeliveryChannel>> = Vec::new();

    if let Some(smtp) = &config.smtp {
        tracing::info!(host = %smtp.host, port = smtp.port, "Email channel enabled");
        channels.push(Arc::new(EmailChannel::new(smtp.clone())));
    }
    if let Some(sms) = &config.sms {
        tracing::info!(gateway = %sms.gateway_url, "SMS channel enabled");
        channels.push(Arc::new(SmsChannel::new(sms.clone())));
    }
    if channels.is_empty() {
        tracing::info!("No delivery credentials configured, using console channel");
        channels.push(Arc::new(ConsoleChannel));
    }

    channels
}
