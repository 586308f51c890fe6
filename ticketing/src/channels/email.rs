//! SMTP email channel using Lettre.

use crate::config::SmtpConfig;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use seatbook_core::notification::{
    DeliveryChannel, DeliveryError, DeliveryFuture, NotificationJob,
};

/// Sends an HTML confirmation with each seat's QR code inlined.
///
/// Codes are attached as `image/png` parts with Content-IDs `ticket-0`,
/// `ticket-1`, ... in seat order and referenced from the body as `cid:`.
#[derive(Clone)]
pub struct EmailChannel {
    config: SmtpConfig,
    credentials: Credentials,
}

impl EmailChannel {
    /// Create a channel for `config`.
    #[must_use]
    pub fn new(config: SmtpConfig) -> Self {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        Self {
            config,
            credentials,
        }
    }

    /// Build SMTP transport for sending emails.
    ///
    /// Creates a new transport for each email to avoid connection pooling issues.
    fn build_transport(&self) -> Result<SmtpTransport, DeliveryError> {
        Ok(SmtpTransport::relay(&self.config.host)
            .map_err(|e| DeliveryError::Permanent(format!("SMTP relay error: {e}")))?
            .port(self.config.port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn build_message(&self, job: &NotificationJob, to: &str) -> Result<Message, DeliveryError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| DeliveryError::Permanent(format!("Invalid from address: {e}")))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| DeliveryError::Permanent(format!("Invalid to address: {e}")))?;
        let png = ContentType::parse("image/png")
            .map_err(|e| DeliveryError::Permanent(format!("Invalid content type: {e}")))?;

        let mut body = MultiPart::related().singlepart(SinglePart::html(html_body(job)));
        for (i, code) in job.rendered_codes.iter().enumerate() {
            body = body.singlepart(
                Attachment::new_inline(format!("ticket-{i}")).body(code.clone(), png.clone()),
            );
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(NotificationJob::SUBJECT)
            .multipart(body)
            .map_err(|e| DeliveryError::Permanent(format!("Failed to build email: {e}")))
    }
}

impl DeliveryChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn accepts(&self, job: &NotificationJob) -> bool {
        job.recipients.email.is_some()
    }

    fn deliver<'a>(&'a self, job: &'a NotificationJob) -> DeliveryFuture<'a> {
        Box::pin(async move {
            let to = job
                .recipients
                .email
                .as_deref()
                .ok_or_else(|| DeliveryError::Permanent("No email recipient".to_string()))?;
            let email = self.build_message(job, to)?;
            let mailer = self.build_transport()?;

            tokio::task::spawn_blocking(move || {
                mailer.send(&email).map(|_| ()).map_err(|e| {
                    if e.is_permanent() {
                        DeliveryError::Permanent(format!("SMTP rejected message: {e}"))
                    } else {
                        DeliveryError::Transient(format!("Failed to send email: {e}"))
                    }
                })
            })
            .await
            .map_err(|e| DeliveryError::Transient(format!("Email task failed: {e}")))?
        })
    }
}

fn html_body(job: &NotificationJob) -> String {
    let fields = &job.display_fields;
    let greeting = fields
        .buyer_name
        .as_deref()
        .map(|name| format!("<p>Hello {},</p>", escape_html(name)))
        .unwrap_or_default();

    let mut codes = String::new();
    for (i, seat) in fields.seat_numbers.iter().enumerate() {
        let category = fields
            .categories
            .get(i)
            .map(|c| format!(" ({})", escape_html(c.as_str())))
            .unwrap_or_default();
        codes.push_str(&format!(
            r#"<div style="margin: 16px 0;"><p>Seat {seat}{category}</p><img src="cid:ticket-{i}" alt="Ticket code for seat {seat}"></div>"#
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{subject}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">{subject}</h2>
        {greeting}
        <p>{message}</p>
        {codes}
        <p style="color: #666; font-size: 14px;">Present a code at the entrance.</p>
    </div>
</body>
</html>"#,
        subject = NotificationJob::SUBJECT,
        message = escape_html(&job.message()),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
