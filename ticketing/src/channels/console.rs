use seatbook_core::notification::{DeliveryChannel, DeliveryFuture, NotificationJob};

/// Logs confirmations instead of sending them. Development default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleChannel;

impl DeliveryChannel for ConsoleChannel {
    fn name(&self) -> &'static str {
        "console"
    }

    fn accepts(&self, _job: &NotificationJob) -> bool {
        true
    }

    fn deliver<'a>(&'a self, job: &'a NotificationJob) -> DeliveryFuture<'a> {
        Box::pin(async move {
            tracing::info!(
                reservation_id = %job.reservation_id,
                email = job.recipients.email.as_deref().unwrap_or("-"),
                phone = job.recipients.phone.as_deref().unwrap_or("-"),
                codes = job.rendered_codes.len(),
                subject = NotificationJob::SUBJECT,
                message = %job.message(),
                "Confirmation"
            );
            Ok(())
        })
    }
}
