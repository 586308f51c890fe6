//! Notification queue and delivery channel doubles.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use seatbook_core::notification::{
    DeliveryChannel, DeliveryError, DeliveryFuture, EnqueueError, NotificationJob,
    NotificationQueue,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// [`NotificationQueue`] that records every job it accepts.
///
/// Can be switched to reject jobs to exercise the booking path's
/// enqueue-failure handling.
#[derive(Clone, Debug, Default)]
pub struct RecordingQueue {
    jobs: Arc<Mutex<Vec<NotificationJob>>>,
    reject_with: Arc<Mutex<Option<EnqueueError>>>,
}

impl RecordingQueue {
    /// Create a queue that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that rejects everything with `error`
    #[must_use]
    pub fn rejecting(error: EnqueueError) -> Self {
        let queue = Self::new();
        *queue.reject_with.lock().unwrap() = Some(error);
        queue
    }

    /// Jobs accepted so far
    #[must_use]
    pub fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl NotificationQueue for RecordingQueue {
    fn enqueue(&self, job: NotificationJob) -> Result<(), EnqueueError> {
        if let Some(error) = *self.reject_with.lock().unwrap() {
            return Err(error);
        }
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

/// Which recipients a [`ScriptedChannel`] claims to reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reach {
    /// Jobs with an email address
    Email,
    /// Jobs with a phone number
    Phone,
    /// Every job
    Any,
}

/// [`DeliveryChannel`] that replays scripted outcomes.
///
/// Each call pops the next scripted result; once the script is empty every
/// call succeeds. Successful deliveries are recorded.
#[derive(Clone, Debug)]
pub struct ScriptedChannel {
    name: &'static str,
    reach: Reach,
    script: Arc<Mutex<VecDeque<Result<(), DeliveryError>>>>,
    delivered: Arc<Mutex<Vec<NotificationJob>>>,
    attempts: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl ScriptedChannel {
    /// Create a channel that always succeeds
    #[must_use]
    pub fn new(name: &'static str, reach: Reach) -> Self {
        Self {
            name,
            reach,
            script: Arc::new(Mutex::new(VecDeque::new())),
            delivered: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Queue up outcomes for the next calls
    #[must_use]
    pub fn with_script(self, outcomes: impl IntoIterator<Item = Result<(), DeliveryError>>) -> Self {
        self.script.lock().unwrap().extend(outcomes);
        self
    }

    /// Sleep for `delay` on every call
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Jobs delivered successfully
    #[must_use]
    pub fn delivered(&self) -> Vec<NotificationJob> {
        self.delivered.lock().unwrap().clone()
    }

    /// Total calls to `deliver`, failures included
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl DeliveryChannel for ScriptedChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    fn accepts(&self, job: &NotificationJob) -> bool {
        match self.reach {
            Reach::Email => job.recipients.email.is_some(),
            Reach::Phone => job.recipients.phone.is_some(),
            Reach::Any => true,
        }
    }

    fn deliver<'a>(&'a self, job: &'a NotificationJob) -> DeliveryFuture<'a> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
            if outcome.is_ok() {
                self.delivered.lock().unwrap().push(job.clone());
            }
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatbook_core::notification::{DisplayFields, Recipients};
    use seatbook_core::types::ReservationId;

    fn job() -> NotificationJob {
        NotificationJob {
            reservation_id: ReservationId::new(),
            recipients: Recipients {
                email: Some("a@example.com".to_string()),
                phone: None,
            },
            rendered_codes: vec![],
            display_fields: DisplayFields {
                event_title: "Gig".to_string(),
                seat_numbers: vec![],
                categories: vec![],
                buyer_name: None,
            },
        }
    }

    #[tokio::test]
    async fn test_scripted_channel_replays_then_succeeds() {
        let channel = ScriptedChannel::new("email", Reach::Email)
            .with_script([Err(DeliveryError::Transient("timeout".to_string()))]);
        let job = job();

        assert!(channel.deliver(&job).await.is_err());
        assert!(channel.deliver(&job).await.is_ok());
        assert_eq!(channel.attempts(), 2);
        assert_eq!(channel.delivered().len(), 1);
    }

    #[test]
    fn test_reach() {
        let job = job();
        assert!(ScriptedChannel::new("email", Reach::Email).accepts(&job));
        assert!(!ScriptedChannel::new("sms", Reach::Phone).accepts(&job));
    }

    #[test]
    fn test_rejecting_queue() {
        let queue = RecordingQueue::rejecting(EnqueueError::QueueFull);
        assert_eq!(queue.enqueue(job()), Err(EnqueueError::QueueFull));
        assert!(queue.jobs().is_empty());
    }
}
