//! Invitation Dispatcher
//!
//! Best-effort invite fan-out after a commit. Jobs go onto a bounded queue
//! drained by a small worker pool; each job retries with exponential backoff.
//! Nothing here can change an import summary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::error::AppError;
use crate::domain::import_config::ImportConfig;
use crate::infrastructure::messaging::{Delivery, InviteContact, MessagingService};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub queued: usize,
    pub sent: usize,
    /// Accepted by a messenger that delivers nothing
    pub not_delivered: usize,
    pub failed: usize,
    pub skipped_no_contact: usize,
}

#[derive(Debug, Default)]
struct WorkerTally {
    sent: usize,
    not_delivered: usize,
    failed: usize,
}

pub struct InvitationDispatcher {
    messenger: Arc<dyn MessagingService>,
    config: ImportConfig,
}

impl InvitationDispatcher {
    pub fn new(messenger: Arc<dyn MessagingService>, config: ImportConfig) -> Self {
        Self { messenger, config }
    }

    /// Send invites and return how many actually went out.
    pub async fn dispatch(&self, contacts: Vec<InviteContact>) -> usize {
        self.dispatch_with_report(contacts).await.sent
    }

    pub async fn dispatch_with_report(&self, contacts: Vec<InviteContact>) -> DispatchReport {
        let (reachable, unreachable): (Vec<_>, Vec<_>) =
            contacts.into_iter().partition(InviteContact::is_reachable);

        for contact in &unreachable {
            debug!(occupant_id = contact.occupant_id, "No email or phone; invite not queued");
        }

        let mut report = DispatchReport {
            queued: reachable.len(),
            skipped_no_contact: unreachable.len(),
            ..Default::default()
        };
        if reachable.is_empty() {
            return report;
        }

        let workers = self.config.dispatch_workers.min(reachable.len()).max(1);
        let (sender, receiver) = mpsc::channel::<InviteContact>(workers * 2);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut pool: JoinSet<WorkerTally> = JoinSet::new();
        for _ in 0..workers {
            let receiver = Arc::clone(&receiver);
            let messenger = Arc::clone(&self.messenger);
            let config = self.config.clone();
            pool.spawn(async move { drain_queue(receiver, messenger, config).await });
        }

        for contact in reachable {
            if sender.send(contact).await.is_err() {
                // Every worker is gone; the remaining jobs cannot be delivered
                report.failed += 1;
            }
        }
        drop(sender);

        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(tally) => {
                    report.sent += tally.sent;
                    report.not_delivered += tally.not_delivered;
                    report.failed += tally.failed;
                }
                Err(e) => warn!(error = %e, "Invite worker aborted"),
            }
        }

        info!(
            queued = report.queued,
            sent = report.sent,
            not_delivered = report.not_delivered,
            failed = report.failed,
            skipped = report.skipped_no_contact,
            "Invite dispatch finished"
        );

        report
    }

    /// Run the dispatch in the background, decoupled from the caller.
    pub fn spawn(
        self: Arc<Self>,
        contacts: Vec<InviteContact>,
    ) -> tokio::task::JoinHandle<DispatchReport> {
        tokio::spawn(async move { self.dispatch_with_report(contacts).await })
    }
}

async fn drain_queue(
    receiver: Arc<Mutex<mpsc::Receiver<InviteContact>>>,
    messenger: Arc<dyn MessagingService>,
    config: ImportConfig,
) -> WorkerTally {
    let mut tally = WorkerTally::default();

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(contact) = next else {
            break;
        };

        match send_with_retry(messenger.as_ref(), &contact, &config).await {
            Ok(Delivery::Sent) => tally.sent += 1,
            Ok(Delivery::NotDelivered) => tally.not_delivered += 1,
            Err(e) => {
                warn!(
                    occupant_id = contact.occupant_id,
                    error = %e,
                    "Invite could not be delivered"
                );
                tally.failed += 1;
            }
        }
    }

    tally
}

async fn send_with_retry(
    messenger: &dyn MessagingService,
    contact: &InviteContact,
    config: &ImportConfig,
) -> Result<Delivery, AppError> {
    let timeout = config.send_timeout();
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(timeout, messenger.send_invite(contact)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "invite send exceeded {}ms",
                timeout.as_millis()
            ))),
        };

        match result {
            Ok(delivery) => return Ok(delivery),
            Err(e) if attempt >= config.dispatch_max_attempts => return Err(e),
            Err(e) => {
                debug!(
                    occupant_id = contact.occupant_id,
                    attempt,
                    error = %e,
                    "Invite attempt failed, retrying"
                );
                tokio::time::sleep(config.backoff_for(attempt)).await;
                attempt += 1;
            }
        }
    }
}
