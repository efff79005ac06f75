// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::jobs::JobStatus;

/// Events buffered per subscriber before new ones are dropped for it
const SUBSCRIBER_BUFFER: usize = 32;

/// Live event pushed to connected clients when a job completes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_id: String,
    pub status: JobStatus,
    pub result_image_id: i64,
    pub download_location: String,
}

/// Currently connected live-event subscribers
#[derive(Debug, Clone, Default)]
pub struct SubscriberSet {
    senders: Arc<DashMap<Uuid, mpsc::Sender<JobEvent>>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.senders.insert(id, tx);
        tracing::debug!(subscriber = %id, "Subscriber connected");

        Subscription {
            id,
            receiver: rx,
            set: self.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    fn unsubscribe(&self, id: &Uuid) {
        if self.senders.remove(id).is_some() {
            tracing::debug!(subscriber = %id, "Subscriber disconnected");
        }
    }

    /// Deliver to a snapshot of the set; returns how many accepted the event.
    ///
    /// A full subscriber misses this event. A closed one is removed.
    pub fn broadcast(&self, event: &JobEvent) -> usize {
        let snapshot: Vec<(Uuid, mpsc::Sender<JobEvent>)> = self
            .senders
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, sender) in snapshot {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = %id, job_id = %event.job_id, "Subscriber lagging, event dropped");
                }
                Err(TrySendError::Closed(_)) => self.unsubscribe(&id),
            }
        }
        delivered
    }
}

/// Receiving end of one subscriber; leaves the set when dropped
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::Receiver<JobEvent>,
    set: SubscriberSet,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn recv(&mut self) -> Option<JobEvent> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.set.unsubscribe(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(job_id: &str) -> JobEvent {
        JobEvent {
            job_id: job_id.to_string(),
            status: JobStatus::Done,
            result_image_id: 5,
            download_location: "http://c06:3000/images/5".to_string(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let set = SubscriberSet::new();
        let mut first = set.subscribe();
        let mut second = set.subscribe();

        assert_eq!(set.broadcast(&event("job-1")), 2);
        assert_eq!(first.recv().await.unwrap().job_id, "job-1");
        assert_eq!(second.recv().await.unwrap().job_id, "job-1");
    }

    #[tokio::test]
    async fn test_dropped_subscription_leaves_set() {
        let set = SubscriberSet::new();
        let subscription = set.subscribe();
        assert_eq!(set.len(), 1);

        drop(subscription);
        assert!(set.is_empty());
        assert_eq!(set.broadcast(&event("job-1")), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_does_not_block_others() {
        let set = SubscriberSet::new();
        let _slow = set.subscribe();
        let mut fast = set.subscribe();

        for i in 0..SUBSCRIBER_BUFFER {
            set.broadcast(&event(&format!("job-{}", i)));
            fast.recv().await.unwrap();
        }

        // slow is full now, fast still gets the next one
        assert_eq!(set.broadcast(&event("late")), 1);
        assert_eq!(fast.recv().await.unwrap().job_id, "late");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(event("job-9")).unwrap();
        assert_eq!(json["jobId"], "job-9");
        assert_eq!(json["status"], "DONE");
        assert_eq!(json["resultImageId"], 5);
        assert_eq!(json["downloadLocation"], "http://c06:3000/images/5");
    }
}
