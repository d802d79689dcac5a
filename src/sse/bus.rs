// ABOUTME: Per-thread broadcast bus for live conversation events
// ABOUTME: Fans out token, completed, and error events to thread event subscribers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Switchboard Contributors

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Default broadcast buffer per thread channel
const EVENT_BUFFER_SIZE: usize = 256;

/// A named event published to a thread's subscribers
#[derive(Debug, Clone)]
pub struct ThreadEvent {
    /// SSE event name (`token`, `completed`, `error`)
    pub name: String,
    /// JSON payload delivered as the event data
    pub payload: Value,
}

impl ThreadEvent {
    /// Create a new thread event
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Per-thread broadcast fan-out for live conversation events
///
/// Channels are created on first subscription and pruned once the last
/// subscriber is gone. Publishing to a thread with no subscribers is a
/// silent no-op; relaying never depends on anyone listening.
#[derive(Clone)]
pub struct ThreadNotificationBus {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<ThreadEvent>>>>,
    buffer_size: usize,
}

impl ThreadNotificationBus {
    /// Create a new bus with the default per-thread buffer
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            buffer_size: EVENT_BUFFER_SIZE,
        }
    }

    /// Subscribe to events for a thread, creating its channel on demand
    pub async fn subscribe(&self, thread_id: &str) -> broadcast::Receiver<ThreadEvent> {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(thread_id.to_owned())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0);
        sender.subscribe()
    }

    /// Publish an event to a thread's subscribers
    ///
    /// Slow subscribers that fall more than the buffer size behind miss
    /// older events; the publisher is never blocked.
    pub async fn publish(&self, thread_id: &str, event: ThreadEvent) {
        let delivered = {
            let channels = self.channels.read().await;
            channels
                .get(thread_id)
                .map(|sender| sender.send(event).is_ok())
        };

        match delivered {
            None => debug!("No event channel for thread {thread_id}, dropping event"),
            Some(false) => {
                // Last subscriber is gone, prune the channel
                let mut channels = self.channels.write().await;
                if let Some(sender) = channels.get(thread_id) {
                    if sender.receiver_count() == 0 {
                        channels.remove(thread_id);
                    }
                }
            }
            Some(true) => {}
        }
    }

    /// Get the subscriber count for a thread
    pub async fn subscriber_count(&self, thread_id: &str) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(thread_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for ThreadNotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = ThreadNotificationBus::new();
        let mut rx = bus.subscribe("thread-1").await;

        bus.publish(
            "thread-1",
            ThreadEvent::new("token", json!({"threadId": "thread-1", "token": "hi"})),
        )
        .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "token");
        assert_eq!(event.payload["token"], "hi");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let bus = ThreadNotificationBus::new();
        bus.publish("nobody-home", ThreadEvent::new("completed", json!({})))
            .await;
        assert_eq!(bus.subscriber_count("nobody-home").await, 0);
    }

    #[tokio::test]
    async fn events_fan_out_to_all_subscribers() {
        let bus = ThreadNotificationBus::new();
        let mut rx1 = bus.subscribe("t").await;
        let mut rx2 = bus.subscribe("t").await;
        assert_eq!(bus.subscriber_count("t").await, 2);

        bus.publish("t", ThreadEvent::new("completed", json!({"threadId": "t"})))
            .await;

        assert_eq!(rx1.recv().await.unwrap().name, "completed");
        assert_eq!(rx2.recv().await.unwrap().name, "completed");
    }

    #[tokio::test]
    async fn channel_pruned_after_last_subscriber_drops() {
        let bus = ThreadNotificationBus::new();
        let rx = bus.subscribe("t").await;
        drop(rx);

        // Publish notices the dead channel and removes it
        bus.publish("t", ThreadEvent::new("token", json!({"token": "x"})))
            .await;
        assert_eq!(bus.subscriber_count("t").await, 0);

        // Resubscribing recreates the channel transparently
        let mut rx = bus.subscribe("t").await;
        bus.publish("t", ThreadEvent::new("token", json!({"token": "y"})))
            .await;
        assert_eq!(rx.recv().await.unwrap().payload["token"], "y");
    }

    #[tokio::test]
    async fn slow_subscriber_skips_missed_events_instead_of_blocking() {
        let bus = ThreadNotificationBus::new();
        let mut rx = bus.subscribe("t").await;

        // Overrun the buffer while the subscriber reads nothing; every
        // publish completes regardless
        for i in 0..EVENT_BUFFER_SIZE * 2 {
            bus.publish("t", ThreadEvent::new("token", json!({"token": i})))
                .await;
        }

        // The first read reports the lag, after which delivery resumes with
        // the newest retained events
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        let last = last.expect("retained events should still be delivered");
        assert_eq!(last.payload["token"], EVENT_BUFFER_SIZE * 2 - 1);
    }

    #[tokio::test]
    async fn events_are_scoped_to_their_thread() {
        let bus = ThreadNotificationBus::new();
        let mut rx_a = bus.subscribe("thread-a").await;
        let mut rx_b = bus.subscribe("thread-b").await;

        bus.publish("thread-a", ThreadEvent::new("token", json!({"token": "a"})))
            .await;

        let event = rx_a.recv().await.unwrap();
        assert_eq!(event.payload["token"], "a");

        // thread-b saw nothing
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
