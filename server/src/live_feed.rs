//! In-process change feed of reservations
//!
//! Every committed creation, cancellation or status change of a reservation is published to the
//! [LiveFeed]. Clients subscribe to the changes of one location and day (as Server-Sent Events via
//! the web API) and refetch the roster on every event. The feed carries no reservation data
//! itself, so the last write observed by the refetch wins.

use crate::data_store::models::ReservationUpdate;
use crate::data_store::LocationId;
use actix_web::web::Bytes;
use chrono::NaiveDate;
use futures::Stream;
use rezervari_api_types::{ChangeKind, ReservationChange};
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Number of changes buffered for slow subscribers. Subscribers falling behind further receive a
/// [FeedEvent::Resync] instead of the missed changes.
pub const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum FeedEvent {
    Change(ReservationChange),
    /// Changes have been lost. The subscriber should reload its full state.
    Resync,
}

impl FeedEvent {
    /// Format the event as a Server-Sent Event message
    pub fn to_sse_message(&self) -> Bytes {
        match self {
            FeedEvent::Change(change) => Bytes::from(format!(
                "event: change\ndata: {}\n\n",
                serde_json::to_string(change).unwrap_or_default()
            )),
            FeedEvent::Resync => Bytes::from_static(b"event: resync\ndata: {}\n\n"),
        }
    }
}

pub type FeedStream = Pin<Box<dyn Stream<Item = FeedEvent> + Send>>;

pub struct LiveFeed {
    sender: broadcast::Sender<ReservationChange>,
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    /// Publish a single change. Changes without subscribers are dropped.
    pub fn publish(&self, change: ReservationChange) {
        // Sending only fails when there are no receivers
        let _ = self.sender.send(change);
    }

    /// Publish the result of a reservation creation or cancellation: the change of the reservation
    /// itself plus an update event for every reservation of the slot whose status has changed.
    pub fn publish_update(&self, update: &ReservationUpdate, kind: ChangeKind) {
        let reservation = &update.reservation;
        self.publish(ReservationChange {
            kind,
            reservation_id: reservation.id,
            location_id: reservation.location_id,
            date: reservation.start_date,
        });
        for changed_id in update.changed_status.iter() {
            self.publish(ReservationChange {
                kind: ChangeKind::Update,
                reservation_id: *changed_id,
                location_id: reservation.location_id,
                date: reservation.start_date,
            });
        }
    }

    /// Subscribe to the changes of reservations at the given location and day
    pub fn subscribe(&self, location_id: LocationId, date: NaiveDate) -> FeedStream {
        let receiver = self.sender.subscribe();
        Box::pin(futures::stream::unfold(
            receiver,
            move |mut receiver| async move {
                loop {
                    match receiver.recv().await {
                        Ok(change) if change.location_id == location_id && change.date == date => {
                            return Some((FeedEvent::Change(change), receiver));
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(_)) => return Some((FeedEvent::Resync, receiver)),
                        Err(RecvError::Closed) => return None,
                    }
                }
            },
        ))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
