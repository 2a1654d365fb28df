use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Per-room broadcast of reservation changes, so open booking forms can
/// refresh their room list and blocked calendar days.
#[derive(Default)]
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to changes on one room. Creates the channel if needed.
    pub fn subscribe(&self, room_id: Ulid) -> broadcast::Receiver<Event> {
        self.channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// No-op if nobody is listening on the event's room.
    pub fn send(&self, event: &Event) {
        let room_id = event.room_id();
        if let Some(sender) = self.channels.get(&room_id)
            && sender.send(event.clone()).is_err()
        {
            drop(sender);
            // Every receiver is gone.
            self.channels.remove_if(&room_id, |_, s| s.receiver_count() == 0);
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
