mod availability;
mod booking;
mod conflict;
mod error;
mod lifecycle;
mod queries;

pub use availability::{
    blocked_dates, day_of, first_conflict, is_available, merge_overlapping, occupied_rooms,
    subtract_intervals,
};
pub use conflict::validate_request;
pub use error::{BookingError, CancellationError, ValidationError};
pub use lifecycle::cancellation_block;

use std::sync::Arc;

use crate::catalog::Inventory;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::notify::NotifyHub;
use crate::store::ReservationStore;

/// Booking core: availability queries, the claim-guarded booking protocol and
/// the cancellation rules, over an injected store, inventory and clock.
pub struct Engine {
    store: Arc<dyn ReservationStore>,
    inventory: Arc<Inventory>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        inventory: Arc<Inventory>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            inventory,
            clock,
            config: config.normalized(),
            notify: Arc::new(NotifyHub::new()),
        }
    }

    /// Wall clock and default tunables.
    pub fn with_system_clock(store: Arc<dyn ReservationStore>, inventory: Arc<Inventory>) -> Self {
        Self::new(store, inventory, Arc::new(SystemClock), EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    pub fn now(&self) -> crate::model::Ms {
        self.clock.now_ms()
    }
}
