use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use innkeep::catalog::Inventory;
use innkeep::clock::SystemClock;
use innkeep::config::{EngineConfig, ServiceConfig};
use innkeep::engine::Engine;
use innkeep::model::{DAY_MS, ReservationView, User};
use innkeep::reaper;
use innkeep::store::WalStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let service = ServiceConfig::from_env();
    let config = EngineConfig::from_env();
    innkeep::observability::init(service.metrics_port);

    // Ensure data directory exists
    std::fs::create_dir_all(&service.data_dir)?;

    let inventory = match &service.catalog_path {
        Some(path) => Inventory::load(path)?,
        None => Inventory::with_default_rooms(),
    };
    let store = Arc::new(WalStore::open(&service.data_dir.join("reservations.wal"))?);
    let engine = Arc::new(Engine::new(
        store.clone(),
        Arc::new(inventory),
        Arc::new(SystemClock),
        config,
    ));

    info!("innkeep booking core");
    info!("  data_dir: {}", service.data_dir.display());
    info!("  rooms: {}", engine.inventory().len());
    info!("  reservations on disk: {}", store.reservation_count());
    info!("  claim ttl: {} ms, grace: {} ms", config.claim_ttl_ms, engine.config().claim_grace_ms);
    info!(
        "  metrics: {}",
        service
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    tokio::spawn(reaper::run_reaper(engine.clone()));
    tokio::spawn(reaper::run_compactor(store.clone(), service.compact_threshold));

    // Every simulated guest asks for the same room and dates at once.
    let Some(room) = engine.inventory().rooms().into_iter().next() else {
        warn!("catalog is empty, nothing to book");
        return Ok(());
    };
    let check_in = engine.now() + 30 * DAY_MS;
    let check_out = check_in + 3 * DAY_MS;
    info!(
        "racing {} guests for room {} ({})",
        service.simulated_guests,
        room.number,
        room.category.title()
    );

    let guests: Vec<User> = (0..service.simulated_guests)
        .map(|i| User {
            id: format!("guest-{i}"),
            email: format!("guest-{i}@example.com"),
            username: format!("guest{i}"),
        })
        .collect();
    let room_id = room.id;
    let attempts = guests.iter().map(|user| {
        let engine = engine.clone();
        async move {
            let result = engine.book(Some(user), room_id, check_in, check_out, 2).await;
            (user.id.clone(), result)
        }
    });

    let mut winner = None;
    for (user_id, result) in join_all(attempts).await {
        match result {
            Ok(reservation) => {
                info!("{user_id}: confirmed {} for {}", reservation.id, reservation.total_price);
                winner = Some((user_id, reservation));
            }
            Err(e) => info!("{user_id}: {e}"),
        }
    }

    if let Some((user_id, reservation)) = winner {
        let active = engine
            .reservations_for(&user_id, ReservationView::Active, engine.now())
            .await?;
        for info in &active {
            info!(
                "{user_id} holds room {} (cancellable: {})",
                info.room_number.as_deref().unwrap_or("?"),
                info.can_cancel
            );
        }
        let cancelled = engine.cancel(reservation.id).await?;
        info!("{user_id} cancelled {} (version {})", cancelled.id, cancelled.version);
    }

    info!("innkeep stopped");
    Ok(())
}
