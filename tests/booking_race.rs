use std::sync::Arc;

use futures::future::join_all;
use ulid::Ulid;

use innkeep::catalog::{Inventory, room_id_for_number};
use innkeep::clock::SystemClock;
use innkeep::config::EngineConfig;
use innkeep::engine::{BookingError, Engine};
use innkeep::model::{DAY_MS, ReservationStatus, User};
use innkeep::store::{InMemoryStore, ReservationStore, WalStore};

fn guest(i: usize) -> User {
    User {
        id: format!("guest-{i}"),
        email: format!("guest-{i}@example.com"),
        username: format!("guest{i}"),
    }
}

fn test_wal_path(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("innkeep_test_race");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

async fn race(engine: Arc<Engine>, room_id: Ulid, guests: usize) -> Vec<Result<(), BookingError>> {
    let check_in = engine.now() + 14 * DAY_MS;
    let handles = (0..guests).map(|i| {
        let engine = engine.clone();
        // Half the guests ask for a stay shifted by one night: still overlapping.
        let check_in = check_in + (i as i64 % 2) * DAY_MS;
        tokio::spawn(async move {
            engine
                .book(Some(&guest(i)), room_id, check_in, check_in + 3 * DAY_MS, 2)
                .await
                .map(|_| ())
        })
    });
    join_all(handles).await.into_iter().map(|r| r.unwrap()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn threaded_race_books_room_once() {
    let store = Arc::new(InMemoryStore::new());
    let engine = Arc::new(Engine::new(
        store.clone(),
        Arc::new(Inventory::with_default_rooms()),
        Arc::new(SystemClock),
        EngineConfig::default().without_grace(),
    ));
    let room_id = room_id_for_number("305");

    for round in 0..20 {
        let results = race(engine.clone(), room_id, 32).await;
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "round {round}");
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(
                    err,
                    BookingError::RoomBeingBooked { .. } | BookingError::DatesUnavailable { .. }
                ),
                "round {round}: {err}"
            );
        }

        // Cancel so the next round races for the same dates again.
        let all = store.read_all_reservations().await.unwrap();
        let live: Vec<_> = all
            .iter()
            .filter(|r| r.status == ReservationStatus::Confirmed)
            .collect();
        assert_eq!(live.len(), 1);
        engine.cancel(live[0].id).await.unwrap();
    }
    assert_eq!(store.reservation_count(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn race_outcome_survives_restart() {
    let path = test_wal_path("race_restart.wal");
    let room_id = room_id_for_number("201");
    let inventory = Arc::new(Inventory::with_default_rooms());

    let winner = {
        let store = Arc::new(WalStore::open(&path).unwrap());
        let engine = Arc::new(Engine::new(
            store.clone(),
            inventory.clone(),
            Arc::new(SystemClock),
            EngineConfig::default().without_grace(),
        ));
        let results = race(engine, room_id, 16).await;
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let all = store.read_all_reservations().await.unwrap();
        assert_eq!(all.len(), 1);
        all[0].clone()
    };

    let reopened = WalStore::open(&path).unwrap();
    let all = reopened.read_all_reservations().await.unwrap();
    assert_eq!(all, vec![winner]);
}
