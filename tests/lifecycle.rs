use chrono::NaiveDate;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, PaginatorTrait};
use tempfile::TempDir;

use bus_count_backend::{
    db,
    entities::{daily_passenger_count, ticket},
    network::{City, FareRule, Network, NetworkConfig},
    services::{
        artifacts::ArtifactStore,
        counters::{self, DailySnapshot},
        lifecycle::{LifecycleError, LocationStatus, TicketLifecycle, ValidationOutcome},
    },
    utils::qr::QrError,
};

const DAY: (i32, u32, u32) = (2024, 11, 4);

// City B sits at (13.0827, 80.2707)
const NEAR_CITY_B: (f64, f64) = (13.0850, 80.2750);
const FAR_FROM_CITY_B: (f64, f64) = (13.1200, 80.2707);

struct Harness {
    db: DatabaseConnection,
    network: Network,
    artifacts: ArtifactStore,
    dir: TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self::with_network(Network::default()).await
    }

    async fn with_network(network: Network) -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options).await.unwrap();
        db::migrate(&db).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        Self {
            db,
            network,
            artifacts: ArtifactStore::new(dir.path().join("uploads")),
            dir,
        }
    }

    fn lifecycle(&self) -> TicketLifecycle<'_> {
        TicketLifecycle::new(&self.db, &self.network, &self.artifacts, 1.0)
    }

    async fn counter(&self) -> DailySnapshot {
        self.counter_on(day()).await
    }

    async fn counter_on(&self, date: NaiveDate) -> DailySnapshot {
        counters::for_date(&self.db, date).await.unwrap()
    }

    async fn counter_rows(&self) -> u64 {
        daily_passenger_count::Entity::find().count(&self.db).await.unwrap()
    }

    async fn ticket_count(&self) -> u64 {
        ticket::Entity::find().count(&self.db).await.unwrap()
    }

    async fn book(&self, user: &str) -> ticket::Model {
        self.lifecycle()
            .book(user, "City A", "City B", day())
            .await
            .unwrap()
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(DAY.0, DAY.1, DAY.2).unwrap()
}

fn next_day() -> NaiveDate {
    day().succ_opt().unwrap()
}

// ============ Booking ============

#[tokio::test]
async fn booking_copies_fare_and_counts_passenger() {
    let h = Harness::new().await;

    let ab = h.book("user").await;
    assert_eq!(ab.fare, 50.0);
    assert_eq!(ab.ticket_date, day());
    assert!(ab.is_active);
    assert!(!ab.is_validated);
    assert!(!ab.is_arrived);
    assert_eq!((ab.destination_latitude, ab.destination_longitude), (13.0827, 80.2707));
    assert_eq!(ab.current_latitude, None);

    let counter = h.counter().await;
    assert_eq!((counter.total_passengers, counter.current_passengers), (1, 1));

    let ac = h
        .lifecycle()
        .book("user2", "City A", "City C", day())
        .await
        .unwrap();
    assert_eq!(ac.fare, 80.0);

    let counter = h.counter().await;
    assert_eq!((counter.total_passengers, counter.current_passengers), (2, 2));
}

#[tokio::test]
async fn booking_writes_decodable_qr_artifact() {
    let h = Harness::new().await;
    let ticket = h.book("user").await;

    let path = ticket.qr_code_path.clone().expect("qr path stored");
    let png = std::fs::read(&path).unwrap();
    let text = bus_count_backend::utils::qr::decode_text(&png).unwrap();

    assert!(text.contains(&format!("Ticket ID: {}", ticket.id)));
    assert!(text.contains("From: City A"));
    assert!(text.contains("To: City B"));
    assert!(text.contains("Fare: $50.00"));
    assert!(text.contains("Date: 2024-11-04"));
}

#[tokio::test]
async fn reverse_route_is_invalid_and_creates_nothing() {
    let h = Harness::new().await;

    let err = h
        .lifecycle()
        .book("user", "City B", "City A", day())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::InvalidRoute { .. }));
    assert_eq!(h.ticket_count().await, 0);
    assert_eq!(h.counter_rows().await, 0);
}

#[tokio::test]
async fn failed_artifact_write_rolls_back_booking() {
    let h = Harness::new().await;

    // A regular file where the artifact directory should be
    let blocker = h.dir.path().join("blocked");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let artifacts = ArtifactStore::new(&blocker);

    let err = TicketLifecycle::new(&h.db, &h.network, &artifacts, 1.0)
        .book("user", "City A", "City B", day())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::Artifact(_)));
    assert_eq!(h.ticket_count().await, 0);
    assert_eq!(h.counter_rows().await, 0);

    // Nothing from the failed attempt blocks the next booking
    h.book("user").await;
    assert_eq!(h.ticket_count().await, 1);
    assert_eq!(h.counter().await.total_passengers, 1);
}

#[tokio::test]
async fn destination_without_coordinates_is_rejected() {
    let network = Network::from_config(NetworkConfig {
        fares: vec![FareRule {
            from: "Depot".to_string(),
            to: "Nowhere".to_string(),
            fare: 10.0,
        }],
        cities: vec![City {
            name: "Depot".to_string(),
            latitude: 0.0,
            longitude: 0.0,
        }],
    });
    let h = Harness::with_network(network).await;

    let err = h
        .lifecycle()
        .book("user", "Depot", "Nowhere", day())
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::UnknownDestination(city) if city == "Nowhere"));
    assert_eq!(h.ticket_count().await, 0);
    assert_eq!(h.counter().await.total_passengers, 0);
}

// ============ Location ============

#[tokio::test]
async fn far_ping_keeps_tracking() {
    let h = Harness::new().await;
    let booked = h.book("user").await;

    let update = h
        .lifecycle()
        .update_location("user", Some(FAR_FROM_CITY_B.0), Some(FAR_FROM_CITY_B.1))
        .await
        .unwrap();

    assert_eq!(update.status, LocationStatus::Tracking);
    assert!(update.distance_km > 1.0);

    let ticket = h.lifecycle().ticket(booked.id).await.unwrap();
    assert!(!ticket.is_arrived);
    assert!(ticket.is_active);
    assert_eq!(ticket.current_latitude, Some(FAR_FROM_CITY_B.0));
    assert_eq!(ticket.current_longitude, Some(FAR_FROM_CITY_B.1));
    assert_eq!(h.counter().await.current_passengers, 1);
}

#[tokio::test]
async fn near_ping_marks_arrival_and_decrements_once() {
    let h = Harness::new().await;
    h.book("user2").await;
    let booked = h.book("user").await;

    let update = h
        .lifecycle()
        .update_location("user", Some(NEAR_CITY_B.0), Some(NEAR_CITY_B.1))
        .await
        .unwrap();

    assert_eq!(update.status, LocationStatus::Arrived);
    assert!(update.distance_km <= 1.0);

    let ticket = h.lifecycle().ticket(booked.id).await.unwrap();
    assert!(ticket.is_arrived);
    assert!(!ticket.is_active);

    let counter = h.counter().await;
    assert_eq!((counter.total_passengers, counter.current_passengers), (2, 1));

    // The journey is over, so there is nothing left to track
    let err = h
        .lifecycle()
        .update_location("user", Some(NEAR_CITY_B.0), Some(NEAR_CITY_B.1))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NoActiveTicket));
    assert_eq!(h.counter().await.current_passengers, 1);
}

#[tokio::test]
async fn arrival_radius_comes_from_configuration() {
    let h = Harness::new().await;
    h.book("user").await;

    // Roughly 4 km out: tracking at the default radius, arrived at 5 km
    let wide = TicketLifecycle::new(&h.db, &h.network, &h.artifacts, 5.0);
    let update = wide
        .update_location("user", Some(FAR_FROM_CITY_B.0), Some(FAR_FROM_CITY_B.1))
        .await
        .unwrap();

    assert_eq!(update.status, LocationStatus::Arrived);
    assert!(update.distance_km > 1.0 && update.distance_km <= 5.0);
    assert_eq!(h.counter().await.current_passengers, 0);
}

#[tokio::test]
async fn missing_coordinates_are_rejected() {
    let h = Harness::new().await;
    h.book("user").await;

    let err = h
        .lifecycle()
        .update_location("user", Some(13.0), None)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::InvalidCoordinates));
}

#[tokio::test]
async fn ping_without_ticket_has_no_active_ticket() {
    let h = Harness::new().await;

    let err = h
        .lifecycle()
        .update_location("user", Some(13.0), Some(80.0))
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::NoActiveTicket));
}

// ============ Validation ============

#[tokio::test]
async fn validating_twice_is_idempotent() {
    let h = Harness::new().await;
    let first = h.book("user").await;
    h.book("user2").await;

    let v = h.lifecycle().validate(first.id).await.unwrap();
    assert_eq!(v.outcome, ValidationOutcome::Validated);
    assert!(v.released);
    assert_eq!(h.counter().await.current_passengers, 1);

    let again = h.lifecycle().validate(first.id).await.unwrap();
    assert_eq!(again.outcome, ValidationOutcome::AlreadyValidated);
    assert!(!again.released);
    assert_eq!(h.counter().await.current_passengers, 1);

    assert!(h.lifecycle().ticket(first.id).await.unwrap().is_validated);
}

#[tokio::test]
async fn validating_unknown_ticket_fails() {
    let h = Harness::new().await;

    let err = h.lifecycle().validate(999).await.unwrap_err();
    assert!(matches!(err, LifecycleError::TicketNotFound(999)));
}

#[tokio::test]
async fn scanned_and_typed_validation_share_one_policy() {
    let h = Harness::new().await;
    let scanned = h.book("user").await;
    let typed = h.book("user2").await;

    let png = std::fs::read(scanned.qr_code_path.as_deref().unwrap()).unwrap();
    let v = h.lifecycle().validate_scan(&png).await.unwrap();
    assert_eq!(v.ticket_id, scanned.id);
    assert_eq!(v.outcome, ValidationOutcome::Validated);

    // A scan takes the passenger off the onboard count exactly like a typed id does
    assert_eq!(h.counter().await.current_passengers, 1);

    h.lifecycle().validate(typed.id).await.unwrap();
    assert_eq!(h.counter().await.current_passengers, 0);
    assert_eq!(h.counter().await.total_passengers, 2);
}

#[tokio::test]
async fn scanning_an_image_without_code_fails() {
    let h = Harness::new().await;
    h.book("user").await;

    let blank = image::GrayImage::from_pixel(120, 120, image::Luma([255u8]));
    let mut png = Vec::new();
    blank
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let err = h.lifecycle().validate_scan(&png).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Qr(QrError::NoCodeFound)));
    assert_eq!(h.counter().await.current_passengers, 1);
}

#[tokio::test]
async fn validation_after_arrival_does_not_double_decrement() {
    let h = Harness::new().await;
    h.book("user2").await;
    let booked = h.book("user").await;

    h.lifecycle()
        .update_location("user", Some(NEAR_CITY_B.0), Some(NEAR_CITY_B.1))
        .await
        .unwrap();
    assert_eq!(h.counter().await.current_passengers, 1);

    let v = h.lifecycle().validate(booked.id).await.unwrap();
    assert_eq!(v.outcome, ValidationOutcome::Validated);
    assert!(!v.released);
    assert_eq!(h.counter().await.current_passengers, 1);
}

#[tokio::test]
async fn arrival_after_validation_does_not_double_decrement() {
    let h = Harness::new().await;
    h.book("user2").await;
    let booked = h.book("user").await;

    h.lifecycle().validate(booked.id).await.unwrap();
    assert_eq!(h.counter().await.current_passengers, 1);

    // A validated passenger is still tracked until arrival
    let update = h
        .lifecycle()
        .update_location("user", Some(NEAR_CITY_B.0), Some(NEAR_CITY_B.1))
        .await
        .unwrap();
    assert_eq!(update.status, LocationStatus::Arrived);
    assert_eq!(h.counter().await.current_passengers, 1);
}

#[tokio::test]
async fn current_passengers_never_goes_below_zero() {
    let h = Harness::new().await;
    let booked = h.book("user").await;

    daily_passenger_count::Entity::update_many()
        .col_expr(
            daily_passenger_count::Column::CurrentPassengers,
            sea_orm::sea_query::Expr::value(0),
        )
        .exec(&h.db)
        .await
        .unwrap();

    let v = h.lifecycle().validate(booked.id).await.unwrap();
    assert_eq!(v.outcome, ValidationOutcome::Validated);
    assert_eq!(h.counter().await.current_passengers, 0);
}

#[tokio::test]
async fn release_applies_to_the_booking_date() {
    let h = Harness::new().await;
    let earlier = h.book("user").await;

    let v = h.lifecycle().validate(earlier.id).await.unwrap();
    assert!(v.released);
    assert_eq!(h.counter().await, DailySnapshot {
        date: day(),
        total_passengers: 1,
        current_passengers: 0,
    });
    assert_eq!(h.counter_rows().await, 1);

    let arriving = h.book("user").await;
    h.lifecycle()
        .book("user2", "City A", "City B", next_day())
        .await
        .unwrap();

    // user's newest active ticket is from the earlier day
    assert_eq!(arriving.ticket_date, day());
    h.lifecycle()
        .update_location("user", Some(NEAR_CITY_B.0), Some(NEAR_CITY_B.1))
        .await
        .unwrap();

    let first = h.counter().await;
    assert_eq!((first.total_passengers, first.current_passengers), (2, 0));

    let second = h.counter_on(next_day()).await;
    assert_eq!((second.total_passengers, second.current_passengers), (1, 1));
    assert_eq!(h.counter_rows().await, 2);
}

// ============ Artifacts ============

#[tokio::test]
async fn missing_artifact_is_regenerated() {
    let h = Harness::new().await;
    let booked = h.book("user").await;

    std::fs::remove_file(booked.qr_code_path.as_deref().unwrap()).unwrap();

    let png = h.lifecycle().qr_artifact(&booked).await.unwrap();
    assert_eq!(
        bus_count_backend::utils::qr::decode_ticket_id(&png).unwrap(),
        booked.id
    );
    assert!(h.artifacts.path_for(booked.id).exists());
}

// ============ Reset ============

#[tokio::test]
async fn reset_requires_exact_confirmation() {
    let h = Harness::new().await;
    let booked = h.book("user").await;

    let err = h.lifecycle().reset("confirm").await.unwrap_err();
    assert!(matches!(err, LifecycleError::ConfirmationMismatch));

    assert_eq!(h.ticket_count().await, 1);
    assert_eq!(h.counter().await.total_passengers, 1);
    assert!(h.artifacts.path_for(booked.id).exists());
}

#[tokio::test]
async fn reset_purges_tickets_counters_and_artifacts() {
    let h = Harness::new().await;
    let first = h.book("user").await;
    let second = h.book("user2").await;

    let foreign = h.artifacts.path_for(first.id).with_file_name("important.txt");
    std::fs::write(&foreign, b"not a ticket").unwrap();

    let summary = h.lifecycle().reset("CONFIRM").await.unwrap();

    assert_eq!(summary.tickets_deleted, 2);
    assert_eq!(summary.counters_deleted, 1);
    assert_eq!(summary.artifacts_removed, 2);
    assert_eq!(summary.artifacts_failed, 0);

    assert_eq!(h.ticket_count().await, 0);
    assert_eq!(h.counter().await, DailySnapshot {
        date: day(),
        total_passengers: 0,
        current_passengers: 0,
    });
    assert!(!h.artifacts.path_for(first.id).exists());
    assert!(!h.artifacts.path_for(second.id).exists());
    assert!(foreign.exists());
}
