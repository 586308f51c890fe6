//! End-to-end walk through the booking flow.
//!
//! Uses `PostgreSQL` when `DATABASE_URL` is set, in-memory adapters otherwise.
//! Confirmations go to the console unless SMTP or SMS credentials are
//! configured.

use anyhow::Context;
use seatbook::channels::build_channels;
use seatbook::codes::QrCodeGenerator;
use seatbook::config::Config;
use seatbook::metrics::register_business_metrics;
use seatbook::{
    BookingEnvironment, ReservationEngine, ReservationQueries, ReserveRequest, ValidationRequest,
    ValidationService,
};
use seatbook_core::catalog::{AccountDirectory, SeatCatalog};
use seatbook_core::environment::SystemClock;
use seatbook_core::error::BookingError;
use seatbook_core::store::ReservationStore;
use seatbook_core::types::{
    AccountContact, BuyerSnapshot, Event, EventId, HolderId, SeatCategory, SeatSelection,
};
use seatbook_postgres::{
    PostgresAccountDirectory, PostgresReservationStore, PostgresSeatCatalog,
};
use seatbook_runtime::NotificationDispatcher;
use seatbook_runtime::metrics::MetricsServer;
use seatbook_testing::{InMemoryAccountDirectory, InMemoryReservationStore, InMemorySeatCatalog};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONTENDERS: usize = 20;

struct Adapters {
    catalog: Arc<dyn SeatCatalog>,
    accounts: Arc<dyn AccountDirectory>,
    store: Arc<dyn ReservationStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(config.server.log_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        postgres = config.postgres.url.is_some(),
        smtp = config.smtp.is_some(),
        sms = config.sms.is_some(),
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new(config.server.metrics_addr()?);
    metrics.start()?;
    register_business_metrics();

    let event = demo_event();
    let holder = demo_account();
    let adapters = adapters(&config, &event, &holder).await?;

    let dispatcher =
        NotificationDispatcher::start(config.notifications.dispatcher(), build_channels(&config));

    let env = BookingEnvironment::new(
        Arc::new(SystemClock),
        adapters.catalog,
        adapters.accounts,
        adapters.store,
        Arc::new(QrCodeGenerator::new(
            config.codes.module_size,
            config.codes.quiet_zone,
        )),
        Arc::new(dispatcher.handle()),
    );
    let engine = ReservationEngine::new(env.clone());
    let validation = ValidationService::new(env.clone());
    let queries = ReservationQueries::new(env);

    // Race for seat 1
    tracing::info!(contenders = CONTENDERS, "Racing for seat 1");
    let tasks: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let engine = engine.clone();
            let request = ReserveRequest {
                event_id: event.id,
                seats: vec![SeatSelection::new(1, SeatCategory::DIAMOND)],
                holder_id: holder.holder_id,
                buyer: BuyerSnapshot {
                    name: Some(format!("Contender {i}")),
                    ..BuyerSnapshot::default()
                },
            };
            tokio::spawn(async move { engine.reserve(request).await })
        })
        .collect();

    let mut winner = None;
    let mut lost = 0;
    for outcome in futures::future::join_all(tasks).await {
        match outcome? {
            Ok(reservation) => winner = Some(reservation),
            Err(BookingError::SeatAlreadyBooked { .. }) => lost += 1,
            Err(e) => return Err(e).context("unexpected booking failure"),
        }
    }
    let winner = winner.context("no contender won seat 1")?;
    tracing::info!(reservation_id = %winner.id, lost, "Race decided");

    // Multi-seat booking next to it
    let pair = engine
        .reserve(ReserveRequest {
            event_id: event.id,
            seats: vec![
                SeatSelection::new(2, SeatCategory::PREMIUM),
                SeatSelection::new(3, SeatCategory::SILVER),
            ],
            holder_id: holder.holder_id,
            buyer: BuyerSnapshot::default(),
        })
        .await?;
    tracing::info!(reservation_id = %pair.id, seats = ?pair.seat_numbers(), "Pair booked");

    // Validate the winner by text and by image
    let ticket = winner
        .tickets
        .first()
        .context("reservation without tickets")?;
    let by_text = validation
        .validate(ValidationRequest::text(ticket.code.content.as_str()))
        .await?;
    let by_image = validation
        .validate(ValidationRequest::image_bytes(&ticket.code.rendered_image))
        .await?;
    tracing::info!(
        by_text = by_text.valid,
        by_image = by_image.valid,
        "Winning ticket validated"
    );

    // Cancel and re-validate
    engine.cancel(winner.id).await?;
    let after_cancel = validation
        .validate(ValidationRequest::text(ticket.code.content.as_str()))
        .await?;
    tracing::info!(
        valid = after_cancel.valid,
        reason = after_cancel.reason.as_str(),
        "Cancelled ticket validated"
    );

    for booking in queries.booked_events_for_holder(holder.holder_id).await? {
        tracing::info!(
            event = %booking.event.title,
            seats = ?booking.seats.iter().map(|s| s.seat_number).collect::<Vec<_>>(),
            "Holder overview"
        );
    }
    let listing = queries.list_all_reservations().await?;
    println!("{}", serde_json::to_string_pretty(&listing_summary(&listing))?);

    dispatcher.shutdown().await?;
    if let Some(rendered) = metrics.render() {
        tracing::debug!(bytes = rendered.len(), "Metrics snapshot rendered");
    }
    tracing::info!("Demo finished");
    Ok(())
}

async fn adapters(
    config: &Config,
    event: &Event,
    holder: &AccountContact,
) -> anyhow::Result<Adapters> {
    if let Some(url) = &config.postgres.url {
        tracing::info!("Connecting to PostgreSQL");
        let pool = seatbook_postgres::connect(url, config.postgres.max_connections).await?;
        seatbook_postgres::migrate(&pool).await?;

        let catalog = PostgresSeatCatalog::new(pool.clone());
        catalog.upsert_event(event).await?;
        let accounts = PostgresAccountDirectory::new(pool.clone());
        accounts.upsert_account(holder).await?;

        return Ok(Adapters {
            catalog: Arc::new(catalog),
            accounts: Arc::new(accounts),
            store: Arc::new(PostgresReservationStore::new(pool)),
        });
    }

    tracing::info!("DATABASE_URL not set, using in-memory adapters");
    let accounts = InMemoryAccountDirectory::new();
    accounts.put(holder.clone());
    Ok(Adapters {
        catalog: Arc::new(InMemorySeatCatalog::with_events([event.clone()])),
        accounts: Arc::new(accounts),
        store: Arc::new(InMemoryReservationStore::new().with_insert_delay(Duration::from_millis(5))),
    })
}

fn demo_event() -> Event {
    Event {
        id: EventId::new(),
        title: "Opening Night".to_string(),
        description: "Season premiere".to_string(),
        date: chrono::Utc::now() + chrono::Duration::days(30),
        location: "Grand Theatre".to_string(),
        image_url: None,
        total_seats: 100,
        categories: SeatCategory::default_set(),
    }
}

fn demo_account() -> AccountContact {
    AccountContact {
        holder_id: HolderId::new(),
        name: "Demo Holder".to_string(),
        email: "holder@example.com".to_string(),
        phone: Some("+15550123".to_string()),
    }
}

fn listing_summary(listing: &[seatbook::ReservationListing]) -> serde_json::Value {
    listing
        .iter()
        .map(|row| {
            serde_json::json!({
                "reservation_id": row.reservation_id.to_string(),
                "status": row.status.as_str(),
                "seats": row.seats.iter().map(|s| s.seat_number.value()).collect::<Vec<_>>(),
                "codes": row.codes.iter().map(|c| c.content.as_str()).collect::<Vec<_>>(),
                "buyer": row.buyer,
                "event": row.event.as_ref().map(|e| e.title.as_str()),
            })
        })
        .collect()
}
