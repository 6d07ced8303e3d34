// Command-line front end for the StayFinder client

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use stayfinder_client::{
    BookingFlowController, ClientConfig, DateQuery, FlowSnapshot, FlowState, Hotel,
    HotelCatalog, HttpHotelService,
};
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Browse hotels and book rooms against a StayFinder hotel service.
#[derive(Parser, Debug)]
#[command(name = "stayfinder", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List hotels.
    List,

    /// Add sample hotels, then list them.
    Seed,

    /// Show the rooms of a hotel.
    Rooms {
        /// Hotel identifier.
        hotel_id: String,
    },

    /// Check availability and book a room.
    Book {
        /// Hotel identifier.
        hotel_id: String,

        /// Room identifier.
        room_id: String,

        /// Check-in date (YYYY-MM-DD).
        check_in: String,

        /// Check-out date (YYYY-MM-DD).
        check_out: String,

        /// Number of guests.
        #[arg(default_value_t = 1)]
        guests: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env().context("loading configuration")?;
    info!(base_url = %config.base_url, "using hotel service");
    let service = Arc::new(HttpHotelService::new(&config).context("building HTTP client")?);

    match cli.command.unwrap_or(Command::List) {
        Command::List => list(service, false).await,
        Command::Seed => list(service, true).await,
        Command::Rooms { hotel_id } => rooms(service, &config, &hotel_id).await,
        Command::Book {
            hotel_id,
            room_id,
            check_in,
            check_out,
            guests,
        } => {
            let query = DateQuery::new(check_in, check_out, guests);
            book(service, &config, &hotel_id, &room_id, query).await
        }
    }
}

async fn list(service: Arc<HttpHotelService>, seed: bool) -> Result<()> {
    let mut catalog = HotelCatalog::new(service);
    if seed {
        catalog.seed().await;
    } else {
        catalog.load_hotels().await;
    }

    let state = catalog.state();
    if !state.error.is_empty() {
        bail!("{}", state.error);
    }
    if state.needs_seed() {
        println!("No hotels yet. Run `stayfinder seed` to add sample hotels.");
        return Ok(());
    }

    for hotel in &state.hotels {
        let rating = hotel
            .rating
            .map_or_else(|| "4.5".to_string(), |rating| rating.to_string());
        let amenities: Vec<&str> = hotel.amenities.iter().take(3).map(String::as_str).collect();
        println!(
            "{:<26} {:<28} {:<18} ★ {:<4} {}",
            hotel.id,
            hotel.name,
            hotel.location,
            rating,
            amenities.join(", ")
        );
    }
    Ok(())
}

fn print_rooms(snapshot: &FlowSnapshot) {
    for room in &snapshot.rooms {
        let status = if snapshot.can_book(&room.id) {
            "available"
        } else {
            "-"
        };
        println!(
            "{:<26} {:<24} sleeps {:<2} ${}/night  {}",
            room.id, room.name, room.capacity, room.price_per_night, status
        );
    }
}

// Prints every state the controller settles in until it is dropped
fn watch_flow(controller: &BookingFlowController<HttpHotelService>) -> JoinHandle<()> {
    let mut snapshots = controller.subscribe();
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if !snapshot.state.is_pending() {
                info!(state = ?snapshot.state, "flow state");
            }
        }
    })
}

async fn rooms(
    service: Arc<HttpHotelService>,
    config: &ClientConfig,
    hotel_id: &str,
) -> Result<()> {
    let controller = BookingFlowController::new(service, config.guest.clone());
    let watcher = watch_flow(&controller);

    controller.select_hotel(&Hotel::with_id(hotel_id)).await?;
    print_rooms(&controller.snapshot());

    drop(controller);
    watcher.await?;
    Ok(())
}

async fn book(
    service: Arc<HttpHotelService>,
    config: &ClientConfig,
    hotel_id: &str,
    room_id: &str,
    query: DateQuery,
) -> Result<()> {
    let controller = BookingFlowController::new(service, config.guest.clone());
    let watcher = watch_flow(&controller);

    controller.select_hotel(&Hotel::with_id(hotel_id)).await?;
    let room = controller
        .snapshot()
        .rooms
        .into_iter()
        .find(|room| room.id == room_id)
        .with_context(|| format!("hotel {} has no room {}", hotel_id, room_id))?;

    controller.check_availability(query).await?;
    let snapshot = controller.snapshot();
    print_rooms(&snapshot);
    if !snapshot.can_book(&room.id) {
        bail!("room {} is not available for these dates", room.id);
    }

    let outcome = controller.book_room(&room).await;
    match controller.state() {
        FlowState::BookingConfirmed(message) | FlowState::BookingFailed(message) => {
            println!("{}", message)
        }
        _ => {}
    }

    drop(controller);
    watcher.await?;
    outcome?;
    Ok(())
}
