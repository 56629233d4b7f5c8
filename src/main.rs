//! liftlog - workout logging client

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, warn};

use liftlog::api::ApiClient;
use liftlog::api::WorkoutApi;
use liftlog::auth::{AuthState, AuthWatch};
use liftlog::config::Config;
use liftlog::library::filter_exercises;
use liftlog::screen::{LogScreen, Submitted};
use liftlog::session::input::parse_float_prefix;
use liftlog::store::{KeyValueStore, SqliteStore};
use liftlog::tui::App;
use liftlog::units::UnitSystem;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(author, version, about = "Log workouts against the fitness API")]
struct Cli {
    /// API base URL
    #[arg(long, env = "LIFTLOG_API_URL")]
    api_url: Option<String>,

    /// Local key-value store (auth token, unit preference)
    #[arg(long, env = "LIFTLOG_STORE")]
    store: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "LIFTLOG_TIMEOUT")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the workout logging screen
    Log {
        /// Workout name for a blank session
        #[arg(short, long)]
        name: Option<String>,

        /// Start from a saved routine
        #[arg(long, conflicts_with_all = ["workout", "class"])]
        routine: Option<i64>,

        /// Edit a previously saved workout
        #[arg(long, conflicts_with = "class")]
        workout: Option<i64>,

        /// Class of an assigned workout (use with --assignment)
        #[arg(long, requires = "assignment")]
        class: Option<i64>,

        /// Assigned workout id
        #[arg(long, requires = "class")]
        assignment: Option<i64>,
    },

    /// Search the exercise library
    Exercises {
        /// Matches name, description, category, muscle groups or equipment
        query: Option<String>,
    },

    /// Log in and store the access token
    Login {
        email: String,

        #[arg(short, long, env = "LIFTLOG_PASSWORD")]
        password: String,
    },

    /// Create an account and store the access token
    Register {
        email: String,
        username: String,

        #[arg(short, long, env = "LIFTLOG_PASSWORD")]
        password: String,
    },

    /// Forget the stored access token
    Logout,

    /// Show or set the weight unit system
    Units {
        #[arg(value_parser = ["metric", "imperial"])]
        system: Option<String>,
    },

    /// Convert a weight between kilograms and the preferred unit
    Convert {
        weight: String,

        /// Read the weight in the preferred unit and print kilograms
        #[arg(long)]
        to_kg: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = Config::new(cli.api_url, cli.store, cli.timeout);
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&config.store_path)?);
    let auth = AuthWatch::from_store(store.as_ref());
    let api = Arc::new(ApiClient::new(&config.api_url, config.timeout, store.clone(), auth.clone())?);

    match cli.command {
        Some(Commands::Log { name, routine, workout, class, assignment }) => {
            let screen = match (routine, workout, class, assignment) {
                (Some(id), _, _, _) => LogScreen::open_routine(api.clone(), id).await?,
                (_, Some(id), _, _) => LogScreen::open_workout(api.clone(), id).await?,
                (_, _, Some(class_id), Some(id)) => LogScreen::open_assigned(api.clone(), class_id, id).await?,
                _ => LogScreen::open_new(api.clone(), name.as_deref()),
            };
            log_workout(screen, &auth, store.as_ref()).await?;
        }

        Some(Commands::Exercises { query }) => {
            let exercises = api.get_exercises().await?;
            let found = filter_exercises(&exercises, query.as_deref().unwrap_or(""));
            println!("{:<6} {:30} {:12} {}", "ID", "Name", "Category", "Muscle groups");
            println!("{:-<70}", "");
            for ex in found {
                println!(
                    "{:<6} {:30} {:12} {}",
                    ex.id,
                    ex.name,
                    ex.category.as_deref().unwrap_or("-"),
                    ex.muscle_groups.join(", ")
                );
            }
        }

        Some(Commands::Login { email, password }) => {
            api.login(&email, &password).await?;
            println!("Logged in as {}", email);
        }

        Some(Commands::Register { email, username, password }) => {
            api.register(&email, &username, &password).await?;
            println!("Account created for {}", username);
        }

        Some(Commands::Logout) => {
            api.logout()?;
            println!("Logged out");
        }

        Some(Commands::Units { system }) => match system {
            Some(value) => {
                let Some(system) = UnitSystem::parse(&value) else {
                    bail!("unknown unit system: {}", value);
                };
                system.save(store.as_ref())?;
                println!("Weight unit: {}", system.weight_unit());
            }
            None => {
                let system = UnitSystem::load(store.as_ref());
                println!("{} ({})", system.as_str(), system.weight_unit());
            }
        },

        Some(Commands::Convert { weight, to_kg }) => {
            let system = UnitSystem::load(store.as_ref());
            let Some(value) = parse_float_prefix(&weight) else {
                bail!("not a weight: {}", weight);
            };
            if to_kg {
                println!("{:.1} kg", system.parse_weight_input(&weight));
            } else {
                println!("{}", system.format_weight(value));
            }
        }

        None => {
            // Default: blank workout
            let screen = LogScreen::open_new(api.clone(), None);
            log_workout(screen, &auth, store.as_ref()).await?;
        }
    }

    Ok(())
}

async fn log_workout(screen: LogScreen<ApiClient>, auth: &AuthWatch, store: &dyn KeyValueStore) -> Result<()> {
    if !auth.is_signed_in() {
        warn!("Not logged in; saving will fail until you run `liftlog login`");
    }

    // React to a 401 during the session instead of polling the store
    let mut auth_rx = auth.subscribe();
    let watcher = tokio::spawn(async move {
        while auth_rx.changed().await.is_ok() {
            if *auth_rx.borrow_and_update() == AuthState::SignedOut {
                warn!("Session expired, log in again to save this workout");
            }
        }
    });

    let library = match screen.api().get_exercises().await {
        Ok(exercises) => exercises,
        Err(e) => {
            error!("Error loading exercises: {}", e);
            Vec::new()
        }
    };
    let weight_unit = UnitSystem::load(store).weight_unit();

    let outcome = App::new(screen, library, weight_unit).run().await;
    watcher.abort();

    match outcome? {
        Some(Submitted::Created(workout)) => println!("Workout saved successfully! ID: {}", workout.id),
        Some(Submitted::Updated(id)) => println!("Workout {} updated successfully!", id),
        Some(Submitted::Completed(_)) => println!("Workout completed! Great job!"),
        None => println!("Workout discarded"),
    }
    Ok(())
}
