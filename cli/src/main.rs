mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ordersms")]
#[command(about = "Order-placed SMS alerts via the Clickatell gateway", long_about = None)]
struct Cli {
    /// Store scope for settings (omit for the base configuration)
    #[arg(long, global = true)]
    store: Option<u64>,

    /// Use the in-process mock gateway instead of the live endpoint
    #[arg(long, global = true)]
    mock: bool,

    /// Client-side timeout for gateway calls, in seconds
    #[arg(long, global = true, default_value_t = 5)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective settings for the chosen scope
    Show,

    /// Save settings; with --store, saved fields become per-store overrides
    Configure {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        api_id: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
    },

    /// Send a test message (no order attached)
    SendTest {
        /// Text of the test message
        message: String,
    },

    /// Simulate the host's order-placed event against an in-memory order
    OrderPlaced {
        /// Order id
        #[arg(long)]
        id: u64,
        /// Order total
        #[arg(long, default_value_t = 0.0)]
        total: f64,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Show => commands::show(cli.store),
        Commands::Configure {
            enabled,
            api_id,
            username,
            password,
            phone_number,
        } => commands::configure(
            cli.store,
            config::SettingsOverride {
                enabled,
                api_id,
                username,
                password,
                phone_number,
            },
        ),
        Commands::SendTest { message } => {
            commands::send_test(cli.store, cli.mock, cli.timeout_secs, message).await
        }
        Commands::OrderPlaced { id, total } => {
            commands::order_placed(cli.store, cli.mock, cli.timeout_secs, id, total).await
        }
    }
}
