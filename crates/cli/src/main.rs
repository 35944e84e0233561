//! Dealdesk CLI - the vendor dashboard from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Where does this account stand?
//! dealdesk status
//!
//! # Register a shop
//! dealdesk register --name "Corner Cafe" --category cafe --contact-name Sam \
//!     --contact-email sam@cafe.test --phone "555 010 2030" \
//!     --address "1 Main St" --city Springfield --country US
//!
//! # Browse coupons, two pages at a time
//! dealdesk coupons list --search latte --pages 2
//!
//! # Look up and confirm a code
//! dealdesk redeem ABC123 --confirm
//! dealdesk redeem --scan "https://deals.test/r?code=ABC123"
//!
//! # Redemptions over the last two weeks
//! dealdesk analytics --days 14
//! ```
//!
//! # Environment Variables
//!
//! - `DEALDESK_API_URL` - Backend base URL (required)
//! - `DEALDESK_EMAIL` / `DEALDESK_PASSWORD` - Vendor credentials
//! - `DEALDESK_LOG_JSON` - Emit JSON logs
//! - `SENTRY_DSN` - Error tracking

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dealdesk_client::{AppState, ClientConfig, ConfigError, telemetry};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "dealdesk")]
#[command(author, version, about = "Dealdesk vendor dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sign-in, shop and subscription status
    Status,
    /// Submit shop registration
    Register(commands::register::RegisterArgs),
    /// Manage coupons
    Coupons {
        #[command(subcommand)]
        action: CouponAction,
    },
    /// Look up (and optionally confirm) a redemption code
    Redeem {
        /// Code as printed on the customer's coupon
        #[arg(required_unless_present = "scan", conflicts_with = "scan")]
        code: Option<String>,

        /// Raw QR payload (a code or a redeem URL)
        #[arg(long)]
        scan: Option<String>,

        /// Confirm the redemption after a successful lookup
        #[arg(long)]
        confirm: bool,
    },
    /// Show redemption analytics
    Analytics {
        /// Number of days ending today
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(Subcommand)]
enum CouponAction {
    /// List coupons
    List {
        /// Filter by search term
        #[arg(short, long, default_value = "")]
        search: String,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Create a draft coupon
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Percentage off (0-100]
        #[arg(long, required_unless_present = "amount", conflicts_with = "amount")]
        percent: Option<Decimal>,

        /// Fixed amount off
        #[arg(long)]
        amount: Option<Decimal>,

        /// Currency of a fixed amount
        #[arg(long, default_value = "USD")]
        currency: String,

        /// Number of codes that can be claimed
        #[arg(short, long)]
        quantity: Option<u32>,
    },
    /// Delete a coupon
    Delete {
        /// Coupon ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            report_config_error(&e);
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(&config);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// No subscriber is installed yet, so stderr is the only channel.
#[allow(clippy::print_stderr)]
fn report_config_error(error: &ConfigError) {
    eprintln!("Configuration error: {error}");
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), commands::CommandError> {
    let state = AppState::new(config)?;
    let notices = commands::NoticeEcho::start(&state);
    let result = dispatch(cli.command, &state).await;
    drop(state);
    notices.finish().await;
    result
}

async fn dispatch(command: Commands, state: &AppState) -> Result<(), commands::CommandError> {
    let access = state.bootstrap().await?;

    match command {
        Commands::Status => commands::status::run(state, access).await,
        Commands::Register(args) => commands::register::run(state, access, args).await,
        Commands::Coupons { action } => {
            commands::require_access(access)?;
            match action {
                CouponAction::List { search, pages } => {
                    commands::coupons::list(state, &search, pages).await
                }
                CouponAction::Create {
                    title,
                    description,
                    percent,
                    amount,
                    currency,
                    quantity,
                } => {
                    let discount = commands::coupons::discount(percent, amount, &currency)?;
                    commands::coupons::create(state, title, description, discount, quantity)
                        .await
                }
                CouponAction::Delete { id } => commands::coupons::delete(state, &id).await,
            }
        }
        Commands::Redeem {
            code,
            scan,
            confirm,
        } => {
            commands::require_access(access)?;
            commands::redeem::run(state, code, scan, confirm).await
        }
        Commands::Analytics { days } => {
            commands::require_access(access)?;
            commands::analytics::run(state, days).await
        }
    }
}
