//! ZeeFit CLI (`zeefit`)

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zeefit_client::config::missing_required_env;
use zeefit_client::ClientConfig;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "zeefit")]
#[command(author, version, about = "ZeeFit CLI - talk to the ZeeFit backend", long_about = None)]
struct Cli {
    /// API base URL (overrides ZEEFIT_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Session file (defaults to the user data directory)
    #[arg(long, global = true, env = "ZEEFIT_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Print compact single-line JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request or verify a one-time password
    Otp {
        #[command(subcommand)]
        action: OtpAction,
    },

    /// Store onboarding answers and send the OTP
    Register(commands::RegisterArgs),

    /// Log out on the backend and clear local session data
    Logout,

    /// Show whether a session is stored
    Status,

    /// Show the current user
    Me,

    /// Update profile fields
    Profile(commands::ProfileArgs),

    /// Delete the current account
    DeleteAccount {
        /// Required to actually delete
        #[arg(long)]
        yes: bool,
    },

    /// Show the home dashboard
    Home,

    /// Browse and join challenges
    Challenges {
        #[command(subcommand)]
        action: ChallengeAction,
    },
}

#[derive(Subcommand)]
enum OtpAction {
    /// Send an OTP to a phone number
    Request {
        phone: String,
        #[arg(long, default_value = zeefit_client::DEFAULT_COUNTRY_CODE)]
        country_code: String,
    },
    /// Verify an OTP and store the session
    Verify {
        phone: String,
        otp: String,
        #[arg(long, default_value = zeefit_client::DEFAULT_COUNTRY_CODE)]
        country_code: String,
        /// Device description sent to the backend
        #[arg(long)]
        device: Option<String>,
    },
}

#[derive(Subcommand)]
enum ChallengeAction {
    /// List all challenges
    List(commands::ListArgs),
    /// List challenges you have joined
    Mine(commands::ListArgs),
    /// Show a challenge by id
    Show { id: String },
    /// Show a challenge by slug
    Slug { slug: String },
    /// Join one or more challenges
    Join {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show your progress in a challenge
    Progress { id: String },
    /// Update your progress in a challenge
    UpdateProgress(commands::ProgressArgs),
}

fn init_tracing(config: &ClientConfig) {
    let default = if config.enable_debug {
        "zeefit_client=debug,zeefit=debug"
    } else {
        "zeefit_client=info,zeefit=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    init_tracing(&config);
    if let Some(url) = cli.base_url {
        config = config.with_base_url(url)?;
    } else {
        for key in missing_required_env() {
            tracing::warn!("{key} is not set, using {}", config.api_base_url);
        }
    }

    tracing::debug!(
        environment = ?config.environment,
        base_url = %config.api_base_url,
        "configuration loaded"
    );

    let ctx = Context::new(&config, cli.session_file, cli.json)?;

    match cli.command {
        Commands::Otp { action } => match action {
            OtpAction::Request {
                phone,
                country_code,
            } => commands::otp_request(&ctx, &phone, &country_code).await,
            OtpAction::Verify {
                phone,
                otp,
                country_code,
                device,
            } => commands::otp_verify(&ctx, &phone, &otp, &country_code, device).await,
        },
        Commands::Register(args) => commands::register(&ctx, args).await,
        Commands::Logout => commands::logout(&ctx).await,
        Commands::Status => commands::status(&ctx),
        Commands::Me => commands::me(&ctx).await,
        Commands::Profile(args) => commands::profile(&ctx, args).await,
        Commands::DeleteAccount { yes } => commands::delete_account(&ctx, yes).await,
        Commands::Home => commands::home(&ctx).await,
        Commands::Challenges { action } => match action {
            ChallengeAction::List(args) => commands::challenges_list(&ctx, args).await,
            ChallengeAction::Mine(args) => commands::challenges_mine(&ctx, args).await,
            ChallengeAction::Show { id } => commands::challenge_show(&ctx, &id).await,
            ChallengeAction::Slug { slug } => commands::challenge_slug(&ctx, &slug).await,
            ChallengeAction::Join { ids } => commands::challenges_join(&ctx, &ids).await,
            ChallengeAction::Progress { id } => commands::challenge_progress(&ctx, &id).await,
            ChallengeAction::UpdateProgress(args) => commands::update_progress(&ctx, args).await,
        },
    }
}
