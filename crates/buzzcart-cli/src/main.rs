//! BuzzCart CLI
//!
//! Thin wrapper around buzzcart-core for command-line usage. Every
//! invocation opens the local backend in the data directory, so a login
//! persists until `logout`.
//!
//! ## Usage
//!
//! ```bash
//! # Create an account (signs it in)
//! buzzcart signup "Alice Smith" alice@example.com secret1
//!
//! # Sign in / out
//! buzzcart login alice@example.com secret1
//! buzzcart logout
//!
//! # Who is signed in, with follower counts
//! buzzcart whoami
//!
//! # Search accounts whose full name contains the text
//! buzzcart search al
//!
//! # Look at someone's profile, then follow them
//! buzzcart user show <user_id>
//! buzzcart follow <user_id>
//! buzzcart unfollow <user_id>
//!
//! # Read the JSONL logs written with --log-dir
//! buzzcart logs --level error
//! ```

use std::path::PathBuf;

use anyhow::Result;
use buzzcart_core::logging::{self, LogOptions, LogQuery};
use buzzcart_core::{
    format_count, BuzzCartApp, BuzzConfig, FollowAction, FollowAttempt, LocalAuth, RedbStore,
    SearchFilter, SignupForm, UserId, UserRecord,
};

use clap::{Parser, Subcommand};

type App = BuzzCartApp<LocalAuth, RedbStore>;

/// BuzzCart - social commerce from the command line
#[derive(Parser)]
#[command(name = "buzzcart")]
#[command(version = "0.1.0")]
#[command(about = "BuzzCart - social commerce from the command line")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.buzzcart/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also write JSONL logs under this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Device name used for JSONL log files
    #[arg(long, global = true, default_value = "cli")]
    device: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        /// Full name shown on the profile
        name: String,
        email: String,
        password: String,
        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Sign in with an existing account
    Login { email: String, password: String },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Search accounts whose full name contains the query
    Search {
        query: String,
        /// accounts, sellers, reels or products
        #[arg(short, long, default_value = "accounts")]
        filter: String,
    },

    /// User profiles
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Follow a user
    Follow {
        /// User ID
        user_id: String,
    },

    /// Unfollow a user
    Unfollow {
        /// User ID
        user_id: String,
    },

    /// Read JSONL log entries
    Logs {
        /// Only this device
        #[arg(long = "for-device")]
        for_device: Option<String>,
        /// Only this level (trace, debug, info, warn, error)
        #[arg(short, long)]
        level: Option<String>,
        /// Only this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Open a user's profile
    Show {
        /// User ID
        user_id: String,
    },
}

fn setup_logging(cli: &Cli) -> Result<()> {
    logging::init(&LogOptions {
        verbose: cli.verbose,
        log_dir: cli.log_dir.clone(),
        device: cli.device.clone(),
        stderr: true,
    })?;
    Ok(())
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".buzzcart")
        .join("data")
}

/// Open the backend and resume the saved login
async fn signed_in_app(config: &BuzzConfig) -> Result<App> {
    let mut app = App::open(config)?;
    if app.identity().is_none() {
        anyhow::bail!("Not signed in. Run: buzzcart login <email> <password>");
    }
    app.start().await?;
    Ok(app)
}

fn print_profile(record: &UserRecord) {
    println!("{}", record.full_name);
    println!("  ID: {}", record.user_id);
    println!("  Email: {}", record.email);
    println!("  Followers: {}", format_count(record.followers_count));
    println!("  Following: {}", format_count(record.following_count));
    println!("  Posts: {}", format_count(record.posts_count));
}

/// Open `user_id`'s profile and press follow if the state differs from `want`
async fn set_following(app: &mut App, user_id: &UserId, want: FollowAction) -> Result<()> {
    let record = app.open_user_profile(user_id).await?;
    let following = app.visible_profile().map(|(_, t)| t.is_following()).unwrap_or(false);

    match (want, following) {
        (FollowAction::Follow, true) => {
            println!("Already following {}", record.full_name);
            return Ok(());
        }
        (FollowAction::Unfollow, false) => {
            println!("Not following {}", record.full_name);
            return Ok(());
        }
        _ => {}
    }

    match app.toggle_follow().await? {
        FollowAttempt::Completed(report) => {
            for warning in &report.warnings {
                println!("Warning: {}", warning);
            }
            if let Some(message) = report.message() {
                for failure in &report.failures {
                    eprintln!("  {}: {}", failure.step, failure.reason);
                }
                anyhow::bail!("{}", message);
            }
            match report.action {
                FollowAction::Follow => println!("Now following {}", record.full_name),
                FollowAction::Unfollow => println!("Unfollowed {}", record.full_name),
            }
        }
        FollowAttempt::OwnProfile => anyhow::bail!("You cannot follow yourself"),
        FollowAttempt::AlreadyInProgress => anyhow::bail!("A follow request is already in progress"),
    }

    let (followers, following) = app.session().formatted_counts();
    println!("  You: {} followers, {} following", followers, following);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let config = BuzzConfig::new(data_dir);

    match cli.command {
        Commands::Signup {
            name,
            email,
            password,
            confirm,
        } => {
            let mut app = App::open(&config)?;
            let form = SignupForm {
                full_name: name,
                email,
                confirm_password: confirm.unwrap_or_else(|| password.clone()),
                password,
            };
            let record = app.sign_up(&form).await?;
            println!("Registration successful");
            println!("  ID: {}", record.user_id);
            println!("  Name: {}", record.full_name);
        }

        Commands::Login { email, password } => {
            let mut app = App::open(&config)?;
            let identity = app.sign_in(&email, &password).await?;
            println!("Signed in as {}", app.session().full_name());
            println!("  ID: {}", identity.user_id);
        }

        Commands::Logout => {
            let mut app = App::open(&config)?;
            if app.identity().is_none() {
                println!("Not signed in.");
            } else {
                app.sign_out()?;
                println!("Signed out.");
            }
        }

        Commands::Whoami => {
            let mut app = App::open(&config)?;
            match app.identity() {
                None => println!("Not signed in."),
                Some(identity) => {
                    app.start().await?;
                    let (followers, following) = app.session().formatted_counts();
                    println!("{}", app.session().full_name());
                    println!("  ID: {}", identity.user_id);
                    println!("  Email: {}", identity.email);
                    println!("  Followers: {}", followers);
                    println!("  Following: {}", following);
                }
            }
        }

        Commands::Search { query, filter } => {
            let filter: SearchFilter = filter.parse()?;
            let mut app = signed_in_app(&config).await?;
            app.open_search();
            app.set_search_filter(filter).await?;

            match app.search(&query).await? {
                Some(outcome) => {
                    println!("{}", outcome.title());
                    println!("{}", outcome.message());
                    for user in &outcome.results {
                        println!();
                        println!("  {} <{}>", user.full_name, user.email);
                        println!("    ID: {}", user.user_id);
                    }
                    if outcome.error.is_some() {
                        std::process::exit(1);
                    }
                }
                None => println!("Search closed."),
            }
        }

        Commands::User { action } => match action {
            UserAction::Show { user_id } => {
                let mut app = signed_in_app(&config).await?;
                let user_id = UserId::from(user_id);
                let record = app.open_user_profile(&user_id).await?;
                print_profile(&record);
                if let Some(me) = app.identity() {
                    if record.is_following(&me.user_id) {
                        println!("  Follows you");
                    }
                }
                if let Some((_, toggle)) = app.visible_profile() {
                    println!("  [{}]", toggle.label());
                }
            }
        },

        Commands::Follow { user_id } => {
            let mut app = signed_in_app(&config).await?;
            set_following(&mut app, &UserId::from(user_id), FollowAction::Follow).await?;
        }

        Commands::Unfollow { user_id } => {
            let mut app = signed_in_app(&config).await?;
            set_following(&mut app, &UserId::from(user_id), FollowAction::Unfollow).await?;
        }

        Commands::Logs {
            for_device,
            level,
            date,
        } => {
            let log_dir = cli.log_dir.clone().unwrap_or_else(|| config.log_dir());
            let query = LogQuery {
                device: for_device,
                date,
                level,
            };
            let entries = logging::read_entries(&log_dir, &query)?;
            if entries.is_empty() {
                println!("No log entries.");
            }
            for entry in entries {
                println!(
                    "{} {:>5} [{}] {}: {}",
                    entry.ts, entry.level, entry.device, entry.target, entry.msg
                );
            }
        }
    }

    Ok(())
}
