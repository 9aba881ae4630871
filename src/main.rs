// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shake-Tracker CLI
//!
//! Thin command-line front end over the client core, standing in for
//! the mobile views: it wires configuration, logging, and services, and
//! maps subcommands onto the core operations.

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use shake_tracker::error::AppError;
use shake_tracker::services::{QuotaTracker, ShakeOutcome};
use shake_tracker::{config::Config, ShakeClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shake-tracker", about = "Offline-first daily shake tracking client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session token
    Login { email: String, password: String },
    /// Register a new account
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Record one shake
    Shake,
    /// Show today's and lifetime counts
    Stats,
    /// Show the recent shake activity feed
    Activities {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show shake history for a date (defaults to today)
    History {
        #[arg(long)]
        date: Option<String>,
    },
    /// Submit feedback
    Feedback {
        title: String,
        message: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long, default_value_t = 5)]
        rating: u8,
    },
    /// Request a password reset email
    ForgotPassword { email: String },
    /// Delete the account and clear all local state
    DeleteAccount,
    /// Show the current profile
    Profile,
    /// Update profile fields
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar_index: Option<u32>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Clear the stored session
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing::info!(backend = %config.backend_url, "Starting shake-tracker");

    let client = ShakeClient::new(config).await?;

    match cli.command {
        Command::Login { email, password } => {
            let session = client.account.login(&email, &password).await?;
            match session.user {
                Some(user) => println!("Logged in as {}", user.display_name()),
                None => println!("Logged in"),
            }
            // Best-effort trail; a backend without activities skips it
            let _ = client.feed.log("login", "Logged in").await;
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let session = client.account.register(&name, &email, &password).await?;
            if session.token.is_some() {
                println!("Registered and logged in");
            } else {
                println!("Registered; log in to start shaking");
            }
        }
        Command::Shake => match client.recorder.record_shake().await {
            Ok(ShakeOutcome::Recorded(record)) => {
                let (daily, total) = client.recorder.refresh_counts().await;
                let limit = client.recorder.limit();
                if record.is_local() {
                    println!("Shake recorded (offline). Today {}/{}, total {}", daily, limit, total);
                } else {
                    println!("Shake recorded! Today {}/{}, total {}", daily, limit, total);
                }
                if let Some(reward) = record.reward {
                    println!("Reward: {}", reward);
                }
            }
            Ok(ShakeOutcome::InFlight) => {
                println!("A submission is already in flight");
            }
            Err(AppError::QuotaExceeded { count, limit }) => {
                let now = chrono::Local::now();
                let (hours, minutes) = QuotaTracker::time_until_reset(now);
                let count = count
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| limit.to_string());
                println!(
                    "Daily limit reached ({}/{}). Resets in {}h {}m.",
                    count, limit, hours, minutes
                );
            }
            Err(e) => return Err(e.into()),
        },
        Command::Stats => {
            let (daily, total) = client.recorder.refresh_counts().await;
            let limit = client.recorder.limit();
            let now = chrono::Local::now();
            let (hours, minutes) = QuotaTracker::time_until_reset(now);

            println!("Today: {}/{}", daily, limit);
            println!("Total: {}", total);
            println!("Resets in {}h {}m", hours, minutes);
            println!("Source: {:?}", client.sync.state().await);
        }
        Command::Activities { limit } => {
            let entries = client.feed.recent_shakes(limit).await?;
            if entries.is_empty() {
                println!("No activities yet");
            }
            for entry in entries {
                println!("{:<20} {}", entry.label, entry.title);
            }
        }
        Command::History { date } => {
            let date_key = match date {
                Some(date) => {
                    chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                        AppError::Internal(anyhow::anyhow!("Invalid date {}: {}", date, e))
                    })?;
                    date
                }
                None => shake_tracker::time_utils::local_date_key(chrono::Local::now()),
            };
            let records = client.feed.shakes_on(&date_key).await?;
            if records.is_empty() {
                println!("No shakes on {}", date_key);
            }
            for record in records {
                match record.instant() {
                    Some(instant) => println!(
                        "{}  x{}",
                        instant.format("%Y-%m-%d %H:%M:%S"),
                        record.count.unwrap_or(1)
                    ),
                    None => println!("(unknown time)  x{}", record.count.unwrap_or(1)),
                }
            }
        }
        Command::Feedback {
            title,
            message,
            category,
            rating,
        } => {
            client
                .feed
                .submit_feedback(&title, &message, &category, rating)
                .await?;
            println!("Feedback submitted");
        }
        Command::ForgotPassword { email } => {
            client.account.request_password_reset(&email).await?;
            println!("Password reset requested for {}", email);
        }
        Command::DeleteAccount => {
            client.account.delete_account().await?;
            println!("Account deleted");
        }
        Command::Profile => {
            let profile = client.profile.current_profile().await?;
            println!("Name:   {}", profile.display_name());
            if let Some(email) = &profile.email {
                println!("Email:  {}", email);
            }
            if let Some(avatar_index) = profile.avatar_index {
                println!("Avatar: #{}", avatar_index);
            }
            if let Some(bio) = &profile.bio {
                println!("Bio:    {}", bio);
            }
            if let Some(phone) = &profile.phone {
                println!("Phone:  {}", phone);
            }
            if let Some(created) = profile.created_instant() {
                println!("Member since {}", created.format("%b %-d, %Y"));
            }
        }
        Command::UpdateProfile {
            name,
            avatar_index,
            bio,
            phone,
        } => {
            let mut partial = Map::new();
            if let Some(name) = name {
                partial.insert("name".to_string(), Value::String(name));
            }
            if let Some(avatar_index) = avatar_index {
                partial.insert("avatarIndex".to_string(), Value::from(avatar_index));
            }
            if let Some(bio) = bio {
                partial.insert("bio".to_string(), Value::String(bio));
            }
            if let Some(phone) = phone {
                partial.insert("phone".to_string(), Value::String(phone));
            }

            if partial.is_empty() {
                println!("Nothing to update");
            } else {
                let profile = client.profile.update_profile(&partial).await?;
                println!("Profile updated for {}", profile.display_name());
            }
        }
        Command::Logout => {
            client.account.logout().await?;
            println!("Logged out");
        }
    }

    Ok(())
}

/// Initialize structured logging; diagnostics go to stderr, command
/// output to stdout.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shake_tracker=info".parse().unwrap()),
        )
        .with(format)
        .init();
}
