//! Bestlist CLI
//!
//! Command-line client for a running `bestlist-edge` server:
//! - Search places
//! - Sign in with a username
//! - Submit achievements and inspect or clear notifications
//! - Generate a config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::path::PathBuf;

use bestlist::config::generate_default_config;

#[derive(Parser)]
#[command(name = "bestlist")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the Bestlist edge server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server URL
    #[arg(long, default_value = "http://localhost:8787", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for places
    Places {
        /// Free-text query, e.g. "pizza"
        query: String,
        /// Latitude to bias results toward
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude to bias results toward
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// Sign in with username and password
    Login {
        username: String,
        /// Password (default: BESTLIST_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Submit an earned achievement
    Achieve {
        /// Achievement id
        id: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
        /// Rarity (common, rare, epic, legendary)
        #[arg(short, long, default_value = "common")]
        rarity: String,
        /// Mark as a global first
        #[arg(long)]
        global_first: bool,
    },

    /// Show visible toasts and the modal
    Notifications,

    /// Dismiss a toast by id, or the modal with "modal"
    Dismiss { id: String },

    /// Clear all notifications
    Reset,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let json_output = cli.format == "json";

    match cli.command {
        Commands::Places { query, lat, lon } => {
            let body = json!({ "query": query, "latitude": lat, "longitude": lon });
            let data = post_json(&client, &cli.api_url, "/functions/v1/search-places", &body).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_places(&data);
            }
        }

        Commands::Login { username, password } => {
            let password = password
                .or_else(|| std::env::var("BESTLIST_PASSWORD").ok())
                .context("No password given (use --password or BESTLIST_PASSWORD)")?;

            let body = json!({ "username": username, "password": password });
            let data = post_json(&client, &cli.api_url, "/functions/v1/username-login", &body).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("Signed in as {}", username.trim().to_lowercase());
                println!("Access token:  {}", data["access_token"].as_str().unwrap_or("-"));
                println!("Refresh token: {}", data["refresh_token"].as_str().unwrap_or("-"));
            }
        }

        Commands::Achieve {
            id,
            name,
            rarity,
            global_first,
        } => {
            let body = json!({
                "achievement": { "id": id, "name": name, "rarity": rarity },
                "isGlobalFirst": global_first,
            });
            let data = post_json(&client, &cli.api_url, "/api/v1/achievements", &body).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                match data["outcome"].as_str() {
                    Some("suppressed") => println!("Suppressed (shown recently)"),
                    Some("modal") => println!("Shown as modal: {}", data["id"].as_str().unwrap_or("-")),
                    Some("toast") => println!(
                        "Queued as toast {} (visible in {} ms)",
                        data["id"].as_str().unwrap_or("-"),
                        data["delay_ms"].as_u64().unwrap_or(0)
                    ),
                    _ => println!("{}", data),
                }
            }
        }

        Commands::Notifications => {
            let response = client
                .get(format!("{}/api/v1/notifications", cli.api_url))
                .send()
                .await
                .with_context(|| connect_hint(&cli.api_url))?;
            let data = read_json(response).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_snapshot(&data);
            }
        }

        Commands::Dismiss { id } => {
            let path = format!("/api/v1/notifications/{}", id);
            let response = client
                .delete(format!("{}{}", cli.api_url, path))
                .send()
                .await
                .with_context(|| connect_hint(&cli.api_url))?;
            expect_success(response).await?;
            println!("Dismissed {}", id);
        }

        Commands::Reset => {
            let response = client
                .post(format!("{}/api/v1/notifications/reset", cli.api_url))
                .send()
                .await
                .with_context(|| connect_hint(&cli.api_url))?;
            expect_success(response).await?;
            println!("Notifications cleared");
        }

        Commands::Config { output } => {
            let config = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, config)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", config),
            }
        }
    }

    Ok(())
}

fn connect_hint(api_url: &str) -> String {
    format!(
        "Cannot connect to the Bestlist edge server at {} (is `cargo run --bin bestlist-edge` running?)",
        api_url
    )
}

async fn post_json(client: &Client, api_url: &str, path: &str, body: &Value) -> anyhow::Result<Value> {
    let response = client
        .post(format!("{}{}", api_url, path))
        .json(body)
        .send()
        .await
        .with_context(|| connect_hint(api_url))?;
    read_json(response).await
}

/// Parse a success body, or turn the `{error}` body into an error
async fn read_json(response: Response) -> anyhow::Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("no details");
        anyhow::bail!("Request failed ({}): {}", status, message);
    }
    Ok(body)
}

async fn expect_success(response: Response) -> anyhow::Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body: Value = response.json().await.unwrap_or(Value::Null);
    anyhow::bail!(
        "Request failed ({}): {}",
        status,
        body["error"].as_str().unwrap_or("no details")
    )
}

fn print_places(data: &Value) {
    let results = data["results"].as_array().map(Vec::as_slice).unwrap_or_default();
    if results.is_empty() {
        println!("No places found.");
        return;
    }

    println!("{:<30} {:<45} {:>10} {:>11}", "Name", "Address", "Lat", "Lon");
    println!("{}", "-".repeat(99));
    for place in results {
        println!(
            "{:<30} {:<45} {:>10.5} {:>11.5}",
            truncate(place["name"].as_str().unwrap_or("-"), 30),
            truncate(place["display"].as_str().unwrap_or("-"), 45),
            place["lat"].as_f64().unwrap_or(0.0),
            place["lon"].as_f64().unwrap_or(0.0),
        );
    }
    println!();
    println!("Source: {} API", data["apiUsed"].as_str().unwrap_or("unknown"));
}

fn print_snapshot(data: &Value) {
    match data["modal"].as_object() {
        Some(modal) => println!(
            "Modal: {} ({})",
            achievement_label(&modal["achievement"]),
            modal["id"].as_str().unwrap_or("-")
        ),
        None => println!("Modal: none"),
    }

    let toasts = data["toasts"].as_array().map(Vec::as_slice).unwrap_or_default();
    println!();
    if toasts.is_empty() {
        println!("No toasts visible.");
    } else {
        println!("{:<38} {:<30} {}", "ID", "Achievement", "Rarity");
        println!("{}", "-".repeat(80));
        for toast in toasts {
            println!(
                "{:<38} {:<30} {}",
                toast["id"].as_str().unwrap_or("-"),
                truncate(&achievement_label(&toast["achievement"]), 30),
                toast["achievement"]["rarity"].as_str().unwrap_or("-"),
            );
        }
    }
    println!();
    println!("Pending: {}", data["pending"].as_u64().unwrap_or(0));
}

fn achievement_label(achievement: &Value) -> String {
    achievement["name"]
        .as_str()
        .or_else(|| achievement["id"].as_str())
        .unwrap_or("-")
        .to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
