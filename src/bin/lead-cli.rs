use std::collections::HashMap;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

use lead_scoring_service::config::load_settings;

#[derive(Parser)]
#[command(name = "lead-cli")]
#[command(about = "Client CLI for the lead scoring service", long_about = None)]
struct Cli {
    /// Service base URL. Defaults to API_URL, then API_HOST/API_PORT.
    #[arg(short, long)]
    url: Option<String>,

    /// Bearer token. Defaults to API_KEY.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health
    Health,
    /// Liveness probe
    Live,
    /// Readiness probe
    Ready,
    /// Score a lead
    Score {
        lead_id: i64,

        /// Feature as name=value; repeatable
        #[arg(short, long = "feature", value_parser = parse_feature)]
        features: Vec<(String, f64)>,
    },
}

fn parse_feature(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{}`", raw))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for `{}`: {}", name, e))?;
    Ok((name.trim().to_string(), value))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings()?;

    let base_url = cli
        .url
        .map(|u| u.trim_end_matches('/').to_string())
        .unwrap_or_else(|| settings.api.base_url());

    let mut headers = HeaderMap::new();
    if let Some(key) = cli.key.or(settings.api.key) {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }
    let client = reqwest::Client::builder().default_headers(headers).build()?;

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base_url)).send().await?,
        Commands::Live => client.get(format!("{}/lead-scoring/live", base_url)).send().await?,
        Commands::Ready => client.get(format!("{}/lead-scoring/ready", base_url)).send().await?,
        Commands::Score { lead_id, features } => {
            let features: HashMap<String, f64> = features.into_iter().collect();
            client
                .post(format!("{}/lead-scoring/score", base_url))
                .json(&json!({ "lead_id": lead_id, "features": features }))
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let json: Value = res.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Some(id) = request_id {
            eprintln!("Request ID: {}", id);
        }
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
