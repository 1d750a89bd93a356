use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "sync-cli")]
#[command(about = "Management CLI for the Event Sync Gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5001")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an event payload for synchronization
    Sync {
        /// JSON event payload
        #[arg(default_value = "{}")]
        payload: String,

        /// Correlation ID to propagate as X-Request-ID
        #[arg(short, long)]
        request_id: Option<String>,
    },
    /// Check gateway health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Sync {
            payload,
            request_id,
        } => {
            let body: Value = serde_json::from_str(&payload)?;

            let mut headers = HeaderMap::new();
            if let Some(id) = &request_id {
                headers.insert("x-request-id", HeaderValue::from_str(id)?);
            }

            let res = client
                .post(format!("{}/api/event/sync", cli.url))
                .headers(headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();

    if let Some(id) = res.headers().get("x-request-id").and_then(|v| v.to_str().ok()) {
        eprintln!("request-id: {}", id);
    }
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
