use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the chat-completion gateway", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://127.0.0.1:9201")]
    url: String,

    /// Admin API key.
    #[arg(short, long, env = "GATEWAY_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List every route with its circuit breaker state
    Routes,
    /// Close a route's circuit breaker
    Reset {
        /// Route id
        route_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{base}/admin/status"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Routes => {
            client
                .get(format!("{base}/admin/routes"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Reset { route_id } => {
            client
                .post(format!("{base}/admin/breakers/{route_id}/reset"))
                .headers(headers)
                .send()
                .await?
        }
    };
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
