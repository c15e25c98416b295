use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for the storefront guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin API key for the /admin routes.
    #[arg(short, long, env = "STOREFRONT_GUARD_ADMIN_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Status,
    /// Show tracked and blocked keys per limiter
    Limits,
    /// Attempt an admin login
    Login {
        #[arg(short, long)]
        password: String,
    },
    /// Look up an order by id
    Order { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Limits => {
            client.get(format!("{}/admin/limits", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Login { password } => {
            client.post(format!("{}/api/admin/login", cli.url))
                .json(&json!({ "password": password }))
                .send()
                .await?
        }
        Commands::Order { id } => {
            client.get(format!("{}/api/orders/{}", cli.url, id))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let retry_after = res
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let body = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&body) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => body,
    };

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Some(secs) = retry_after {
            eprintln!("Retry after: {}s", secs);
        }
        eprintln!("Response: {}", rendered);
        return Ok(());
    }

    println!("{}", rendered);
    Ok(())
}
