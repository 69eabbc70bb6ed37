use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "share-cli")]
#[command(about = "Owner CLI for the mailbox share gate", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "SHARE_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gate status
    Status,
    /// Create a share link for a mailbox
    Create {
        mailbox: String,
        /// RFC 3339 expiry time
        #[arg(long)]
        expires: Option<String>,
        /// Allowed requester address (repeatable)
        #[arg(long = "allow")]
        whitelist: Vec<String>,
        /// Comma-separated keywords
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long)]
        per_second: Option<u32>,
        #[arg(long)]
        per_minute: Option<u32>,
    },
    /// Disable a share
    Disable { token: String },
    /// Re-enable a share
    Enable { token: String },
    /// Change a share's rate limits
    Limits {
        token: String,
        per_second: u32,
        per_minute: u32,
    },
    /// Show recent access log entries
    Logs {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
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

    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Create {
            mailbox,
            expires,
            whitelist,
            keywords,
            per_second,
            per_minute,
        } => client.post(format!("{base}/admin/shares")).json(&json!({
            "mailbox": mailbox,
            "expireTime": expires,
            "whitelist": whitelist,
            "keywordFilter": keywords,
            "rateLimitPerSecond": per_second,
            "rateLimitPerMinute": per_minute,
        })),
        Commands::Disable { token } => client
            .put(format!("{base}/admin/shares/{token}/status"))
            .json(&json!({ "status": "disabled" })),
        Commands::Enable { token } => client
            .put(format!("{base}/admin/shares/{token}/status"))
            .json(&json!({ "status": "active" })),
        Commands::Limits {
            token,
            per_second,
            per_minute,
        } => client
            .put(format!("{base}/admin/shares/{token}/limits"))
            .json(&json!({ "perSecond": per_second, "perMinute": per_minute })),
        Commands::Logs { limit } => client.get(format!("{base}/admin/access-log?limit={limit}")),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
