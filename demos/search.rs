//! Search a storage from the command line
//!
//! Run with: cargo run --example search -- --storage products "lap*"
//! Set RUST_LOG=cps_client=trace to see the request and reply XML.

use clap::Parser;
use cps_client::commands::query;
use cps_client::{Connection, ConnectionConfig, Request};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "search")]
#[command(about = "Run a search against a Clusterpoint storage", long_about = None)]
struct Args {
    /// Words to search for
    text: String,

    /// tcp://host[:port], http://host[:port]/path or unix://path
    #[arg(short, long, default_value = "tcp://127.0.0.1:5550")]
    connection: String,

    /// Storage name
    #[arg(short, long)]
    storage: String,

    /// Account name
    #[arg(short, long, default_value = "")]
    user: String,

    /// Account password
    #[arg(short, long, default_value = "")]
    password: String,

    /// Restrict the search to this tag path
    #[arg(long, default_value = "")]
    xpath: String,

    /// Maximum number of documents returned
    #[arg(long, default_value_t = 10)]
    docs: u32,

    /// TOML file with connection settings; command-line values override it
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cps_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => ConnectionConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => ConnectionConfig::default(),
    };
    config.connection_string = args.connection;
    config.storage = args.storage;
    if !args.user.is_empty() {
        config.username = args.user;
        config.password = args.password;
    }

    let mut conn = Connection::new(config)?;
    let mut request = Request::search(&query(&args.text, &args.xpath));
    request.set_docs(args.docs);

    let response = conn.send_request(&request).await?;
    tracing::info!(hits = response.hits(), seconds = response.seconds(), "search finished");
    for document in response.documents(false) {
        println!("{document}");
    }
    Ok(())
}
