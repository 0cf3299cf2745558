use crate::client::LmClient;
use crate::errors::AccessResult;
use crate::services::config::ClientConfig;
use crate::services::deep_link::EntityFamily;
use crate::utils::query::ListQuery;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

/// Query the LogicMonitor REST API with the credentials in `LM_*` env vars.
#[derive(Debug, Parser)]
#[command(name = "lm-access", version)]
pub struct Cli {
    /// Per-request timeout; overrides LM_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// GET a single resource, e.g. `/device/devices/42`.
    Get {
        path: String,
        #[arg(long)]
        fields: Option<String>,
    },
    /// Read a list endpoint, e.g. `/device/devices`.
    List(ListArgs),
    /// Build a UI link for a dashboard, resource, website or alert.
    Link { family: EntityFamily, id: String },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    pub path: String,
    /// Filter expression, e.g. `displayName~prod,hostStatus:alive`.
    #[arg(long)]
    pub filter: Option<String>,
    #[arg(long)]
    pub fields: Option<String>,
    #[arg(long)]
    pub size: Option<u32>,
    #[arg(long)]
    pub offset: Option<u64>,
    /// Follow every page instead of returning the first one.
    #[arg(long)]
    pub all: bool,
}

impl ListArgs {
    fn query(&self) -> ListQuery {
        ListQuery {
            filter: self.filter.clone(),
            fields: self.fields.clone(),
            size: self.size,
            offset: self.offset,
            ..ListQuery::default()
        }
    }
}

pub async fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(output) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string())
            );
            0
        }
        Err(err) => {
            eprintln!(
                "{}",
                serde_json::json!({"error": err, "message": err.to_string(), "retryable": err.retryable()})
            );
            1
        }
    }
}

pub async fn execute(cli: Cli) -> AccessResult<Value> {
    let mut config = ClientConfig::from_env()?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    let client = LmClient::new(config)?;

    let result = match &cli.command {
        Command::Get { path, fields } => {
            let query = ListQuery {
                fields: fields.clone(),
                ..ListQuery::default()
            };
            client.get(path, &query).await?
        }
        Command::List(args) if args.all => {
            serde_json::json!(client.list_all(&args.path, &args.query()).await?)
        }
        Command::List(args) => serde_json::json!(client.list_page(&args.path, &args.query()).await?),
        Command::Link { family, id } => serde_json::json!(client.deep_link(*family, id).await?),
    };

    Ok(serde_json::json!({
        "result": result,
        "rate_limits": client.rate_limits(),
    }))
}
