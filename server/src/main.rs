//! sqlgate server: serves the endpoints declared in a config file.
//!
//! Usage: `sqlgate [-c|--config <file>]`. Without a flag the path comes from
//! `SQLGATE_CONFIG`, else `sqlgate.toml`.

use sqlgate::{load_env, load_file, run, Conf, ConfigError};

const CONFIG_ENV: &str = "SQLGATE_CONFIG";
const DEFAULT_CONFIG: &str = "sqlgate.toml";

/// The file given with `-c`/`--config`, if any.
fn config_flag() -> Result<Option<String>, String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => return args.next().map(Some).ok_or_else(|| format!("{} needs a file", arg)),
            other => {
                if let Some(file) = other.strip_prefix("--config=") {
                    return Ok(Some(file.to_string()));
                }
                return Err(format!("unknown argument {}", other));
            }
        }
    }
    Ok(None)
}

async fn load_config() -> Result<Conf, Box<dyn std::error::Error>> {
    if let Some(file) = config_flag()? {
        return Ok(load_file(&file).await?);
    }
    match load_env(CONFIG_ENV).await {
        Err(ConfigError::EnvNotSet(_)) => Ok(load_file(DEFAULT_CONFIG).await?),
        other => Ok(other?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sqlgate=info")),
        )
        .init();

    let conf = load_config().await?;
    run(conf).await?;
    Ok(())
}
