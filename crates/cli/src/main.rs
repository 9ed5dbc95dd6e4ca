mod config;
mod serve;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use db::Database;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "questlog")]
#[command(about = "Task manager with experience, levels and leaderboards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    #[command(display_order = 1)]
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize questlog configuration
    #[command(display_order = 2)]
    Init,
    /// Configuration management
    #[command(display_order = 3)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// User administration
    #[command(display_order = 4)]
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Show configuration file path
    Path,
}

#[derive(Subcommand)]
enum UserAction {
    /// List active users
    List,
    /// Create a user
    Create {
        username: String,
        email: String,

        /// Password for the new account
        #[arg(long, env = "QUESTLOG_USER_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The server logs at INFO; one-shot commands stay quiet at WARN.
    // A valid RUST_LOG replaces either default.
    let level = match cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, rust_log.as_deref()))
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main(cli.command))
}

fn log_filter(default: tracing::Level, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default.as_str()))
}

async fn async_main(command: Commands) -> Result<()> {
    match command {
        Commands::Serve { host, port } => {
            let mut cfg = config::load_config()?;
            if let Some(host) = host {
                cfg.server.host = host;
            }
            if let Some(port) = port {
                cfg.server.port = port;
            }
            serve::run(&cfg).await
        }
        Commands::Init => handle_init(),
        Commands::Config { action } => handle_config(action),
        Commands::User { action } => handle_user(action).await,
    }
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut cfg = config::load_config()?;
            if cfg.auth.jwt_secret.is_some() {
                cfg.auth.jwt_secret = Some("********".to_string());
            }
            if cfg.database.password.is_some() {
                cfg.database.password = Some("********".to_string());
            }
            let toml_str = toml::to_string_pretty(&cfg)?;
            println!("{}", toml_str);
            Ok(())
        }
        ConfigAction::Get { key } => {
            let cfg = config::load_config()?;
            match config::get_config_value(&cfg, &key) {
                Some(value) => println!("{}", value),
                None => {
                    if config::CONFIG_KEYS.contains(&key.as_str()) {
                        println!("(not set)");
                    } else {
                        anyhow::bail!("Unknown config key: {}", key);
                    }
                }
            }
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut cfg = config::load_config()?;
            config::set_config_value(&mut cfg, &key, &value)?;
            config::save_config(&cfg)?;
            let shown = config::get_config_value(&cfg, &key).unwrap_or(value);
            println!("Set {} = {}", key, shown);
            Ok(())
        }
        ConfigAction::Path => {
            let path = config::get_config_file()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn handle_init() -> Result<()> {
    let config_file = config::get_config_file()?;

    if config_file.exists() {
        println!("Config file already exists: {}", config_file.display());
        return Ok(());
    }

    let mut cfg = config::Config::default();
    cfg.auth.jwt_secret = Some(config::generate_secret());
    config::save_config(&cfg)?;
    println!("Created config file: {}", config_file.display());

    println!();
    println!("Defaults:");
    println!("  Server: http://{}:{}", cfg.server.host, cfg.server.port);
    println!("  Database: {}", config::get_db_path(&cfg)?.display());
    println!("  Token lifetime: {} hours", cfg.auth.token_ttl_hours);

    Ok(())
}

async fn open_database(cfg: &config::Config) -> Result<Database> {
    let default_path = config::get_db_path(cfg)?;
    Database::connect(&cfg.database, "questlog", Some(default_path))
        .await
        .context("Failed to connect to questlog database")
}

async fn handle_user(action: UserAction) -> Result<()> {
    let cfg = config::load_config()?;
    let store = accounts::Store::new(open_database(&cfg).await?);

    match action {
        UserAction::List => {
            let mut users = store.list_active_users().await?;
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }

            users.sort_by(|a, b| a.username.cmp(&b.username));
            println!(
                "{:<20} {:<30} {:>5} {:>8} {:>6}",
                "USERNAME", "EMAIL", "LEVEL", "POINTS", "DONE"
            );
            for user in users {
                println!(
                    "{:<20} {:<30} {:>5} {:>8} {:>6}",
                    user.username,
                    user.email,
                    user.gamification.level,
                    user.gamification.points,
                    user.stats.completed_tasks
                );
            }
            Ok(())
        }
        UserAction::Create {
            username,
            email,
            password,
            first_name,
            last_name,
        } => {
            let first_name = if first_name.trim().is_empty() {
                username.clone()
            } else {
                first_name
            };
            let last_name = if last_name.trim().is_empty() {
                "-".to_string()
            } else {
                last_name
            };

            let user = accounts::NewUser {
                username,
                email,
                password,
                first_name,
                last_name,
            }
            .into_user()?;
            let user = store.create_user(user).await?;
            println!(
                "Created user {} ({})",
                user.username,
                user.id_str().unwrap_or_default()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rust_log_replaces_default_level() {
        use tracing::level_filters::LevelFilter;
        use tracing::Level;

        let filter = log_filter(Level::INFO, Some("debug"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(Level::INFO, Some("error"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));

        let filter = log_filter(Level::WARN, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = log_filter(Level::INFO, Some("  "));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_serve_overrides_parse() {
        let cli = Cli::try_parse_from(["questlog", "serve", "--host", "0.0.0.0", "-p", "8080"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_user_create_parses() {
        let cli = Cli::try_parse_from([
            "questlog",
            "user",
            "create",
            "ada",
            "ada@example.com",
            "--password",
            "engine42",
            "--first-name",
            "Ada",
        ])
        .unwrap();
        match cli.command {
            Commands::User {
                action: UserAction::Create { username, first_name, last_name, .. },
            } => {
                assert_eq!(username, "ada");
                assert_eq!(first_name, "Ada");
                assert_eq!(last_name, "");
            }
            _ => panic!("expected user create"),
        }
    }
}
