//! CLI module for kodbank.
//!
//! Runs the account flows against the backends selected in the config file.
//! The client session is kept as JSON at `session.path` between invocations,
//! the way a browser keeps it in local storage.
//!
//! # Usage
//!
//! ```bash
//! # Create the SQL tables
//! kodbank -c kodbank.toml init
//!
//! # Register, then log in
//! kodbank register -u john -e john@example.com -p secret1 --phone 555-0100
//! kodbank login -e john@example.com -p secret1
//!
//! # Check the balance with the stored session
//! kodbank balance
//!
//! # Inspect and clean up access tokens
//! kodbank tokens --format json
//! kodbank prune
//!
//! kodbank logout
//!
//! # Everything above, in memory
//! kodbank demo
//! ```

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kodbank_config::{
    BackendKind, CliOverrides, Config, LoggingConfig, apply_overrides, load_config,
    validate_config,
};
use kodbank_core::defaults::{DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL, DEFAULT_LOG_OUTPUT};
use kodbank_core::{Clock, SystemClock};
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::http::HttpApi;
use crate::memory::{MemoryAuthProvider, MemoryRecordStore};
use crate::model::redact;
use crate::sql::{SqlConfig, SqlDatabase};
use crate::{
    AccessTokenRecord, AccountError, AccountService, AuthProvider, Credentials, RecordStore,
    Registration, ServiceConfig, SessionContext, UserProfile,
};

type CliResult<T = ()> = Result<T, Box<dyn Error>>;
type DynService = AccountService<Box<dyn AuthProvider>, Box<dyn RecordStore>>;

/// Kodbank CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "kodbank", version, about = "Kodbank account and balance client")]
pub struct AccountArgs {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "kodbank.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: CliOverrides,

    #[command(subcommand)]
    pub command: AccountCommands,
}

/// Kodbank CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommands {
    /// Initialize the SQL schema.
    Init,

    /// Register a new account.
    Register {
        /// Display name.
        #[arg(short, long)]
        username: String,

        /// Email address (the login name).
        #[arg(short, long)]
        email: String,

        /// Password.
        #[arg(short, long, env = "KODBANK_PASSWORD", hide_env_values = true)]
        password: String,

        /// Phone number.
        #[arg(long)]
        phone: Option<String>,
    },

    /// Log in and store the session.
    Login {
        /// Email address.
        #[arg(short, long)]
        email: String,

        /// Password.
        #[arg(short, long, env = "KODBANK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show the balance of the logged-in account.
    Balance,

    /// Show the profile of the logged-in account.
    Whoami,

    /// List the access tokens of the logged-in account.
    Tokens {
        /// Output format (table, json, csv).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Delete expired access tokens of every account.
    Prune,

    /// End the stored session.
    Logout,

    /// Run register, login, balance and logout against in-memory backends.
    Demo {
        #[arg(short, long, default_value = "demo")]
        username: String,

        #[arg(short, long, default_value = "demo@example.com")]
        email: String,

        #[arg(short, long, default_value = "secret1")]
        password: String,
    },
}

/// Token row for display.
#[derive(Tabled)]
struct TokenDisplay {
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Live")]
    live: String,
    #[tabled(rename = "Current")]
    current: String,
}

/// Profile for display.
#[derive(Tabled)]
struct ProfileDisplay {
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Balance")]
    balance: String,
}

impl From<UserProfile> for ProfileDisplay {
    fn from(p: UserProfile) -> Self {
        Self {
            uid: p.uid,
            username: p.username,
            email: p.email,
            phone: p.phone.unwrap_or_else(|| "-".to_string()),
            role: p.role.to_string(),
            balance: format_balance(p.balance),
        }
    }
}

/// Run the kodbank CLI with the given arguments.
pub async fn run(args: AccountArgs) -> CliResult {
    if let AccountCommands::Demo {
        username,
        email,
        password,
    } = &args.command
    {
        let mut config = Config::in_memory();
        apply_overrides(&mut config, &args.overrides);
        init_tracing(&config.logging);
        return demo(&config, username, email, password).await;
    }

    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);
    debug!(
        provider = config.provider.kind.as_str(),
        store = config.store.kind.as_str(),
        "configuration loaded"
    );

    if let AccountCommands::Init = args.command {
        return init_schema(&config).await;
    }

    let service = build_service(&config).await?;
    let session_path = PathBuf::from(&config.session.path);
    let mut ctx = load_session(&session_path)?;

    let result = execute(&service, &mut ctx, args.command).await;

    // Persist even on failure: a forced sign-out must reach the file
    save_session(&session_path, &ctx)?;
    result
}

async fn execute(
    service: &DynService,
    ctx: &mut SessionContext,
    command: AccountCommands,
) -> CliResult {
    match command {
        AccountCommands::Register {
            username,
            email,
            password,
            phone,
        } => {
            let mut registration = Registration::new(username, email, password);
            if let Some(phone) = phone {
                registration = registration.phone(phone);
            }
            let profile = service.register(ctx, &registration).await?;
            println!(
                "Registered {} with a balance of {}. Please log in.",
                profile.username,
                format_balance(profile.balance)
            );
        }
        AccountCommands::Login { email, password } => {
            let outcome = service
                .login(ctx, &Credentials::new(email, password))
                .await?;
            match outcome.profile {
                Some(profile) => println!(
                    "Logged in as {}. Session expires {}.",
                    profile.username,
                    format_timestamp(outcome.session_expires_at)
                ),
                None => println!("Logged in, but no profile exists for this account."),
            }
        }
        AccountCommands::Balance => {
            let balance = service.check_balance(ctx).await?;
            println!(
                "Balance for {}: {}",
                balance.username,
                format_balance(balance.balance)
            );
        }
        AccountCommands::Whoami => {
            let profile = service.profile(ctx).await?;
            println!("{}", Table::new([ProfileDisplay::from(profile)]));
        }
        AccountCommands::Tokens { format } => {
            let tokens = service.tokens(ctx).await?;
            let current = ctx.session().map(|s| s.access_token.clone());
            print_tokens(&tokens, current.as_deref(), &format)?;
        }
        AccountCommands::Prune => {
            let removed = service.prune_expired_tokens().await?;
            println!("Removed {removed} expired access token(s).");
        }
        AccountCommands::Logout => {
            if ctx.is_signed_in() {
                service.logout(ctx).await?;
                println!("Logged out.");
            } else {
                println!("Not logged in.");
            }
        }
        AccountCommands::Init | AccountCommands::Demo { .. } => {
            return Err("command does not use the stored session".into());
        }
    }
    Ok(())
}

/// Connect the configured backends.
async fn build_service(config: &Config) -> CliResult<DynService> {
    let database = match &config.database {
        Some(db) if config.uses_sql() => {
            Some(SqlDatabase::connect(SqlConfig::from_database_config(db)).await?)
        }
        _ => None,
    };
    let api = match &config.http {
        Some(http) if config.uses_http() => Some(HttpApi::from_config(http)?),
        _ => None,
    };

    let provider: Box<dyn AuthProvider> = match config.provider.kind {
        BackendKind::Memory => return Err(memory_backend_error()),
        BackendKind::Sql => Box::new(
            database
                .as_ref()
                .ok_or("provider kind \"sql\" requires a [database] section")?
                .auth_provider()
                .session_ttl(std::time::Duration::from_secs(
                    config.provider.session_ttl_secs,
                ))
                .min_password_len(config.provider.min_password_len),
        ),
        BackendKind::Http => Box::new(
            api.as_ref()
                .ok_or("provider kind \"http\" requires an [http] section")?
                .auth_provider(),
        ),
    };
    let store: Box<dyn RecordStore> = match config.store.kind {
        BackendKind::Memory => return Err(memory_backend_error()),
        BackendKind::Sql => Box::new(
            database
                .as_ref()
                .ok_or("store kind \"sql\" requires a [database] section")?
                .record_store(),
        ),
        BackendKind::Http => Box::new(
            api.as_ref()
                .ok_or("store kind \"http\" requires an [http] section")?
                .record_store(),
        ),
    };

    Ok(AccountService::new(
        provider,
        store,
        ServiceConfig::from_account_config(&config.account),
    ))
}

fn memory_backend_error() -> Box<dyn Error> {
    "memory backends keep no state between invocations; use `kodbank demo`".into()
}

/// Initialize the SQL schema.
async fn init_schema(config: &Config) -> CliResult {
    let Some(db) = config.database.as_ref().filter(|_| config.uses_sql()) else {
        println!("No SQL backend configured; nothing to initialize.");
        return Ok(());
    };
    let database = SqlDatabase::connect(SqlConfig::from_database_config(db)).await?;
    database.init_schema().await?;
    println!("Database schema initialized successfully.");
    Ok(())
}

/// Walk through the four flows on in-memory backends.
async fn demo(config: &Config, username: &str, email: &str, password: &str) -> CliResult {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let provider = MemoryAuthProvider::new()
        .with_clock(clock.clone())
        .min_password_len(config.provider.min_password_len);
    let service = AccountService::new(
        provider,
        MemoryRecordStore::new(),
        ServiceConfig::from_account_config(&config.account),
    )
    .with_clock(clock);
    let mut ctx = SessionContext::new();

    let profile = service
        .register(&mut ctx, &Registration::new(username, email, password))
        .await?;
    println!(
        "register  ok   {} ({}), balance {}",
        profile.username,
        profile.email,
        format_balance(profile.balance)
    );

    match service
        .register(&mut ctx, &Registration::new(username, email, password))
        .await
    {
        Err(e @ AccountError::CredentialConflict) => println!("register  err  {e}"),
        other => return Err(format!("expected a conflict, got {other:?}").into()),
    }

    let outcome = service
        .login(&mut ctx, &Credentials::new(email, password))
        .await?;
    println!(
        "login     ok   session expires {}",
        format_timestamp(outcome.session_expires_at)
    );

    let balance = service.check_balance(&mut ctx).await?;
    println!(
        "balance   ok   {}: {}",
        balance.username,
        format_balance(balance.balance)
    );

    service.logout(&mut ctx).await?;
    println!("logout    ok");

    match service.check_balance(&mut ctx).await {
        Err(e @ AccountError::NotAuthenticated) => println!("balance   err  {e}"),
        other => return Err(format!("expected sign-out, got {other:?}").into()),
    }

    info!("demo finished");
    Ok(())
}

fn print_tokens(tokens: &[AccessTokenRecord], current: Option<&str>, format: &str) -> CliResult {
    if tokens.is_empty() {
        println!("No access tokens found.");
        return Ok(());
    }

    let now = SystemClock.now_unix();
    let rows: Vec<TokenDisplay> = tokens
        .iter()
        .map(|t| TokenDisplay {
            token: redact(&t.token),
            expires: format_timestamp(t.expiry),
            live: if t.is_live(now) { "Yes" } else { "No" }.to_string(),
            current: if current == Some(t.token.as_str()) { "*" } else { "" }.to_string(),
        })
        .collect();

    match format {
        "json" => {
            let json: Vec<_> = rows
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "token": r.token,
                        "expires": r.expires,
                        "live": r.live == "Yes",
                        "current": r.current == "*",
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        "csv" => {
            println!("token,expires,live,current");
            for r in rows {
                println!("{},{},{},{}", r.token, r.expires, r.live, r.current == "*");
            }
        }
        _ => {
            // Table format (default)
            println!("{}", Table::new(rows));
        }
    }
    Ok(())
}

/// Load the persisted session; a missing file is a signed-out context.
pub(crate) fn load_session(path: &Path) -> CliResult<SessionContext> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SessionContext::new()),
        Err(e) => Err(e.into()),
    }
}

/// Persist the session; a signed-out context removes the file.
pub(crate) fn save_session(path: &Path, ctx: &SessionContext) -> CliResult {
    if !ctx.is_signed_in() {
        return match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        };
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(ctx)?)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Balance with Indian digit grouping, e.g. `₹1,00,000`.
pub(crate) fn format_balance(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let sign = if amount < 0 { "-" } else { "" };
    if digits.len() <= 3 {
        return format!("{sign}₹{digits}");
    }

    let (head, last3) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = left;
    }
    groups.push(rest);
    groups.reverse();
    format!("{sign}₹{},{last3}", groups.join(","))
}

fn format_timestamp(unix: i64) -> String {
    OffsetDateTime::from_unix_timestamp(unix)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| unix.to_string())
}

/// Base level followed by the per-module overrides, as `EnvFilter` directives.
fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = config
        .level
        .as_deref()
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string();
    for (module, level) in &config.filters {
        directives.push_str(&format!(",{module}={level}"));
    }
    directives
}

/// Initialize tracing subscriber with the given logging configuration.
///
/// Supports:
/// - `level`: Base log level (trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
/// - `filters`: Per-module log level overrides
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(filter_directives(config))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let format = config.format.as_deref().unwrap_or(DEFAULT_LOG_FORMAT);
    let output = config.output.as_deref().unwrap_or(DEFAULT_LOG_OUTPUT);

    match (format, output) {
        ("json", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
        }
        ("json", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        ("compact", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stdout))
                .init();
        }
        ("compact", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        (_, "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Identity, ProviderSession};

    fn session() -> ProviderSession {
        ProviderSession {
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            expires_at: 1_700_000_000,
            identity: Identity {
                id: "id-1".into(),
                email: "john@example.com".into(),
            },
        }
    }

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(0), "₹0");
        assert_eq!(format_balance(999), "₹999");
        assert_eq!(format_balance(1_000), "₹1,000");
        assert_eq!(format_balance(100_000), "₹1,00,000");
        assert_eq!(format_balance(12_345_678), "₹1,23,45,678");
        assert_eq!(format_balance(-100_000), "-₹1,00,000");
    }

    #[test]
    fn test_filter_directives() {
        let mut logging = LoggingConfig::default();
        assert_eq!(filter_directives(&logging), DEFAULT_LOG_LEVEL);

        logging.level = Some("warn".into());
        logging
            .filters
            .insert("kodbank_account".into(), "debug".into());
        assert_eq!(filter_directives(&logging), "warn,kodbank_account=debug");
    }

    #[test]
    fn test_session_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        assert!(!load_session(&path).unwrap().is_signed_in());

        save_session(&path, &SessionContext::with_session(session())).unwrap();
        let loaded = load_session(&path).unwrap();
        assert_eq!(loaded.session(), Some(&session()));

        save_session(&path, &SessionContext::new()).unwrap();
        assert!(!path.exists());
        // Removing an absent file is fine
        save_session(&path, &SessionContext::new()).unwrap();
    }

    #[test]
    fn test_corrupt_session_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_session(&path).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = AccountArgs::try_parse_from([
            "kodbank",
            "-c",
            "custom.yaml",
            "--token-ttl-secs",
            "60",
            "login",
            "-e",
            "john@example.com",
            "-p",
            "secret1",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("custom.yaml"));
        assert_eq!(args.overrides.token_ttl_secs, Some(60));
        assert!(matches!(args.command, AccountCommands::Login { .. }));

        let args = AccountArgs::try_parse_from(["kodbank", "tokens", "--format", "csv"]).unwrap();
        assert!(matches!(args.command, AccountCommands::Tokens { ref format } if format == "csv"));
    }

    #[tokio::test]
    async fn test_memory_backends_rejected_outside_demo() {
        let result = build_service(&Config::in_memory()).await;
        assert!(result.is_err());
    }
}
