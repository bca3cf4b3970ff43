use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use time::Duration;

const DEFAULT_AUTH_COOKIE_NAME: &str = "komsai_auth";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve {
        addr: SocketAddr,
        config: komsai_cup::config::AppConfig,
    },
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Init(args)) => return RunOutcome::Exit(run_init(args)),
        Some(Command::AuthKey) => return RunOutcome::Exit(run_auth_key()),
        Some(Command::HashPassword(args)) => return RunOutcome::Exit(run_hash_password(args)),
        None => {}
    }

    if cli.page_size == 0 {
        eprintln!("error: --page-size must be greater than 0");
        return RunOutcome::Exit(2);
    }

    let auth = match resolve_auth_config(&cli) {
        Ok(auth) => auth,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve {
        addr: cli.listen,
        config: komsai_cup::config::AppConfig {
            app_name: cli.app_name,
            site: cli.site,
            subscriptions: cli.subscriptions,
            page_size: cli.page_size,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
            auth,
        },
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "komsai-cup",
    version,
    about = "Push notification server for the Komsai Cup leaderboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "KOMSAI_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    #[arg(long, default_value = "Komsai Cup")]
    app_name: String,
    /// TOML file with houses and admin accounts.
    #[arg(long, env = "KOMSAI_SITE")]
    site: Option<PathBuf>,
    /// JSON file subscriptions are persisted to; kept in memory when omitted.
    #[arg(long, env = "KOMSAI_SUBSCRIPTIONS")]
    subscriptions: Option<PathBuf>,
    #[arg(long, env = "KOMSAI_PAGE_SIZE", default_value_t = 50)]
    page_size: usize,
    #[arg(long, env = "KOMSAI_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "KOMSAI_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "KOMSAI_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "KOMSAI_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "KOMSAI_AUTH_TOKEN_TTL")]
    auth_token_ttl: Option<String>,
    #[arg(long, env = "KOMSAI_AUTH_COOKIE_NAME")]
    auth_cookie_name: Option<String>,
    #[arg(long, env = "KOMSAI_AUTH_COOKIE_SECURE")]
    auth_cookie_secure: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate VAPID credentials.
    Init(InitArgs),
    /// Generate a key for signing admin tokens.
    AuthKey,
    /// Hash a password for an `[[admin]]` entry in the site file.
    HashPassword(HashPasswordArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

#[derive(Args, Debug)]
struct HashPasswordArgs {
    password: String,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match komsai_cup::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("KOMSAI_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("KOMSAI_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("KOMSAI_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace KOMSAI_VAPID_SUBJECT with a contact URI you control.");
    }
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-public-key \"{}\" --vapid-subject \"{subject}\"",
        credentials.private_key, credentials.public_key
    );
    0
}

fn run_auth_key() -> i32 {
    let secret = match komsai_cup::auth::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn run_hash_password(args: HashPasswordArgs) -> i32 {
    if args.password.trim().is_empty() {
        eprintln!("error: password cannot be empty");
        return 2;
    }
    match komsai_cup::auth::hash_password(&args.password) {
        Ok(hash) => {
            println!("{hash}");
            0
        }
        Err(err) => {
            eprintln!("failed to hash password: {err}");
            1
        }
    }
}

fn resolve_auth_config(cli: &Cli) -> Result<Option<komsai_cup::config::AuthConfig>, String> {
    let has_any = cli.auth_key.is_some()
        || cli.auth_token_ttl.is_some()
        || cli.auth_cookie_name.is_some()
        || cli.auth_cookie_secure;

    if !has_any {
        return Ok(None);
    }

    let auth_key = cli
        .auth_key
        .as_ref()
        .ok_or("auth is configured but --auth-key is missing")?
        .trim();
    if auth_key.is_empty() {
        return Err("auth key cannot be empty".to_string());
    }

    if let Some(name) = cli.auth_cookie_name.as_deref()
        && name.trim().is_empty()
    {
        return Err("auth cookie name cannot be empty".to_string());
    }

    let token_ttl = match cli.auth_token_ttl.as_deref() {
        Some(raw) => parse_auth_token_ttl(raw)?,
        None => default_auth_token_ttl(),
    };
    let cookie_name = cli
        .auth_cookie_name
        .as_deref()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_AUTH_COOKIE_NAME.to_string());

    Ok(Some(komsai_cup::config::AuthConfig {
        key: auth_key.to_string(),
        token_ttl,
        cookie_name,
        cookie_secure: cli.auth_cookie_secure,
    }))
}

fn default_auth_token_ttl() -> Duration {
    Duration::days(14)
}

fn parse_auth_token_ttl(raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("auth token ttl cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err("auth token ttl must be greater than 0".to_string());
    }

    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        _ => Err(format!(
            "invalid auth token ttl '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}
