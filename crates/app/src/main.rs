use std::fmt;

use services::accounts::AccountService;
use services::app_services::AppServices;
use services::remote::RemoteConfig;
use services::statistics::LearningOverview;
use services::Clock;
use vocab_core::model::{UserId, UserProfile, WordId};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidWordId { raw: String },
    InvalidTotalWords { raw: String },
    InvalidDbUrl { raw: String },
    UnknownUser { id: String },
    MissingName,
    MissingWordId,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidWordId { raw } => write!(f, "invalid word id: {raw}"),
            ArgsError::InvalidTotalWords { raw } => {
                write!(f, "invalid --total-words value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::UnknownUser { id } => write!(f, "no user with id {id}"),
            ArgsError::MissingName => write!(f, "expected a user name"),
            ArgsError::MissingWordId => write!(f, "expected a word id"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- stats  [--db <sqlite_url>] [--user <id>] [--total-words <n>]");
    eprintln!("  cargo run -p app -- export [--db <sqlite_url>] [--user <id>] [--out <path>]");
    eprintln!("  cargo run -p app -- learn <word-id> [--db <sqlite_url>] [--user <id>]");
    eprintln!("  cargo run -p app -- users [add <name>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:vocab.sqlite3");
    eprintln!("  --total-words 570");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VOCAB_DB_URL, VOCAB_USER_ID, VOCAB_API_URL, VOCAB_API_TOKEN");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Stats,
    Export,
    Learn { word: WordId },
    Users { add: Option<String> },
}

struct Args {
    db_url: String,
    user_id: Option<UserId>,
    total_words: u32,
    out: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("VOCAB_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://vocab.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = std::env::var("VOCAB_USER_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(UserId::new);
        let mut total_words = 570_u32;
        let mut out = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = Some(UserId::new(parsed));
                }
                "--total-words" => {
                    let value = require_value(args, "--total-words")?;
                    total_words = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTotalWords { raw: value.clone() })?;
                }
                "--out" => {
                    out = Some(require_value(args, "--out")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            total_words,
            out,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some("stats") => Command::Stats,
        Some("export") => Command::Export,
        Some("learn") => {
            let raw = argv.get(1).cloned().ok_or(ArgsError::MissingWordId)?;
            let word = raw
                .parse::<u64>()
                .map(WordId::new)
                .map_err(|_| ArgsError::InvalidWordId { raw })?;
            argv.remove(1);
            Command::Learn { word }
        }
        Some("users") => {
            let add = if argv.get(1).map(String::as_str) == Some("add") {
                let name = argv.get(2).cloned().ok_or(ArgsError::MissingName)?;
                argv.remove(2);
                argv.remove(1);
                Some(name)
            } else {
                None
            };
            Command::Users { add }
        }
        Some(first) => {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            return Err(Box::new(ArgsError::UnknownArg(first.to_string())));
        }
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let clock = Clock::default_clock();
    let remote = RemoteConfig::from_env();
    let mut app = AppServices::new_sqlite(&parsed.db_url, remote, clock).await?;

    match cmd {
        Command::Users { add } => {
            if let Some(name) = add {
                let profile = app.accounts().create_local(&name).await?;
                println!("created user {} ({})", profile.name, profile.id);
            }
            for profile in app.accounts().list().await? {
                println!("{}\t{}", profile.id, profile.name);
            }
            Ok(())
        }
        Command::Stats => {
            let profile = resolve_user(app.accounts(), parsed.user_id).await?;
            app.store().set_current_user(profile.clone());
            let now = app.clock().now();
            let progress = app.store().get().await?;
            let overview = LearningOverview::compute(progress, now, parsed.total_words);

            println!("user:             {}", profile.name);
            println!("words learned:    {} ({:.1}%)", progress.learned_count(), overview.percent_learned);
            println!("this week:        {} words", overview.words_learned_this_week);
            println!("avg quiz score:   {:.1}%", overview.average_quiz_score);
            println!("streak:           {}", overview.streak_label);
            println!("longest streak:   {} days", overview.longest_streak);
            println!("total study time: {}s", overview.total_time_spent_secs);
            Ok(())
        }
        Command::Export => {
            let profile = resolve_user(app.accounts(), parsed.user_id).await?;
            app.store().set_current_user(profile);
            let artifact = app.store().export_data().await?;
            match parsed.out {
                Some(path) => {
                    std::fs::write(&path, artifact)?;
                    println!("exported to {path}");
                }
                None => println!("{artifact}"),
            }
            Ok(())
        }
        Command::Learn { word } => {
            let profile = resolve_user(app.accounts(), parsed.user_id).await?;
            app.store().set_current_user(profile);
            if app.store().mark_learned(word).await? {
                println!("word {word} marked learned");
            } else {
                println!("word {word} was already learned");
            }
            Ok(())
        }
    }
}

/// Pick the requested user, else the first known one, else create a local
/// default profile.
async fn resolve_user(
    accounts: &AccountService,
    preferred: Option<UserId>,
) -> Result<UserProfile, Box<dyn std::error::Error>> {
    let known = accounts.list().await?;

    if let Some(id) = preferred {
        if let Some(profile) = known.iter().find(|profile| profile.id == id) {
            return Ok(profile.clone());
        }
        return Err(Box::new(ArgsError::UnknownUser { id: id.to_string() }));
    }

    if let Some(first) = known.first() {
        return Ok(first.clone());
    }

    Ok(accounts.create_local("Learner").await?)
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
