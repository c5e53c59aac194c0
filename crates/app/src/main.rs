mod console;

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use services::{
    AdvanceOutcome, CatalogService, EngineSettings, ListenOutcome, ProgressTracker,
    PromptOutcome, SessionCommand, SessionEvent, SessionLoopService, SessionService,
    SessionUpdate, capture_channel,
};
use speech_core::catalog::ExerciseFilter;
use speech_core::model::{CategoryId, ExerciseId};
use storage::repository::Storage;

use crate::console::ConsoleCapture;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidTimeout { raw: String },
    InvalidId { flag: &'static str, raw: String },
    MissingExercise,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeout { raw } => {
                write!(f, "invalid --listen-timeout value: {raw}")
            }
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::MissingExercise => write!(f, "practice requires --exercise <id>"),
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
    eprintln!("  speech-practice list     [--category <id>] [--query <text>] [common flags]");
    eprintln!("  speech-practice practice --exercise <id> [common flags]");
    eprintln!("  speech-practice progress [common flags]");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>          (default sqlite:speech-practice.sqlite3)");
    eprintln!("  --catalog <json file>      (default: built-in catalog)");
    eprintln!("  --listen-timeout <secs>    (default 15)");
    eprintln!("  --log-level <filter>       (default warn)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SPEECH_DB_URL, SPEECH_CATALOG, SPEECH_LISTEN_TIMEOUT, SPEECH_LOG, RUST_LOG");
    eprintln!();
    eprintln!("While practicing, type what you said, or:");
    eprintln!("  :play :listen :stop :hint :next :prev :dismiss :quit");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Practice,
    Progress,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "practice" => Some(Self::Practice),
            "progress" => Some(Self::Progress),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    catalog_path: Option<String>,
    listen_timeout: Option<u64>,
    log_level: String,
    exercise: Option<ExerciseId>,
    category: Option<CategoryId>,
    query: Option<String>,
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("SPEECH_DB_URL").map_or_else(
            || normalize_sqlite_url("sqlite:speech-practice.sqlite3".into()),
            normalize_sqlite_url,
        );
        let mut catalog_path = env("SPEECH_CATALOG").filter(|v| !v.trim().is_empty());
        let mut listen_timeout = env("SPEECH_LISTEN_TIMEOUT").and_then(|v| v.parse().ok());
        let mut log_level = env("SPEECH_LOG").unwrap_or_else(|| "warn".into());
        let mut exercise = None;
        let mut category = None;
        let mut query = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => catalog_path = Some(require_value(args, "--catalog")?),
                "--listen-timeout" => {
                    let value = require_value(args, "--listen-timeout")?;
                    let parsed = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTimeout { raw: value.clone() })?;
                    listen_timeout = Some(parsed);
                }
                "--log-level" => log_level = require_value(args, "--log-level")?,
                "--exercise" => {
                    let value = require_value(args, "--exercise")?;
                    exercise = Some(value.parse().map_err(|_| ArgsError::InvalidId {
                        flag: "--exercise",
                        raw: value.clone(),
                    })?);
                }
                "--category" => {
                    let value = require_value(args, "--category")?;
                    category = Some(value.parse().map_err(|_| ArgsError::InvalidId {
                        flag: "--category",
                        raw: value.clone(),
                    })?);
                }
                "--query" => query = Some(require_value(args, "--query")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            catalog_path,
            listen_timeout,
            log_level,
            exercise,
            category,
            query,
        })
    }

    fn settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::default();
        if let Some(secs) = self.listen_timeout {
            settings.listen_timeout_secs = secs;
        }
        settings
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

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(path: Option<&str>) -> Result<CatalogService, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(CatalogService::builtin()?);
    };
    let json = std::fs::read_to_string(path)?;
    Ok(CatalogService::from_json_str(&json)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing(&parsed.log_level);

    let settings = parsed.settings().validate()?;
    let catalog = load_catalog(parsed.catalog_path.as_deref())?;

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let progress = ProgressTracker::restore(catalog.catalog(), storage.completions.as_ref()).await?;
    tracing::debug!(db = %parsed.db_url, completed = progress.completed_count(), "storage ready");

    match cmd {
        Command::List => {
            list(&catalog, &progress, &parsed);
            Ok(())
        }
        Command::Progress => {
            print_progress(&progress);
            Ok(())
        }
        Command::Practice => {
            let exercise = parsed.exercise.clone().ok_or(ArgsError::MissingExercise)?;
            catalog.get_exercise(&exercise)?;
            practice(exercise, progress, settings, storage).await
        }
    }
}

fn list(catalog: &CatalogService, progress: &ProgressTracker, args: &Args) {
    let mut filter = ExerciseFilter::all();
    if let Some(category) = &args.category {
        filter = filter.with_category(category.clone());
    }
    if let Some(query) = &args.query {
        filter = filter.with_query(query.clone());
    }

    for category in catalog.list_categories() {
        let exercises: Vec<_> = catalog
            .list_exercises(&filter)
            .into_iter()
            .filter(|e| e.category_id() == category.id())
            .collect();
        if exercises.is_empty() {
            continue;
        }
        println!(
            "{} {}  ({}%)",
            category.icon(),
            category.name(),
            progress.category_progress(category.id())
        );
        for exercise in exercises {
            let mark = if progress.is_completed(exercise.id()) { "x" } else { " " };
            println!(
                "  [{mark}] {:<22} {:<7} {:>3} pts  {}",
                exercise.id(),
                exercise.difficulty(),
                exercise.points(),
                exercise.title()
            );
        }
    }
}

fn print_progress(progress: &ProgressTracker) {
    for summary in progress.category_summaries() {
        println!(
            "{:<14} {:>2}/{:<2} {:>3}%",
            summary.name, summary.completed, summary.total, summary.percent
        );
    }
    println!(
        "completed {} exercise(s), {} point(s)",
        progress.completed_count(),
        progress.total_points()
    );
}

fn parse_line(line: &str) -> Option<SessionCommand> {
    let command = match line {
        ":play" => SessionCommand::RequestPrompt,
        ":listen" => SessionCommand::BeginListening,
        ":stop" => SessionCommand::StopListening,
        ":hint" => SessionCommand::ToggleHint,
        ":next" => SessionCommand::Advance,
        ":prev" => SessionCommand::Retreat,
        ":dismiss" => SessionCommand::DismissNotice,
        ":quit" => SessionCommand::Shutdown,
        _ => return None,
    };
    Some(command)
}

async fn practice(
    exercise: ExerciseId,
    progress: ProgressTracker,
    settings: EngineSettings,
    storage: Storage,
) -> Result<(), Box<dyn std::error::Error>> {
    let console = ConsoleCapture::default();
    let (capture_tx, capture_rx) = capture_channel();
    let machine = SessionService::new(Arc::new(console.clone()), capture_tx, progress.clone())
        .with_settings(settings);
    let session_loop =
        SessionLoopService::new().with_completions(Arc::clone(&storage.completions));

    let (commands, command_rx) = mpsc::channel(16);
    let (update_tx, mut updates) = mpsc::channel(16);
    let handle = tokio::spawn(async move {
        session_loop
            .run(machine, capture_rx, command_rx, update_tx)
            .await
    });

    commands.send(SessionCommand::Start(exercise)).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(update) = update else { break };
                if render(&update) {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_line(line) {
                    Some(SessionCommand::Shutdown) => break,
                    Some(command) => commands.send(command).await?,
                    None if line.starts_with(':') => eprintln!("unknown command: {line}"),
                    None => {
                        if !console.deliver(line.to_owned()) {
                            commands.send(SessionCommand::BeginListening).await?;
                        }
                    }
                }
            }
        }
    }

    commands.send(SessionCommand::Shutdown).await.ok();
    let summary = handle.await?;
    if summary.persistence_failures > 0 {
        eprintln!("warning: progress could not be saved; it is kept for this run only");
    }
    print_progress(&progress);
    Ok(())
}

/// Prints one update. Returns `true` once the exercise is finished.
fn render(update: &SessionUpdate) -> bool {
    match &update.event {
        SessionEvent::Started(_) => {
            if let Some(step) = &update.snapshot.step {
                println!("== {} ==", step.exercise_title);
            }
            if let Some(advisory) = update.snapshot.advisory {
                println!("  note: {advisory}");
            }
        }
        SessionEvent::Prompt(PromptOutcome::Spoken) => return false,
        SessionEvent::Prompt(PromptOutcome::Unavailable) => {
            println!("  prompt playback is unavailable");
        }
        SessionEvent::Prompt(PromptOutcome::Failed(reason)) => {
            println!("  prompt failed: {reason}");
        }
        SessionEvent::Listen(ListenOutcome::Started { .. }) | SessionEvent::Interim => return false,
        SessionEvent::Listen(ListenOutcome::Unavailable) => println!("  recording is unavailable"),
        SessionEvent::Listen(ListenOutcome::Failed(reason)) => {
            println!("  could not listen: {reason}");
        }
        SessionEvent::Scored(feedback) => {
            println!("  {} (score {})", feedback.message, feedback.score);
            return false;
        }
        SessionEvent::CaptureFailed | SessionEvent::TimedOut => {
            if let Some(notice) = update.snapshot.step.as_ref().and_then(|s| s.notice.as_ref()) {
                println!("  {notice}");
            }
        }
        SessionEvent::Advanced(AdvanceOutcome::Completed(completion)) => {
            println!("Exercise complete! +{} points", completion.points);
            return true;
        }
        SessionEvent::Advanced(AdvanceOutcome::Blocked { attempts }) => {
            println!("  keep trying: pass this step or use all 3 attempts ({attempts} so far)");
            return false;
        }
        SessionEvent::Rejected(reason) => {
            println!("  {reason}");
            return false;
        }
        SessionEvent::Exited => return true,
        SessionEvent::ListenCancelled
        | SessionEvent::HintToggled { .. }
        | SessionEvent::NoticeDismissed
        | SessionEvent::Advanced(AdvanceOutcome::Moved { .. })
        | SessionEvent::Retreated { .. } => {}
    }

    if let Some(step) = &update.snapshot.step {
        println!(
            "Step {}/{}: say \"{}\"  (attempts: {})",
            step.step_index + 1,
            step.step_count,
            step.target,
            step.attempts
        );
        if let Some(hint) = step.visible_hint() {
            println!("  hint: {hint}");
        }
    }
    false
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
