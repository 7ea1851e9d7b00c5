mod logger;
mod terminal;

use std::fmt;
use std::path::PathBuf;

use donish_core::gate::{ContentConsumption, ContentKind, Role};
use donish_core::model::{LessonId, Locale, QuestionDraft, TestSettings};
use services::{AppServices, Clock, GateInput};
use storage::repository::Storage;
use tracing::info;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLessonId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLocale { raw: String },
    InvalidRole { raw: String },
    InvalidDrawSize { raw: String },
    InvalidContent { raw: String },
    MissingBank,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --lesson value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLocale { raw } => {
                write!(f, "invalid --locale value (expected ru or tg): {raw}")
            }
            ArgsError::InvalidRole { raw } => {
                write!(f, "invalid --role value (expected student, teacher or admin): {raw}")
            }
            ArgsError::InvalidDrawSize { raw } => write!(f, "invalid --draw-size value: {raw}"),
            ArgsError::InvalidContent { raw } => {
                write!(f, "invalid content list (expected video,text,slides): {raw}")
            }
            ArgsError::MissingBank => write!(f, "seed requires --bank <file.json>"),
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
    eprintln!("  donish seed --bank <file.json> [--db <sqlite_url>]");
    eprintln!("  donish take    [--db <sqlite_url>] [--lesson <id>] [--locale ru|tg] [--role <role>]");
    eprintln!("                 [--content <kinds>] [--consumed <kinds>] [--draw-size <n>]");
    eprintln!("  donish history [--db <sqlite_url>] [--lesson <id>]");
    eprintln!();
    eprintln!("  <kinds> is a comma-separated list of video, text, slides.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:donish.sqlite3");
    eprintln!("  --lesson 1");
    eprintln!("  --locale ru");
    eprintln!("  --role student");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DONISH_DB_URL, DONISH_LESSON_ID, DONISH_LOCALE, DONISH_DRAW_SIZE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Take,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "take" => Some(Self::Take),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    lesson_id: LessonId,
    locale: Locale,
    role: Role,
    content: Vec<ContentKind>,
    consumed: Vec<ContentKind>,
    draw_size: Option<u32>,
    bank: Option<PathBuf>,
}

fn parse_kinds(raw: &str) -> Result<Vec<ContentKind>, ArgsError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|kind| match kind {
            "video" => Ok(ContentKind::Video),
            "text" => Ok(ContentKind::Text),
            "slides" => Ok(ContentKind::Slides),
            _ => Err(ArgsError::InvalidContent {
                raw: raw.to_string(),
            }),
        })
        .collect()
}

fn parse_draw_size(raw: String) -> Result<u32, ArgsError> {
    raw.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or(ArgsError::InvalidDrawSize { raw })
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("DONISH_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:donish.sqlite3".into()), normalize_sqlite_url);
        let mut lesson_id = std::env::var("DONISH_LESSON_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| LessonId::new(1), LessonId::new);
        let mut locale = std::env::var("DONISH_LOCALE")
            .ok()
            .and_then(|value| value.parse::<Locale>().ok())
            .unwrap_or_default();
        let mut draw_size = std::env::var("DONISH_DRAW_SIZE")
            .ok()
            .and_then(|value| parse_draw_size(value).ok());
        let mut role = Role::default();
        let mut content = Vec::new();
        let mut consumed = Vec::new();
        let mut bank = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--lesson" => {
                    let value = require_value(args, "--lesson")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLessonId { raw: value.clone() })?;
                    lesson_id = LessonId::new(parsed);
                }
                "--locale" => {
                    let value = require_value(args, "--locale")?;
                    locale = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLocale { raw: value.clone() })?;
                }
                "--role" => {
                    let value = require_value(args, "--role")?;
                    role = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidRole { raw: value.clone() })?;
                }
                "--content" => {
                    content = parse_kinds(&require_value(args, "--content")?)?;
                }
                "--consumed" => {
                    consumed = parse_kinds(&require_value(args, "--consumed")?)?;
                }
                "--draw-size" => {
                    draw_size = Some(parse_draw_size(require_value(args, "--draw-size")?)?);
                }
                "--bank" => {
                    bank = Some(PathBuf::from(require_value(args, "--bank")?));
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
            lesson_id,
            locale,
            role,
            content,
            consumed,
            draw_size,
            bank,
        })
    }

    fn gate_input(&self) -> GateInput {
        let has = |kind| self.content.contains(&kind);
        let done = |kind| self.consumed.contains(&kind);
        GateInput::new(
            self.role,
            ContentConsumption {
                has_video: has(ContentKind::Video),
                video_done: done(ContentKind::Video),
                has_text: has(ContentKind::Text),
                text_done: done(ContentKind::Text),
                has_slides: has(ContentKind::Slides),
                slides_done: done(ContentKind::Slides),
            },
        )
    }

    fn settings(&self) -> Result<TestSettings, Box<dyn std::error::Error>> {
        let settings = TestSettings::default();
        Ok(match self.draw_size {
            Some(n) => settings.with_draw_size(n)?,
            None => settings,
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
            .unwrap_or_else(|_| PathBuf::from("."))
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

async fn seed(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let path = args.bank.as_ref().ok_or(ArgsError::MissingBank)?;
    let raw = std::fs::read_to_string(path)?;
    let drafts: Vec<QuestionDraft> = serde_json::from_str(&raw)?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let mut count = 0_usize;
    for draft in drafts {
        let question = draft.validate()?;
        storage.questions.upsert_question(&question).await?;
        count += 1;
    }
    info!(count, path = %path.display(), "question bank imported");
    println!("Imported {count} questions into {}", args.db_url);
    Ok(())
}

async fn history(app: &AppServices, lesson_id: LessonId) -> Result<(), Box<dyn std::error::Error>> {
    let history = app.history();
    let items = history.history(lesson_id).await?;
    if items.is_empty() {
        println!("No attempts for lesson {lesson_id} yet.");
    }
    for item in &items {
        println!(
            "#{:<4} {}  {:>3}%  {}/{}  {}{}",
            item.id,
            item.submitted_at.format("%Y-%m-%d %H:%M"),
            item.score,
            item.correct,
            item.total,
            if item.passed { "passed" } else { "failed" },
            if item.rewarded { "  +reward" } else { "" }
        );
    }

    let stats = history.stats(lesson_id).await?;
    if let Some(best) = stats.best_score {
        println!(
            "Attempts: {}  best: {}%  average errors: {:.0}%  passed: {}",
            stats.attempts,
            best,
            stats.average_error_rate * 100.0,
            if stats.passed { "yes" } else { "no" }
        );
    }
    println!("Reward balance: {}", history.reward_balance().await?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

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

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so core/services stay free of file handling.
    prepare_sqlite_file(&parsed.db_url)?;

    match cmd {
        Command::Seed => seed(&parsed).await,
        Command::Take => {
            let settings = parsed.settings()?;
            let app = AppServices::new_sqlite(&parsed.db_url, Clock::system(), settings).await?;
            terminal::run(
                &app.sessions(),
                parsed.lesson_id,
                parsed.gate_input(),
                parsed.locale,
            )
            .await
        }
        Command::History => {
            let app =
                AppServices::new_sqlite(&parsed.db_url, Clock::system(), parsed.settings()?)
                    .await?;
            history(&app, parsed.lesson_id).await
        }
    }
}

#[tokio::main]
async fn main() {
    logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
