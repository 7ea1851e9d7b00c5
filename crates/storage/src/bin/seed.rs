use std::collections::BTreeMap;
use std::fmt;

use donish_core::model::{
    ChoiceOption, ItemId, LessonId, LocalizedText, MatchItem, OptionId, Question, QuestionId,
    QuestionKind,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    lesson_id: LessonId,
    questions: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLessonId { raw: String },
    InvalidQuestions { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLessonId { raw } => write!(f, "invalid --lesson value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("DONISH_DB_URL").unwrap_or_else(|_| "sqlite:donish.sqlite3".into());
        let mut lesson_id = std::env::var("DONISH_LESSON_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| LessonId::new(1), LessonId::new);
        let mut questions = 12;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--lesson" => {
                    let value = require_value(&mut args, "--lesson")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLessonId { raw: value.clone() })?;
                    lesson_id = LessonId::new(parsed);
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
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
            questions,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:donish.sqlite3)");
    eprintln!("  --lesson <id>             Lesson for generated questions (default: 1)");
    eprintln!("  --questions <n>           Number of sample questions to generate (default: 12)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  DONISH_DB_URL, DONISH_LESSON_ID");
}

fn text(ru: &str, tg: &str) -> Result<LocalizedText, Box<dyn std::error::Error>> {
    Ok(LocalizedText::new(ru, Some(tg.to_string()))?)
}

/// Arithmetic drill cycling through the three question types.
fn sample_question(
    lesson_id: LessonId,
    n: u32,
) -> Result<Question, Box<dyn std::error::Error>> {
    let a = n + 2;
    let b = n * 3 + 1;
    let id = QuestionId::new(u64::from(n) + 1);

    let (prompt, kind) = match n % 3 {
        0 => {
            let sum = a + b;
            let options = [sum, sum + 1, sum.saturating_sub(1), sum + 10]
                .iter()
                .zip(1_u64..)
                .map(|(value, option_id)| {
                    Ok(ChoiceOption {
                        id: OptionId::new(option_id),
                        text: LocalizedText::ru_only(value.to_string())?,
                        image: None,
                    })
                })
                .collect::<Result<Vec<_>, donish_core::model::TextError>>()?;
            (
                text(
                    &format!("Сколько будет {a} + {b}?"),
                    &format!("{a} + {b} чанд мешавад?"),
                )?,
                QuestionKind::SingleChoice {
                    options,
                    correct: OptionId::new(1),
                },
            )
        }
        1 => {
            let product = a * b;
            let digits = product
                .to_string()
                .bytes()
                .map(|byte| byte - b'0')
                .collect();
            (
                text(
                    &format!("Вычислите {a} × {b}"),
                    &format!("{a} × {b}-ро ҳисоб кунед"),
                )?,
                QuestionKind::Numeric { digits, unit: None },
            )
        }
        _ => {
            let left = vec![
                MatchItem {
                    id: ItemId::new(1),
                    text: LocalizedText::ru_only(format!("{a} + {a}"))?,
                },
                MatchItem {
                    id: ItemId::new(2),
                    text: LocalizedText::ru_only(format!("{b} + {b}"))?,
                },
            ];
            let right = vec![
                MatchItem {
                    id: ItemId::new(10),
                    text: LocalizedText::ru_only((2 * a).to_string())?,
                },
                MatchItem {
                    id: ItemId::new(11),
                    text: LocalizedText::ru_only((2 * b).to_string())?,
                },
            ];
            (
                text("Сопоставьте выражения", "Ифодаҳоро мувофиқ кунед")?,
                QuestionKind::Matching {
                    left,
                    right,
                    pairs: BTreeMap::from([
                        (ItemId::new(1), ItemId::new(10)),
                        (ItemId::new(2), ItemId::new(11)),
                    ]),
                },
            )
        }
    };

    let question = Question {
        id,
        lesson_id,
        prompt,
        image: None,
        kind,
    };
    question.validate()?;
    Ok(question)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let questions = (0..args.questions)
        .map(|n| sample_question(args.lesson_id, n))
        .collect::<Result<Vec<_>, _>>()?;

    for question in &questions {
        storage.questions.upsert_question(question).await?;
    }

    println!("Seeded {} questions into {}", questions.len(), args.db_url);

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
