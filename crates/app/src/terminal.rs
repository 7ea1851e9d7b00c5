//! Line-oriented test runner for the terminal.

use std::fmt;
use std::io::Write;

use donish_core::grading::GradeReport;
use donish_core::model::{
    Answer, AnswerEdit, LessonId, Locale, Question, QuestionKind, RewardOutcome,
};
use services::{
    ActiveSession, AnswerOutcome, GateInput, GradedAttempt, SessionError, SubmitOutcome,
    TestSessionService,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// One learner command. Positions are 1-based as displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Choose(usize),
    Pair(usize, usize),
    Digit(usize, u8),
    Next,
    Back,
    Go(usize),
    Submit,
    Restart,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Empty,
    Unknown(String),
    BadArgument { command: &'static str, usage: &'static str },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Empty => write!(f, "type a command (h for help)"),
            InputError::Unknown(raw) => write!(f, "unknown command: {raw} (h for help)"),
            InputError::BadArgument { command, usage } => {
                write!(f, "bad arguments for {command}; usage: {usage}")
            }
        }
    }
}

fn position(raw: Option<&str>) -> Option<usize> {
    raw?.parse::<usize>().ok().filter(|n| *n > 0)
}

pub fn parse_input(line: &str) -> Result<Input, InputError> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Err(InputError::Empty);
    };
    let bad = |command, usage| InputError::BadArgument { command, usage };

    let input = match command {
        "a" => Input::Choose(position(parts.next()).ok_or(bad("a", "a <option#>"))?),
        "p" => {
            let left = position(parts.next());
            let right = position(parts.next());
            match (left, right) {
                (Some(l), Some(r)) => Input::Pair(l, r),
                _ => return Err(bad("p", "p <left#> <right#>")),
            }
        }
        "d" => {
            let pos = position(parts.next());
            let digit = parts
                .next()
                .and_then(|raw| raw.parse::<u8>().ok())
                .filter(|d| *d <= 9);
            match (pos, digit) {
                (Some(p), Some(d)) => Input::Digit(p, d),
                _ => return Err(bad("d", "d <position#> <digit>")),
            }
        }
        "n" => Input::Next,
        "b" => Input::Back,
        "g" => Input::Go(position(parts.next()).ok_or(bad("g", "g <question#>"))?),
        "s" => Input::Submit,
        "r" => Input::Restart,
        "q" => Input::Quit,
        "h" | "?" => Input::Help,
        other => return Err(InputError::Unknown(other.to_string())),
    };

    if parts.next().is_some() {
        return Err(InputError::Unknown(line.trim().to_string()));
    }
    Ok(input)
}

/// Translate a displayed-position command into an edit for `question`.
pub fn to_edit(question: &Question, input: Input) -> Option<AnswerEdit> {
    match (input, &question.kind) {
        (Input::Choose(n), QuestionKind::SingleChoice { options, .. }) => {
            options.get(n - 1).map(|o| AnswerEdit::Choose(o.id))
        }
        (Input::Pair(l, r), QuestionKind::Matching { left, right, .. }) => {
            let left = left.get(l - 1)?.id;
            let right = right.get(r - 1)?.id;
            Some(AnswerEdit::Pair { left, right })
        }
        (Input::Digit(pos, value), QuestionKind::Numeric { .. }) => Some(AnswerEdit::Digit {
            position: pos - 1,
            value,
        }),
        _ => None,
    }
}

fn print_help() {
    println!("  a <option#>          choose an option");
    println!("  p <left#> <right#>   pair a left item with a right item");
    println!("  d <position#> <0-9>  enter one digit");
    println!("  n / b                next (locks an answered question) / back");
    println!("  g <question#>        jump to a question");
    println!("  s                    submit");
    println!("  r                    restart with a new draw");
    println!("  q                    quit (progress is kept)");
}

pub fn render(active: &ActiveSession, locale: Locale) -> String {
    let mut out = String::new();
    let session = active.session();
    let progress = active.progress();
    let Some(question) = session.current_question() else {
        return out;
    };

    let locked = session.is_locked(question.id);
    out.push_str(&format!(
        "\nQuestion {}/{}  (answered {}, locked {}){}\n",
        progress.current + 1,
        progress.total,
        progress.answered,
        progress.locked,
        if locked { "  [locked]" } else { "" }
    ));
    if active.obscured() {
        out.push_str("  (hidden while the window is inactive)\n");
        return out;
    }
    out.push_str(question.prompt.get(locale));
    out.push('\n');

    let answer = session.answer_for(question.id);
    match &question.kind {
        QuestionKind::SingleChoice { options, .. } => {
            for (i, option) in options.iter().enumerate() {
                let chosen = matches!(answer, Some(Answer::Choice(id)) if *id == option.id);
                out.push_str(&format!(
                    "  {}{}) {}\n",
                    if chosen { "*" } else { " " },
                    i + 1,
                    option.text.get(locale)
                ));
            }
        }
        QuestionKind::Matching { left, right, .. } => {
            let pairs = match answer {
                Some(Answer::Pairs(pairs)) => Some(pairs),
                _ => None,
            };
            for (i, item) in left.iter().enumerate() {
                let paired = pairs
                    .and_then(|p| p.get(&item.id))
                    .and_then(|r| right.iter().position(|x| x.id == *r))
                    .map(|r| format!("  -> {}", r + 1))
                    .unwrap_or_default();
                out.push_str(&format!("  L{}) {}{}\n", i + 1, item.text.get(locale), paired));
            }
            for (i, item) in right.iter().enumerate() {
                out.push_str(&format!("  R{}) {}\n", i + 1, item.text.get(locale)));
            }
        }
        QuestionKind::Numeric { digits, unit } => {
            let entered = match answer {
                Some(Answer::Digits(entered)) => entered.clone(),
                _ => vec![None; digits.len()],
            };
            out.push_str("  ");
            for slot in &entered {
                match slot {
                    Some(d) => out.push_str(&format!("[{d}]")),
                    None => out.push_str("[_]"),
                }
            }
            if let Some(unit) = unit {
                out.push(' ');
                out.push_str(unit.get(locale));
            }
            out.push('\n');
        }
    }
    out
}

fn print_score(report: &GradeReport) {
    println!(
        "Score {}% ({}/{}) - {}",
        report.score,
        report.correct,
        report.total,
        if report.passed { "passed" } else { "not passed" }
    );
}

fn print_graded(graded: &GradedAttempt) {
    print_score(&graded.report);
    if graded.reward.as_ref().is_some_and(RewardOutcome::is_new) {
        println!("Reward credited.");
    }
    println!("Type r to try again or q to quit.");
}

/// A passing attempt is recorded but its reward is not credited yet.
fn reward_pending(active: &ActiveSession) -> bool {
    active
        .graded()
        .is_some_and(|graded| graded.report.passed && graded.reward.is_none())
}

async fn finish_reward(
    sessions: &TestSessionService,
    active: &mut ActiveSession,
) -> Result<(), SessionError> {
    match sessions.finalize_reward(active).await {
        Ok(_) => {
            if let Some(graded) = active.graded() {
                print_graded(graded);
            }
        }
        Err(err) => {
            if let Some(graded) = active.graded() {
                print_score(&graded.report);
            }
            println!("The reward could not be credited yet ({err}). Type s to try again.");
        }
    }
    Ok(())
}

/// Submit the session, or retry the reward of an already graded one.
///
/// A failed credit after grading is retried once before the learner is told
/// to try again.
async fn submit(
    sessions: &TestSessionService,
    active: &mut ActiveSession,
) -> Result<(), SessionError> {
    if reward_pending(active) {
        return finish_reward(sessions, active).await;
    }

    match sessions.submit(active).await {
        Ok(SubmitOutcome::Incomplete { unanswered }) => {
            println!("{unanswered} question(s) still need an answer.");
            Ok(())
        }
        Ok(SubmitOutcome::Graded(graded)) => {
            print_graded(&graded);
            Ok(())
        }
        Err(err) if reward_pending(active) => {
            warn!(error = %err, "reward credit failed after grading, retrying");
            finish_reward(sessions, active).await
        }
        Err(err) => Err(err),
    }
}

fn report_error(err: &SessionError) {
    match err {
        SessionError::Finished => println!("This attempt is graded. Type r to restart or q to quit."),
        other => println!("{other}"),
    }
}

/// Drive one lesson's test from stdin until the learner quits.
///
/// # Errors
///
/// Returns an error if the session cannot be opened or stdin fails.
pub async fn run(
    sessions: &TestSessionService,
    lesson_id: LessonId,
    access: GateInput,
    locale: Locale,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut active = match sessions.start(lesson_id, &access).await {
        Ok(active) => active,
        Err(SessionError::GateClosed { pending }) => {
            let pending: Vec<String> = pending.iter().map(ToString::to_string).collect();
            println!("Finish the lesson first: {}", pending.join(", "));
            return Ok(());
        }
        Err(SessionError::EmptyBank(_)) => {
            println!("This lesson has no test questions yet.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = true;
    loop {
        if redraw && !active.is_graded() {
            print!("{}", render(&active, locale));
        }
        redraw = true;
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(err) => {
                println!("{err}");
                redraw = false;
                continue;
            }
        };

        let result = match input {
            Input::Choose(_) | Input::Pair(..) | Input::Digit(..) => {
                let Some(question) = active.current_question().cloned() else {
                    continue;
                };
                match to_edit(&question, input) {
                    Some(edit) => sessions
                        .answer(&mut active, question.id, edit)
                        .await
                        .map(|outcome| {
                            if outcome == AnswerOutcome::Ignored {
                                println!("This answer is locked.");
                            }
                        }),
                    None => {
                        println!("That command does not fit this question.");
                        Ok(())
                    }
                }
            }
            Input::Next => sessions.next(&mut active).await.map(|_| ()),
            Input::Back => sessions.previous(&mut active).await,
            Input::Go(n) => sessions.jump_to(&mut active, n - 1).await,
            Input::Submit => submit(sessions, &mut active).await,
            Input::Restart => match sessions.restart(lesson_id, &access).await {
                Ok(fresh) => {
                    active = fresh;
                    Ok(())
                }
                Err(err) => Err(err),
            },
            Input::Quit => break,
            Input::Help => {
                print_help();
                redraw = false;
                Ok(())
            }
        };

        if let Err(err) = result {
            report_error(&err);
        }
    }

    Ok(())
}
