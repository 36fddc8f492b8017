//! The `quizrun take` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizrun_core::bank::QuestionFilter;
use quizrun_core::error::{ExecutionError, QuizError};
use quizrun_core::model::{Difficulty, Question};
use quizrun_core::session::{ProgressionMode, QuizSession, Selection, Submission};
use quizrun_runner::CodeExecutionAdapter;
use quizrun_sources::config::load_config_from;
use quizrun_sources::load_locations;

use super::{build_adapter, open_store};

pub struct TakeOptions {
    pub banks: Vec<String>,
    pub mode: Option<ProgressionMode>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub wrong_only: bool,
    pub config: Option<PathBuf>,
}

pub async fn execute(options: TakeOptions) -> Result<()> {
    let config = load_config_from(options.config.as_deref())?;

    let locations = if options.banks.is_empty() {
        config.banks.clone()
    } else {
        options.banks
    };
    anyhow::ensure!(
        !locations.is_empty(),
        "no question banks given; pass --bank or add `banks` to quizrun.toml"
    );

    let loaded = load_locations(&locations).await?;
    tracing::debug!(
        locations = locations.len(),
        questions = loaded.bank.len(),
        rejected = loaded.rejected.len(),
        "loaded question banks"
    );
    if !loaded.rejected.is_empty() {
        eprintln!(
            "Skipped {} invalid record(s); run `quizrun validate` for details.",
            loaded.rejected.len()
        );
    }

    let mode = options.mode.unwrap_or(config.default_mode);
    let mut session = QuizSession::new(loaded.bank, mode, open_store(&config))?;

    if options.wrong_only {
        match session.show_wrong_only() {
            Ok(()) => {}
            Err(QuizError::EmptyResult(_)) => {
                println!("No missed questions to review, well done!");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    } else if options.category.is_some() || options.difficulty.is_some() {
        session.apply_filter(QuestionFilter {
            category: options.category,
            difficulty: options.difficulty,
        })?;
    }

    let mut adapter = build_adapter(&config);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let submission = run_quiz(
        &mut session,
        &mut adapter,
        &mut stdin.lock(),
        &mut stdout.lock(),
    )
    .await?;

    match submission {
        Some(submission) => print_results(&session, &submission),
        None => println!("\nQuiz abandoned."),
    }
    Ok(())
}

/// Drive `session` from line-oriented input until it is submitted, or
/// return `None` if the user quits.
pub async fn run_quiz<R: BufRead, W: Write>(
    session: &mut QuizSession,
    adapter: &mut CodeExecutionAdapter,
    input: &mut R,
    out: &mut W,
) -> Result<Option<Submission>> {
    let total = session.bank().len();
    writeln!(
        out,
        "{total} question(s), {} mode. Answer with a number or letter; `quit` to stop.",
        session.mode()
    )?;

    for index in 0..total {
        let Some(question) = session.bank().get(index).cloned() else {
            break;
        };
        show_question(out, &question, index, total)?;

        let Some(choice) = read_choice(&question, adapter, input, out).await? else {
            return Ok(None);
        };

        match session.select_option(index, choice)? {
            Selection::Recorded => {}
            Selection::Evaluated(feedback) => {
                if feedback.is_correct {
                    writeln!(out, "Correct!")?;
                } else {
                    writeln!(
                        out,
                        "Incorrect. The answer is: {}",
                        question.correct_option()
                    )?;
                }
                writeln!(out, "  {}", feedback.explanation)?;
                if let Some(submission) = feedback.submission {
                    return Ok(Some(submission));
                }
            }
        }
    }

    Ok(Some(session.submit()?))
}

fn show_question<W: Write>(out: &mut W, question: &Question, index: usize, total: usize) -> Result<()> {
    writeln!(
        out,
        "\nQuestion {}/{} [{}, {}]",
        index + 1,
        total,
        question.category,
        question.difficulty
    )?;
    writeln!(out, "{}", question.text)?;
    for (i, option) in question.options.iter().enumerate() {
        writeln!(out, "  {}) {option}", i + 1)?;
    }
    if question.needs_code_runner && extract_snippet(&question.text).is_some() {
        writeln!(out, "  (type `run` to execute the snippet)")?;
    }
    Ok(())
}

/// Read lines until one is a valid option. `None` means quit or end of input.
async fn read_choice<R: BufRead, W: Write>(
    question: &Question,
    adapter: &mut CodeExecutionAdapter,
    input: &mut R,
    out: &mut W,
) -> Result<Option<usize>> {
    let count = question.options.len();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read answer")? == 0 {
            return Ok(None);
        }
        let line = line.trim();

        match line.to_lowercase().as_str() {
            "" => continue,
            "q" | "quit" | "exit" => return Ok(None),
            "run" => {
                run_snippet(question, adapter, out).await?;
                continue;
            }
            _ => {}
        }

        match parse_choice(line, count) {
            Some(choice) => return Ok(Some(choice)),
            None => writeln!(out, "Please answer 1-{count} or a-{}.", option_letter(count - 1))?,
        }
    }
}

async fn run_snippet<W: Write>(
    question: &Question,
    adapter: &mut CodeExecutionAdapter,
    out: &mut W,
) -> Result<()> {
    let Some(snippet) = extract_snippet(&question.text).filter(|_| question.needs_code_runner) else {
        writeln!(out, "This question has no runnable snippet.")?;
        return Ok(());
    };

    match adapter.run_default(&snippet).await {
        Ok(result) => {
            write!(out, "{}", result.stdout)?;
            if !result.stdout.ends_with('\n') && !result.stdout.is_empty() {
                writeln!(out)?;
            }
            writeln!(
                out,
                "[ran in {}ms, {} trace event(s)]",
                result.duration_ms,
                result.trace.len()
            )?;
        }
        Err(ExecutionError::EnvironmentUnavailable { .. }) => {
            writeln!(out, "Code execution is unavailable; answer without it.")?;
        }
        Err(e) => {
            tracing::debug!(question = %question.id, "snippet failed: {e}");
            writeln!(out, "{e}")?;
        }
    }
    Ok(())
}

/// Parse a 1-based number or a letter into an option index.
pub fn parse_choice(input: &str, option_count: usize) -> Option<usize> {
    let input = input.trim();
    let index = match input.parse::<usize>() {
        Ok(n) => n.checked_sub(1)?,
        Err(_) => {
            let mut chars = input.chars();
            let c = chars.next()?.to_ascii_lowercase();
            if chars.next().is_some() || !c.is_ascii_lowercase() {
                return None;
            }
            (c as u8 - b'a') as usize
        }
    };
    (index < option_count).then_some(index)
}

fn option_letter(index: usize) -> char {
    (b'a' + (index.min(25) as u8)) as char
}

/// First fenced code block in `text`, without the fence lines.
pub fn extract_snippet(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    let snippet = body[..end].trim_end();
    (!snippet.trim().is_empty()).then(|| format!("{snippet}\n"))
}

fn print_results(session: &QuizSession, submission: &Submission) {
    let Some(outcomes) = session.results() else {
        return;
    };

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Result"]);
    for outcome in &outcomes {
        let Some(question) = session.bank().get(outcome.index) else {
            continue;
        };
        let selected = outcome
            .selected
            .and_then(|i| question.options.get(i))
            .map(String::as_str)
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(outcome.index + 1),
            Cell::new(first_line(&question.text, 48)),
            Cell::new(selected),
            Cell::new(&outcome.correct_option),
            Cell::new(if outcome.is_correct { "correct" } else { "wrong" }),
        ]);
    }
    println!("\n{table}");

    println!(
        "Score: {} ({:.1}%)",
        submission.score,
        submission.score.ratio() * 100.0
    );
    println!("Time: {:.1}s", submission.elapsed_ms as f64 / 1000.0);

    if let Some(err) = &submission.persist_error {
        eprintln!("Warning: could not save wrong answers: {err}");
    } else if !submission.wrong.is_empty() {
        println!(
            "Saved {} missed question(s); review them with `quizrun take --wrong-only`.",
            submission.wrong.len()
        );
    }
}

fn first_line(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use quizrun_core::bank::QuestionBank;
    use quizrun_core::store::WrongAnswerStore;
    use quizrun_runner::mock::{MockLoader, ScriptedInterpreter};
    use serde_json::json;

    fn bank() -> QuestionBank {
        QuestionBank::normalize(&[
            json!({"id": 1, "question": "Pick a", "options": ["a", "b"], "correct": 0}),
            json!({"id": 2, "question": "Pick y", "options": ["x", "y"], "correct": 1,
                   "explanation": "y is second"}),
        ])
        .bank
    }

    fn adapter(loader: MockLoader) -> CodeExecutionAdapter {
        CodeExecutionAdapter::new(Arc::new(loader))
    }

    async fn drive(mode: ProgressionMode, input: &str) -> (QuizSession, Option<Submission>, String) {
        let mut session = QuizSession::new(bank(), mode, WrongAnswerStore::in_memory()).unwrap();
        let mut adapter = adapter(MockLoader::new(ScriptedInterpreter::new()));
        let mut out = Vec::new();
        let submission = run_quiz(
            &mut session,
            &mut adapter,
            &mut Cursor::new(input.as_bytes().to_vec()),
            &mut out,
        )
        .await
        .unwrap();
        (session, submission, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parse_choice_accepts_numbers_and_letters() {
        assert_eq!(parse_choice("1", 3), Some(0));
        assert_eq!(parse_choice(" 3 ", 3), Some(2));
        assert_eq!(parse_choice("b", 3), Some(1));
        assert_eq!(parse_choice("C", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("d", 3), None);
        assert_eq!(parse_choice("ab", 3), None);
        assert_eq!(parse_choice("?", 3), None);
    }

    #[test]
    fn extract_snippet_from_fence() {
        let text = "What does this print?\n```python\nxs = [1, 2]\nprint(len(xs))\n```\n";
        assert_eq!(
            extract_snippet(text).as_deref(),
            Some("xs = [1, 2]\nprint(len(xs))\n")
        );
        assert_eq!(extract_snippet("no code here"), None);
        assert_eq!(extract_snippet("```\n```"), None);
    }

    #[tokio::test]
    async fn batch_quiz_scores_and_records_wrong_answers() {
        let (session, submission, out) = drive(ProgressionMode::Batch, "1\na\n").await;
        let submission = submission.unwrap();
        assert_eq!(submission.score.to_string(), "1/2");
        assert!(out.contains("Question 2/2"));

        let stored = session.wrong_answers().load().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id.as_str(), "2");
    }

    #[tokio::test]
    async fn invalid_input_reprompts() {
        let (_, submission, out) = drive(ProgressionMode::Batch, "\n7\nzz\n1\n2\n").await;
        assert_eq!(submission.unwrap().score.correct, 2);
        assert_eq!(out.matches("Please answer 1-2 or a-b.").count(), 2);
    }

    #[tokio::test]
    async fn sequential_quiz_gives_feedback() {
        let (_, submission, out) = drive(ProgressionMode::Sequential, "2\n2\n").await;
        assert_eq!(submission.unwrap().score.correct, 1);
        assert!(out.contains("Incorrect. The answer is: a"));
        assert!(out.contains("Correct!"));
        assert!(out.contains("y is second"));
    }

    #[tokio::test]
    async fn quitting_abandons_without_submission() {
        let (session, submission, _) = drive(ProgressionMode::Batch, "1\nquit\n").await;
        assert!(submission.is_none());
        assert!(!session.is_submitted());
        assert!(session.wrong_answers().load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn end_of_input_abandons() {
        let (_, submission, _) = drive(ProgressionMode::Sequential, "1\n").await;
        assert!(submission.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_runner_does_not_block_the_quiz() {
        let code_bank = QuestionBank::normalize(&[json!({
            "id": "c1",
            "question": "What prints?\n```python\nprint(2 * 3)\n```",
            "options": ["5", "6"],
            "correct": 1,
            "needCodeRunner": true
        })])
        .bank;
        let mut session =
            QuizSession::new(code_bank, ProgressionMode::Batch, WrongAnswerStore::in_memory())
                .unwrap();
        let mut adapter = adapter(MockLoader::always_failing());
        let mut out = Vec::new();

        let submission = run_quiz(
            &mut session,
            &mut adapter,
            &mut Cursor::new(b"run\n2\n".to_vec()),
            &mut out,
        )
        .await
        .unwrap()
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Code execution is unavailable"));
        assert_eq!(submission.score.correct, 1);
    }

    #[tokio::test]
    async fn run_prints_snippet_output() {
        let code_bank = QuestionBank::normalize(&[json!({
            "id": "c1",
            "question": "What prints?\n```python\nprint(2 * 3)\n```",
            "options": ["5", "6"],
            "correct": 1,
            "needCodeRunner": true
        })])
        .bank;
        let mut session =
            QuizSession::new(code_bank, ProgressionMode::Sequential, WrongAnswerStore::in_memory())
                .unwrap();
        let mut adapter = adapter(MockLoader::new(ScriptedInterpreter::new().with_stdout("6\n")));
        let mut out = Vec::new();

        run_quiz(
            &mut session,
            &mut adapter,
            &mut Cursor::new(b"run\nb\n".to_vec()),
            &mut out,
        )
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("(type `run` to execute the snippet)"));
        assert!(out.contains("6\n[ran in"));
    }
}
