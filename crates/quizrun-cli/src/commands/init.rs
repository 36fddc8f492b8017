//! The `quizrun init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("quizrun.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("questions").context("failed to create questions/")?;
    write_if_missing(Path::new("questions/example.json"), EXAMPLE_BANK)?;

    println!("\nNext steps:");
    println!("  1. Add your own questions under questions/");
    println!("  2. Run: quizrun validate --bank questions");
    println!("  3. Run: quizrun take");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
        return Ok(());
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizrun configuration

# Files, directories, or http(s) URLs serving a JSON array of questions.
banks = ["questions"]

# "batch" shows every question before one submit; "sequential" gives
# feedback after each answer.
default_mode = "batch"

# Missed questions are kept here between sessions.
data_dir = ".quizrun"

[runner]
python = "python3"
timeout_ms = 5000
init_attempts = 3
init_backoff_ms = 500
"#;

const EXAMPLE_BANK: &str = r#"[
  {
    "id": 1,
    "question": "What does len([1, 2, 3]) return?",
    "options": ["2", "3", "4"],
    "correctAnswer": 1,
    "explanation": "len counts the elements of a sequence.",
    "category": "lists",
    "difficulty": "easy"
  },
  {
    "id": 2,
    "question": "Which keyword defines a function in Python?",
    "options": ["func", "def", "fn", "lambda"],
    "correctAnswer": 1,
    "explanation": "def starts a function definition; lambda creates an anonymous expression.",
    "category": "syntax",
    "difficulty": "easy"
  },
  {
    "id": 3,
    "question": "How long is xs after this runs?\n```python\nxs = []\nfor i in range(4):\n    xs.append(i * i)\nprint(len(xs))\n```",
    "options": ["3", "4", "16"],
    "correctAnswer": 1,
    "explanation": "The loop appends once per value of range(4).",
    "category": "lists",
    "difficulty": "medium",
    "needCodeRunner": true
  }
]
"#;
