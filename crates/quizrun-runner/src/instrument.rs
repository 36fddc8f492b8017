//! Instrumentation harness for Python snippets.
//!
//! The snippet is embedded as a string literal, compiled under the filename
//! [`SNIPPET_FILENAME`] and executed with a `sys.settrace` hook that
//! snapshots variables before and after every top-level statement. Events
//! are written as JSON lines to the file named by [`TRACE_PATH_ENV`].

use serde_json::Value;

use quizrun_core::error::ExecutionError;
use quizrun_core::trace::TraceEvent;

/// Environment variable carrying the trace output path.
pub const TRACE_PATH_ENV: &str = "QUIZRUN_TRACE_PATH";

/// Filename the snippet is compiled under.
pub const SNIPPET_FILENAME: &str = "<snippet>";

/// Longest `repr` kept per snapshot.
pub const REPR_LIMIT: usize = 80;

const HARNESS: &str = r#"import inspect
import json
import math
import os
import sys
import traceback

SOURCE = __QUIZRUN_SOURCE__
TRACKED = __QUIZRUN_TRACKED__
FILENAME = __QUIZRUN_FILENAME__
REPR_LIMIT = __QUIZRUN_REPR_LIMIT__

events = []
state = {"step": 0, "line": None}


def measure(value):
    if isinstance(value, bool):
        return 1.0 if value else 0.0
    if isinstance(value, (int, float)):
        try:
            number = float(value)
        except OverflowError:
            return None
        return number if math.isfinite(number) else None
    try:
        return float(len(value))
    except Exception:
        return None


def visible(name, value):
    if name.startswith("__"):
        return False
    return not (
        inspect.ismodule(value)
        or inspect.isfunction(value)
        or inspect.isclass(value)
        or inspect.isbuiltin(value)
    )


def snapshot(namespace):
    if TRACKED:
        names = [name for name in TRACKED if name in namespace]
    else:
        names = sorted(name for name, value in namespace.items() if visible(name, value))
    variables = {}
    for name in names:
        value = namespace[name]
        try:
            text = repr(value)
        except Exception:
            text = "<unrepresentable>"
        if len(text) > REPR_LIMIT:
            text = text[: REPR_LIMIT - 3] + "..."
        variables[name] = {"repr": text, "measure": measure(value)}
    return variables


def record(kind, line, namespace):
    events.append(
        {"step": state["step"], "kind": kind, "line": line, "variables": snapshot(namespace)}
    )


def close_statement(namespace):
    if state["line"] is not None:
        record("post_exec", state["line"], namespace)
        state["step"] += 1
        state["line"] = None


def local_tracer(frame, event, arg):
    if event == "line":
        close_statement(frame.f_globals)
        record("pre_exec", frame.f_lineno, frame.f_globals)
        state["line"] = frame.f_lineno
    elif event == "return":
        close_statement(frame.f_globals)
    return local_tracer


def tracer(frame, event, arg):
    code = frame.f_code
    if code.co_filename != FILENAME or code.co_name != "<module>":
        return None
    return local_tracer


def write_trace():
    path = os.environ.get(__QUIZRUN_TRACE_ENV__)
    if not path:
        return
    with open(path, "w", encoding="utf-8") as handle:
        for event in events:
            handle.write(json.dumps(event) + "\n")


def main():
    namespace = {"__name__": "__main__", "__builtins__": __builtins__}
    status = 0
    try:
        code = compile(SOURCE, FILENAME, "exec")
        sys.settrace(tracer)
        try:
            exec(code, namespace)
        finally:
            sys.settrace(None)
    except Exception:
        traceback.print_exc()
        status = 1
    finally:
        write_trace()
    sys.stdout.flush()
    sys.exit(status)


main()
"#;

/// Wrap `snippet` in the instrumentation harness.
///
/// `tracked` names the variables to snapshot; when empty every top-level
/// name that is not a module, function, class or dunder is captured.
pub fn wrap(snippet: &str, tracked: &[String]) -> String {
    HARNESS
        .replace("__QUIZRUN_SOURCE__", &python_str(snippet))
        .replace(
            "__QUIZRUN_TRACKED__",
            &Value::from(tracked.to_vec()).to_string(),
        )
        .replace("__QUIZRUN_FILENAME__", &python_str(SNIPPET_FILENAME))
        .replace("__QUIZRUN_REPR_LIMIT__", &REPR_LIMIT.to_string())
        .replace("__QUIZRUN_TRACE_ENV__", &python_str(TRACE_PATH_ENV))
}

/// A JSON string literal is also a valid Python string literal.
fn python_str(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

/// Parse the JSON-lines trace written by the harness.
pub fn parse_trace(contents: &str) -> Result<Vec<TraceEvent>, ExecutionError> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                ExecutionError::Interpreter(format!("malformed trace event {}: {e}", n + 1))
            })
        })
        .collect()
}

/// The message a failed run should surface: the last non-empty stderr line,
/// which for a Python traceback is `ExceptionType: message`.
pub fn script_error_message(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("interpreter exited with an error")
        .to_string()
}
