use anyhow::{Result, bail};
use serde::Serialize;
use thiserror::Error;

use sous_core::controller::{Controller, Operation, Outcome};

/// A lookup by id matched nothing. `main` maps this to exit code 2.
#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct NotFound(pub String);

/// Print the not-found message the way the caller asked for, then return the
/// typed error so the exit code can be chosen upstream.
pub(crate) fn not_found(message: &str, json: bool) -> anyhow::Error {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    NotFound(message.to_string()).into()
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn parse_switch(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => bail!("Invalid value '{value}'. Use on or off"),
    }
}

/// Print the result of a generation operation. In JSON mode `data` is
/// attached when the operation completed. Returns the status message the
/// operation reported, if any.
pub(crate) fn report_outcome<T: Serialize + ?Sized>(
    ctrl: &Controller,
    op: Operation,
    outcome: Outcome,
    data: &T,
    json: bool,
) -> Result<Option<String>> {
    let error = ctrl.status().get(op).error.clone();
    if json {
        #[derive(Serialize)]
        struct OutcomeJson<'a, T: Serialize + ?Sized> {
            operation: &'static str,
            #[serde(flatten)]
            outcome: Outcome,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            data: Option<&'a T>,
        }
        let completed = matches!(outcome, Outcome::Completed { .. });
        println!(
            "{}",
            serde_json::to_string_pretty(&OutcomeJson {
                operation: op.as_str(),
                outcome,
                error: error.as_deref(),
                data: completed.then_some(data),
            })?
        );
    } else if let Some(ref message) = error {
        eprintln!("{message}");
    }
    Ok(error)
}

/// Split a line into words, honoring single and double quotes.
pub(crate) fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        bail!("Unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
