//! Interactive shell. One controller lives for the whole session, so
//! generated recipes (which are never saved) stay available for reviews and
//! shopping-list generation.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;

use sous_core::controller::{Controller, Operation, StatusBoard};
use sous_core::generation::GenerationClient;
use sous_core::models::View;

use super::helpers::{NotFound, tokenize};
use super::{Action, dispatch};
use super::{pantry, plan, recipes, shopping};

#[derive(Parser)]
#[command(no_binary_name = true, name = "sous>", disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand)]
enum SessionCommand {
    #[command(flatten)]
    Action(Action),
    /// Show the current view, or switch to another: pantry, recipes, mealplan, shopping
    View {
        /// View to switch to
        view: Option<String>,
    },
    /// Show pending operations and reported errors
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear a reported error (all of them by default)
    Dismiss {
        /// recipes, meal_plan or shopping_list
        operation: Option<String>,
    },
    /// Leave the session
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub(crate) async fn cmd_session(ctrl: &mut Controller, client: &dyn GenerationClient) -> Result<()> {
    eprintln!("sous session. Type `help` for commands, `quit` to leave.");
    let stdin = io::stdin();
    loop {
        eprint!("sous> ");
        io::stderr().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            eprintln!();
            break;
        }
        match run_line(ctrl, client, &line).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) if e.downcast_ref::<NotFound>().is_some() => {}
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }
    Ok(())
}

async fn run_line(
    ctrl: &mut Controller,
    client: &dyn GenerationClient,
    line: &str,
) -> Result<Flow> {
    let words = tokenize(line)?;
    if words.is_empty() {
        return Ok(Flow::Continue);
    }
    let parsed = match SessionLine::try_parse_from(words) {
        Ok(parsed) => parsed,
        Err(e) => {
            e.print()?;
            return Ok(Flow::Continue);
        }
    };

    match parsed.command {
        SessionCommand::Action(action) => dispatch(ctrl, client, action).await?,
        SessionCommand::View { view } => {
            if let Some(view) = view {
                ctrl.select_view(view.parse()?);
            }
            show_view(ctrl)?;
        }
        SessionCommand::Status { json } => print_status(ctrl.status(), json)?,
        SessionCommand::Dismiss { operation } => match operation {
            Some(op) => ctrl.dismiss_error(op.parse::<Operation>()?),
            None => ctrl.dismiss_errors(),
        },
        SessionCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn show_view(ctrl: &Controller) -> Result<()> {
    println!("== {} ==", ctrl.view().as_str());
    match ctrl.view() {
        View::Pantry => pantry::cmd_pantry_list(ctrl, false),
        View::Recipes => recipes::cmd_recipes_list(ctrl, false),
        View::MealPlan => plan::cmd_plan_show(ctrl, false),
        View::Shopping => shopping::cmd_shopping_list(ctrl, false),
    }
}

fn print_status(status: &StatusBoard, json: bool) -> Result<()> {
    if json {
        #[derive(Serialize)]
        struct StatusJson<'a> {
            operation: &'static str,
            pending: bool,
            error: Option<&'a str>,
        }
        let rows: Vec<StatusJson> = Operation::ALL
            .iter()
            .map(|op| {
                let s = status.get(*op);
                StatusJson {
                    operation: op.as_str(),
                    pending: s.pending,
                    error: s.error.as_deref(),
                }
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for op in Operation::ALL {
        let s = status.get(op);
        let state = match (&s.error, s.pending) {
            (_, true) => "working...".to_string(),
            (Some(message), false) => format!("error: {message}"),
            (None, false) => "ok".to_string(),
        };
        println!("  {:<14} {state}", op.as_str());
    }
    Ok(())
}
