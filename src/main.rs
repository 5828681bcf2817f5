#![forbid(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

// Saludo Utilities
use crate::client::handler::{Handles, Outcome, RequestHandler};
use crate::client::ui::{ConsoleAlert, ConsoleOutput, LogDiagnostics, TextField};
use crate::utils::config::{init_log, init_runtime_context, init_saludo_dirs, SALUDO_ARGS};
use crate::utils::errors::Errors;

// Modules
mod client;
mod utils;

// ***************************************************************************
//                                Constants
// ***************************************************************************
const CLIENT_NAME : &str = "SaludoClient";

// ---------------------------------------------------------------------------
// main:
// ---------------------------------------------------------------------------
#[tokio::main]
async fn main() -> Result<ExitCode> {
    // --------------- Initialize Client --------------
    // Announce ourselves on stderr, stdout carries the greetings.
    eprintln!("Starting saludo_client!");

    let saludo_dirs = init_saludo_dirs(&SALUDO_ARGS)?;
    if SALUDO_ARGS.create_dirs_only {
        eprintln!("Data directories ready under {}.", saludo_dirs.root_dir);
        return Ok(ExitCode::SUCCESS);
    }

    // Configure our log, then read the configuration file.
    init_log(&saludo_dirs)?;
    let runtime_ctx = init_runtime_context(saludo_dirs)?;
    info!("{}", Errors::InputParms(format!("{:#?}", runtime_ctx)));
    info!("Log files, when configured, are written under {}.", runtime_ctx.saludo_dirs.logs_dir);
    print_version_info();

    // --------------- Handler Set Up -----------------
    let input = Arc::new(TextField::new());
    let handles = Handles {
        input: input.clone(),
        output: Arc::new(ConsoleOutput::new()),
        alert: Arc::new(ConsoleAlert),
        diagnostics: Arc::new(LogDiagnostics),
    };
    let handler = RequestHandler::new(&runtime_ctx.handler_settings(), handles)?;

    // ------------------ Main Loop -------------------
    match &SALUDO_ARGS.name {
        Some(name) => {
            let greeted = run_once(&handler, &input, name).await;
            Ok(if greeted { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        },
        None => run_interactive(&handler, &input).await,
    }
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// run_once:
// ---------------------------------------------------------------------------
/** Send one request for the name given on the command line.  True when a
 * greeting was displayed.
 */
async fn run_once(handler: &RequestHandler, input: &TextField, name: &str) -> bool {
    input.set(name);
    match handler.handle_send_request().await {
        Outcome::Displayed(_) => true,
        Outcome::Rejected | Outcome::Failed(_) => false,
    }
}

// ---------------------------------------------------------------------------
// run_interactive:
// ---------------------------------------------------------------------------
/** Every stdin line is typed into the input field and sent.  Requests are not
 * serialized: the next line is read while earlier requests are in flight and
 * whichever reply arrives last is the one left on the display.  At end of
 * input we wait for the outstanding requests before exiting.
 */
async fn run_interactive(handler: &RequestHandler, input: &TextField) -> Result<ExitCode> {
    info!("Reading names from stdin using the {} response format.", handler.response_format());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();
    while let Some(line) = lines.next_line().await? {
        input.set(&line);
        if let Some(task) = handler.spawn_send_request() {
            pending.push(task);
        }
    }

    let mut failed = 0;
    for task in pending {
        match task.await {
            Ok(Outcome::Displayed(_)) => (),
            Ok(_) => failed += 1,
            Err(e) => {
                error!("Greeting task did not complete: {}", e);
                failed += 1;
            },
        }
    }
    if failed > 0 {
        info!("{} greeting request(s) failed.", failed);
    }

    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// print_version_info:
// ---------------------------------------------------------------------------
fn print_version_info() {
    info!("*** Running {} VERSION={}", CLIENT_NAME,
          option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"));
}
