//! Interactive chat command.
//!
//! Each turn goes through [`RagSystem::query_with_timeout`] with the chat's
//! session id, so the model sees the last few exchanges as history.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let system = RagSystem::from_settings(&settings)?;
    let mut session_id = system.create_session();

    println!("\n{}", style("Pensum Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your courses, or 'exit' to quit. Use 'clear' to start a new session.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            let (id, _) = system.new_session(Some(&session_id));
            session_id = id;
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = system.query_with_timeout(input, Some(&session_id)).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                print!("{}", style("Pensum:").cyan().bold());
                Output::answer(&response.answer, &response.sources);
            }
            Err(e) => Output::error(&format!("Error: {}", e)),
        }
    }

    Ok(())
}
