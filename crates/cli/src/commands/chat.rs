//! Chat command handler.
//!
//! Interactive multi-turn loop over one conversation.

use super::ask::unavailable_response;
use super::print_response;
use crate::services::Services;
use clap::Args;
use ragline_core::{config::AppConfig, AppError, AppResult};
use ragline_knowledge::RagEngine;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive multi-turn conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Conversation to continue (default: a new random id)
    #[arg(long)]
    pub conversation_id: Option<String>,
}

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Exit,
    Clear,
    History,
    Empty,
    Unknown(&'a str),
    Question(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "/exit" | "/quit" => Input::Exit,
        "/clear" => Input::Clear,
        "/history" => Input::History,
        command if command.starts_with('/') => Input::Unknown(command),
        question => Input::Question(question),
    }
}

/// Eight hex characters from a random v4 uuid.
pub(crate) fn new_conversation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let services = Services::build(config)?;
        let engine = services.engine(config)?;
        let conversation_id = self
            .conversation_id
            .clone()
            .unwrap_or_else(new_conversation_id);

        println!("Conversation {} (/history, /clear, /exit)", conversation_id);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_input(&line) {
                Input::Exit => break,
                Input::Empty => continue,
                Input::Clear => {
                    engine.conversations().clear_conversation(&conversation_id);
                    println!("Conversation cleared.");
                }
                Input::History => {
                    let summary = engine.conversations().summary(&conversation_id);
                    println!(
                        "{} messages ({} from you, {} answers), about {} tokens",
                        summary.message_count,
                        summary.user_messages,
                        summary.assistant_messages,
                        summary.estimated_tokens
                    );
                }
                Input::Unknown(command) => println!("Unknown command: {}", command),
                Input::Question(question) => {
                    self.answer(&engine, &conversation_id, question).await;
                }
            }
        }

        tracing::info!("Chat ended");
        Ok(())
    }

    /// Answer one turn; errors are reported and the loop goes on.
    async fn answer(&self, engine: &RagEngine, conversation_id: &str, question: &str) {
        let options = engine.default_options().with_conversation(conversation_id);

        match engine.query(question, &options).await {
            Ok(response) => print_response(&response),
            Err(e) if e.is_ai_unavailable() => {
                tracing::warn!("Answer unavailable: {}", e);
                print_response(&unavailable_response(None));
            }
            Err(AppError::InvalidRequest(reason)) => println!("{}", reason),
            Err(e) => {
                tracing::error!(kind = e.kind(), "Query failed: {}", e);
                println!("Error: {}", e);
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  /exit "), Input::Exit);
        assert_eq!(parse_input("/quit"), Input::Exit);
        assert_eq!(parse_input("/clear"), Input::Clear);
        assert_eq!(parse_input("/history"), Input::History);
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input("/help"), Input::Unknown("/help"));
        assert_eq!(
            parse_input(" How do I connect to eduroam? "),
            Input::Question("How do I connect to eduroam?")
        );
    }

    #[test]
    fn test_new_conversation_id() {
        let id = new_conversation_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_conversation_id());
    }
}
