use anyhow::Result;
use chrono::Local;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::{open_session, print_notices};
use crate::chat::{ChatSession, ChatState, Message, SendError, SendRejected};
use crate::core::AppConfig;
use crate::gemini::model_info;

const HELP: &str = r"Commands:
  /key [KEY]   enter or replace your Gemini API key
  /show-key    toggle showing the stored key unmasked
  /models      refresh and list available models
  /model NAME  switch to another model
  /settings    show or hide the settings panel
  /history     print the conversation so far
  /clear       delete the chat history
  /help        show this help
  /quit        exit
Anything else is sent as a message.";

#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Send(String),
    Key(Option<String>),
    ShowKey,
    Models,
    Model(Option<String>),
    Settings,
    History,
    Clear,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return ReplCommand::Send(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
        None => (command, None),
    };

    match name {
        "key" => ReplCommand::Key(arg),
        "show-key" => ReplCommand::ShowKey,
        "models" => ReplCommand::Models,
        "model" => ReplCommand::Model(arg),
        "settings" => ReplCommand::Settings,
        "history" => ReplCommand::History,
        "clear" => ReplCommand::Clear,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Unknown(other.to_string()),
    }
}

pub fn format_message(msg: &Message) -> String {
    let time = msg.timestamp().with_timezone(&Local).format("%H:%M");
    if msg.is_user() {
        format!("[{}] you: {}", time, msg.text())
    } else {
        let model = msg.model().unwrap_or("assistant");
        format!("[{}] {}: {}", time, model, msg.text())
    }
}

pub fn format_model_line(model: &str, selected: &str) -> String {
    let info = model_info(model);
    let marker = if model == selected { "*" } else { " " };
    format!(
        "{} {} \x1b[{}m[{}]\x1b[0m",
        marker,
        model,
        info.color.ansi_code(),
        info.badge
    )
}

pub fn format_model_list(session: &ChatSession) -> Vec<String> {
    let mut lines: Vec<String> = session
        .available_models()
        .iter()
        .map(|m| format_model_line(m, session.selected_model()))
        .collect();
    lines.push(format!("Selected: {}", session.selected_model()));
    if session.is_selected_model_available() {
        lines.push(String::from("✓ Model available"));
    } else {
        lines.push(String::from(
            "⚠ Model may not be available with your API key",
        ));
    }
    lines
}

fn print_settings(session: &ChatSession) {
    println!("Model Selection");
    for line in format_model_list(session) {
        println!("{}", line);
    }
    match session.displayed_api_key() {
        Some(key) => println!("API key: {}", key),
        None => println!("API key: not set"),
    }
}

fn print_transcript(session: &ChatSession) {
    if session.transcript().is_empty() {
        println!("Welcome to Gemini Swift Chat. Start a conversation with Google's Gemini AI.");
        return;
    }
    for msg in session.transcript().iter() {
        println!("{}", format_message(msg));
    }
}

/// Prompt for an API key. An empty entry closes the prompt without
/// changing anything.
async fn prompt_for_key(rl: &mut DefaultEditor, session: &mut ChatSession) -> Result<()> {
    session.open_credential_entry();
    println!("Enter your Gemini API key (get one at https://makersuite.google.com/app/apikey).");
    println!("It is stored locally and only sent to the Gemini API.");
    match rl.readline("API key: ") {
        Ok(line) => {
            if !session.submit_api_key(&line).await {
                session.dismiss_credential_entry();
            }
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            session.dismiss_credential_entry();
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let (mut session, mut rx) = open_session(config).await?;

    print_transcript(&session);
    if session.state() == ChatState::AwaitingCredential {
        prompt_for_key(&mut rl, &mut session).await?;
        print_notices(&mut rx);
    }

    loop {
        let readline = rl.readline(">>> ");
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            ReplCommand::Send(text) => {
                println!("...");
                match session.submit(&text).await {
                    Ok(reply) => println!("{}", format_message(&reply)),
                    Err(SendError::Rejected(SendRejected::MissingCredential)) => {
                        print_notices(&mut rx);
                        prompt_for_key(&mut rl, &mut session).await?;
                    }
                    Err(SendError::Rejected(rejected)) => println!("{}", rejected),
                    Err(SendError::Failed(e)) => tracing::debug!("Send failed: {}", e),
                }
            }
            ReplCommand::Key(Some(key)) => {
                session.open_credential_entry();
                if !session.submit_api_key(&key).await {
                    session.dismiss_credential_entry();
                }
            }
            ReplCommand::Key(None) => prompt_for_key(&mut rl, &mut session).await?,
            ReplCommand::ShowKey => {
                session.toggle_api_key_visibility();
                match session.displayed_api_key() {
                    Some(key) => println!("API key: {}", key),
                    None => println!("API key: not set"),
                }
            }
            ReplCommand::Models => {
                session.refresh_models().await;
                for line in format_model_list(&session) {
                    println!("{}", line);
                }
            }
            ReplCommand::Model(Some(name)) => {
                if session.select_model(&name) {
                    println!("Switched to {}", name);
                } else {
                    println!(
                        "Switched to {} (⚠ may not be available with your API key)",
                        name
                    );
                }
            }
            ReplCommand::Model(None) => println!("Usage: /model NAME"),
            ReplCommand::Settings => {
                if session.toggle_settings() {
                    session.refresh_models().await;
                    print_settings(&session);
                } else {
                    println!("Settings hidden");
                }
            }
            ReplCommand::History => print_transcript(&session),
            ReplCommand::Clear => session.clear_history().await,
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(name) => println!("Unknown command /{}. Try /help", name),
        }

        print_notices(&mut rx);
    }

    Ok(())
}
