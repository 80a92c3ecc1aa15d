#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use termimad::MadSkin;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::Role;
use crate::domain::services::Controller;
use crate::domain::services::SessionStore;

fn render_message(skin: &MadSkin, message: &Message) {
    match message.role {
        Role::User => {
            println!("{} {}", style("You:").bold().cyan(), message.content);
        }
        Role::Assistant => {
            println!("{}", style("Quickchat:").bold().green());
            skin.print_text(&message.content);
        }
    }
}

/// Drains controller events and writes them to the terminal. Assistant
/// replies render as markdown, user input already sits on screen from the
/// prompt line so it is not echoed back.
async fn print_events(
    store: Arc<Mutex<SessionStore>>,
    mut rx: mpsc::UnboundedReceiver<Event>,
) {
    let skin = MadSkin::default();

    while let Some(event) = rx.recv().await {
        match event {
            Event::MessageAppended { chat_id, message } => {
                if store.lock().await.active_id() != Some(chat_id.as_str()) {
                    tracing::debug!(chat_id = chat_id, "Response landed in a background chat");
                    continue;
                }
                if message.role == Role::Assistant {
                    render_message(&skin, &message);
                }
            }
            Event::Notice(text) => {
                println!("{}", style(text).yellow());
            }
            Event::Waiting(true) => {
                println!("{}", style("Generating...").dim());
            }
            Event::Waiting(false) => {}
            Event::TitleChanged { title, .. } => {
                println!("{}", style(format!("(chat renamed to \"{title}\")")).dim());
            }
        }
    }
}

async fn list_chats(store: &Arc<Mutex<SessionStore>>) {
    let entries = store.lock().await.list_chats();
    for (idx, entry) in entries.iter().enumerate() {
        let n = idx + 1;
        let mut line = format!("- ({n}) {}", entry.title);
        if entry.is_active {
            line = format!("{line} (active)");
        }
        println!("{line}");
    }
}

/// `/switch` needs a word boundary, glued inputs like `/switchfoo` are not
/// commands here and fall through to the interpreter.
fn switch_argument(input: &str) -> Option<&str> {
    if input == "/switch" {
        return Some("");
    }
    return input.strip_prefix("/switch ");
}

async fn switch_chat(store: &Arc<Mutex<SessionStore>>, skin: &MadSkin, arg: &str) {
    let entries = store.lock().await.list_chats();
    let index = match arg.trim().parse::<usize>() {
        Ok(index) if index >= 1 && index <= entries.len() => index,
        _ => {
            println!(
                "{}",
                style("Usage: /switch <number>, see /chats for the list.").yellow()
            );
            return;
        }
    };

    let id = entries[index - 1].id.to_string();
    match store.lock().await.switch_to(&id) {
        Ok(messages) => {
            for message in &messages {
                render_message(skin, message);
            }
        }
        Err(err) => {
            println!("{}", style(err.to_string()).red());
        }
    }
}

pub async fn start(
    controller: Controller,
    store: Arc<Mutex<SessionStore>>,
    rx: mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let printer_store = store.clone();
    tokio::spawn(async move {
        print_events(printer_store, rx).await;
    });

    let skin = MadSkin::default();
    let mut editor = DefaultEditor::new()?;

    println!(
        "{}",
        style("Commands: /clear, /title, /image <prompt>, /chats, /switch <number>, /quit").dim()
    );

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim().to_string();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);

                if ["/q", "/quit", "/exit"].contains(&trimmed.as_str()) {
                    break;
                }
                if trimmed == "/chats" {
                    list_chats(&store).await;
                    continue;
                }
                if let Some(arg) = switch_argument(&trimmed) {
                    switch_chat(&store, &skin, arg).await;
                    continue;
                }

                controller.send(&trimmed).await?;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                return Err(err.into());
            }
        }
    }

    return Ok(());
}
