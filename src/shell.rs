//! Line-oriented front end: prompts for a name, then takes one command per
//! line. Calls run in the background; each redraw shows whatever has come
//! back so far, and an empty line just redraws.

use colored::Colorize;
use dialoguer::Input;

use crate::app::Client;
use crate::error::{ServiceError, ServiceResult};
use crate::types::{EntityId, Message, Task};

const HELP: &str = "commands: add <text> | toggle <id> | rm <id> | say <text> | unsay <id> | reload | logout | help | quit";

pub fn render_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "  No tasks yet.".dimmed().to_string();
    }
    tasks
        .iter()
        .map(|t| {
            if t.done {
                format!("  [x] {:>4}  {}", t.id, t.text.strikethrough().dimmed())
            } else {
                format!("  [ ] {:>4}  {}", t.id, t.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_messages(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "  No messages yet.".dimmed().to_string();
    }
    messages
        .iter()
        .map(|m| format!("  #{:<4} {}: {}", m.id, m.user.bold(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render(client: &Client) {
    let name = client.username().unwrap_or_default();
    println!();
    println!("{} {}", "Hello,".cyan(), name.bold());
    if client.is_loading() {
        println!("{}", "  loading...".dimmed());
    }
    println!("{}", "Tasks".bold().underline());
    println!("{}", render_tasks(client.tasks()));
    println!("{}", "Chat".bold().underline());
    println!("{}", render_messages(client.messages()));
}

fn prompt(label: &str) -> ServiceResult<String> {
    Input::<String>::new()
        .with_prompt(label)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| ServiceError::FromString(format!("Prompt failed: {e}")))
}

/// A parsed shell line.
#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Add(String),
    Toggle(EntityId),
    Remove(EntityId),
    Say(String),
    Unsay(EntityId),
    Reload,
    Logout,
    Help,
    Quit,
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_start();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let id = |cmd: fn(EntityId) -> ShellCommand| match rest.trim().parse() {
            Ok(id) => cmd(id),
            Err(_) => ShellCommand::Unknown(line.to_string()),
        };
        match verb {
            "add" => ShellCommand::Add(rest.to_string()),
            "toggle" | "t" => id(ShellCommand::Toggle),
            "rm" | "remove" => id(ShellCommand::Remove),
            "say" => ShellCommand::Say(rest.to_string()),
            "unsay" => id(ShellCommand::Unsay),
            "reload" => ShellCommand::Reload,
            "logout" => ShellCommand::Logout,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            _ => ShellCommand::Unknown(line.to_string()),
        }
    }
}

pub fn run(client: &mut Client) -> ServiceResult<()> {
    if !client.restore() {
        login(client)?;
    }
    println!("{}", HELP.dimmed());

    loop {
        client.apply_pending();
        render(client);
        let line = prompt(">")?;
        match ShellCommand::parse(&line) {
            ShellCommand::Add(mut text) => {
                client.add_task(&mut text);
            }
            ShellCommand::Toggle(id) => {
                client.toggle_task(id);
            }
            ShellCommand::Remove(id) => {
                client.remove_task(id);
            }
            ShellCommand::Say(mut text) => {
                client.send_message(&mut text);
            }
            ShellCommand::Unsay(id) => client.delete_message(id),
            ShellCommand::Reload => client.reload(),
            ShellCommand::Logout => {
                client.logout();
                login(client)?;
            }
            ShellCommand::Help => println!("{}", HELP.dimmed()),
            ShellCommand::Quit => break,
            ShellCommand::Unknown(text) if text.trim().is_empty() => {}
            ShellCommand::Unknown(text) => println!("{} {}", "unknown command:".yellow(), text),
        }
    }
    Ok(())
}

fn login(client: &mut Client) -> ServiceResult<()> {
    while !client.is_authenticated() {
        let name = prompt("Your name")?;
        client.login(&name);
    }
    Ok(())
}
