use std::io::{self, Write};

use crate::models::{AgentCardView, CLIConfig, ChatMessage, TaskView};

pub fn banner(cfg: &CLIConfig) {
    println!("Wikipedia Agent Debug CLI");
    println!("API: {}", cfg.base_url);
    println!("Session: {}", cfg.session_id);
    println!("Type /help for commands.");
}

pub fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

pub fn help() {
    println!("Commands:");
    println!("  /help                 Show commands");
    println!("  /exit | /quit          Exit");
    println!("  /session [id]          Show or switch session");
    println!("  /new                   Start a new session");
    println!("  /task [id]             Fetch a task (default: last)");
    println!("  /card                  Show the agent card");
    println!("  /tasks [limit]         List tasks");
    println!("  /history               Show chat history");
    println!("  /reset                 Clear chat history");
    println!("  /debug [on|off]        Toggle raw task output");
    println!("  /config                Show current config");
    println!("  /base <url>            Update base URL");
}

pub fn reply(task: &TaskView, debug: bool) {
    match task.reply_text() {
        Some(text) => println!("agent [{}]> {}", task.status.state, text),
        None => println!("agent [{}]> (no text)", task.status.state),
    }
    if debug {
        println!("task: {}", task.id);
        if let Some(history) = &task.history {
            for msg in history {
                let text: Vec<&str> = msg.parts.iter().filter_map(|p| p.text.as_deref()).collect();
                println!("  {}: {}", msg.role, text.join(" "));
            }
        }
    }
}

pub fn task(task: &TaskView) {
    println!("task {} [{}]", task.id, task.status.state);
    if let Some(session) = &task.session_id {
        println!("  session: {}", session);
    }
    if let Some(text) = task.reply_text() {
        println!("  reply: {}", text);
    }
    if let Some(history) = &task.history {
        println!("  history: {} messages", history.len());
    }
}

pub fn tasks(tasks: &[TaskView]) {
    if tasks.is_empty() {
        println!("no tasks");
        return;
    }
    for task in tasks {
        println!(
            "[{}] {} session={}",
            task.status.state,
            task.id,
            task.session_id.clone().unwrap_or_default()
        );
    }
}

pub fn card(card: &AgentCardView) {
    println!("{} v{}", card.name, card.version);
    println!("  {}", card.description);
    println!("  url: {}", card.url);
    println!("  output modes: {}", card.default_output_modes.join(", "));
    for skill in &card.skills {
        println!("  skill {}: {}", skill.id, skill.name);
    }
}

pub fn config(cfg: &CLIConfig) {
    println!("config:");
    println!("  base: {}", cfg.base_url);
    println!("  session: {}", cfg.session_id);
    println!("  history length: {}", cfg.history_length);
    println!("  debug: {}", cfg.debug);
}

pub fn history(items: &[ChatMessage]) {
    if items.is_empty() {
        println!("no history");
        return;
    }
    for msg in items {
        println!("{}> {}", msg.role, msg.content);
    }
}

pub fn info(msg: &str) {
    println!("{}", msg);
}

pub fn error(msg: &str) {
    eprintln!("error: {}", msg);
}
