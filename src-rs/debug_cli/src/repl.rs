use std::io;

use crate::client::HTTPClient;
use crate::models::{new_id, CLIConfig, ChatMessage};
use crate::render;

pub struct REPL {
    pub config: CLIConfig,
    pub client: HTTPClient,
    pub history: Vec<ChatMessage>,
    /// Open task while the agent is waiting for more input.
    pending_task: Option<String>,
    last_task: Option<String>,
}

impl REPL {
    pub fn new(config: CLIConfig, client: HTTPClient) -> Self {
        Self {
            config,
            client,
            history: Vec::new(),
            pending_task: None,
            last_task: None,
        }
    }

    pub fn run(&mut self) {
        render::banner(&self.config);
        loop {
            render::prompt();
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('/') {
                if self.handle_command(&line) {
                    break;
                }
                continue;
            }
            self.send(&line);
        }
    }

    fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("").trim_start_matches('/');
        let rest = parts.next().unwrap_or("").trim();
        match cmd {
            "exit" | "quit" => return true,
            "help" => render::help(),
            "session" => {
                if rest.is_empty() {
                    render::info(&format!("session: {}", self.config.session_id));
                } else {
                    self.config.session_id = rest.to_string();
                    self.pending_task = None;
                    render::info("session updated");
                }
            }
            "new" => {
                self.config.session_id = new_id();
                self.pending_task = None;
                self.history.clear();
                render::info(&format!("new session: {}", self.config.session_id));
            }
            "task" => {
                let id = if rest.is_empty() {
                    self.last_task.clone()
                } else {
                    Some(rest.to_string())
                };
                match id {
                    Some(id) => match self.client.get_task(&id, self.config.history_length) {
                        Ok(task) => render::task(&task),
                        Err(err) => render::error(&err),
                    },
                    None => render::info("no task yet"),
                }
            }
            "card" => match self.client.agent_card() {
                Ok(card) => render::card(&card),
                Err(err) => render::error(&err),
            },
            "tasks" => {
                let limit = rest.parse::<usize>().unwrap_or(10);
                match self.client.list_tasks(limit) {
                    Ok(tasks) => render::tasks(&tasks),
                    Err(err) => render::error(&err),
                }
            }
            "history" => render::history(&self.history),
            "reset" => {
                self.history.clear();
                render::info("history cleared");
            }
            "debug" => {
                if rest.is_empty() {
                    self.config.debug = !self.config.debug;
                    render::info(&format!("debug: {}", self.config.debug));
                } else if let Some(flag) = parse_on_off(rest) {
                    self.config.debug = flag;
                    render::info(&format!("debug: {}", self.config.debug));
                } else {
                    render::error("invalid debug flag");
                }
            }
            "config" => render::config(&self.config),
            "base" => {
                if rest.is_empty() {
                    render::info(&format!("base: {}", self.config.base_url));
                } else {
                    match HTTPClient::new(rest) {
                        Ok(client) => {
                            self.config.base_url = rest.to_string();
                            self.client = client;
                            render::info("base url updated");
                        }
                        Err(err) => render::error(&err),
                    }
                }
            }
            _ => render::info("unknown command, type /help"),
        }
        false
    }

    fn send(&mut self, line: &str) {
        self.history.push(ChatMessage {
            role: "user".to_string(),
            content: line.to_string(),
        });

        let task_id = self.pending_task.take().unwrap_or_else(new_id);
        match self.client.send_task(
            &task_id,
            &self.config.session_id,
            line,
            self.config.history_length,
        ) {
            Ok(task) => {
                if let Some(text) = task.reply_text() {
                    self.history.push(ChatMessage {
                        role: "agent".to_string(),
                        content: text,
                    });
                }
                if task.awaiting_input() {
                    self.pending_task = Some(task.id.clone());
                }
                self.last_task = Some(task.id.clone());
                render::reply(&task, self.config.debug);
            }
            Err(err) => render::error(&err),
        }
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(true),
        "off" | "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
