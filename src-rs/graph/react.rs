use std::mem;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::checkpoint::SessionStore;
use super::types::GraphState;
use crate::error::{AgentError, Result};
use crate::llm::{CompletionRequest, LLMRouter, Message, ToolCall};
use crate::result::ResponseFormat;
use crate::tools::ToolRegistry;

#[derive(Clone, Debug)]
pub struct ReactGraphConfig {
    pub system_prompt: String,
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    /// Model calls allowed in one turn before the run is aborted.
    pub max_iterations: usize,
    pub response_schema: Value,
}

/// Model -> tools -> model loop ending in a structured response, checkpointed per thread.
pub struct ReactGraph {
    router: LLMRouter,
    tools: ToolRegistry,
    checkpointer: Arc<SessionStore>,
    cfg: ReactGraphConfig,
}

impl ReactGraph {
    pub fn new(
        router: LLMRouter,
        tools: ToolRegistry,
        checkpointer: Arc<SessionStore>,
        cfg: ReactGraphConfig,
    ) -> Self {
        Self {
            router,
            tools,
            checkpointer,
            cfg,
        }
    }

    /// Starts a run; every item is the thread state right after one node executed.
    pub fn stream(&self, input: Message, thread_id: &str) -> GraphRun<'_> {
        GraphRun {
            graph: self,
            thread_id: thread_id.to_string(),
            state: GraphState::default(),
            next: Node::Input(input),
            model_calls: 0,
        }
    }

    pub fn invoke(&self, input: Message, thread_id: &str) -> Result<GraphState> {
        let mut last = None;
        for state in self.stream(input, thread_id) {
            last = Some(state?);
        }
        last.ok_or_else(|| AgentError::Graph("run produced no state".to_string()))
    }

    pub fn get_state(&self, thread_id: &str) -> Option<GraphState> {
        self.checkpointer.get(thread_id)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            messages,
            tools: None,
            temperature: Some(self.cfg.temperature),
            model: Some(self.cfg.model.clone()),
            provider: Some(self.cfg.provider.clone()),
            response_schema: None,
        }
    }

    fn call_model(&self, state: &GraphState) -> Result<Message> {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(&self.cfg.system_prompt));
        messages.extend(state.messages.iter().cloned());

        let mut request = self.request(messages);
        if self.tools.count() > 0 {
            request.tools = Some(self.tools.get_schemas());
        }
        let response = self.router.complete(request)?;
        Ok(Message::assistant(&response.content, response.tool_calls))
    }

    fn run_tools(&self, calls: &[ToolCall]) -> Vec<Message> {
        calls
            .iter()
            .map(|call| {
                let result = self.tools.execute(&call.name, call.args.clone());
                if !result.success {
                    warn!(tool = %call.name, error = ?result.error, "tool call failed");
                }
                Message::tool(call, result.render())
            })
            .collect()
    }

    fn structured_response(&self, state: &GraphState) -> Result<Value> {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(ResponseFormat::INSTRUCTION));
        messages.extend(state.messages.iter().cloned());

        let mut request = self.request(messages);
        request.response_schema = Some(self.cfg.response_schema.clone());
        let response = self.router.complete(request)?;
        let content = response.content.trim();
        Ok(serde_json::from_str(content).unwrap_or_else(|_| Value::String(content.to_string())))
    }
}

enum Node {
    Input(Message),
    Agent,
    Tools,
    Respond,
    Done,
}

/// A single, non-restartable pass through the graph for one thread.
pub struct GraphRun<'a> {
    graph: &'a ReactGraph,
    thread_id: String,
    state: GraphState,
    next: Node,
    model_calls: usize,
}

impl GraphRun<'_> {
    fn step(&mut self, node: Node) -> Result<Node> {
        match node {
            Node::Input(message) => {
                self.state = self.graph.get_state(&self.thread_id).unwrap_or_default();
                self.state.structured_response = None;
                self.state.messages.push(message);
                Ok(Node::Agent)
            }
            Node::Agent => {
                if self.model_calls >= self.graph.cfg.max_iterations {
                    return Err(AgentError::Graph(format!(
                        "recursion limit of {} reached without a final answer",
                        self.graph.cfg.max_iterations
                    )));
                }
                self.model_calls += 1;
                let reply = self.graph.call_model(&self.state)?;
                let next = if reply.has_tool_calls() {
                    Node::Tools
                } else {
                    Node::Respond
                };
                self.state.messages.push(reply);
                Ok(next)
            }
            Node::Tools => {
                let calls = self
                    .state
                    .last_message()
                    .map(|msg| msg.tool_calls.clone())
                    .unwrap_or_default();
                let results = self.graph.run_tools(&calls);
                self.state.messages.extend(results);
                Ok(Node::Agent)
            }
            Node::Respond => {
                let value = self.graph.structured_response(&self.state)?;
                self.state.structured_response = Some(value);
                Ok(Node::Done)
            }
            Node::Done => Ok(Node::Done),
        }
    }
}

impl Iterator for GraphRun<'_> {
    type Item = Result<GraphState>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = mem::replace(&mut self.next, Node::Done);
        if matches!(node, Node::Done) {
            return None;
        }
        match self.step(node) {
            Ok(next) => {
                self.next = next;
                self.graph.checkpointer.put(&self.thread_id, self.state.clone());
                debug!(
                    thread_id = %self.thread_id,
                    messages = self.state.messages.len(),
                    "graph step checkpointed"
                );
                Some(Ok(self.state.clone()))
            }
            Err(err) => Some(Err(err)),
        }
    }
}
