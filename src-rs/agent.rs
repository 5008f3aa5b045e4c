use std::sync::Arc;

use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::error::Result;
use crate::graph::{GraphRun, GraphState, ReactGraph, ReactGraphConfig, SessionStore};
use crate::llm::{LLMRouter, Message, Role};
use crate::result::{AgentResult, ResponseFormat};
use crate::tools::ToolRegistry;

/// Conversational agent over a checkpointed ReAct graph.
pub struct Agent {
    pub name: String,
    pub supported_content_types: Vec<String>,
    graph: ReactGraph,
    working_messages: [String; 2],
    error_message: String,
}

impl Agent {
    pub fn new(config: &AgentConfig, graph: ReactGraph) -> Self {
        Self {
            name: config.agent.name.clone(),
            supported_content_types: config.agent.supported_content_types.clone(),
            graph,
            working_messages: config.streaming.working_messages.clone(),
            error_message: config.streaming.error_message.clone(),
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        router: LLMRouter,
        tools: ToolRegistry,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let graph = ReactGraph::new(
            router,
            tools,
            sessions,
            ReactGraphConfig {
                system_prompt: config.agent.system_instruction.clone(),
                provider: config.model.provider.clone(),
                model: config.model.name.clone(),
                temperature: config.model.temperature,
                max_iterations: config.model.max_iterations,
                response_schema: ResponseFormat::schema(),
            },
        );
        Self::new(config, graph)
    }

    /// Runs one turn to completion for `session_id`. Blocks on the model.
    pub fn invoke(&self, query: &str, session_id: &str) -> Result<AgentResult> {
        info!(agent = %self.name, %session_id, "invoking agent");
        self.graph.invoke(Message::user(query), session_id)?;
        Ok(self.agent_response(session_id))
    }

    /// Interim progress updates followed by exactly one final result.
    pub fn stream(&self, query: &str, session_id: &str) -> AgentStream<'_> {
        info!(agent = %self.name, %session_id, "streaming agent");
        AgentStream {
            agent: self,
            session_id: session_id.to_string(),
            run: Some(self.graph.stream(Message::user(query), session_id)),
            finished: false,
        }
    }

    pub fn tool_count(&self) -> usize {
        self.graph.tools().count()
    }

    /// Maps the session's structured response to a result.
    pub fn agent_response(&self, session_id: &str) -> AgentResult {
        let structured = self
            .graph
            .get_state(session_id)
            .and_then(|state| state.structured_response)
            .and_then(|value| ResponseFormat::from_value(&value));
        match structured {
            Some(response) => response.into(),
            None => {
                debug!(%session_id, "no usable structured response");
                AgentResult::failed(&self.error_message)
            }
        }
    }

    fn working_update(&self, state: &GraphState) -> Option<AgentResult> {
        let last = state.last_message()?;
        if last.has_tool_calls() {
            Some(AgentResult::working(&self.working_messages[0]))
        } else if last.role == Role::Tool {
            Some(AgentResult::working(&self.working_messages[1]))
        } else {
            None
        }
    }
}

pub struct AgentStream<'a> {
    agent: &'a Agent,
    session_id: String,
    run: Option<GraphRun<'a>>,
    finished: bool,
}

impl Iterator for AgentStream<'_> {
    type Item = Result<AgentResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        while let Some(run) = self.run.as_mut() {
            match run.next() {
                Some(Ok(state)) => {
                    if let Some(update) = self.agent.working_update(&state) {
                        return Some(Ok(update));
                    }
                }
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                None => self.run = None,
            }
        }
        self.finished = true;
        Some(Ok(self.agent.agent_response(&self.session_id)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{agent_config, scripted_agent, ScriptedProvider};

    #[test]
    fn invoke_maps_completed_response() {
        let (agent, _) = scripted_agent(vec![
            ScriptedProvider::text("Adam Mickiewicz was a Polish poet."),
            ScriptedProvider::structured("completed", "Adam Mickiewicz was a Polish poet."),
        ]);
        let result = agent.invoke("Tell me about Adam Mickiewicz", "session_12345").unwrap();
        assert_eq!(
            result,
            AgentResult {
                is_task_complete: true,
                require_user_input: false,
                content: "Adam Mickiewicz was a Polish poet.".to_string(),
            }
        );
    }

    #[test]
    fn invoke_maps_error_status_to_user_input() {
        let (agent, _) = scripted_agent(vec![
            ScriptedProvider::text("failed"),
            ScriptedProvider::structured("error", "lookup failed"),
        ]);
        let result = agent.invoke("q", "s").unwrap();
        assert!(!result.is_task_complete);
        assert!(result.require_user_input);
        assert_eq!(result.content, "lookup failed");
    }

    #[test]
    fn missing_structured_response_degrades_to_error_message() {
        let (agent, _) = scripted_agent(Vec::new());
        let expected = agent_config().streaming.error_message;
        assert_eq!(agent.agent_response("never-seen"), AgentResult::failed(&expected));
    }

    #[test]
    fn unrecognized_structured_response_degrades_to_error_message() {
        let (agent, _) = scripted_agent(vec![
            ScriptedProvider::text("hi"),
            ScriptedProvider::text("I am not JSON"),
        ]);
        let result = agent.invoke("q", "s").unwrap();
        assert_eq!(result, AgentResult::failed(&agent_config().streaming.error_message));
    }

    #[test]
    fn stream_reports_tool_call_then_result_then_final() {
        let (agent, _) = scripted_agent(vec![
            ScriptedProvider::tool_call("wikipedia", json!({"query": "Adam Mickiewicz"})),
            ScriptedProvider::text("He was a poet."),
            ScriptedProvider::structured("completed", "He was a poet."),
        ]);
        let cfg = agent_config();
        let results: Vec<AgentResult> = agent
            .stream("Tell me about Adam Mickiewicz", "s")
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(
            results,
            vec![
                AgentResult::working(&cfg.streaming.working_messages[0]),
                AgentResult::working(&cfg.streaming.working_messages[1]),
                AgentResult {
                    is_task_complete: true,
                    require_user_input: false,
                    content: "He was a poet.".to_string(),
                },
            ]
        );
    }

    #[test]
    fn stream_without_tools_yields_only_the_final_result() {
        let (agent, _) = scripted_agent(vec![
            ScriptedProvider::text("Which one?"),
            ScriptedProvider::structured("input_required", "Which one?"),
        ]);
        let results: Vec<AgentResult> = agent.stream("q", "s").collect::<Result<_>>().unwrap();
        assert_eq!(results, vec![AgentResult::failed("Which one?")]);
    }

    #[test]
    fn stream_surfaces_graph_errors_once() {
        let (agent, _) = scripted_agent(Vec::new());
        let mut stream = agent.stream("q", "s");
        assert!(matches!(stream.next(), Some(Err(_))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn previous_turn_response_does_not_leak_into_a_failed_turn() {
        let (agent, _) = scripted_agent(vec![
            ScriptedProvider::text("done"),
            ScriptedProvider::structured("completed", "done"),
            ScriptedProvider::text("again"),
            ScriptedProvider::text("garbage"),
        ]);
        assert!(agent.invoke("first", "s").unwrap().is_task_complete);
        let second = agent.invoke("second", "s").unwrap();
        assert!(!second.is_task_complete);
        assert_eq!(second.content, agent_config().streaming.error_message);
    }
}
