use crate::llm_client::ChatMessage;

/// Executions needed after a model turn to run tools and ask the model again.
const TOOL_ROUND_TRIP: usize = 2;

/// State flowing through the agent graph.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub messages: Vec<ChatMessage>,
    /// Node executions left in this run, counting the node about to execute.
    pub remaining_steps: usize,
}

impl AgentState {
    pub fn new(messages: Vec<ChatMessage>, recursion_limit: usize) -> Self {
        Self {
            messages,
            remaining_steps: recursion_limit,
        }
    }

    /// True when a tool call requested now could not be followed by another model turn.
    pub fn is_last_step(&self) -> bool {
        self.remaining_steps <= TOOL_ROUND_TRIP
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
