// ReAct agent: a two-node graph (model node, tool node) looping while the
// model keeps requesting tool calls. Threads persist history across runs.

pub mod graph;
pub mod handlers;
pub mod run_lock;
pub mod state;
pub mod threads;
pub mod tools;
