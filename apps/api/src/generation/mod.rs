// Ideal resume generation.
// Backs the agent's `generate_ideal_resume` tool and the direct generate endpoint.
// All LLM calls go through llm_client; no direct provider calls here.

pub mod generator;
pub mod handlers;
pub mod prompts;
