// Shared prompt constants for the agent's model node.
// Tool prompts live next to the tool that uses them.

use chrono::{DateTime, SecondsFormat, Utc};

/// Default system prompt of the agent. `{system_time}` is filled in per call.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.\n\nSystem time: {system_time}";

/// Replaces `{system_time}` in `template` with `now` in RFC 3339.
pub fn render_system_prompt(template: &str, now: DateTime<Utc>) -> String {
    template.replace(
        "{system_time}",
        &now.to_rfc3339_opts(SecondsFormat::Micros, false),
    )
}
