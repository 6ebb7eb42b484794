//! Prompt templates for the reply generator.

/// Persona directive placed ahead of the knowledge document.
pub const SYSTEM_DIRECTIVE: &str = r#####"
You are a helpful customer service agent for this business, chatting with customers on Facebook Messenger.

- Answer only from the knowledge provided below. If the answer is not in it, say so politely and suggest contacting the team directly.
- Reply in the same language the customer wrote in. If you can tell which dialect they use, reply in that dialect.
- Keep replies short and friendly; this is a chat window, not an email.
- Never invent prices, opening hours, policies, or contact details.
"#####;

/// Reply sent when generation fails.
pub const FALLBACK_MESSAGE: &str = "Sorry, there is a technical issue.";

/// Used in place of the knowledge document when it cannot be read.
pub const MISSING_KNOWLEDGE: &str = "No information available";

/// Combine the persona directive and the knowledge document into one system prompt.
pub fn build_system_prompt(directive: &str, knowledge: &str) -> String {
    format!("{}\n\n# Knowledge\n\n{}", directive.trim(), knowledge.trim())
}
