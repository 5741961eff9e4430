//! Prompt composition: the mall-guide persona wrapped around retrieved context.

use ragrelay_core::types::{ChatMessage, Role};

/// Slot in [`TOUR_GUIDE_TEMPLATE`] replaced by the retrieved context.
pub const CONTEXT_SLOT: &str = "{context}";

/// Sentence the model is told to use when the context lacks an answer.
pub const INFO_DESK_FALLBACK: &str = "I don't have that specific information, but you can ask at the information desk on the ground floor";

pub const TOUR_GUIDE_TEMPLATE: &str = "You are a helpful tour guide assistant for Central City Mall. You have access to specific information about the mall.

Based on the following information:

{context}

Instructions:
- Answer the user's questions clearly and concisely in 2-3 sentences maximum
- If asked about a location, provide specific floor and landmark information
- If the question is about directions, give step-by-step guidance
- Keep responses friendly and helpful
- If the information is not in the provided context, say \"{fallback}\"
- Always be welcoming and professional as a mall guide";

/// Used instead of the template when there is no context to interpolate.
pub const GENERIC_SYSTEM_PROMPT: &str =
    "You are a helpful tour guide for Central City Mall. Answer briefly and clearly.";

/// System prompt for `context`; the generic prompt when it is empty.
pub fn system_prompt(context: &str) -> String {
    if context.is_empty() {
        return GENERIC_SYSTEM_PROMPT.to_string();
    }
    // Fill the fallback first so a literal "{fallback}" inside the context stays untouched.
    TOUR_GUIDE_TEMPLATE
        .replace("{fallback}", INFO_DESK_FALLBACK)
        .replacen(CONTEXT_SLOT, context, 1)
}

/// Build the message list sent upstream: one synthesized system message, then
/// every non-system caller message in order. Caller system messages are dropped.
pub fn compose_messages(original: &[ChatMessage], context: &str) -> Vec<ChatMessage> {
    if context.is_empty() {
        tracing::warn!("⚠️ No context retrieved, using default system message");
    } else {
        tracing::info!("✅ Created system message with {} chars of context", context.len());
    }

    let mut messages = Vec::with_capacity(original.len() + 1);
    messages.push(ChatMessage::system(system_prompt(context)));
    messages.extend(original.iter().filter(|m| m.role != Role::System).cloned());

    tracing::info!("📝 Total messages sent to LLM: {}", messages.len());
    messages
}
