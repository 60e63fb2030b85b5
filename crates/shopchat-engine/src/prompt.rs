//! Prompt assembly for reformulation and answer generation.

use shopchat_core::ChatMessage;
use shopchat_index::ScoredRecord;
use shopchat_providers::GenerationRequest;

/// Instruction for rewriting a follow-up into a standalone query.
pub const CONDENSE_SYSTEM_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, formulate a standalone question \
which can be understood without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.";

/// Default instruction for answering from retrieved context.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for a products chatbot. \
Your role is to help users find and understand products based on the retrieved product information.\n\n\
Use the retrieved context below to answer the question. \
If you don't know the answer based on the context, say so. Don't make up information.\n\n\
Provide a helpful, accurate answer based on the context. If the context doesn't contain \
enough information, politely let the user know and suggest they rephrase their question \
or ask about specific product categories.";

/// Render retrieved records into a context block.
///
/// Each record is tagged with its id and title so answers can be mapped back
/// to provenance. An empty hit list renders an explicit empty marker so the
/// model still answers instead of erroring.
pub fn build_context_block(hits: &[ScoredRecord]) -> String {
    if hits.is_empty() {
        return "(no matching products found)".to_string();
    }

    hits.iter()
        .map(|hit| {
            let record = &hit.record;
            if record.category.is_empty() {
                format!("[{}] {}\n{}", record.id, record.title, record.content)
            } else {
                format!(
                    "[{}] {} ({})\n{}",
                    record.id, record.title, record.category, record.content
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the reformulation request: condense instruction, prior history,
/// then the raw user message.
pub fn condense_request(
    model: &str,
    temperature: f32,
    history: &[ChatMessage],
    message: &str,
) -> GenerationRequest {
    let mut messages = history.to_vec();
    messages.push(ChatMessage::user(message));

    GenerationRequest {
        model: model.to_string(),
        system_prompt: CONDENSE_SYSTEM_PROMPT.to_string(),
        messages,
        temperature,
    }
}

/// Build the answer request: system instructions plus retrieved context,
/// prior history, then the raw user message.
pub fn answer_request(
    model: &str,
    temperature: f32,
    system_prompt: Option<&str>,
    hits: &[ScoredRecord],
    history: &[ChatMessage],
    message: &str,
) -> GenerationRequest {
    let instructions = system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let system = format!(
        "{}\n\nRetrieved context:\n{}",
        instructions,
        build_context_block(hits)
    );

    let mut messages = history.to_vec();
    messages.push(ChatMessage::user(message));

    GenerationRequest {
        model: model.to_string(),
        system_prompt: system,
        messages,
        temperature,
    }
}
