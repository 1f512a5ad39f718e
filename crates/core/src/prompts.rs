use crate::llm::ChatMessage;
use crate::{DocumentChunk, Turn};

pub const CONTEXTUALIZE_PROMPT: &str = "Given a chat history and the latest user question which might reference context in the chat history, formulate a standalone question. Do NOT answer the question.";

pub const ANSWER_PROMPT: &str = "You are an assistant for question-answering tasks. Use the following pieces of retrieved context to answer the question. If you don't know the answer, say that you don't know. Use three sentences maximum and keep the answer concise.";

pub const I_DONT_KNOW: &str = "I don't know.";

pub fn history_messages(history: &[Turn]) -> Vec<ChatMessage> {
    history
        .iter()
        .flat_map(|turn| {
            [
                ChatMessage::user(turn.user.clone()),
                ChatMessage::assistant(turn.assistant.clone()),
            ]
        })
        .collect()
}

pub fn rewrite_messages(history: &[Turn], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(CONTEXTUALIZE_PROMPT));
    messages.extend(history_messages(history));
    messages.push(ChatMessage::user(message));
    messages
}

pub fn format_context(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn answer_messages(chunks: &[DocumentChunk], history: &[Turn], question: &str) -> Vec<ChatMessage> {
    let system = format!("{ANSWER_PROMPT}\n\n{}", format_context(chunks));

    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(system.trim_end()));
    messages.extend(history_messages(history));
    messages.push(ChatMessage::user(question));
    messages
}
