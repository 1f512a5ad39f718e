use crate::llm::ChatModel;
use crate::prompts::rewrite_messages;
use crate::{PipelineError, Turn};
use tracing::debug;

pub async fn rewrite_question<L>(
    llm: &L,
    history: &[Turn],
    message: &str,
) -> Result<String, PipelineError>
where
    L: ChatModel + ?Sized,
{
    let message = message.trim();
    if history.is_empty() {
        return Ok(message.to_string());
    }

    let rewritten = llm.complete(&rewrite_messages(history, message)).await?;
    let rewritten = rewritten.trim();
    if rewritten.is_empty() {
        return Ok(message.to_string());
    }

    debug!(question = %message, standalone = %rewritten, "question rewritten");
    Ok(rewritten.to_string())
}
