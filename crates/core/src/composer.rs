use crate::llm::ChatModel;
use crate::prompts::{answer_messages, I_DONT_KNOW};
use crate::{DocumentChunk, PipelineError, Turn};

pub async fn compose_answer<L>(
    llm: &L,
    question: &str,
    context: &[DocumentChunk],
    history: &[Turn],
) -> Result<String, PipelineError>
where
    L: ChatModel + ?Sized,
{
    let answer = llm
        .complete(&answer_messages(context, history, question))
        .await?;
    let answer = answer.trim();

    if answer.is_empty() {
        Ok(I_DONT_KNOW.to_string())
    } else {
        Ok(answer.to_string())
    }
}
