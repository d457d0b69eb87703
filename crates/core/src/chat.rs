//! Text chat with an agent.
//!
//! Each question is answered independently: instructions, the question, and
//! (if the model asks for them) tool calls and their results. No history is
//! carried between questions.

use crate::{
    agent::AgentConfig,
    llm_client::{LLMAction, LLMClient, LLMStreamEvent},
};
use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolArgs,
    FunctionObjectArgs,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ChatAgent {
    agent: AgentConfig,
    llm_client: Arc<dyn LLMClient>,
}

impl ChatAgent {
    pub fn new(agent: AgentConfig, llm_client: Arc<dyn LLMClient>) -> Self {
        Self { agent, llm_client }
    }

    pub fn agent(&self) -> &AgentConfig {
        &self.agent
    }

    /// Runs the agent on one question and returns its final answer.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.agent.instructions())
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(question)
                .build()?
                .into(),
        ];

        let action = self
            .llm_client
            .decide_action(messages.clone(), self.tool_list()?)
            .await?;

        let tool_calls = match action {
            LLMAction::TextResponse(text) => return Ok(text),
            LLMAction::ToolCall(tool_calls) => tool_calls,
        };

        let mut history_with_tools = messages;
        history_with_tools.push(
            ChatCompletionRequestAssistantMessageArgs::default()
                .tool_calls(tool_calls.clone())
                .build()?
                .into(),
        );
        for call in &tool_calls {
            info!(tool = %call.function.name, agent = %self.agent.name(), "Model requested tool");
            let result = self
                .agent
                .tools()
                .execute(&call.function.name, &call.function.arguments)
                .await;
            history_with_tools.push(
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(call.id.clone())
                    .content(result)
                    .build()?
                    .into(),
            );
        }

        let mut final_stream = self.llm_client.stream_after_tools(history_with_tools).await?;
        let mut full_response = String::new();
        while let Some(event_result) = final_stream.next().await {
            match event_result {
                Ok(LLMStreamEvent::TextChunk(chunk)) => full_response.push_str(&chunk),
                Err(e) => warn!(error = %e, "Dropping failed stream chunk"),
            }
        }
        Ok(full_response)
    }

    fn tool_list(&self) -> Result<Vec<ChatCompletionTool>> {
        self.agent
            .tools()
            .iter()
            .map(|t| {
                Ok(ChatCompletionToolArgs::default()
                    .function(
                        FunctionObjectArgs::default()
                            .name(t.name())
                            .description(t.description())
                            .parameters(t.parameters().clone())
                            .build()?,
                    )
                    .build()?)
            })
            .collect()
    }
}
