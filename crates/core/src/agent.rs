//! Agent Definition
//!
//! An agent is a persona (instructions) plus the tools it may call. It is a
//! plain config value, built once at startup and never mutated.

use crate::{
    tool::{ToolError, ToolRegistry},
    tools,
};

/// The agents this workspace ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AgentKind {
    /// Invoicing and estimating for trades (electrician, roofer, ...).
    Invoicing,
    /// Voice-driven invoice creation.
    Voice,
    /// ISTQB testing helper, used by the text chat.
    Testing,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    name: String,
    instructions: String,
    tools: ToolRegistry,
    voice: Option<String>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>, tools: ToolRegistry) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools,
            voice: None,
        }
    }

    /// Sets the voice the agent speaks with.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn voice(&self) -> Option<&str> {
        self.voice.as_deref()
    }

    pub fn preset(kind: AgentKind) -> Result<Self, ToolError> {
        match kind {
            AgentKind::Invoicing => Self::invoicing_estimating(),
            AgentKind::Voice => Self::voice_invoicing(),
            AgentKind::Testing => Self::testing(),
        }
    }

    pub fn invoicing_estimating() -> Result<Self, ToolError> {
        let tools = ToolRegistry::new()
            .with(tools::create_invoice(
                "Create an invoice based on the provided details",
            ))?
            .with(tools::provide_estimate())?;
        Ok(Self::new(
            "Invoicing and Estimating Agent",
            "You are an agent that helps with invoicing and estimating tasks. You can adapt to different personas like Electrician, Roofer, etc.",
            tools,
        )
        .with_voice("coral"))
    }

    pub fn voice_invoicing() -> Result<Self, ToolError> {
        let tools = ToolRegistry::new().with(tools::create_invoice(
            "Create an invoice based on voice instructions",
        ))?;
        Ok(Self::new(
            "Voice Agent",
            "You are a voice agent that creates invoices based on voice instructions.",
            tools,
        ))
    }

    pub fn testing() -> Result<Self, ToolError> {
        let tools = ToolRegistry::new().with(tools::test_case_tool())?;
        Ok(Self::new(
            "Testing Agent",
            "You are a testing agent that helps with testing. You will follow ISTQB standards.",
            tools,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoicing_preset() {
        let agent = AgentConfig::preset(AgentKind::Invoicing).unwrap();
        assert_eq!(agent.name(), "Invoicing and Estimating Agent");
        assert_eq!(agent.voice(), Some("coral"));
        assert_eq!(agent.tools().names(), vec!["create_invoice", "provide_estimate"]);
        assert!(agent.instructions().contains("Electrician, Roofer"));
    }

    #[test]
    fn test_voice_preset_has_only_invoicing() {
        let agent = AgentConfig::preset(AgentKind::Voice).unwrap();
        assert_eq!(agent.name(), "Voice Agent");
        assert_eq!(agent.voice(), None);
        assert_eq!(agent.tools().names(), vec!["create_invoice"]);
        assert_eq!(
            agent.tools().get("create_invoice").unwrap().description(),
            "Create an invoice based on voice instructions"
        );
    }

    #[test]
    fn test_testing_preset() {
        let agent = AgentConfig::preset(AgentKind::Testing).unwrap();
        assert_eq!(agent.name(), "Testing Agent");
        assert_eq!(agent.tools().names(), vec!["test_case_tool"]);
    }
}
