//! Agent personas and the prompts built from them.
//!
//! An agent is a persona (role, goal, backstory) plus sampling settings. The
//! analysis type picks one agent and one [`TaskTemplate`]; together with the
//! user's query and the report text they become the chat messages sent to the
//! model.

mod personas;
mod tasks;

use bta_llm::ChatMessage;

use crate::analysis::AnalysisType;

pub use personas::{DOCTOR, EXERCISE_SPECIALIST, NUTRITIONIST, VERIFIER};
pub use tasks::TaskTemplate;

/// Placeholder replaced by the user's query in goals and task descriptions.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// An LLM persona.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    /// Stable identifier, recorded in logs.
    pub name: &'static str,
    pub role: &'static str,
    /// May contain `{query}`.
    pub goal: &'static str,
    pub backstory: &'static str,
    pub temperature: f32,
}

impl Agent {
    /// The agent responsible for an analysis type.
    pub fn for_type(analysis_type: AnalysisType) -> &'static Agent {
        match analysis_type {
            AnalysisType::Summary => &DOCTOR,
            AnalysisType::Nutrition => &NUTRITIONIST,
            AnalysisType::Exercise => &EXERCISE_SPECIALIST,
            AnalysisType::Verification => &VERIFIER,
        }
    }

    /// System prompt describing the persona.
    pub fn system_prompt(&self, query: &str) -> String {
        format!(
            "You are {role}.\n\nYour goal: {goal}\n\nBackground: {backstory}",
            role = self.role,
            goal = interpolate(self.goal, query),
            backstory = self.backstory,
        )
    }
}

/// Replace `{query}` in a template.
pub fn interpolate(template: &str, query: &str) -> String {
    template.replace(QUERY_PLACEHOLDER, query)
}

/// Assemble the conversation for one analysis.
pub fn build_messages(
    agent: &Agent,
    task: &TaskTemplate,
    query: &str,
    report: &str,
) -> Vec<ChatMessage> {
    let user = format!(
        "{description}\n\nExpected output: {expected}\n\n\
         <blood_test_report>\n{report}\n</blood_test_report>",
        description = interpolate(task.description, query),
        expected = task.expected_output,
        report = report.trim_end(),
    );
    vec![ChatMessage::system(agent.system_prompt(query)), ChatMessage::user(user)]
}
