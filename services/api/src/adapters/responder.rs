//! services/api/src/adapters/responder.rs
//!
//! The default reply generator. It renders the canned clarity/mode templates
//! from the core crate instead of calling out to an inference backend.

use async_trait::async_trait;
use learning_session_core::{
    domain::{ClarityLevel, DoubtContext, LearningMode},
    ports::{PortResult, ResponseGenerator},
    responder,
};

#[derive(Clone, Debug, Default)]
pub struct TemplateResponder;

impl TemplateResponder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseGenerator for TemplateResponder {
    async fn answer_doubt(
        &self,
        question: &str,
        context: &DoubtContext,
        clarity: ClarityLevel,
        mode: LearningMode,
    ) -> PortResult<String> {
        Ok(responder::doubt_response(question, context, clarity, mode))
    }

    async fn general_reply(
        &self,
        input: &str,
        clarity: ClarityLevel,
        mode: LearningMode,
    ) -> PortResult<String> {
        Ok(responder::general_response(input, clarity, mode))
    }
}
