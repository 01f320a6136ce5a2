//! Model endpoint trait and the HTTP implementation.

pub mod http;
pub mod openai_responses;

use async_trait::async_trait;

use crate::error::TurnloopError;
use crate::tools::ToolDescriptor;
use crate::types::{GenerationSettings, Turn};

pub use openai_responses::OpenAiResponsesEndpoint;

/// A request sent to a model endpoint.
///
/// Endpoints are stateless: every request carries the complete log and the
/// complete tool list.
#[derive(Debug, Clone)]
pub struct EndpointRequest {
    pub model: String,
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolDescriptor>,
    pub settings: GenerationSettings,
}

/// Core endpoint trait: the remote conversational service.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    /// Endpoint name (e.g., "openai-responses").
    fn endpoint_name(&self) -> &str;

    /// The model ID this endpoint instance serves.
    fn model_id(&self) -> &str;

    /// Send the history and return the turns the model produced, in order.
    async fn query(&self, request: &EndpointRequest) -> Result<Vec<Turn>, TurnloopError>;
}
