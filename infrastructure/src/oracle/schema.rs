//! JSON Schema action converter.
//!
//! Turns routing [`ActionDefinition`]s into the function-calling `tools`
//! entries accepted by Ollama's chat API (the OpenAI-compatible shape):
//!
//! ```json
//! {"type": "function", "function": {"name": "...", "description": "...",
//!   "parameters": {"type": "object", "properties": {...}, "required": [...]}}}
//! ```

use council_domain::ActionDefinition;
use serde_json::{Map, Value, json};

/// Produces function-calling JSON Schema for routing actions.
///
/// Every routing parameter is a string.
pub struct JsonSchemaActionConverter;

impl JsonSchemaActionConverter {
    pub fn action_to_schema(&self, action: &ActionDefinition) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &action.parameters {
            properties.insert(
                param.name.clone(),
                json!({ "type": "string", "description": param.description }),
            );
            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "function",
            "function": {
                "name": action.name(),
                "description": action.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }

    /// Schemas for `actions`, keeping the catalogue order.
    pub fn actions_schema(&self, actions: &[ActionDefinition]) -> Vec<Value> {
        actions.iter().map(|a| self.action_to_schema(a)).collect()
    }
}
