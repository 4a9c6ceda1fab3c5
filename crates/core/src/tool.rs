//! Tool descriptors: what the caller offers the model.

use serde::{Deserialize, Serialize};

/// An abstract tool offered to the model (typically sourced from an MCP server).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's input, passed through untouched
    pub input_schema: serde_json::Value,
}

/// A tool declaration in the upstream function-calling shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_uses_snake_case_schema_field() {
        let tool: ToolDescriptor = serde_json::from_value(serde_json::json!({
            "name": "get_cart",
            "description": "Fetch the cart",
            "input_schema": { "type": "object" }
        }))
        .unwrap();
        assert_eq!(tool.name, "get_cart");
        assert_eq!(tool.input_schema["type"], "object");
    }
}
