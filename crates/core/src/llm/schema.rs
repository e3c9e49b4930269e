//! JSON Schema generation for LLM structured-output calls.
//!
//! Built on `openai-client::StructuredOutput`
//! (`packages/openai-client/src/schema.rs`): a blanket trait over
//! `JsonSchema + DeserializeOwned` so any response type used with
//! [`crate::llm::LlmClient::call_structured`] gets its schema generated
//! rather than hand-written.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate a JSON Schema value for this type, with
    /// `additionalProperties: false` forced onto every object so the model
    /// can't pad the response with unrequested keys.
    fn json_schema_value() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();
        deny_additional_properties(&mut value);
        value
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn deny_additional_properties(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.get("type") == Some(&serde_json::Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), serde_json::Value::Bool(false));
            }
            for v in map.values_mut() {
                deny_additional_properties(v);
            }
        }
        serde_json::Value::Array(arr) => {
            for v in arr.iter_mut() {
                deny_additional_properties(v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Example {
        name: String,
    }

    #[test]
    fn denies_additional_properties_on_objects() {
        let schema = Example::json_schema_value();
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
    }
}
