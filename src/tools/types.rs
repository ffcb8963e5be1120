use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Schema for a single property in a tool's input or output schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    /// JSON type: "string", "number", "integer", "boolean", "array", "object"
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Human/model readable description
    pub description: String,
    /// Item schema when schema_type is "array"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn string(description: impl Into<String>) -> Self {
        PropertySchema {
            schema_type: "string".to_string(),
            description: description.into(),
            items: None,
        }
    }

    pub fn integer(description: impl Into<String>) -> Self {
        PropertySchema {
            schema_type: "integer".to_string(),
            description: description.into(),
            items: None,
        }
    }

    pub fn number(description: impl Into<String>) -> Self {
        PropertySchema {
            schema_type: "number".to_string(),
            description: description.into(),
            items: None,
        }
    }

    pub fn array_of(item: PropertySchema, description: impl Into<String>) -> Self {
        PropertySchema {
            schema_type: "array".to_string(),
            description: description.into(),
            items: Some(Box::new(item)),
        }
    }
}

/// Object schema describing a tool's input arguments or output payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl ObjectSchema {
    pub fn new(properties: HashMap<String, PropertySchema>, required: Vec<String>) -> Self {
        ObjectSchema {
            schema_type: "object".to_string(),
            properties,
            required,
        }
    }

    /// Render as a plain JSON Schema object for LLM tool advertisement
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, prop) in &self.properties {
            properties.insert(name.clone(), property_to_json(prop));
        }
        serde_json::json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": self.required,
        })
    }

    /// Validate a JSON value against this schema.
    ///
    /// Rules: the value must be an object, every required field must be
    /// present and non-null, every present field must be declared, and every
    /// present non-null field must match its declared type. Optional fields
    /// may be null (weather payloads carry nullable fields by design).
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("expected an object, got {}", type_name(value)))?;

        for field in &self.required {
            match object.get(field) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required field '{}'", field));
                }
                Some(_) => {}
            }
        }

        for (field, field_value) in object {
            let schema = self
                .properties
                .get(field)
                .ok_or_else(|| format!("unexpected field '{}'", field))?;
            if field_value.is_null() && !self.required.contains(field) {
                continue;
            }
            validate_property(field, schema, field_value)?;
        }

        Ok(())
    }
}

impl Default for ObjectSchema {
    fn default() -> Self {
        ObjectSchema::new(HashMap::new(), vec![])
    }
}

fn property_to_json(prop: &PropertySchema) -> Value {
    let mut object = Map::new();
    object.insert("type".to_string(), Value::String(prop.schema_type.clone()));
    object.insert(
        "description".to_string(),
        Value::String(prop.description.clone()),
    );
    if let Some(items) = &prop.items {
        object.insert("items".to_string(), property_to_json(items));
    }
    Value::Object(object)
}

fn validate_property(field: &str, schema: &PropertySchema, value: &Value) -> Result<(), String> {
    let ok = match schema.schema_type.as_str() {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => match value.as_array() {
            Some(items) => {
                if let Some(item_schema) = &schema.items {
                    for item in items {
                        validate_property(field, item_schema, item)?;
                    }
                }
                true
            }
            None => false,
        },
        other => return Err(format!("field '{}' has unknown schema type '{}'", field, other)),
    };

    if ok {
        Ok(())
    } else {
        Err(format!(
            "field '{}' expected {}, got {}",
            field,
            schema.schema_type,
            type_name(value)
        ))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declaration of a tool: name, description and input/output schemas.
/// Immutable once registered; advertised to the model on every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: ObjectSchema,
    pub output_schema: ObjectSchema,
}

/// Result of a tool invocation. Failures are surfaced to the model as
/// structured tool output, never raised past the loop boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(payload: Value) -> Self {
        ToolResult {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolResult {
            success: false,
            payload: None,
            error: Some(message.into()),
        }
    }
}
