//! JSON rendering for protobuf `Struct` records.
//!
//! Sinks that persist rows as text or documents use these to turn the
//! dynamically typed measurement records into `serde_json` values.

use prost_types::{value::Kind, ListValue, Struct, Value};
use serde_json::{Map, Number, Value as Json};

/// Converts a protobuf `Struct` into a JSON object.
pub fn struct_to_json(record: &Struct) -> Json {
    Json::Object(
        record
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value_to_json(value)))
            .collect::<Map<String, Json>>(),
    )
}

/// Converts a protobuf `Value` into JSON. Non-finite numbers become `null`.
pub fn value_to_json(value: &Value) -> Json {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Json::Null,
        Some(Kind::NumberValue(n)) => Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Some(Kind::StringValue(s)) => Json::String(s.clone()),
        Some(Kind::BoolValue(b)) => Json::Bool(*b),
        Some(Kind::StructValue(s)) => struct_to_json(s),
        Some(Kind::ListValue(ListValue { values })) => {
            Json::Array(values.iter().map(value_to_json).collect())
        }
    }
}

/// Renders a record as a compact JSON line.
pub fn record_to_string(record: &Struct) -> String {
    struct_to_json(record).to_string()
}
