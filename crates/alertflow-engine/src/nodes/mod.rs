//! The node family: one module per variant, plus the factory that maps a
//! persisted type tag to a constructed node.

pub mod condition;
pub mod email;
pub mod flood;
pub mod form;
pub mod sentinel;
pub mod sms;
pub mod weather;

pub use condition::ConditionNode;
pub use email::EmailNode;
pub use flood::FloodNode;
pub use form::FormNode;
pub use sentinel::SentinelNode;
pub use sms::SmsNode;
pub use weather::WeatherNode;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::GraphError;
use crate::traits::{Capabilities, Node};
use crate::types::{BaseFields, NodeRecord};

/// Construct the node variant matching the record's type tag, parsing its
/// metadata and injecting the capability adapters it needs.
///
/// The tag set is closed; unknown tags are a first-class error. The weather
/// node keeps its historical `"integration"` tag so persisted graphs keep
/// working.
pub fn build_node(record: &NodeRecord, caps: &Capabilities) -> Result<Box<dyn Node>, GraphError> {
    let base = BaseFields::from_record(record);
    match record.node_type.as_str() {
        "start" | "end" => Ok(Box::new(SentinelNode::new(base))),
        "form" => Ok(Box::new(FormNode::parse(base)?)),
        "integration" => Ok(Box::new(WeatherNode::parse(base, Arc::clone(&caps.weather))?)),
        "condition" => Ok(Box::new(ConditionNode::parse(base)?)),
        "email" => Ok(Box::new(EmailNode::parse(base, Arc::clone(&caps.email))?)),
        "sms" => Ok(Box::new(SmsNode::parse(base, Arc::clone(&caps.sms))?)),
        "flood" => Ok(Box::new(FloodNode::parse(base, Arc::clone(&caps.flood))?)),
        other => Err(GraphError::UnknownNodeType(other.to_string())),
    }
}

/// Build an output map from literal key/value pairs, preserving order.
pub(crate) fn output_map<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Render a variable value the way it reads in message text: strings bare,
/// everything else as its JSON form.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
