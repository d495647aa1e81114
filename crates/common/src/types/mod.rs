use serde::{Deserialize, Serialize};

/// Body of the health route: serializes to the bare JSON string `"ok"`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Health(pub String);

impl Health {
    pub fn ok() -> Self { Self("ok".to_string()) }
}

/// Uniform error body returned by every handler.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
