use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub detail: String,
}

impl DeleteResponse {
    pub fn deleted() -> Self {
        Self {
            detail: "Client deleted".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadinessResponse {
    pub fn ready(store: String) -> Self {
        Self {
            status: "ready".to_string(),
            store,
            error: None,
        }
    }

    pub fn not_ready(store: String, error: Option<String>) -> Self {
        Self {
            status: "not_ready".to_string(),
            store,
            error,
        }
    }
}
