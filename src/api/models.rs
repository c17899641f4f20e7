//! API response models.
//!
//! Chat completion payloads pass through untyped; only the gateway's own
//! responses are modelled here.

use serde::{Deserialize, Serialize};

/// One routable `provider:model` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

/// Response of `GET /models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelEntry>,
    pub object: String,
}

impl ModelList {
    pub fn from_ids(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            data: ids.into_iter().map(|id| ModelEntry { id }).collect(),
            object: "list".to_string(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_list_serialization() {
        let list = ModelList::from_ids(vec!["a:m1".to_string(), "b:m2".to_string()]);
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({"data": [{"id": "a:m1"}, {"id": "b:m2"}], "object": "list"})
        );
    }

    #[test]
    fn test_empty_model_list() {
        let json = serde_json::to_string(&ModelList::from_ids(Vec::new())).unwrap();
        assert_eq!(json, r#"{"data":[],"object":"list"}"#);
    }
}
