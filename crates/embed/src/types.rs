use serde::{Deserialize, Serialize};

/// Ollama embed request (`POST /api/embed`)
#[derive(Debug, Clone, Serialize)]
pub struct EmbedRequest {
    /// Model name (e.g., "all-minilm", "nomic-embed-text")
    pub model: String,

    /// Texts to embed, answered in the same order
    pub input: Vec<String>,

    /// Truncate inputs that exceed the model context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,
}

/// Ollama embed response
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    /// Model name
    #[serde(default)]
    pub model: String,

    /// One vector per input text
    pub embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = EmbedRequest {
            model: "all-minilm".to_string(),
            input: vec!["a".to_string(), "b".to_string()],
            truncate: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "all-minilm");
        assert_eq!(json["input"][1], "b");
        assert!(json.get("truncate").is_none());
    }

    #[test]
    fn test_response_parse() {
        let body = r#"{"model":"all-minilm","embeddings":[[0.6,0.8],[1.0,0.0]],"total_duration":12}"#;
        let response: EmbedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[0], vec![0.6, 0.8]);
    }
}
