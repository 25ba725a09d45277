//! Wire types shared between the player and the synthesis backend

use serde::{Deserialize, Serialize};

/// Body of `POST /api/speak` sent to the synthesis backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub lang: String,
}

/// Manifest returned by the synthesis backend.
///
/// `session` names a server-side set of rendered segments; `count` is how
/// many numbered segments the set holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub session: String,
    pub count: u32,
}

/// JSON error body the backend returns on failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_deserialization() {
        let json = r#"{"session": "abc123", "count": 4}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.session, "abc123");
        assert_eq!(manifest.count, 4);
    }

    #[test]
    fn test_synthesis_request_round_trip() {
        let req = SynthesisRequest {
            text: "hola mundo".to_string(),
            lang: "es".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"lang\":\"es\""));
    }
}
