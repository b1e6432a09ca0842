/*!
Builders des réponses de l'API Prometheus (`/api/v1/query`)

Formes reproduites:
- `vector` : `{"metric": {...}, "value": [ts, "valeur"]}` par série
- `scalar` : `[ts, "valeur"]`
- erreurs  : `{"status": "error", "errorType": ..., "error": ...}`
*/

use serde_json::{json, Value};

pub struct PromResponse;

impl PromResponse {
    fn now() -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }

    /// Vecteur à une série
    pub fn vector(value: f64) -> Value {
        Self::vector_raw(&value.to_string())
    }

    /// Vecteur à une série, valeur brute (`"NaN"`, `"+Inf"`, ...)
    pub fn vector_raw(value: &str) -> Value {
        json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {}, "value": [Self::now(), value]}
                ]
            }
        })
    }

    /// Aucune série ne correspond
    pub fn empty_vector() -> Value {
        json!({
            "status": "success",
            "data": {"resultType": "vector", "result": []}
        })
    }

    pub fn scalar(value: f64) -> Value {
        json!({
            "status": "success",
            "data": {"resultType": "scalar", "result": [Self::now(), value.to_string()]}
        })
    }

    pub fn error(error_type: &str, message: &str) -> Value {
        json!({
            "status": "error",
            "errorType": error_type,
            "error": message
        })
    }
}
