//! Machine-readable API description.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::AppMetadata;

/// GET /openapi.json — OpenAPI document for the service.
pub async fn document(State(metadata): State<Arc<AppMetadata>>) -> Json<Value> {
    Json(build(&metadata))
}

pub fn build(metadata: &AppMetadata) -> Value {
    json!({
        "openapi": "3.1.0",
        "info": {
            "title": metadata.title,
            "description": metadata.description,
            "version": metadata.version,
        },
        "paths": {
            "/health": {
                "get": {
                    "tags": ["Health"],
                    "summary": "Health Check",
                    "operationId": "health_check",
                    "responses": {
                        "200": {
                            "description": "Health status information",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/HealthResponse" }
                                }
                            }
                        },
                        "404": { "description": "Not found" }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "HealthResponse": {
                    "type": "object",
                    "required": ["status", "timestamp", "python_version", "system"],
                    "properties": {
                        "status": { "type": "string", "const": "ok" },
                        "timestamp": { "type": "number" },
                        "python_version": { "type": "string" },
                        "system": { "type": "string" }
                    }
                }
            }
        }
    })
}
