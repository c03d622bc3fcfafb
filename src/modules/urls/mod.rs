pub mod models;
pub mod normalize;

use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use url::Url;

use shelf_http::error::AppError;
use shelf_kernel::{InitCtx, Module};

use models::{ProcessUrlRequest, ProcessedUrlResponse};
use normalize::{host_is_allowed, normalize};

/// URLs module: the stateless normalization endpoint.
pub struct UrlsModule;

impl UrlsModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for UrlsModule {
    fn name(&self) -> &'static str {
        "urls"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "urls module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new().route("/url", post(process_url))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/url": {
                    "post": {
                        "summary": "Normalize a URL",
                        "tags": ["Urls"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "operation": {
                                                "type": "string",
                                                "enum": ["canonical", "redirection", "all"]
                                            },
                                            "url": { "type": "string", "format": "uri" }
                                        },
                                        "required": ["operation", "url"]
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Processed URL",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "processed_url": { "type": "string" }
                                            }
                                        }
                                    }
                                }
                            },
                            "400": {
                                "description": "Invalid operation, URL, or host",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }
}

async fn process_url(
    body: Result<Json<ProcessUrlRequest>, JsonRejection>,
) -> Result<Json<ProcessedUrlResponse>, AppError> {
    let Json(body) = body.map_err(|err| AppError::bad_request(err.body_text()))?;

    let url = validate_url(&body.url)?;

    let processed = normalize(&body.url, &url, body.operation)
        .map_err(|_| AppError::bad_request("url host cannot be rewritten"))?;

    Ok(Json(ProcessedUrlResponse {
        processed_url: processed,
    }))
}

/// The URL must parse as absolute and its host must pass the containment
/// check.
fn validate_url(raw: &str) -> Result<Url, AppError> {
    let url =
        Url::parse(raw).map_err(|_| AppError::bad_request("url must be a well-formed absolute URL"))?;

    if !host_is_allowed(&url) {
        return Err(AppError::bad_request("url host is not allowed"));
    }

    Ok(url)
}

/// Create a new instance of the urls module.
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(UrlsModule::new())
}
