pub mod models;
pub mod repo;
pub mod routes;

use anyhow::anyhow;
use async_trait::async_trait;
use axum::Router;
use once_cell::sync::OnceCell;
use shelf_db::SharedStore;
use shelf_kernel::{InitCtx, Module};

/// Books module: create and delete catalog records
pub struct BooksModule {
    store: OnceCell<SharedStore>,
}

impl BooksModule {
    pub fn new() -> Self {
        Self {
            store: OnceCell::new(),
        }
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.store
            .set(ctx.db.clone())
            .map_err(|_| anyhow!("books module initialized twice"))?;

        // A failed probe is reported but does not block startup.
        let store = ctx.db.clone();
        match tokio::task::spawn_blocking(move || repo::check_health(store.as_ref())).await? {
            Ok(()) => tracing::info!(
                module = self.name(),
                environment = ?ctx.settings.environment,
                "books module initialized"
            ),
            Err(err) => tracing::warn!(
                module = self.name(),
                error = %err,
                "books module initialized but the store did not answer its probe"
            ),
        }

        Ok(())
    }

    fn routes(&self) -> Router {
        match self.store.get() {
            Some(store) => routes::router(store.clone()),
            None => {
                tracing::warn!(module = self.name(), "routes requested before init");
                Router::new()
            }
        }
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let envelope = |description: &str| {
            serde_json::json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Envelope" }
                    }
                }
            })
        };

        Some(serde_json::json!({
            "paths": {
                "/": {
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": envelope("Book created"),
                            "400": envelope("Malformed payload"),
                            "500": envelope("Store failure")
                        }
                    }
                },
                "/{id}": {
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "id",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "integer", "format": "int64" }
                        }],
                        "responses": {
                            "200": envelope("Delete statement executed"),
                            "400": envelope("Missing or zero id"),
                            "500": envelope("Store failure")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Store connectivity check",
                        "tags": ["Books"],
                        "responses": {
                            "200": envelope("Store reachable"),
                            "503": envelope("Store unreachable")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "author": { "type": "string" },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "isbn": { "type": "string" },
                            "id": {
                                "type": "integer",
                                "format": "int64",
                                "description": "Assigned by the store; 0 until persisted"
                            }
                        },
                        "required": ["author", "title", "description", "isbn", "id"]
                    },
                    "NewBook": {
                        "type": "object",
                        "properties": {
                            "author": { "type": "string" },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "isbn": { "type": "string" }
                        },
                        "required": ["author", "title", "description", "isbn"]
                    }
                }
            }
        }))
    }

    fn schema(&self) -> &'static [&'static str] {
        &[repo::BOOKS_TABLE]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use shelf_db::mock::{Call, MockStore};
    use shelf_kernel::{settings::Settings, ModuleRegistry};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn init_probes_store_and_exposes_routes() {
        let store = Arc::new(MockStore::new());
        let db: SharedStore = store.clone();
        let settings = Settings::default();
        let module = BooksModule::new();

        module
            .init(&InitCtx {
                settings: &settings,
                db: &db,
            })
            .await
            .unwrap();
        assert_eq!(store.calls(), vec![Call::Ping]);

        let response = module
            .routes()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn init_tolerates_unreachable_store_but_not_double_init() {
        let db: SharedStore = Arc::new(MockStore::new().fail_ping("no route to host"));
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        let module = BooksModule::new();

        module.init(&ctx).await.unwrap();
        assert!(module.init(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn full_stack_create_then_delete() {
        let db = shelf_db::connect(":memory:").unwrap();
        let settings = Settings::default();
        let mut registry = ModuleRegistry::new();
        registry.register(create_module());
        registry.ensure_schema(db.as_ref()).unwrap();
        registry
            .init_all(&InitCtx {
                settings: &settings,
                db: &db,
            })
            .await
            .unwrap();

        let app = shelf_http::build_router(&registry, &settings);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/books")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"author":"Terry Pratchett","title":"Mort","description":"...","isbn":"9780552144292"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/books/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/books/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
