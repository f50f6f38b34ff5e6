//! HTTP surface: one set of CRUD routes per entity plus a metadata endpoint.
//!
//! | method   | path                  | operation |
//! |----------|-----------------------|-----------|
//! | `GET`    | `/<ns>/<entity>`      | list (`?skip=&limit=`) |
//! | `POST`   | `/<ns>/<entity>`      | create |
//! | `GET`    | `/<ns>/<entity>/{id}` | get |
//! | `PATCH`  | `/<ns>/<entity>/{id}` | partial update |
//! | `DELETE` | `/<ns>/<entity>/{id}` | delete |
//! | `GET`    | `/_meta/entities`     | registered entities and their shapes |
//!
//! Failures are rendered as `{"error": {"kind", "message", "details"?}}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use schemaforge_engine::{CrudBinding, CrudError, CrudResult, Page};
use schemaforge_model::{
    AuthError, CompiledEntity, EntityKey, EntityRegistry, HookError, Identity, IdentityResolver,
};
use schemaforge_storage::{Session, Store};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

use crate::auth;

/// State shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub registry: Arc<EntityRegistry>,
    pub resolver: Arc<dyn IdentityResolver>,
    pub require_auth: bool,
    pub default_page_limit: u64,
}

impl AppState {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Identity>, ApiError> {
        auth::authenticate(self.resolver.as_ref(), headers, self.require_auth).map_err(|e| {
            debug!(error = %e, "authentication failed");
            ApiError::from(e)
        })
    }
}

#[derive(Clone)]
struct EntityState {
    app: AppState,
    binding: Arc<CrudBinding>,
}

impl EntityState {
    /// Runs one engine operation on the blocking pool with its own session.
    async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&CrudBinding, &mut Session<'_>) -> CrudResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.app.store);
        let binding = Arc::clone(&self.binding);
        let outcome = tokio::task::spawn_blocking(move || -> CrudResult<T> {
            let mut session = store.session()?;
            op(binding.as_ref(), &mut session)
        })
        .await
        .map_err(|e| {
            error!(entity = %self.binding.key(), error = %e, "request task failed");
            ApiError::internal("request failed")
        })?;
        outcome.map_err(|e| ApiError::from_crud(self.binding.key(), e))
    }
}

/// Builds the router for a set of entity bindings.
pub fn router(state: AppState, bindings: BTreeMap<EntityKey, CrudBinding>) -> Router {
    let mut app = Router::new()
        .route("/_meta/entities", get(list_entities))
        .with_state(state.clone());

    for (key, binding) in bindings {
        let prefix = key.route_prefix();
        let entity = EntityState {
            app: state.clone(),
            binding: Arc::new(binding),
        };
        let routes = Router::new()
            .route(&prefix, get(list_records).post(create_record))
            .route(&format!("{prefix}/"), get(list_records).post(create_record))
            .route(
                &format!("{prefix}/{{id}}"),
                get(get_record).patch(update_record).delete(delete_record),
            )
            .with_state(entity);
        app = app.merge(routes);
        debug!(entity = %key, route = %prefix, "mounted routes");
    }

    app.fallback(unknown_route)
}

// ── Handlers ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListQuery {
    skip: Option<u64>,
    limit: Option<u64>,
}

async fn list_records(
    State(state): State<EntityState>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Value>>, ApiError> {
    state.app.authenticate(&headers)?;
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let page = Page::new(
        query.skip.unwrap_or(0),
        query.limit.unwrap_or(state.app.default_page_limit),
    );
    let records = state
        .run(move |binding, session| binding.list(session, page))
        .await?;
    Ok(Json(records))
}

async fn get_record(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    state.app.authenticate(&headers)?;
    let record = state
        .run(move |binding, session| binding.get(session, &id))
        .await?;
    Ok(Json(record))
}

async fn create_record(
    State(state): State<EntityState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let identity = state.app.authenticate(&headers)?;
    let Json(payload) = body?;
    let record = state
        .run(move |binding, session| binding.create(session, identity.as_ref(), &payload))
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_record(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let identity = state.app.authenticate(&headers)?;
    let Json(payload) = body?;
    let record = state
        .run(move |binding, session| binding.update(session, identity.as_ref(), &id, &payload))
        .await?;
    Ok(Json(record))
}

async fn delete_record(
    State(state): State<EntityState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let identity = state.app.authenticate(&headers)?;
    let record = state
        .run(move |binding, session| binding.delete(session, identity.as_ref(), &id))
        .await?;
    Ok(Json(record))
}

#[derive(Serialize)]
struct EntitySummary<'a> {
    key: String,
    route: String,
    #[serde(flatten)]
    entity: &'a CompiledEntity,
}

async fn list_entities(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.authenticate(&headers)?;
    let summaries: Vec<EntitySummary<'_>> = state
        .registry
        .entries()
        .into_iter()
        .map(|entry| EntitySummary {
            key: entry.key().to_string(),
            route: entry.key().route_prefix(),
            entity: entry.entity(),
        })
        .collect();
    Ok(Json(summaries).into_response())
}

async fn unknown_route() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", "no such route")
}

// ── Errors ───────────────────────────────────────────────────────

/// An error response. Storage internals never reach the message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    details: Option<Value>,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            details: None,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    fn from_crud(key: &EntityKey, err: CrudError) -> Self {
        let kind = err.kind();
        match err {
            CrudError::NotFound { .. } => {
                debug!(entity = %key, error = %err, "not found");
                Self::new(StatusCode::NOT_FOUND, kind, err.to_string())
            }
            CrudError::Validation(errors) => {
                debug!(entity = %key, error = %errors, "rejected payload");
                let mut api = Self::new(StatusCode::BAD_REQUEST, kind, errors.to_string());
                api.details = serde_json::to_value(errors.errors()).ok();
                api
            }
            CrudError::Hook(HookError::Denied(message)) => {
                debug!(entity = %key, error = %message, "hook denied request");
                Self::new(StatusCode::FORBIDDEN, kind, message)
            }
            CrudError::Hook(HookError::Invalid(message)) => {
                debug!(entity = %key, error = %message, "hook rejected payload");
                Self::new(StatusCode::BAD_REQUEST, kind, message)
            }
            CrudError::Hook(HookError::Failed(message)) => {
                error!(entity = %key, kind, error = %message, "hook failed");
                Self::internal("hook failed").with_kind(kind)
            }
            CrudError::Persistence(e) => {
                error!(entity = %key, kind, error = %e, "storage failure");
                Self::internal("storage failure").with_kind(kind)
            }
            CrudError::SchemaMismatch(message) => {
                error!(entity = %key, kind, error = %message, "stored data does not match entity");
                Self::internal("stored data does not match the entity definition").with_kind(kind)
            }
        }
    }

    fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = json!({
            "kind": self.kind,
            "message": self.message,
        });
        if let (Some(details), Some(object)) = (self.details, error.as_object_mut()) {
            object.insert("details".into(), details);
        }
        let mut response = (self.status, Json(json!({ "error": error }))).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
