//! The MediaStack route table.
//!
//! Routes are registered in a fixed order and matched first-fit, so more
//! specific patterns must come before patterns that would shadow them.
//! Every handler is a plain `async fn` taking the shared [`AppState`] and the
//! validated [`RequestContext`].

use std::future::Future;
use std::sync::Arc;

use mediastack_http::{
    Handler, HandlerError, HandlerResponse, HttpMethod, RequestContext, Route, RouteTable, Schema,
};
use mediastack_model::MediaType;
use mediastack_model::input::{
    HelloParams, MediaIdParams, MultipartCompleteInput, MultipartPartsInput, MultipartStartInput,
    NewMediaInput, SingleUploadInput,
};
use mediastack_model::output::{
    FinalizeOutput, HealthOutput, MessageOutput, PresignedUrlOutput, ReadMediaOutput,
};

use crate::media::MediaService;
use crate::metadata::MetadataStore;
use crate::storage::StorageBackend;
use crate::upload::{MAX_PARTS, UploadService};

/// Server version reported by `GET /health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

type HandlerResult = Result<HandlerResponse, HandlerError>;

/// Services shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Record lifecycle.
    pub media: MediaService,
    /// Upload URLs and multipart uploads.
    pub upload: UploadService,
}

impl AppState {
    /// Wire the services over the given collaborators.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            media: MediaService::new(metadata, Arc::clone(&storage)),
            upload: UploadService::new(storage),
        }
    }
}

/// Build the full route table over `state`.
#[must_use]
pub fn route_table(state: Arc<AppState>) -> RouteTable {
    RouteTable::new()
        .route(Route::new(HttpMethod::Get, "/health", with_state(&state, health)))
        .route(
            Route::new(HttpMethod::Get, "/api/hello/:name", with_state(&state, hello))
                .with_params(Schema::object([(
                    "name",
                    Schema::string().non_empty("name is required"),
                )])),
        )
        .route(
            Route::new(HttpMethod::Post, "/api/media/new", with_state(&state, new_media))
                .with_body(Schema::object([(
                    "type",
                    Schema::one_of(MediaType::extensions()),
                )])),
        )
        .route(
            Route::new(
                HttpMethod::Post,
                "/api/media/:id/finalize",
                with_state(&state, finalize_media),
            )
            .with_params(id_params()),
        )
        .route(
            Route::new(HttpMethod::Get, "/api/media/:id", with_state(&state, read_media))
                .with_params(id_params()),
        )
        .route(
            Route::new(HttpMethod::Delete, "/api/media/:id", with_state(&state, delete_media))
                .with_params(id_params()),
        )
        .route(
            Route::new(HttpMethod::Put, "/api/upload/single", with_state(&state, single_upload))
                .with_body(key_body()),
        )
        .route(
            Route::new(
                HttpMethod::Post,
                "/api/upload/multipart/new",
                with_state(&state, start_multipart),
            )
            .with_body(key_body()),
        )
        .route(
            Route::new(
                HttpMethod::Put,
                "/api/upload/multipart/parts",
                with_state(&state, multipart_parts),
            )
            .with_body(Schema::object([
                ("uploadId", Schema::string().non_empty("uploadId is required")),
                (
                    "parts",
                    Schema::integer()
                        .min(1.0, "parts must be at least 1")
                        .max(f64::from(MAX_PARTS), "parts must be at most 10000"),
                ),
                ("key", Schema::string().non_empty("key is required")),
            ])),
        )
        .route(
            Route::new(
                HttpMethod::Post,
                "/api/upload/multipart/complete",
                with_state(&state, complete_multipart),
            )
            .with_body(Schema::object([
                ("key", Schema::string().non_empty("key is required")),
                ("uploadId", Schema::string().non_empty("uploadId is required")),
                (
                    "parts",
                    Schema::array(Schema::object([
                        (
                            "partNumber",
                            Schema::integer().min(1.0, "partNumber must be at least 1"),
                        ),
                        ("eTag", Schema::string().non_empty("eTag is required")),
                    ])),
                ),
            ])),
        )
}

fn id_params() -> Schema {
    Schema::object([("id", Schema::string().non_empty("id is required"))])
}

fn key_body() -> Schema {
    Schema::object([("key", Schema::string().non_empty("key is required"))])
}

/// Adapt `handler` into a route [`Handler`] that receives a clone of `state`.
fn with_state<F, Fut>(state: &Arc<AppState>, handler: F) -> impl Handler
where
    F: Fn(Arc<AppState>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let state = Arc::clone(state);
    move |ctx: RequestContext| handler(Arc::clone(&state), ctx)
}

async fn health(_state: Arc<AppState>, _ctx: RequestContext) -> HandlerResult {
    HandlerResponse::json(&HealthOutput {
        status: "running".to_owned(),
        version: VERSION.to_owned(),
    })
}

async fn hello(_state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let HelloParams { name } = ctx.params_as()?;
    HandlerResponse::json(&MessageOutput::new(format!("Hello {name}!")))
}

async fn new_media(state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let input: NewMediaInput = ctx.body_as()?;
    let created = state.media.init_file(input.media_type).await?;
    HandlerResponse::json(&created)
}

async fn finalize_media(state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let MediaIdParams { id } = ctx.params_as()?;
    state.media.finalize_file(&id).await?;
    HandlerResponse::json(&FinalizeOutput { id })
}

async fn read_media(state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let MediaIdParams { id } = ctx.params_as()?;
    let file = state.media.read_file(&id).await?;
    HandlerResponse::json(&ReadMediaOutput { url: file })
}

async fn delete_media(state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let MediaIdParams { id } = ctx.params_as()?;
    state.media.delete_file(&id).await?;
    HandlerResponse::json(&MessageOutput::new("File deleted"))
}

async fn single_upload(state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let SingleUploadInput { key } = ctx.body_as()?;
    state.media.verify_file(&key).await?;
    let url = state.upload.presigned_put_url(&key).await?;
    HandlerResponse::json(&PresignedUrlOutput { url })
}

async fn start_multipart(state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let MultipartStartInput { key } = ctx.body_as()?;
    state.media.verify_file(&key).await?;
    let started = state.upload.start_multipart(&key).await?;
    HandlerResponse::json(&started)
}

async fn multipart_parts(state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let input: MultipartPartsInput = ctx.body_as()?;
    state.media.verify_file(&input.key).await?;
    let urls = state
        .upload
        .multipart_part_urls(&input.key, &input.upload_id, input.parts)
        .await?;
    HandlerResponse::json(&urls)
}

async fn complete_multipart(state: Arc<AppState>, ctx: RequestContext) -> HandlerResult {
    let input: MultipartCompleteInput = ctx.body_as()?;
    state.media.verify_file(&input.key).await?;
    let completed = state
        .upload
        .complete_multipart(&input.key, &input.upload_id, input.parts)
        .await?;
    HandlerResponse::json(&completed)
}
