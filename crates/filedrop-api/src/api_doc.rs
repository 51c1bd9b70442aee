//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use filedrop_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filedrop API",
        version = "0.1.0",
        description = "Presigned-URL file sharing over an object store. Clients request an upload credential, push the bytes directly to storage, and hand out a download link that expires with the share."
    ),
    paths(
        handlers::upload::create_upload,
        handlers::download::resolve_download,
        handlers::cleanup::run_cleanup,
    ),
    components(schemas(
        models::UploadRequest,
        models::UploadResponse,
        models::PresignedUpload,
        models::DownloadResponse,
        models::CleanupSummary,
        error::ErrorResponse,
    )),
    tags(
        (name = "shares", description = "Create shares and resolve them to download URLs"),
        (name = "internal", description = "Operational endpoints for schedulers")
    )
)]
pub struct ApiDoc;
