use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/files", file_routes(config))
        .nest("/storage", storage_routes())
}

fn file_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::file::list_files,
            handlers::file::upload_file
        ))
        .routes(routes!(handlers::file::delete_file))
        .layer(handlers::file::upload_body_limit(
            config.storage.max_blob_size,
        ))
}

fn storage_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::storage::download_blob))
}
