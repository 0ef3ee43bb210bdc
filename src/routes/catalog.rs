use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    catalog::CatalogSource,
    dto::catalog::{CatalogForm, CatalogList, CatalogUploadForm, UploadedImage},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::CatalogItem,
    response::{ApiResponse, ErrorResponse},
    routes::params::CatalogQuery,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{source}", get(list_items).post(create_item))
        .route(
            "/{source}/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/products/{source}",
    params(
        ("source" = CatalogSource, Path, description = "Catalog variant: products or electronics"),
        CatalogQuery,
    ),
    responses(
        (status = 200, description = "List catalog items", body = ApiResponse<CatalogList>),
        (status = 400, description = "Unknown catalog variant"),
    ),
    tag = "Catalog"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Path(source): Path<CatalogSource>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<ApiResponse<CatalogList>>> {
    let resp = catalog_service::list_items(&state, source, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{source}/{id}",
    params(
        ("source" = CatalogSource, Path, description = "Catalog variant"),
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Get catalog item", body = ApiResponse<CatalogItem>),
        (status = 404, description = "Item not found", body = ErrorResponse),
    ),
    tag = "Catalog"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path((source, id)): Path<(CatalogSource, Uuid)>,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    let resp = catalog_service::get_item(&state, source, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products/{source}",
    params(
        ("source" = CatalogSource, Path, description = "Catalog variant")
    ),
    request_body(content = CatalogUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Create catalog item", body = ApiResponse<CatalogItem>),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(source): Path<CatalogSource>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<CatalogItem>>)> {
    ensure_admin(&user)?;
    let payload = read_form(multipart).await?.into_create()?;
    let resp = catalog_service::create_item(&state, &user, source, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/products/{source}/{id}",
    params(
        ("source" = CatalogSource, Path, description = "Catalog variant"),
        ("id" = Uuid, Path, description = "Item ID")
    ),
    request_body(content = CatalogUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated catalog item", body = ApiResponse<CatalogItem>),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((source, id)): Path<(CatalogSource, Uuid)>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<CatalogItem>>> {
    ensure_admin(&user)?;
    let payload = read_form(multipart).await?.into_update()?;
    let resp = catalog_service::update_item(&state, &user, source, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{source}/{id}",
    params(
        ("source" = CatalogSource, Path, description = "Catalog variant"),
        ("id" = Uuid, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Deleted catalog item"),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((source, id)): Path<(CatalogSource, Uuid)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_item(&state, &user, source, id).await?;
    Ok(Json(resp))
}

async fn read_form(mut multipart: Multipart) -> AppResult<CatalogForm> {
    let mut form = CatalogForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                if !bytes.is_empty() {
                    form.image = Some(UploadedImage {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "name" => form.name = Some(field.text().await.map_err(bad_multipart)?),
            "description" => form.description = Some(field.text().await.map_err(bad_multipart)?),
            "price" => form.price = Some(field.text().await.map_err(bad_multipart)?),
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }
    Ok(form)
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}
