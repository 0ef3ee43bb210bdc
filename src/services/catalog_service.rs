use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    audit,
    catalog::CatalogSource,
    dto::catalog::{CatalogList, CreateCatalogItem, UpdateCatalogItem, UploadedImage},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::CatalogItem,
    response::{ApiResponse, Meta},
    routes::params::{CatalogQuery, CatalogSortBy, SortOrder},
    state::AppState,
    storage::object_key,
};

const COLUMNS: &str = "id, name, description, price, image, created_at, updated_at";

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CatalogQuery) {
    builder.push(" WHERE TRUE");
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min_price) = query.min_price {
        builder.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = query.max_price {
        builder.push(" AND price <= ").push_bind(max_price);
    }
}

pub async fn list_items(
    state: &AppState,
    source: CatalogSource,
    query: CatalogQuery,
) -> AppResult<ApiResponse<CatalogList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let sort_by = query.sort_by.unwrap_or(CatalogSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut count = QueryBuilder::<Postgres>::new(format!(
        "SELECT COUNT(*) FROM {}",
        source.table_name()
    ));
    push_filters(&mut count, &query);
    let total: i64 = count.build_query_scalar::<i64>().fetch_one(&state.pool).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM {}",
        source.table_name()
    ));
    push_filters(&mut select, &query);
    select
        .push(format!(
            " ORDER BY {} {}, id LIMIT ",
            sort_by.as_sql(),
            sort_order.as_sql()
        ))
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = select
        .build_query_as::<CatalogItem>()
        .fetch_all(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        source.as_str(),
        CatalogList { items },
        Some(meta),
    ))
}

pub async fn find_item(
    state: &AppState,
    source: CatalogSource,
    id: Uuid,
) -> AppResult<Option<CatalogItem>> {
    let item = sqlx::query_as::<_, CatalogItem>(&format!(
        "SELECT {COLUMNS} FROM {} WHERE id = $1",
        source.table_name()
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;
    Ok(item)
}

pub async fn get_item(
    state: &AppState,
    source: CatalogSource,
    id: Uuid,
) -> AppResult<ApiResponse<CatalogItem>> {
    match find_item(state, source, id).await? {
        Some(item) => Ok(ApiResponse::success("Item", item, None)),
        None => Err(AppError::ProductNotFound(source.item(id))),
    }
}

pub async fn create_item(
    state: &AppState,
    user: &AuthUser,
    source: CatalogSource,
    payload: CreateCatalogItem,
) -> AppResult<ApiResponse<CatalogItem>> {
    ensure_admin(user)?;

    let image_url = match payload.image.as_ref() {
        Some(image) => Some(store_image(state, source, image).await?),
        None => None,
    };

    let inserted = sqlx::query_as::<_, CatalogItem>(&format!(
        "INSERT INTO {} (id, name, description, price, image) VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}",
        source.table_name()
    ))
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.description)
    .bind(payload.price)
    .bind(image_url.as_deref())
    .fetch_one(&state.pool)
    .await;

    let item = match inserted {
        Ok(item) => item,
        Err(err) => {
            if let Some(url) = image_url.as_deref() {
                discard_image(state, url).await;
            }
            return Err(err.into());
        }
    };

    tracing::info!(%source, item_id = %item.id, "catalog item created");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "catalog_create",
        source.as_str(),
        serde_json::json!({ "id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Item created",
        item,
        Some(Meta::empty()),
    ))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    source: CatalogSource,
    id: Uuid,
    payload: UpdateCatalogItem,
) -> AppResult<ApiResponse<CatalogItem>> {
    ensure_admin(user)?;
    let Some(existing) = find_item(state, source, id).await? else {
        return Err(AppError::ProductNotFound(source.item(id)));
    };

    let new_image = match payload.image.as_ref() {
        Some(image) => Some(store_image(state, source, image).await?),
        None => None,
    };

    let name = payload.name.unwrap_or(existing.name);
    let description = match payload.description {
        Some(description) => description,
        None => existing.description,
    };
    let price = payload.price.unwrap_or(existing.price);
    let image = new_image.clone().or_else(|| existing.image.clone());

    let updated = sqlx::query_as::<_, CatalogItem>(&format!(
        r#"
        UPDATE {}
        SET name = $2, description = $3, price = $4, image = $5, updated_at = now()
        WHERE id = $1
        RETURNING {COLUMNS}
        "#,
        source.table_name()
    ))
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(image)
    .fetch_optional(&state.pool)
    .await;

    let item = match updated {
        Ok(Some(item)) => item,
        other => {
            if let Some(url) = new_image.as_deref() {
                discard_image(state, url).await;
            }
            return Err(match other {
                Err(err) => err.into(),
                Ok(_) => AppError::ProductNotFound(source.item(id)),
            });
        }
    };

    if let (Some(_), Some(old)) = (new_image.as_ref(), existing.image.as_deref()) {
        discard_image(state, old).await;
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "catalog_update",
        source.as_str(),
        serde_json::json!({ "id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        item,
        Some(Meta::empty()),
    ))
}

pub async fn delete_item(
    state: &AppState,
    user: &AuthUser,
    source: CatalogSource,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let deleted: Option<(Option<String>,)> = sqlx::query_as(&format!(
        "DELETE FROM {} WHERE id = $1 RETURNING image",
        source.table_name()
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?;

    let Some((image,)) = deleted else {
        return Err(AppError::ProductNotFound(source.item(id)));
    };
    if let Some(url) = image.as_deref() {
        discard_image(state, url).await;
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "catalog_delete",
        source.as_str(),
        serde_json::json!({ "id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn store_image(
    state: &AppState,
    source: CatalogSource,
    image: &UploadedImage,
) -> AppResult<String> {
    if let Some(content_type) = image.content_type.as_deref() {
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "image must be an image, got {content_type}"
            )));
        }
    }
    if image.bytes.is_empty() {
        return Err(AppError::BadRequest("image is empty".into()));
    }

    let key = object_key(source, &image.file_name);
    let url = state
        .storage
        .put(&key, image.content_type.as_deref(), &image.bytes)
        .await?;
    Ok(url)
}

async fn discard_image(state: &AppState, url: &str) {
    if let Err(err) = state.storage.remove(url).await {
        tracing::warn!(error = %err, url, "failed to remove stored image");
    }
}
