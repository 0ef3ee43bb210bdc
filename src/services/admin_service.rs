use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use uuid::Uuid;

use crate::{
    audit,
    catalog::CatalogSource,
    dto::{
        dashboard::{DashboardStats, SourceUnits, StatusTotals},
        orders::UpdateOrderStatusRequest,
    },
    entity::orders::{ActiveModel as OrderActive, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    services::order_service::order_from_entity,
    state::AppState,
};

/// Overwrite an order's status. Any status may follow any other.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status: OrderStatus = payload.status.parse().map_err(AppError::BadRequest)?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let Some(existing) = existing else {
        return Err(AppError::NotFound);
    };

    let previous = existing.status;
    if previous.is_terminal() && previous != status {
        tracing::warn!(order_id = %id, from = %previous, to = %status, "order leaving terminal status");
    }

    let mut active: OrderActive = existing.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %order.status, "order status updated");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": previous, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Aggregate revenue, order counts and units sold across every order.
pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;

    let status_rows: Vec<(String, i64, Decimal)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*)::BIGINT, COALESCE(SUM(total_amount), 0)
        FROM orders
        GROUP BY status
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let unit_rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT source, COALESCE(SUM(quantity), 0)::BIGINT
        FROM order_items
        GROUP BY source
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let statuses = status_rows
        .into_iter()
        .filter_map(|(status, orders, revenue)| match status.parse::<OrderStatus>() {
            Ok(status) => Some(StatusTotals {
                status,
                orders,
                revenue,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "skipping orders with unknown status");
                None
            }
        });

    let units = unit_rows
        .into_iter()
        .filter_map(|(source, units)| match source.parse::<CatalogSource>() {
            Ok(source) => Some(SourceUnits { source, units }),
            Err(err) => {
                tracing::warn!(error = %err, "skipping order items with unknown source");
                None
            }
        });

    let stats = DashboardStats::fold(statuses, units);
    Ok(ApiResponse::success("Dashboard", stats, Some(Meta::empty())))
}
