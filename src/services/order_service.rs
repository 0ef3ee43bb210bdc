use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    catalog::CatalogRef,
    dto::orders::{OrderCreated, OrderItemView, OrderList, OrderWithItems, PlaceOrderRequest},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus},
    pricing::{self, PricedLine},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Validate the payload, price every line from the catalog and write the
/// order with its items in one transaction.
///
/// Unit prices are read inside the transaction and copied onto each
/// `order_items` row; nothing price-related from the client is used. If any
/// referenced item is missing the transaction is dropped and nothing is
/// written.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<OrderCreated> {
    let order = payload.validate()?;

    let txn = state.orm.begin().await?;

    let snapshots = state
        .catalogs
        .resolve(&txn, order.lines.iter().map(|(item, _)| *item))
        .await?;

    let mut priced = Vec::with_capacity(order.lines.len());
    for (item, quantity) in &order.lines {
        let Some(snapshot) = snapshots.get(item) else {
            tracing::info!(user_id = %user.user_id, %item, "order references missing catalog item");
            return Err(AppError::ProductNotFound(*item));
        };
        priced.push(PricedLine {
            item: *item,
            quantity: *quantity,
            unit_price: snapshot.price,
        });
    }

    let quote = pricing::quote(priced, state.config.delivery_fee);

    let order_id = Uuid::new_v4();
    OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        total_amount: Set(quote.total),
        status: Set(OrderStatus::Pending),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for line in &quote.lines {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.item.id()),
            source: Set(line.item.source()),
            quantity: Set(line.quantity),
            price: Set(line.unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    tracing::info!(
        %order_id,
        user_id = %user.user_id,
        lines = quote.lines.len(),
        total = %quote.total,
        city = %order.delivery_info.city,
        "order placed"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_placed",
        "orders",
        serde_json::json!({ "order_id": order_id, "total_amount": quote.total }),
    )
    .await;

    Ok(OrderCreated {
        message: "Order placed successfully".into(),
        order_id,
    })
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse().map_err(AppError::BadRequest)?;
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = with_items(state, &state.orm, orders).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let Some(order) = order else {
        return Err(AppError::NotFound);
    };

    let mut loaded = with_items(state, &state.orm, vec![order]).await?;
    let data = loaded.pop().ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Attach items to each order and resolve item names through the catalog
/// registry. Items whose catalog row no longer exists keep `product_name`
/// empty.
pub(crate) async fn with_items<C>(
    state: &AppState,
    db: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>>
where
    C: ConnectionTrait,
{
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(ids))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(db)
        .await?;

    let names = state
        .catalogs
        .resolve(db, rows.iter().map(|row| CatalogRef::new(row.source, row.product_id)))
        .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for row in rows {
        let product_name = names
            .get(&CatalogRef::new(row.source, row.product_id))
            .map(|snapshot| snapshot.name.clone());
        grouped.entry(row.order_id).or_default().push(OrderItemView {
            item: order_item_from_entity(row),
            product_name,
        });
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderWithItems {
            items: grouped.remove(&order.id).unwrap_or_default(),
            order: order_from_entity(order),
        })
        .collect())
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        source: model.source,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
