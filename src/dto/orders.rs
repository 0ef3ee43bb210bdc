use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    catalog::{CatalogRef, CatalogSource, UnknownCatalogSource},
    error::{AppError, AppResult},
    models::{Order, OrderItem},
};

/// Most lines a single order may carry.
pub const MAX_ORDER_LINES: usize = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DeliveryInfo {
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: String,
}

impl DeliveryInfo {
    fn validate(&self) -> AppResult<()> {
        let fields = [
            ("name", &self.name),
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
            ("phone", &self.phone),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(AppError::BadRequest(format!(
                    "deliveryInfo.{field} is required"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// `products` or `electronics`.
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub delivery_info: DeliveryInfo,
    pub carts: Vec<OrderLineRequest>,
}

/// A placement request that passed validation: every line has a known
/// catalog variant and a positive quantity.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub delivery_info: DeliveryInfo,
    pub lines: Vec<(CatalogRef, i32)>,
}

impl PlaceOrderRequest {
    pub fn validate(self) -> AppResult<ValidatedOrder> {
        self.delivery_info.validate()?;
        if self.carts.is_empty() {
            return Err(AppError::BadRequest("carts must not be empty".into()));
        }
        if self.carts.len() > MAX_ORDER_LINES {
            return Err(AppError::BadRequest(format!(
                "an order may have at most {MAX_ORDER_LINES} lines"
            )));
        }

        let mut lines = Vec::with_capacity(self.carts.len());
        for line in self.carts {
            let source: CatalogSource = line
                .source
                .parse()
                .map_err(|err: UnknownCatalogSource| AppError::BadRequest(err.to_string()))?;
            if line.quantity <= 0 {
                return Err(AppError::BadRequest(format!(
                    "quantity for {} must be greater than 0",
                    line.product_id
                )));
            }
            lines.push((source.item(line.product_id), line.quantity));
        }

        Ok(ValidatedOrder {
            delivery_info: self.delivery_info,
            lines,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub message: String,
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    /// `None` when the catalog row has since been deleted.
    pub product_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery() -> DeliveryInfo {
        DeliveryInfo {
            name: "Ada".into(),
            address: "1 Main St".into(),
            city: "Lagos".into(),
            country: "NG".into(),
            phone: "+234000".into(),
        }
    }

    fn line(source: &str, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id: Uuid::new_v4(),
            quantity,
            source: source.into(),
        }
    }

    #[test]
    fn parses_wire_payload() {
        let id = Uuid::new_v4();
        let payload: PlaceOrderRequest = serde_json::from_value(serde_json::json!({
            "deliveryInfo": {
                "name": "Ada", "address": "1 Main St", "city": "Lagos",
                "country": "NG", "phone": "+234000"
            },
            "carts": [{ "productId": id, "quantity": 2, "source": "electronics" }]
        }))
        .unwrap();

        let order = payload.validate().unwrap();
        assert_eq!(order.lines, vec![(CatalogRef::Electronics(id), 2)]);
    }

    #[test]
    fn rejects_empty_cart() {
        let request = PlaceOrderRequest {
            delivery_info: delivery(),
            carts: vec![],
        };
        assert!(matches!(request.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_oversized_cart() {
        let request = PlaceOrderRequest {
            delivery_info: delivery(),
            carts: (0..=MAX_ORDER_LINES).map(|_| line("products", 1)).collect(),
        };
        match request.validate() {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("at most")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let request = PlaceOrderRequest {
            delivery_info: delivery(),
            carts: vec![line("products", 1), line("products", 0)],
        };
        assert!(matches!(request.validate(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_unknown_source() {
        let request = PlaceOrderRequest {
            delivery_info: delivery(),
            carts: vec![line("groceries", 1)],
        };
        match request.validate() {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("groceries")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_delivery_field() {
        let mut info = delivery();
        info.phone = "  ".into();
        let request = PlaceOrderRequest {
            delivery_info: info,
            carts: vec![line("products", 1)],
        };
        match request.validate() {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("phone")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
