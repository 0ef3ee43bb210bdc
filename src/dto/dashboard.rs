use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{catalog::CatalogSource, models::OrderStatus};

/// One `GROUP BY status` row over `orders`.
#[derive(Debug, Clone)]
pub struct StatusTotals {
    pub status: OrderStatus,
    pub orders: i64,
    pub revenue: Decimal,
}

/// One `GROUP BY source` row over `order_items`.
#[derive(Debug, Clone)]
pub struct SourceUnits {
    pub source: CatalogSource,
    pub units: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Sum of `total_amount` over every order regardless of status.
    pub total_revenue: Decimal,
    pub delivered_revenue: Decimal,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    pub products_sold_count: i64,
    pub electronics_sold_count: i64,
}

impl DashboardStats {
    pub fn fold<S, U>(statuses: S, units: U) -> Self
    where
        S: IntoIterator<Item = StatusTotals>,
        U: IntoIterator<Item = SourceUnits>,
    {
        let mut stats = DashboardStats::default();

        for row in statuses {
            stats.total_orders += row.orders;
            stats.total_revenue += row.revenue;
            match row.status {
                OrderStatus::Pending => stats.pending_orders += row.orders,
                OrderStatus::Delivered => {
                    stats.delivered_orders += row.orders;
                    stats.delivered_revenue += row.revenue;
                }
                OrderStatus::Cancelled => stats.cancelled_orders += row.orders,
                OrderStatus::Processing | OrderStatus::Shipped => {}
            }
        }

        for row in units {
            match row.source {
                CatalogSource::Products => stats.products_sold_count += row.units,
                CatalogSource::Electronics => stats.electronics_sold_count += row.units,
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_counts_every_status() {
        let stats = DashboardStats::fold(
            [
                StatusTotals {
                    status: OrderStatus::Pending,
                    orders: 2,
                    revenue: Decimal::from(40),
                },
                StatusTotals {
                    status: OrderStatus::Delivered,
                    orders: 1,
                    revenue: Decimal::from(30),
                },
                StatusTotals {
                    status: OrderStatus::Cancelled,
                    orders: 1,
                    revenue: Decimal::from(10),
                },
            ],
            Vec::<SourceUnits>::new(),
        );

        assert_eq!(stats.total_revenue, Decimal::from(80));
        assert_eq!(stats.delivered_revenue, Decimal::from(30));
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.pending_orders, 2);
        assert_eq!(stats.delivered_orders, 1);
        assert_eq!(stats.cancelled_orders, 1);
    }

    #[test]
    fn units_are_split_by_source() {
        let stats = DashboardStats::fold(
            Vec::<StatusTotals>::new(),
            [
                SourceUnits {
                    source: CatalogSource::Products,
                    units: 7,
                },
                SourceUnits {
                    source: CatalogSource::Electronics,
                    units: 3,
                },
            ],
        );

        assert_eq!(stats.products_sold_count, 7);
        assert_eq!(stats.electronics_sold_count, 3);
        assert_eq!(stats.total_revenue, Decimal::ZERO);
    }
}
