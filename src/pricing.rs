use rust_decimal::Decimal;

use crate::catalog::CatalogRef;

/// One order line with its unit price already resolved from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub item: CatalogRef,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderQuote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

/// Sum the lines and add the flat delivery fee. An empty order carries no fee.
pub fn quote(lines: Vec<PricedLine>, delivery_fee: Decimal) -> OrderQuote {
    let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
    let delivery_fee = if lines.is_empty() {
        Decimal::ZERO
    } else {
        delivery_fee
    };
    OrderQuote {
        total: subtotal + delivery_fee,
        lines,
        subtotal,
        delivery_fee,
    }
}
