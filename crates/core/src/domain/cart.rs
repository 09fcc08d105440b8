use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::product::{Product, ProductId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default, alias = "subtotal")]
    pub line_subtotal: Decimal,
}

impl CartLine {
    pub fn for_product(product: &Product, quantity: u32, variant: Option<String>) -> Self {
        let mut line = Self {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            variant,
            line_subtotal: Decimal::ZERO,
        };
        line.recalculate();
        line
    }

    pub(crate) fn recalculate(&mut self) {
        self.line_subtotal = self.unit_price * Decimal::from(self.quantity);
    }

    fn matches(&self, product_id: &ProductId, variant: Option<&str>) -> bool {
        &self.product_id == product_id && self.variant.as_deref() == variant
    }
}

/// Ordered lines for one customer. `(product_id, variant)` is unique across lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub customer_id: CustomerId,
    pub lines: Vec<CartLine>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(customer_id: CustomerId) -> Self {
        Self { customer_id, lines: Vec::new(), updated_at: Utc::now() }
    }

    /// Adds a line or merges into the existing `(product, variant)` line. Returns the line's
    /// resulting quantity.
    pub fn add_item(&mut self, product: &Product, quantity: u32, variant: Option<String>) -> u32 {
        self.updated_at = Utc::now();

        if let Some(line) =
            self.lines.iter_mut().find(|line| line.matches(&product.id, variant.as_deref()))
        {
            line.quantity = line.quantity.saturating_add(quantity);
            line.recalculate();
            return line.quantity;
        }

        self.lines.push(CartLine::for_product(product, quantity, variant));
        quantity
    }

    /// Removes the line at a 1-based position.
    pub fn remove_line(&mut self, position: usize) -> Option<CartLine> {
        if position == 0 || position > self.lines.len() {
            return None;
        }
        self.updated_at = Utc::now();
        Some(self.lines.remove(position - 1))
    }

    /// Sets the quantity of a line. Zero or negative removes it.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        variant: Option<&str>,
        quantity: i64,
    ) -> bool {
        let Some(index) = self.lines.iter().position(|line| line.matches(product_id, variant))
        else {
            return false;
        };

        self.updated_at = Utc::now();
        if quantity <= 0 {
            self.lines.remove(index);
            return true;
        }

        let line = &mut self.lines[index];
        line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        line.recalculate();
        true
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .filter(|line| &line.product_id == product_id)
            .map(|line| line.quantity)
            .sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.updated_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|line| line.line_subtotal).sum()
    }

    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::Cart;
    use crate::domain::customer::CustomerId;
    use crate::domain::product::{Product, ProductDraft, ProductId};

    fn product(id: &str, price: i64) -> Product {
        Product::from_draft(
            ProductId(id.to_owned()),
            format!("SKU-{id}"),
            ProductDraft {
                name: format!("Product {id}"),
                description: String::new(),
                price: Decimal::new(price, 0),
                stock: 10,
                category: "umum".to_owned(),
                image: None,
            },
        )
    }

    fn cart() -> Cart {
        Cart::new(CustomerId("6281234567890".to_owned()))
    }

    #[test]
    fn repeated_add_merges_into_single_line() {
        let mut cart = cart();
        let item = product("P-1", 50_000);

        cart.add_item(&item, 1, None);
        let quantity = cart.add_item(&item, 2, None);

        assert_eq!(quantity, 3);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].line_subtotal, Decimal::new(150_000, 0));
    }

    #[test]
    fn distinct_variants_are_separate_lines() {
        let mut cart = cart();
        let item = product("P-1", 20_000);

        cart.add_item(&item, 1, Some("M".to_owned()));
        cart.add_item(&item, 1, Some("L".to_owned()));
        cart.add_item(&item, 1, None);

        assert_eq!(cart.lines.len(), 3);
        assert_eq!(cart.quantity_of(&item.id), 3);
    }

    #[test]
    fn remove_line_uses_one_based_positions() {
        let mut cart = cart();
        cart.add_item(&product("P-1", 1_000), 1, None);
        cart.add_item(&product("P-2", 2_000), 1, None);

        assert!(cart.remove_line(0).is_none());
        assert!(cart.remove_line(3).is_none());
        let removed = cart.remove_line(2).expect("second line exists");

        assert_eq!(removed.product_id.0, "P-2");
        assert_eq!(cart.lines.len(), 1);
    }

    #[test]
    fn update_quantity_to_zero_removes_line() {
        let mut cart = cart();
        let item = product("P-1", 5_000);
        cart.add_item(&item, 4, None);

        assert!(cart.update_quantity(&item.id, None, 2));
        assert_eq!(cart.total(), Decimal::new(10_000, 0));

        assert!(cart.update_quantity(&item.id, None, 0));
        assert!(cart.is_empty());
        assert!(!cart.update_quantity(&item.id, None, 1));
    }

    #[test]
    fn totals_sum_line_subtotals_and_quantities() {
        let mut cart = cart();
        cart.add_item(&product("P-1", 50_000), 2, None);
        cart.add_item(&product("P-2", 15_000), 1, None);

        assert_eq!(cart.total(), Decimal::new(115_000, 0));
        assert_eq!(cart.total_items(), 3);

        cart.clear();
        assert_eq!(cart.total(), Decimal::ZERO);
    }
}
