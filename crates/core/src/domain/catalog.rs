use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::product::Product;

/// Read view over the product collection with a category index.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    categories: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub product_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub available: usize,
    pub categories: usize,
}

impl Catalog {
    pub fn new(mut products: Vec<Product>) -> Self {
        products.sort_by(|left, right| {
            left.name.to_lowercase().cmp(&right.name.to_lowercase()).then(left.id.cmp(&right.id))
        });

        let mut categories = BTreeMap::new();
        for product in &products {
            *categories.entry(product.category.to_lowercase()).or_insert(0) += 1;
        }

        Self { products, categories }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn available(&self) -> Vec<&Product> {
        self.products.iter().filter(|product| product.is_listed()).collect()
    }

    pub fn in_category(&self, category: &str) -> Vec<&Product> {
        let wanted = category.trim().to_lowercase();
        self.products
            .iter()
            .filter(|product| product.is_listed() && product.category.to_lowercase() == wanted)
            .collect()
    }

    pub fn find_by_sku(&self, sku: &str) -> Option<&Product> {
        let wanted = sku.trim();
        self.products.iter().find(|product| product.sku.eq_ignore_ascii_case(wanted))
    }

    /// Case-insensitive substring match over name, description and sku.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.products
            .iter()
            .filter(|product| {
                product.name.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
                    || product.sku.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn categories(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .map(|(name, count)| CategorySummary { name: name.clone(), product_count: *count })
            .collect()
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            total: self.products.len(),
            available: self.products.iter().filter(|product| product.is_listed()).count(),
            categories: self.categories.len(),
        }
    }
}
