use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use warung_core::domain::catalog::Catalog;
use warung_core::domain::product::Product;
use warung_db::repositories::{ProductRepository, SqlProductRepository};

use crate::commands::{load_config, migrated_pool, runtime, CommandResult, StepFailure};

/// Accepts a bare product array or a webhook-style `{ "products": [...] }` body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Products(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

pub fn run(catalog_path: &Path) -> CommandResult {
    match seed(catalog_path) {
        Ok(message) => CommandResult::success("seed", message),
        Err(failure) => failure.into_result("seed"),
    }
}

fn seed(catalog_path: &Path) -> Result<String, StepFailure> {
    let products = load_catalog(catalog_path)
        .map_err(|error| StepFailure::new("catalog_file", format!("{error:#}"), 6))?;
    let config = load_config()?;
    let runtime = runtime()?;

    let stats = Catalog::new(products.clone()).stats();
    runtime.block_on(async {
        let (pool, _) = migrated_pool(&config).await?;
        SqlProductRepository::new(pool.clone())
            .replace_all(products)
            .await
            .map_err(|error| StepFailure::new("seed_execution", error.to_string(), 5))?;
        pool.close().await;
        Ok::<(), StepFailure>(())
    })?;

    Ok(format!(
        "seeded {} products ({} available) across {} categories from {}",
        stats.total,
        stats.available,
        stats.categories,
        catalog_path.display()
    ))
}

pub(crate) fn load_catalog(path: &Path) -> anyhow::Result<Vec<Product>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read catalog file `{}`", path.display()))?;
    let products = match serde_json::from_str::<CatalogFile>(&raw)
        .with_context(|| format!("catalog file `{}` is not a product list", path.display()))?
    {
        CatalogFile::Products(products) | CatalogFile::Wrapped { products } => products,
    };

    let mut skus = BTreeSet::new();
    for product in &products {
        product.validate()?;
        if !skus.insert(product.sku.to_ascii_uppercase()) {
            bail!("duplicate sku `{}` in catalog file", product.sku);
        }
    }
    Ok(products)
}
