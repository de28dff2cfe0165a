//! Product catalog listing.

use serde::Serialize;
use tabled::Tabled;

use pairkit_core::{PairingCloud, PlatformBackend};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::{config, output};

#[derive(Debug, Serialize)]
struct Product {
    product_id: String,
}

#[derive(Tabled)]
struct ProductRow {
    #[tabled(rename = "Product ID")]
    product_id: String,
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let backend = PlatformBackend::from_config(&resolved.session)?;

    let mut ids = backend
        .product_ids()
        .await
        .map_err(|e| CliError::CatalogUnavailable {
            reason: e.to_string(),
        })?;
    ids.retain(|id| !id.is_empty());
    ids.sort();
    ids.dedup();
    tracing::info!(products = ids.len(), "catalog loaded");

    let products: Vec<Product> = ids
        .into_iter()
        .map(|product_id| Product { product_id })
        .collect();
    let out = output::render_list(
        &global.output,
        &products,
        |p| ProductRow {
            product_id: p.product_id.clone(),
        },
        |p| p.product_id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
