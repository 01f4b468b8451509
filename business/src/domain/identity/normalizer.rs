//! Resolution of the many ad-hoc identifier fields into one [`CanonicalId`].
//!
//! Cart store, wishlist and catalog sync all match through this module and
//! never through raw fields.

use super::model::{CanonicalId, IdSource, ProductLike, ProductRef};

/// Resolves a product-ish record to its canonical id.
///
/// Rules, first match wins:
/// 1. `cart_item_id` (a cart line is its own identity)
/// 2. first of `product_id`, `document_id`, `id`, `numeric_id`, with the
///    variant discriminator appended when a variant is selected
/// 3. `sku`
///
/// Returns `None` when nothing resolves.
pub fn normalize(record: &ProductLike) -> Option<CanonicalId> {
    match record {
        ProductLike::Bare(raw) => raw
            .to_key()
            .map(|key| CanonicalId::new(IdSource::Bare, key)),
        ProductLike::Record(product) => normalize_record(product),
    }
}

fn normalize_record(product: &ProductRef) -> Option<CanonicalId> {
    if let Some(cart_item_id) = non_blank(product.cart_item_id.as_deref()) {
        return Some(CanonicalId::new(IdSource::CartLine, cart_item_id));
    }

    if let Some(first) = candidate_ids(product).into_iter().next() {
        let discriminator = product
            .selected_variant
            .as_ref()
            .and_then(|v| v.discriminator());
        return Some(match discriminator {
            Some(d) => CanonicalId::new(IdSource::Variant, composite_key(&first, d)),
            None => CanonicalId::new(IdSource::Product, first),
        });
    }

    non_blank(product.sku.as_deref()).map(|sku| CanonicalId::new(IdSource::Sku, sku))
}

/// Every identifier form a record can be looked up by: all raw candidates,
/// the composite variant id and the sku. Deduplicated, in priority order.
pub fn identifier_forms(product: &ProductRef) -> Vec<String> {
    let mut forms = candidate_ids(product);

    if let Some(first) = forms.first().cloned()
        && let Some(d) = product
            .selected_variant
            .as_ref()
            .and_then(|v| v.discriminator())
    {
        forms.push(composite_key(&first, d));
    }

    if let Some(sku) = non_blank(product.sku.as_deref()) {
        forms.push(sku);
    }

    let mut seen = std::collections::HashSet::new();
    forms.retain(|f| seen.insert(f.clone()));
    forms
}

/// Merge key of a cart line: canonical id plus variant size.
pub fn line_signature(canonical: &CanonicalId, variant_size: &str) -> String {
    format!("{}_{}", canonical.as_str(), variant_size)
}

fn candidate_ids(product: &ProductRef) -> Vec<String> {
    [
        product.product_id.as_ref().and_then(|id| id.to_key()),
        product.document_id.as_ref().and_then(|id| id.to_key()),
        product.id.as_ref().and_then(|id| id.to_key()),
        product.numeric_id.map(|n| n.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn composite_key(base: &str, discriminator: &str) -> String {
    format!("{}-{}", base, discriminator)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
