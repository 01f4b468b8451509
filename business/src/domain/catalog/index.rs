use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::Product;
use crate::domain::cart::model::CartLine;
use crate::domain::identity::model::{CanonicalId, ProductRef, RawId, VariantSelection};
use crate::domain::identity::normalizer::{identifier_forms, normalize};
use crate::domain::shared::value_objects::MinorUnits;

/// How a cart line was matched to a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    CanonicalId,
    RawId,
    ExactName,
    PartialName,
}

/// Lookup table over a catalog snapshot, keyed by every identifier form of
/// every product (including per-variant composite ids).
pub struct ProductIndex<'a> {
    products: &'a [Product],
    by_id: HashMap<String, usize>,
}

impl<'a> ProductIndex<'a> {
    pub fn build(products: &'a [Product]) -> Self {
        let mut by_id = HashMap::new();
        for (position, product) in products.iter().enumerate() {
            let mut keys = identifier_forms(&product.ids);
            if let Some(canonical) = normalize(&product.ids.clone().into()) {
                keys.push(canonical.as_str().to_string());
            }
            for variant in &product.variants {
                let with_variant = ProductRef {
                    selected_variant: Some(variant.clone()),
                    ..product.ids.clone()
                };
                if let Some(canonical) = normalize(&with_variant.into()) {
                    keys.push(canonical.as_str().to_string());
                }
            }
            for key in keys {
                by_id.entry(key).or_insert(position);
            }
        }
        Self { products, by_id }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Canonical id, then raw id, then case-insensitive exact name, then
    /// substring name, in that order.
    pub fn find(&self, line: &CartLine) -> Option<(&'a Product, MatchKind)> {
        if let Some(product) = self.by_key(line.canonical_product_id.as_str()) {
            return Some((product, MatchKind::CanonicalId));
        }

        if let Some(product) = line
            .product_id
            .as_ref()
            .and_then(RawId::to_key)
            .and_then(|key| self.by_key(&key))
        {
            return Some((product, MatchKind::RawId));
        }

        let wanted = line.name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        if let Some(product) = self
            .products
            .iter()
            .find(|p| p.name.trim().to_lowercase() == wanted)
        {
            return Some((product, MatchKind::ExactName));
        }

        self.products
            .iter()
            .find(|p| {
                let name = p.name.trim().to_lowercase();
                !name.is_empty() && (name.contains(&wanted) || wanted.contains(&name))
            })
            .map(|p| (p, MatchKind::PartialName))
    }

    fn by_key(&self, key: &str) -> Option<&'a Product> {
        self.by_id
            .get(key)
            .and_then(|position| self.products.get(*position))
    }
}

/// Catalog data to write onto one cart line. Quantity is never part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRefresh {
    pub line_id: Uuid,
    pub canonical_product_id: CanonicalId,
    pub product_id: Option<RawId>,
    pub name: String,
    pub unit_price: MinorUnits,
    pub in_stock: bool,
    pub image: Option<String>,
    pub synced_at: DateTime<Utc>,
}

impl LineRefresh {
    pub fn from_match(line: &CartLine, product: &Product, now: DateTime<Utc>) -> Self {
        let variant = line.selected_variant();
        let unit_price = variant
            .as_ref()
            .and_then(|selected| variant_price(product, selected))
            .unwrap_or(product.price);
        let ids = ProductRef {
            selected_variant: variant,
            ..product.ids.clone()
        };
        let canonical_product_id =
            normalize(&ids.clone().into()).unwrap_or_else(|| line.canonical_product_id.clone());

        Self {
            line_id: line.line_id,
            canonical_product_id,
            product_id: ids.primary_raw_id().or_else(|| line.product_id.clone()),
            name: product.name.clone(),
            unit_price,
            in_stock: product.in_stock,
            image: product.image.clone().or_else(|| line.image.clone()),
            synced_at: now,
        }
    }
}

fn variant_price(product: &Product, selected: &VariantSelection) -> Option<MinorUnits> {
    product
        .variants
        .iter()
        .find(|v| match (&selected.id, &v.id) {
            (Some(wanted), Some(id)) => wanted == id,
            _ => v.size_label().is_some() && v.size_label() == selected.size_label(),
        })
        .and_then(|v| v.price)
}
