use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use business::domain::cart::model::{
    CartLine, DEFAULT_STOCK_LIMIT, DEFAULT_VARIANT_SIZE, LineVariant,
};
use business::domain::identity::model::{CanonicalId, ProductLike, RawId};
use business::domain::identity::normalizer::normalize;
use business::domain::shared::value_objects::MinorUnits;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineVariantEntity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

/// Stored shape of a cart or wishlist line. Every field except the name is
/// optional on read so documents written by older clients still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineEntity {
    #[serde(default)]
    pub line_id: Option<Uuid>,
    #[serde(default)]
    pub canonical_product_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<RawId>,
    pub name: String,
    #[serde(default)]
    pub unit_price: MinorUnits,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub variant: LineVariantEntity,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub stock_limit: Option<u32>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_quantity() -> u32 {
    1
}

fn default_in_stock() -> bool {
    true
}

impl CartLineEntity {
    pub fn from_domain(line: &CartLine) -> Self {
        Self {
            line_id: Some(line.line_id),
            canonical_product_id: Some(line.canonical_product_id.to_string()),
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            variant: LineVariantEntity {
                id: line.variant.id.clone(),
                size: Some(line.variant.size.clone()),
                sku: Some(line.variant.sku.clone()),
            },
            image: line.image.clone(),
            in_stock: line.in_stock,
            stock_limit: Some(line.stock_limit),
            last_synced_at: line.last_synced_at,
            added_at: Some(line.added_at),
            updated_at: Some(line.updated_at),
        }
    }

    /// Restores a domain line. Returns `None` when no product identity can
    /// be recovered from the stored record.
    pub fn into_domain(self, now: DateTime<Utc>) -> Option<CartLine> {
        let canonical = self
            .canonical_product_id
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(CanonicalId::from_key)
            .or_else(|| {
                self.product_id
                    .clone()
                    .and_then(|id| normalize(&ProductLike::Bare(id)))
            })?;

        let size = self
            .variant
            .size
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VARIANT_SIZE.to_string());
        let sku = self
            .variant
            .sku
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("SKU-{}", canonical));
        let stock_limit = self
            .stock_limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_STOCK_LIMIT);
        let added_at = self.added_at.unwrap_or(now);

        Some(CartLine {
            line_id: self.line_id.unwrap_or_else(Uuid::new_v4),
            canonical_product_id: canonical,
            product_id: self.product_id,
            name: self.name,
            unit_price: self.unit_price,
            quantity: self.quantity.clamp(1, stock_limit),
            variant: LineVariant {
                id: self.variant.id,
                size,
                sku,
            },
            image: self.image,
            in_stock: self.in_stock,
            stock_limit,
            last_synced_at: self.last_synced_at,
            added_at,
            updated_at: self.updated_at.unwrap_or(added_at),
        })
    }
}
