use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::CartError;
use crate::domain::catalog::model::CartProduct;
use crate::domain::identity::model::{CanonicalId, ProductRef, RawId, VariantSelection};
use crate::domain::identity::normalizer::{line_signature, normalize};
use crate::domain::shared::value_objects::MinorUnits;

/// Size used when a product is added without a variant.
pub const DEFAULT_VARIANT_SIZE: &str = "370g";

/// Stock limit assumed when the catalog does not report a quantity.
pub const DEFAULT_STOCK_LIMIT: u32 = 999;

/// Flat shipping fee applied to any non-empty cart (minor units).
pub const DEFAULT_SHIPPING_FEE: MinorUnits = 20_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineVariant {
    pub id: Option<String>,
    pub size: String,
    pub sku: String,
}

/// One purchasable unit in the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub line_id: Uuid,
    pub canonical_product_id: CanonicalId,
    pub product_id: Option<RawId>,
    pub name: String,
    pub unit_price: MinorUnits,
    pub quantity: u32,
    pub variant: LineVariant,
    pub image: Option<String>,
    pub in_stock: bool,
    pub stock_limit: u32,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    /// Builds a fresh line for an add-to-cart event. Quantity is capped at
    /// the stock limit by the caller.
    pub fn new(
        product: &CartProduct,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, CartError> {
        if quantity < 1 {
            return Err(CartError::QuantityBelowMinimum);
        }

        let canonical = normalize(&product.ids.clone().into())
            .ok_or(CartError::UnresolvableProduct)?;

        let selected = product.ids.selected_variant.as_ref();
        let size = variant_size(product);
        let sku = selected
            .and_then(|v| v.sku.clone())
            .or_else(|| product.ids.sku.clone())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("SKU-{}", canonical));

        Ok(Self {
            line_id: Uuid::new_v4(),
            canonical_product_id: canonical,
            product_id: product.ids.primary_raw_id(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            variant: LineVariant {
                id: selected.and_then(|v| v.id.clone()),
                size,
                sku,
            },
            image: product.image.clone(),
            in_stock: product.in_stock != Some(false),
            stock_limit: product
                .stock_quantity
                .filter(|q| *q > 0)
                .unwrap_or(DEFAULT_STOCK_LIMIT),
            last_synced_at: None,
            added_at: now,
            updated_at: now,
        })
    }

    /// Merge key: canonical id plus variant size.
    pub fn signature(&self) -> String {
        line_signature(&self.canonical_product_id, &self.variant.size)
    }

    pub fn line_total(&self) -> MinorUnits {
        self.unit_price * MinorUnits::from(self.quantity)
    }

    /// The variant this line was added with, when its canonical id is a
    /// product/variant composite.
    pub fn selected_variant(&self) -> Option<VariantSelection> {
        let raw = self.product_id.as_ref().and_then(RawId::to_key)?;
        if raw == self.canonical_product_id.as_str() {
            return None;
        }
        Some(VariantSelection {
            id: self.variant.id.clone(),
            size: Some(self.variant.size.clone()),
            sku: Some(self.variant.sku.clone()),
            ..VariantSelection::default()
        })
    }

    /// Rebuilds an add-to-cart product that normalizes back to this line.
    pub fn to_cart_product(&self) -> CartProduct {
        let ids = match self.selected_variant() {
            Some(variant) => ProductRef {
                product_id: self.product_id.clone(),
                selected_variant: Some(variant),
                ..ProductRef::default()
            },
            None => ProductRef {
                id: Some(RawId::from(self.canonical_product_id.as_str())),
                sku: Some(self.variant.sku.clone()),
                ..ProductRef::default()
            },
        };

        CartProduct {
            ids,
            name: self.name.clone(),
            price: self.unit_price,
            image: self.image.clone(),
            in_stock: Some(self.in_stock),
            stock_quantity: (self.stock_limit != DEFAULT_STOCK_LIMIT).then_some(self.stock_limit),
        }
    }
}

/// Merge key a product would get as a cart line, without building the line.
pub fn product_signature(product: &CartProduct) -> Option<String> {
    let canonical = normalize(&product.ids.clone().into())?;
    Some(line_signature(&canonical, &variant_size(product)))
}

fn variant_size(product: &CartProduct) -> String {
    product
        .ids
        .selected_variant
        .as_ref()
        .and_then(|v| v.size_label())
        .unwrap_or(DEFAULT_VARIANT_SIZE)
        .to_string()
}

/// Derived cart figures. Always recomputed from the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: MinorUnits,
    pub shipping: MinorUnits,
    pub total: MinorUnits,
    pub item_count: u64,
}

impl CartTotals {
    pub fn compute(lines: &[CartLine], shipping_fee: MinorUnits) -> Self {
        let subtotal: MinorUnits = lines.iter().map(CartLine::line_total).sum();
        let item_count = lines.iter().map(|l| u64::from(l.quantity)).sum();
        let shipping = if subtotal > 0 { shipping_fee } else { 0 };

        Self {
            subtotal,
            shipping,
            total: subtotal + shipping,
            item_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartConfig {
    pub shipping_fee: MinorUnits,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            shipping_fee: DEFAULT_SHIPPING_FEE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn product(id: &str, price: MinorUnits) -> CartProduct {
        CartProduct {
            ids: ProductRef::with_id(id),
            name: format!("Product {}", id),
            price,
            ..CartProduct::default()
        }
    }

    #[test]
    fn should_apply_defaults_for_missing_fields() {
        let line = CartLine::new(&product("A1", 500), 1, Utc::now()).unwrap();

        assert_eq!(line.variant.size, DEFAULT_VARIANT_SIZE);
        assert_eq!(line.variant.sku, "SKU-A1");
        assert!(line.in_stock);
        assert_eq!(line.stock_limit, DEFAULT_STOCK_LIMIT);
        assert!(line.last_synced_at.is_none());
        assert_eq!(line.product_id, Some(RawId::from("A1")));
    }

    #[test]
    fn should_keep_explicit_out_of_stock_flag() {
        let mut p = product("A1", 500);
        p.in_stock = Some(false);
        p.stock_quantity = Some(3);

        let line = CartLine::new(&p, 1, Utc::now()).unwrap();

        assert!(!line.in_stock);
        assert_eq!(line.stock_limit, 3);
    }

    #[test]
    fn should_take_size_and_sku_from_variant() {
        let mut p = product("A1", 500);
        p.ids.selected_variant = Some(VariantSelection {
            size: Some("1kg".to_string()),
            sku: Some("HNY-1KG".to_string()),
            ..VariantSelection::default()
        });

        let line = CartLine::new(&p, 2, Utc::now()).unwrap();

        assert_eq!(line.variant.size, "1kg");
        assert_eq!(line.variant.sku, "HNY-1KG");
        assert_eq!(line.signature(), "A1-1kg_1kg");
    }

    #[test]
    fn should_rebuild_product_with_same_signature() {
        let mut plain = product("A1", 500);
        plain.stock_quantity = Some(6);
        let mut sized = product("B2", 900);
        sized.ids.selected_variant = Some(VariantSelection {
            size: Some("1kg".to_string()),
            ..VariantSelection::default()
        });

        for original in [plain, sized] {
            let line = CartLine::new(&original, 1, Utc::now()).unwrap();
            let rebuilt = line.to_cart_product();

            assert_eq!(product_signature(&rebuilt), Some(line.signature()));
            assert_eq!(rebuilt.stock_quantity, original.stock_quantity);
        }
    }

    #[test]
    fn should_reject_unresolvable_product() {
        let p = CartProduct {
            name: "Mystery".to_string(),
            ..CartProduct::default()
        };

        let result = CartLine::new(&p, 1, Utc::now());

        assert!(matches!(result, Err(CartError::UnresolvableProduct)));
    }

    #[test]
    fn should_reject_zero_quantity() {
        let result = CartLine::new(&product("A1", 500), 0, Utc::now());
        assert!(matches!(result, Err(CartError::QuantityBelowMinimum)));
    }

    #[test]
    fn should_charge_no_shipping_for_empty_cart() {
        let totals = CartTotals::compute(&[], 20_000);
        assert_eq!(totals.subtotal, 0);
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.total, 0);
        assert_eq!(totals.item_count, 0);
    }

    proptest! {
        #[test]
        fn totals_are_a_pure_function_of_lines(
            items in proptest::collection::vec((0u64..100_000, 1u32..50), 0..12),
            fee in 0u64..50_000,
        ) {
            let now = Utc::now();
            let lines: Vec<CartLine> = items
                .iter()
                .enumerate()
                .map(|(i, (price, qty))| CartLine::new(&product(&format!("P{}", i), *price), *qty, now).unwrap())
                .collect();

            let totals = CartTotals::compute(&lines, fee);
            let expected: u64 = items.iter().map(|(p, q)| p * u64::from(*q)).sum();

            prop_assert_eq!(totals.subtotal, expected);
            prop_assert_eq!(totals.total, totals.subtotal + totals.shipping);
            prop_assert_eq!(totals.shipping == 0, totals.subtotal == 0 || fee == 0);
            prop_assert_eq!(totals.item_count, items.iter().map(|(_, q)| u64::from(*q)).sum::<u64>());
        }
    }
}
