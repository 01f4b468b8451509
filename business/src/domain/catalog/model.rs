use crate::domain::identity::model::{ProductRef, VariantSelection};
use crate::domain::shared::value_objects::MinorUnits;

/// A live catalog record. Read-only to the checkout core.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub ids: ProductRef,
    pub name: String,
    pub price: MinorUnits,
    pub image: Option<String>,
    pub in_stock: bool,
    pub stock_quantity: Option<u32>,
    pub category: Option<String>,
    pub variants: Vec<VariantSelection>,
}

impl Product {
    /// Catalog view of this product with one variant picked, ready for
    /// add-to-cart.
    pub fn to_cart_product(&self, variant: Option<VariantSelection>) -> CartProduct {
        let price = variant
            .as_ref()
            .and_then(|v| v.price)
            .unwrap_or(self.price);
        CartProduct {
            ids: ProductRef {
                selected_variant: variant,
                ..self.ids.clone()
            },
            name: self.name.clone(),
            price,
            image: self.image.clone(),
            in_stock: Some(self.in_stock),
            stock_quantity: self.stock_quantity,
        }
    }
}

/// What add-to-cart receives: identifiers (with the selected variant) plus
/// display and stock data. Absent fields get cart defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartProduct {
    pub ids: ProductRef,
    pub name: String,
    pub price: MinorUnits,
    pub image: Option<String>,
    pub in_stock: Option<bool>,
    pub stock_quantity: Option<u32>,
}

/// Filters for a catalog fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
}
