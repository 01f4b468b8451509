use serde::{Deserialize, Serialize};
use serde_json::Value;

use business::domain::catalog::model::Product;
use business::domain::identity::model::{ProductRef, RawId, VariantSelection};
use business::domain::shared::value_objects::MinorUnits;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantDto {
    #[serde(default, alias = "_id")]
    id: Option<RawId>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    mass: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    price: Option<f64>,
}

impl VariantDto {
    fn into_domain(self) -> VariantSelection {
        VariantSelection {
            id: self.id.and_then(|id| id.to_key()),
            size: self.size,
            mass: self.mass,
            sku: self.sku,
            price: self.price.and_then(to_minor_units),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductDto {
    #[serde(default)]
    product_id: Option<RawId>,
    #[serde(default, rename = "_id")]
    document_id: Option<RawId>,
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default)]
    numeric_id: Option<i64>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    in_stock: Option<bool>,
    #[serde(default)]
    stock_quantity: Option<i64>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    variants: Vec<VariantDto>,
}

impl ProductDto {
    pub(crate) fn into_domain(self) -> Product {
        let stock_quantity = self
            .stock_quantity
            .map(|q| u32::try_from(q.max(0)).unwrap_or(u32::MAX));
        let in_stock = self
            .in_stock
            .unwrap_or_else(|| stock_quantity.is_none_or(|q| q > 0));

        Product {
            ids: ProductRef {
                product_id: self.product_id,
                document_id: self.document_id,
                id: self.id,
                numeric_id: self.numeric_id,
                cart_item_id: None,
                sku: self.sku,
                selected_variant: None,
            },
            name: self.name.unwrap_or_default(),
            price: self.price.and_then(to_minor_units).unwrap_or(0),
            image: self.image.or_else(|| self.images.into_iter().next()),
            in_stock,
            stock_quantity,
            category: self.category,
            variants: self.variants.into_iter().map(VariantDto::into_domain).collect(),
        }
    }
}

/// Catalog prices arrive in the same minor units the cart stores; fractional
/// values are rounded.
fn to_minor_units(value: f64) -> Option<MinorUnits> {
    (value.is_finite() && value >= 0.0).then(|| value.round() as MinorUnits)
}

/// Accepts a bare array or an object wrapping it under `products` or `data`.
pub(crate) fn product_list(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => ["products", "data"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MpesaInitiateDto<'a> {
    pub phone_number: &'a str,
    pub amount: u64,
    pub order_id: &'a str,
    pub description: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MpesaInitiatedDto {
    #[serde(default, alias = "CheckoutRequestID")]
    pub checkout_request_id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, alias = "CustomerMessage")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MpesaStatusDto {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "mpesaReceiptNumber")]
    pub receipt_number: Option<String>,
    #[serde(default, alias = "resultDesc")]
    pub message: Option<String>,
}
