use serde::{Deserialize, Serialize};

use crate::domain::shared::value_objects::MinorUnits;

/// An identifier as it arrives from the catalog or an older cart: either a
/// string id or a legacy numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    /// Stringified, trimmed form. `None` for blank strings.
    pub fn to_key(&self) -> Option<String> {
        match self {
            RawId::Number(n) => Some(n.to_string()),
            RawId::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

impl From<&str> for RawId {
    fn from(s: &str) -> Self {
        RawId::Text(s.to_string())
    }
}

impl From<String> for RawId {
    fn from(s: String) -> Self {
        RawId::Text(s)
    }
}

impl From<i64> for RawId {
    fn from(n: i64) -> Self {
        RawId::Number(n)
    }
}

/// The variant a shopper picked (size, mass or an explicit variant id).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSelection {
    pub id: Option<String>,
    pub size: Option<String>,
    pub mass: Option<String>,
    pub sku: Option<String>,
    pub price: Option<MinorUnits>,
}

impl VariantSelection {
    /// Variant id, else size, else mass.
    pub fn discriminator(&self) -> Option<&str> {
        [&self.id, &self.size, &self.mass]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// Size label used in line signatures (size, else mass).
    pub fn size_label(&self) -> Option<&str> {
        [&self.size, &self.mass]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

/// Every identifier field a product-ish record may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductRef {
    pub product_id: Option<RawId>,
    /// Document id (`_id` on the wire).
    pub document_id: Option<RawId>,
    pub id: Option<RawId>,
    pub numeric_id: Option<i64>,
    pub cart_item_id: Option<String>,
    pub sku: Option<String>,
    pub selected_variant: Option<VariantSelection>,
}

impl ProductRef {
    pub fn with_id(id: impl Into<RawId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// First raw product identifier in priority order, as given.
    pub fn primary_raw_id(&self) -> Option<RawId> {
        [
            self.product_id.clone(),
            self.document_id.clone(),
            self.id.clone(),
            self.numeric_id.map(RawId::Number),
        ]
        .into_iter()
        .flatten()
        .find(|id| id.to_key().is_some())
    }
}

/// Input accepted by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductLike {
    Bare(RawId),
    Record(ProductRef),
}

impl From<&str> for ProductLike {
    fn from(s: &str) -> Self {
        ProductLike::Bare(RawId::from(s))
    }
}

impl From<i64> for ProductLike {
    fn from(n: i64) -> Self {
        ProductLike::Bare(RawId::Number(n))
    }
}

impl From<ProductRef> for ProductLike {
    fn from(record: ProductRef) -> Self {
        ProductLike::Record(record)
    }
}

/// Which rule produced a canonical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdSource {
    CartLine,
    Product,
    Variant,
    Sku,
    Bare,
}

/// The single identifier the core matches on. Equality and hashing look at
/// the key only, so re-normalizing a key yields an equal id.
#[derive(Debug, Clone)]
pub struct CanonicalId {
    source: IdSource,
    key: String,
}

impl CanonicalId {
    pub(crate) fn new(source: IdSource, key: String) -> Self {
        Self { source, key }
    }

    /// Rebuilds an id read back from storage.
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            source: IdSource::Bare,
            key: key.into(),
        }
    }

    pub fn source(&self) -> IdSource {
        self.source
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl PartialEq for CanonicalId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CanonicalId {}

impl std::hash::Hash for CanonicalId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}
