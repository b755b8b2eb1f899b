//! Catalog domain types.

use teamspirit_core::{CatalogId, Price, ProductId};

/// Name given to catalogs created without one.
pub const DEFAULT_CATALOG_NAME: &str = "(catalogue sans nom)";
/// Name given to products created without one.
pub const DEFAULT_PRODUCT_NAME: &str = "(produit sans nom)";
/// Maximum length of catalog and product names.
pub const MAX_NAME_LENGTH: usize = 50;

/// A named collection of products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub id: CatalogId,
    pub name: String,
}

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub catalog_id: CatalogId,
    pub catalog_name: String,
    pub name: String,
    /// Storage key of the product photo, under `produits/`.
    pub image: Option<String>,
    pub is_available: bool,
    pub is_free: bool,
    /// Unit price; only meaningful when the product is not free.
    pub price: Option<Price>,
}

impl Product {
    /// Price label for listings: `Offert` for free products.
    #[must_use]
    pub fn price_label(&self) -> String {
        if self.is_free {
            return "Offert".to_owned();
        }
        self.price.unwrap_or(Price::ZERO).to_string()
    }
}

/// Data for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub catalog_id: CatalogId,
    pub name: String,
    pub image: Option<String>,
    pub is_available: bool,
    pub is_free: bool,
    pub price: Option<Price>,
}
