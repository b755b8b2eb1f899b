//! Product catalog.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Product;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "catalogs/product_list.html")]
pub struct ProductListTemplate {
    pub products: Vec<Product>,
}

/// All products, grouped by catalog name.
pub async fn product_list(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<impl IntoResponse> {
    let products = state.repos().catalogs.list_products().await?;
    Ok(ProductListTemplate { products })
}
