//! Shopping cart (pre-orders).
//!
//! ```text
//! GET  /shopping_cart/                          cart lines and total
//! GET  /shopping_cart/add_product/{productId}/  add form
//! POST /shopping_cart/add_product/{productId}/  add line, back to the catalog
//! GET  /shopping_cart/drop_product/{lineId}/    confirm page
//! POST /shopping_cart/drop_product/{lineId}/    drop line, back to the cart
//! ```

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use teamspirit_core::{AddLineRequest, CartLineId, ProductId, Size, ValidationErrors};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CartLine, DropOutcome, Product};
use crate::services::preorder::{CartSummary, PreorderError, PreorderService};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "preorders/cart.html")]
pub struct CartTemplate {
    pub summary: CartSummary,
}

#[derive(Template, WebTemplate)]
#[template(path = "preorders/add_product.html")]
pub struct AddProductTemplate {
    pub product: Product,
    pub form: AddLineRequest,
    pub sizes: [Size; 5],
    pub errors: ValidationErrors,
}

impl AddProductTemplate {
    fn new(product: Product, form: AddLineRequest, errors: ValidationErrors) -> Self {
        Self {
            product,
            form,
            sizes: Size::ALL,
            errors,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "preorders/drop_product.html")]
pub struct DropProductTemplate {
    pub line: CartLine,
}

/// The member's cart, created on first visit.
pub async fn cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let summary = PreorderService::new(state.repos()).summary(user.id).await?;
    Ok(CartTemplate { summary })
}

pub async fn add_product_page(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(product_id): Path<i32>,
) -> Result<impl IntoResponse> {
    let product = PreorderService::new(state.repos())
        .product(ProductId::new(product_id))
        .await?;
    let form = AddLineRequest {
        quantity: "1".to_string(),
        size: Size::M.as_str().to_string(),
    };
    Ok(AddProductTemplate::new(product, form, ValidationErrors::new()))
}

/// Add a line, or re-render the form with the rejected fields.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<i32>,
    Form(form): Form<AddLineRequest>,
) -> Result<Response> {
    let product_id = ProductId::new(product_id);
    let service = PreorderService::new(state.repos());

    let errors = match service.add_to_cart(user.id, product_id, &form).await {
        Ok(line) => {
            add_breadcrumb(
                "preorder",
                "Added line",
                Some(&[("line_id", &line.id.to_string())]),
            );
            return Ok(Redirect::to("/catalog/").into_response());
        }
        Err(PreorderError::Validation(errors)) => errors,
        Err(PreorderError::ProductUnavailable) => ValidationErrors::single(
            "product",
            "Ce produit n'est plus disponible à la précommande.",
        ),
        Err(e) => return Err(e.into()),
    };

    let product = service.product(product_id).await?;
    Ok((
        StatusCode::BAD_REQUEST,
        AddProductTemplate::new(product, form, errors),
    )
        .into_response())
}

/// Confirmation page. Lines of other members are reported as missing.
pub async fn drop_product_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(line_id): Path<i32>,
) -> Result<impl IntoResponse> {
    let line = PreorderService::new(state.repos())
        .owned_line(user.id, CartLineId::new(line_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("cart line {line_id}")))?;
    Ok(DropProductTemplate { line })
}

/// Drop a line and go back to the cart.
///
/// Dropping another member's line does nothing.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn drop_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(line_id): Path<i32>,
) -> Result<Redirect> {
    let outcome = PreorderService::new(state.repos())
        .drop_line(user.id, CartLineId::new(line_id))
        .await?;
    if outcome == DropOutcome::Dropped {
        add_breadcrumb("preorder", "Dropped line", None);
    }
    Ok(Redirect::to("/shopping_cart/"))
}
