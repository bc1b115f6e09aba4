//! API client for the storefront REST backend.
//!
//! This module provides the `StorefrontClient` struct for signing in and for
//! catalog, cart, checkout and back-office calls. Every call goes through the
//! `Gateway`, so credentials are attached and renewed in one place.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info};

use crate::auth::SessionStore;
use crate::config::Config;
use crate::models::{
    Cart, Category, DashboardStats, Identity, ListResponse, Order, OrderStatus, PaymentMethod,
    Product, ProductDraft, ProductFilter,
};

use super::{ApiError, FormPart, Gateway, PendingRequest};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    user: Option<Identity>,
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    order: Order,
}

/// Typed storefront API.
/// Clone is cheap - the gateway shares its connection pool and session.
#[derive(Clone)]
pub struct StorefrontClient {
    gateway: Gateway,
}

impl StorefrontClient {
    pub fn new(config: &Config, session: Arc<SessionStore>) -> Result<Self> {
        Ok(Self {
            gateway: Gateway::new(config, session)?,
        })
    }

    pub fn from_gateway(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.gateway.session()
    }

    async fn fetch_list<T: DeserializeOwned>(&self, request: PendingRequest) -> Result<Vec<T>, ApiError> {
        let list: ListResponse<T> = self.gateway.send_json(request).await?;
        Ok(list.into_vec())
    }

    fn json_request<B: serde::Serialize>(request: PendingRequest, body: &B) -> Result<PendingRequest> {
        request.json(body).context("Failed to serialize request body")
    }

    // ===== Authentication =====

    /// Sign in and establish the session
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity> {
        let request = Self::json_request(
            PendingRequest::post("users/login/").anonymous(),
            &serde_json::json!({ "username": username, "password": password }),
        )?;

        let response: LoginResponse = match self.gateway.send_json(request).await {
            Ok(response) => response,
            Err(ApiError::Unauthorized) => {
                return Err(ApiError::Unauthorized).context("Invalid username or password")
            }
            Err(e) => return Err(e).context("Failed to send sign-in request"),
        };

        let identity = response
            .user
            .ok_or_else(|| ApiError::InvalidResponse("sign-in response has no user".to_string()))?;

        self.session()
            .establish(identity.clone(), response.access, response.refresh)?;
        info!(username = %identity.username, "Signed in");
        Ok(identity)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        let request = Self::json_request(
            PendingRequest::post("users/register/").anonymous(),
            &serde_json::json!({ "username": username, "email": email, "password": password }),
        )?;
        self.gateway
            .send_empty(request)
            .await
            .context("Registration failed")?;
        info!(username, "Account registered");
        Ok(())
    }

    /// Sign out locally. The backend keeps no session state to tear down.
    pub fn logout(&self) {
        self.session().clear();
    }

    // ===== Products =====

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let request = PendingRequest::get("products/").queries(filter.query_pairs());
        let products: Vec<Product> = self
            .fetch_list(request)
            .await
            .context("Failed to fetch products")?;
        debug!(count = products.len(), "Products fetched");
        Ok(products)
    }

    pub async fn get_product(&self, id: i64) -> Result<Product> {
        self.gateway
            .send_json(PendingRequest::get(format!("products/{}/", id)))
            .await
            .with_context(|| format!("Failed to fetch product {}", id))
    }

    /// List a new product. Sent as a multipart form so an image can ride along.
    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        draft.validate()?;
        let request = PendingRequest::post("products/").form(product_form(draft));
        let product: Product = self
            .gateway
            .send_json(request)
            .await
            .context("Failed to create product")?;
        info!(product_id = product.id, "Product listed");
        Ok(product)
    }

    /// Replace a product's fields; the stored image is kept unless the draft has one
    pub async fn update_product(&self, id: i64, draft: &ProductDraft) -> Result<Product> {
        draft.validate()?;
        let request = PendingRequest::patch(format!("products/{}/", id)).form(product_form(draft));
        self.gateway
            .send_json(request)
            .await
            .with_context(|| format!("Failed to update product {}", id))
    }

    pub async fn set_product_active(&self, id: i64, active: bool) -> Result<Product> {
        let request = Self::json_request(
            PendingRequest::patch(format!("products/{}/", id)),
            &serde_json::json!({ "is_active": active }),
        )?;
        self.gateway
            .send_json(request)
            .await
            .with_context(|| format!("Failed to change availability of product {}", id))
    }

    pub async fn delete_product(&self, id: i64) -> Result<()> {
        self.gateway
            .send_empty(PendingRequest::delete(format!("products/{}/", id)))
            .await
            .with_context(|| format!("Failed to delete product {}", id))
    }

    // ===== Categories =====

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.fetch_list(PendingRequest::get("products/categories/"))
            .await
            .context("Failed to fetch categories")
    }

    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let request = Self::json_request(
            PendingRequest::post("products/categories/"),
            &serde_json::json!({ "name": name }),
        )?;
        self.gateway
            .send_json(request)
            .await
            .context("Failed to create category")
    }

    pub async fn rename_category(&self, id: i64, name: &str) -> Result<Category> {
        let request = Self::json_request(
            PendingRequest::patch(format!("products/categories/{}/", id)),
            &serde_json::json!({ "name": name }),
        )?;
        self.gateway
            .send_json(request)
            .await
            .with_context(|| format!("Failed to rename category {}", id))
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        self.gateway
            .send_empty(PendingRequest::delete(format!("products/categories/{}/", id)))
            .await
            .with_context(|| format!("Failed to delete category {}", id))
    }

    // ===== Cart =====

    pub async fn get_cart(&self) -> Result<Cart> {
        self.gateway
            .send_json(PendingRequest::get("cart/"))
            .await
            .context("Failed to fetch cart")
    }

    pub async fn add_to_cart(&self, product_id: i64, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            anyhow::bail!("Quantity must be at least 1");
        }
        let request = Self::json_request(
            PendingRequest::post("cart/add/"),
            &serde_json::json!({ "product_id": product_id, "quantity": quantity }),
        )?;
        self.gateway
            .send_json(request)
            .await
            .context("Failed to add to cart")
    }

    pub async fn update_cart_item(&self, item_id: i64, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            anyhow::bail!("Quantity must be at least 1");
        }
        let request = Self::json_request(
            PendingRequest::patch(format!("cart/update/{}/", item_id)),
            &serde_json::json!({ "quantity": quantity }),
        )?;
        self.gateway
            .send_json(request)
            .await
            .context("Failed to update cart item")
    }

    pub async fn remove_cart_item(&self, item_id: i64) -> Result<Cart> {
        self.gateway
            .send_json(PendingRequest::delete(format!("cart/remove/{}/", item_id)))
            .await
            .context("Failed to remove cart item")
    }

    // ===== Orders =====

    /// Turn the current cart into an order
    pub async fn checkout(&self, shipping_address: &str, payment_method: PaymentMethod) -> Result<Order> {
        let request = Self::json_request(
            PendingRequest::post("orders/checkout/"),
            &serde_json::json!({
                "shipping_address": shipping_address,
                "payment_method": payment_method,
            }),
        )?;
        let response: CheckoutResponse = self
            .gateway
            .send_json(request)
            .await
            .context("Failed to place order")?;
        info!(order_id = response.order.id, "Order placed");
        Ok(response.order)
    }

    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        self.fetch_list(PendingRequest::get("orders/my/"))
            .await
            .context("Failed to fetch orders")
    }

    /// Every order in the shop (back office)
    pub async fn all_orders(&self) -> Result<Vec<Order>> {
        self.fetch_list(PendingRequest::get("orders/"))
            .await
            .context("Failed to fetch all orders")
    }

    pub async fn update_order_status(&self, order_id: i64, status: &OrderStatus) -> Result<Order> {
        let request = Self::json_request(
            PendingRequest::patch(format!("orders/update/{}/", order_id)),
            &serde_json::json!({ "status": status }),
        )?;
        self.gateway
            .send_json(request)
            .await
            .with_context(|| format!("Failed to update order {}", order_id))
    }

    /// Back-office summary; fetches products, orders and categories concurrently
    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let everything = ProductFilter::default();
        let (products, orders, categories) = tokio::try_join!(
            self.list_products(&everything),
            self.all_orders(),
            self.list_categories(),
        )?;
        Ok(DashboardStats::compute(&products, &orders, &categories))
    }
}

/// Form fields in the order the backend's product form declares them
fn product_form(draft: &ProductDraft) -> Vec<FormPart> {
    let mut parts = vec![
        FormPart::text("title", &draft.title),
        FormPart::text("description", &draft.description),
        FormPart::text("price", &draft.price),
    ];
    if let Some(category_id) = draft.category_id {
        parts.push(FormPart::text("category_id", category_id));
    }
    parts.push(FormPart::text("is_active", draft.is_active));
    if let Some(ref image) = draft.image {
        parts.push(FormPart::File {
            name: "image".to_string(),
            file_name: image.file_name.clone(),
            mime: image.mime.clone(),
            bytes: image.bytes.clone(),
        });
    }
    parts
}
