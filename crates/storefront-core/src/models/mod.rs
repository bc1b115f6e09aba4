//! Data models for storefront entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `Identity`: the signed-in user as reported at sign-in
//! - `Product`, `Category`, `ProductDraft`, `ImageUpload`: catalog entries
//! - `Cart`, `CartItem`: the current user's cart
//! - `Order`, `OrderItem`, `OrderStatus`, `PaymentMethod`: checkout and history
//! - `DashboardStats`: back-office summary computed from the lists above

pub mod cart;
pub mod dashboard;
pub mod list;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem};
pub use dashboard::DashboardStats;
pub use list::ListResponse;
pub use order::{Order, OrderCustomer, OrderItem, OrderStatus, PaymentMethod};
pub use product::{Category, ImageUpload, Product, ProductDraft, ProductFilter};
pub use user::Identity;

/// Parse a decimal string as sent by the backend ("19.99") for display math.
/// Unparseable amounts count as zero.
pub(crate) fn parse_amount(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}
