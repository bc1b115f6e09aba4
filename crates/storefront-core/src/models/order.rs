use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_amount, Product};

/// Order lifecycle as tracked by the backend.
///
/// Parsing is case-insensitive; anything unrecognized is kept verbatim in
/// `Other` so older orders still display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Approved,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Approved,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Other(s) => s,
        }
    }

    /// Awaiting action from the back office ("processing" is a legacy alias)
    pub fn is_pending(&self) -> bool {
        match self {
            OrderStatus::Pending => true,
            OrderStatus::Other(s) => s.eq_ignore_ascii_case("processing"),
            _ => false,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => OrderStatus::Pending,
            "APPROVED" => OrderStatus::Approved,
            "PAID" => OrderStatus::Paid,
            "SHIPPED" => OrderStatus::Shipped,
            "DELIVERED" => OrderStatus::Delivered,
            "CANCELLED" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(s),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    /// Strict parse for user input: only the known statuses are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match OrderStatus::from(s.to_string()) {
            OrderStatus::Other(_) => {
                let valid = Self::ALL
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(format!("Invalid status '{}'. Valid statuses are: {}", s, valid))
            }
            status => Ok(status),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    CashOnDelivery,
    #[serde(rename = "MOCK")]
    MockOnline,
}

impl PaymentMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
            PaymentMethod::MockOnline => "Mock Online Payment",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cod" => Ok(PaymentMethod::CashOnDelivery),
            "mock" => Ok(PaymentMethod::MockOnline),
            _ => Err(format!("Invalid payment method '{}' (expected cod or mock)", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product: Option<Product>,
    pub quantity: u32,
    /// Unit price at the time of purchase
    pub price: String,
    #[serde(default)]
    pub subtotal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCustomer {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    pub total_price: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub user: Option<OrderCustomer>,
    pub shipping_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn total_value(&self) -> f64 {
        parse_amount(&self.total_price)
    }
}
