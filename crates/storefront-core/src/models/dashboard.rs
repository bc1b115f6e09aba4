use super::{Category, Order, Product};

/// Back-office summary figures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_products: usize,
    pub total_orders: usize,
    pub total_categories: usize,
    pub total_revenue: f64,
    pub pending_orders: usize,
}

impl DashboardStats {
    pub fn compute(products: &[Product], orders: &[Order], categories: &[Category]) -> Self {
        Self {
            total_products: products.len(),
            total_orders: orders.len(),
            total_categories: categories.len(),
            total_revenue: orders.iter().map(Order::total_value).sum(),
            pending_orders: orders.iter().filter(|o| o.status.is_pending()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;

    fn order(id: i64, status: &str, total: &str) -> Order {
        Order {
            id,
            status: OrderStatus::from(status.to_string()),
            total_price: total.to_string(),
            items: Vec::new(),
            user: None,
            shipping_address: None,
            payment_method: None,
            created_at: None,
        }
    }

    #[test]
    fn test_compute() {
        let orders = vec![
            order(1, "PENDING", "10.00"),
            order(2, "processing", "5.50"),
            order(3, "DELIVERED", "4.50"),
            order(4, "PAID", "not-a-number"),
        ];
        let categories = vec![Category {
            id: 1,
            name: "Home".to_string(),
            slug: "home".to_string(),
        }];

        let stats = DashboardStats::compute(&[], &orders, &categories);
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.total_categories, 1);
        assert_eq!(stats.total_products, 0);
        assert_eq!(stats.pending_orders, 2);
        assert!((stats.total_revenue - 20.0).abs() < 1e-9);
    }
}
