//! Command-line arguments.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use storefront_core::models::{OrderStatus, PaymentMethod};

#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Browse the shop, manage your cart and orders from the terminal")]
pub struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, env = "STOREFRONT_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long, env = "STOREFRONT_USERNAME")]
        username: Option<String>,
    },
    /// Create a new customer account
    Register {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami,
    /// List products
    Products {
        #[arg(long)]
        category: Option<i64>,
        /// Only products you listed
        #[arg(long)]
        mine: bool,
    },
    /// Show one product
    Product { id: i64 },
    /// List categories
    Categories,
    /// Show the cart
    Cart,
    /// Add a product to the cart
    CartAdd {
        product: i64,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change the quantity of a cart item
    CartSet { item: i64, quantity: u32 },
    /// Remove an item from the cart
    CartRemove { item: i64 },
    /// Place an order for everything in the cart
    Checkout {
        #[arg(long)]
        address: String,
        /// cod or mock
        #[arg(long, default_value = "cod")]
        payment: PaymentMethod,
    },
    /// Your order history
    Orders,
    /// Put a product of your own up for sale
    ListProduct(NewProduct),
    /// Change one of your products
    EditProduct {
        id: i64,
        #[command(flatten)]
        edits: ProductEdits,
    },
    /// Remove one of your products
    DeleteProduct { id: i64 },
    /// Check whether a view is reachable with the current session
    Open { path: String },
    /// Back-office commands (admin accounts only)
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// Shop-wide totals
    Dashboard,
    /// Every order in the shop
    Orders,
    /// Move an order to a new status
    SetStatus {
        order: i64,
        /// pending, approved, paid, shipped, delivered or cancelled
        #[arg(value_parser = OrderStatus::from_str)]
        status: OrderStatus,
    },
    /// Every product, including inactive ones
    Products,
    /// Add a product to the catalog
    AddProduct(NewProduct),
    /// Change any product in the catalog
    EditProduct {
        id: i64,
        #[command(flatten)]
        edits: ProductEdits,
    },
    /// Hide a product from the storefront
    Deactivate { product: i64 },
    /// Show a hidden product again
    Activate { product: i64 },
    DeleteProduct { product: i64 },
    AddCategory { name: String },
    RenameCategory { id: i64, name: String },
    DeleteCategory { id: i64 },
}

/// Fields for a new product
#[derive(Debug, Args)]
pub struct NewProduct {
    #[arg(long)]
    pub title: String,
    /// Decimal price, e.g. 19.99
    #[arg(long)]
    pub price: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Category id (see `storefront categories`)
    #[arg(long)]
    pub category: Option<i64>,
    /// JPEG, PNG, GIF or WebP file to upload
    #[arg(long)]
    pub image: Option<PathBuf>,
    /// List it hidden from the storefront
    #[arg(long)]
    pub inactive: bool,
}

/// Fields to change on an existing product; anything omitted stays as is
#[derive(Debug, Default, Args)]
pub struct ProductEdits {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub price: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub category: Option<i64>,
    /// Replacement image
    #[arg(long)]
    pub image: Option<PathBuf>,
    /// Show (true) or hide (false) on the storefront
    #[arg(long)]
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_checkout() {
        let cli = Cli::try_parse_from(["storefront", "checkout", "--address", "1 Main St", "--payment", "mock"])
            .expect("parse");
        match cli.command {
            Command::Checkout { address, payment } => {
                assert_eq!(address, "1 Main St");
                assert_eq!(payment, PaymentMethod::MockOnline);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_set_status() {
        let cli = Cli::try_parse_from(["storefront", "admin", "set-status", "7", "shipped"]).expect("parse");
        match cli.command {
            Command::Admin(AdminCommand::SetStatus { order, status }) => {
                assert_eq!(order, 7);
                assert_eq!(status, OrderStatus::Shipped);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["storefront", "admin", "set-status", "7", "lost"]).is_err());
    }

    #[test]
    fn test_set_status_rejects_unknown_status() {
        let err = Cli::try_parse_from(["storefront", "admin", "set-status", "7", "lost"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("Valid statuses are"));

        let cli = Cli::try_parse_from(["storefront", "admin", "set-status", "7", "Delivered"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Admin(AdminCommand::SetStatus { status: OrderStatus::Delivered, .. })
        ));
    }

    #[test]
    fn test_parse_list_product() {
        let cli = Cli::try_parse_from([
            "storefront",
            "list-product",
            "--title",
            "Desk Lamp",
            "--price",
            "24.50",
            "--category",
            "2",
            "--image",
            "lamp.png",
        ])
        .expect("parse");
        match cli.command {
            Command::ListProduct(product) => {
                assert_eq!(product.title, "Desk Lamp");
                assert_eq!(product.price, "24.50");
                assert_eq!(product.category, Some(2));
                assert_eq!(product.image, Some(PathBuf::from("lamp.png")));
                assert!(product.description.is_empty());
                assert!(!product.inactive);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["storefront", "list-product", "--title", "Lamp"]).is_err());
    }

    #[test]
    fn test_parse_edit_product() {
        let cli = Cli::try_parse_from(["storefront", "admin", "edit-product", "4", "--price", "9.99", "--active", "false"])
            .expect("parse");
        match cli.command {
            Command::Admin(AdminCommand::EditProduct { id, edits }) => {
                assert_eq!(id, 4);
                assert_eq!(edits.price.as_deref(), Some("9.99"));
                assert_eq!(edits.active, Some(false));
                assert!(edits.title.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
