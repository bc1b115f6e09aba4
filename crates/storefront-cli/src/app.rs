//! Command execution for the storefront CLI.
//!
//! `App` owns the session store, the API client and a subscription to session
//! events. Commands for guarded views are checked with route authorization
//! before any request is made; session events raised by the gateway are
//! turned into navigation hints after each command.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use storefront_core::auth::{FileStorage, KeyringStorage, SessionEvent, SessionStore};
use storefront_core::config::{Config, StorageKind};
use storefront_core::models::{Cart, ImageUpload, Order, Product, ProductDraft, ProductFilter};
use storefront_core::routes::{self, Navigation, Route};
use storefront_core::StorefrontClient;

use crate::cli::{AdminCommand, Command, NewProduct, ProductEdits};
use crate::format::{format_amount, format_date, truncate_string};

/// Environment variable supplying the password non-interactively
const PASSWORD_ENV: &str = "STOREFRONT_PASSWORD";

/// Column width for product titles in listings
const TITLE_WIDTH: usize = 32;

pub struct App {
    config: Config,
    client: StorefrontClient,
    events: broadcast::Receiver<SessionEvent>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let session = Arc::new(Self::open_session(&config)?);
        let events = session.subscribe();
        let client = StorefrontClient::new(&config, session)?;
        debug!(base_url = %client.gateway().base_url(), "Client ready");

        Ok(Self {
            config,
            client,
            events,
        })
    }

    fn open_session(config: &Config) -> Result<SessionStore> {
        Ok(match config.storage {
            StorageKind::File => SessionStore::open(FileStorage::new(config.session_dir()?)),
            StorageKind::Keyring => SessionStore::open(KeyringStorage::new()),
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        let result = self.execute(command).await;
        self.follow_session_events();
        result
    }

    /// Refuse to continue if `route` would not render for the current session
    fn require(&self, route: Route) -> Result<()> {
        match routes::authorize(route, self.client.session().identity().as_ref()) {
            Navigation::Render(_) => Ok(()),
            Navigation::Redirect(Route::Login) => {
                anyhow::bail!("{} requires signing in (storefront login)", route)
            }
            Navigation::Redirect(to) => {
                anyhow::bail!("{} requires an admin account; redirected to {}", route, to)
            }
        }
    }

    /// Navigation is the presentation layer's job: react to what the session
    /// store reported while the command ran.
    fn follow_session_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let next = routes::route_for_event(&event);
            match (&event, next) {
                (SessionEvent::Invalidated, Some(route)) => {
                    eprintln!("Your session has expired. Please sign in again ({}).", route);
                }
                (SessionEvent::SignedIn(identity), Some(route)) => {
                    println!("Signed in as {} ({}). Continue at {}", identity.username, identity.role_display(), route);
                }
                (SessionEvent::SignedOut, _) => println!("Signed out."),
                _ => debug!(?event, "Session event"),
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { username } => self.login(username).await,
            Command::Register { username, email } => self.register(username, email).await,
            Command::Logout => {
                self.client.logout();
                Ok(())
            }
            Command::Whoami => {
                match self.client.session().identity() {
                    Some(identity) => println!(
                        "{} <{}> id={} role={}",
                        identity.username,
                        identity.email,
                        identity.id,
                        identity.role_display()
                    ),
                    None => println!("Not signed in"),
                }
                Ok(())
            }
            Command::Products { category, mine } => {
                let created_by = if mine {
                    self.require(Route::MyProducts)?;
                    self.client.session().identity().map(|i| i.id)
                } else {
                    None
                };
                let filter = ProductFilter {
                    category_id: category,
                    created_by,
                };
                let products = self.client.list_products(&filter).await?;
                print_products(&products);
                Ok(())
            }
            Command::Product { id } => {
                self.require(Route::ProductDetail(id))?;
                let product = self.client.get_product(id).await?;
                print_product(&product);
                Ok(())
            }
            Command::Categories => {
                for category in self.client.list_categories().await? {
                    println!("{:>5}  {}", category.id, category.name);
                }
                Ok(())
            }
            Command::Cart => {
                self.require(Route::Cart)?;
                print_cart(&self.client.get_cart().await?);
                Ok(())
            }
            Command::CartAdd { product, quantity } => {
                self.require(Route::Cart)?;
                print_cart(&self.client.add_to_cart(product, quantity).await?);
                Ok(())
            }
            Command::CartSet { item, quantity } => {
                self.require(Route::Cart)?;
                print_cart(&self.client.update_cart_item(item, quantity).await?);
                Ok(())
            }
            Command::CartRemove { item } => {
                self.require(Route::Cart)?;
                print_cart(&self.client.remove_cart_item(item).await?);
                Ok(())
            }
            Command::Checkout { address, payment } => {
                self.require(Route::Checkout)?;
                if address.trim().is_empty() {
                    anyhow::bail!("Shipping address is required");
                }
                let order = self.client.checkout(&address, payment).await?;
                println!(
                    "Order #{} placed: {} via {} ({})",
                    order.id,
                    format_amount(order.total_value()),
                    payment.display_name(),
                    order.status
                );
                Ok(())
            }
            Command::Orders => {
                self.require(Route::Orders)?;
                print_orders(&self.client.my_orders().await?, false);
                Ok(())
            }
            Command::ListProduct(product) => {
                self.require(Route::ListProduct)?;
                let product = self.client.create_product(&new_draft(product)?).await?;
                println!("Listed {} (#{})", product.title, product.id);
                Ok(())
            }
            Command::EditProduct { id, edits } => {
                self.require(Route::MyProducts)?;
                let product = self.edit_product(id, edits).await?;
                println!("Updated {} (#{})", product.title, product.id);
                Ok(())
            }
            Command::DeleteProduct { id } => {
                self.require(Route::MyProducts)?;
                self.client.delete_product(id).await?;
                println!("Product {} deleted", id);
                Ok(())
            }
            Command::Open { path } => {
                match routes::resolve(&path, self.client.session()) {
                    Navigation::Render(route) => println!("render {}", route),
                    Navigation::Redirect(route) => println!("redirect {}", route),
                }
                Ok(())
            }
            Command::Admin(admin) => self.admin(admin).await,
        }
    }

    async fn admin(&self, command: AdminCommand) -> Result<()> {
        match command {
            AdminCommand::Dashboard => {
                self.require(Route::AdminDashboard)?;
                let stats = self.client.dashboard().await?;
                println!("Products:   {}", stats.total_products);
                println!("Categories: {}", stats.total_categories);
                println!("Orders:     {} ({} pending)", stats.total_orders, stats.pending_orders);
                println!("Revenue:    {}", format_amount(stats.total_revenue));
            }
            AdminCommand::Orders => {
                self.require(Route::AdminOrders)?;
                print_orders(&self.client.all_orders().await?, true);
            }
            AdminCommand::SetStatus { order, status } => {
                self.require(Route::AdminOrders)?;
                let order = self.client.update_order_status(order, &status).await?;
                println!("Order #{} is now {}", order.id, order.status);
            }
            AdminCommand::Products => {
                self.require(Route::AdminProducts)?;
                print_products(&self.client.list_products(&ProductFilter::default()).await?);
            }
            AdminCommand::AddProduct(product) => {
                self.require(Route::AdminProducts)?;
                let product = self.client.create_product(&new_draft(product)?).await?;
                println!("Product {} created ({})", product.id, product.title);
            }
            AdminCommand::EditProduct { id, edits } => {
                self.require(Route::AdminProducts)?;
                let product = self.edit_product(id, edits).await?;
                println!("Product {} updated ({})", product.id, product.title);
            }
            AdminCommand::Deactivate { product } => {
                self.require(Route::AdminProducts)?;
                let product = self.client.set_product_active(product, false).await?;
                println!("{} hidden from the storefront", product.title);
            }
            AdminCommand::Activate { product } => {
                self.require(Route::AdminProducts)?;
                let product = self.client.set_product_active(product, true).await?;
                println!("{} is visible again", product.title);
            }
            AdminCommand::DeleteProduct { product } => {
                self.require(Route::AdminProducts)?;
                self.client.delete_product(product).await?;
                println!("Product {} deleted", product);
            }
            AdminCommand::AddCategory { name } => {
                self.require(Route::AdminCategories)?;
                let category = self.client.create_category(&name).await?;
                println!("Category {} created ({})", category.id, category.name);
            }
            AdminCommand::RenameCategory { id, name } => {
                self.require(Route::AdminCategories)?;
                let category = self.client.rename_category(id, &name).await?;
                println!("Category {} renamed to {}", category.id, category.name);
            }
            AdminCommand::DeleteCategory { id } => {
                self.require(Route::AdminCategories)?;
                self.client.delete_category(id).await?;
                println!("Category {} deleted", id);
            }
        }
        Ok(())
    }

    /// Fetch the product, apply the edits and send the whole form back
    async fn edit_product(&self, id: i64, edits: ProductEdits) -> Result<Product> {
        let current = self.client.get_product(id).await?;
        let mut draft = ProductDraft::from_product(&current);
        apply_edits(&mut draft, edits)?;
        self.client.update_product(id, &draft).await
    }

    async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username {
            Some(username) => username,
            None => prompt_line("Username", self.config.last_username.as_deref())?,
        };
        if username.is_empty() {
            anyhow::bail!("Username and password required");
        }

        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) => password,
            Err(_) => rpassword::prompt_password("Password: ")?,
        };
        if password.is_empty() {
            anyhow::bail!("Username and password required");
        }

        self.client.login(&username, &password).await?;

        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
        Ok(())
    }

    async fn register(&self, username: Option<String>, email: Option<String>) -> Result<()> {
        let username = match username {
            Some(username) => username,
            None => prompt_line("Username", None)?,
        };
        let email = match email {
            Some(email) => email,
            None => prompt_line("Email", None)?,
        };
        let password = rpassword::prompt_password("Password: ")?;
        if username.is_empty() || email.is_empty() || password.is_empty() {
            anyhow::bail!("Username, email and password are required");
        }

        self.client.register(&username, &email, &password).await?;
        println!("Account created. Sign in with: storefront login --username {}", username);
        Ok(())
    }
}

fn new_draft(product: NewProduct) -> Result<ProductDraft> {
    let mut draft = ProductDraft::new(product.title, product.price);
    draft.description = product.description;
    draft.category_id = product.category;
    draft.is_active = !product.inactive;
    if let Some(path) = product.image {
        draft.image = Some(ImageUpload::from_path(&path)?);
    }
    Ok(draft)
}

fn apply_edits(draft: &mut ProductDraft, edits: ProductEdits) -> Result<()> {
    if let Some(title) = edits.title {
        draft.title = title;
    }
    if let Some(price) = edits.price {
        draft.price = price;
    }
    if let Some(description) = edits.description {
        draft.description = description;
    }
    if let Some(category) = edits.category {
        draft.category_id = Some(category);
    }
    if let Some(active) = edits.active {
        draft.is_active = active;
    }
    if let Some(path) = edits.image {
        draft.image = Some(ImageUpload::from_path(&path)?);
    }
    Ok(())
}

/// Read one line from stdin, falling back to `default` on empty input
fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => print!("{} [{}]: ", label, default),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read from stdin")?;
    let input = input.trim();

    Ok(match (input.is_empty(), default) {
        (true, Some(default)) => default.to_string(),
        _ => input.to_string(),
    })
}

fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        println!(
            "{:>5}  {:<width$}  {:>10}  {}{}",
            product.id,
            truncate_string(&product.title, TITLE_WIDTH),
            product.price,
            product.category_name(),
            if product.is_active { "" } else { "  (inactive)" },
            width = TITLE_WIDTH
        );
    }
}

fn print_product(product: &Product) {
    println!("{} (#{})", product.title, product.id);
    println!("Price:    {}", product.price);
    println!("Category: {}", product.category_name());
    if let Some(ref seller) = product.created_by {
        println!("Seller:   {}", seller);
    }
    println!("Listed:   {}", format_date(product.created_at.as_ref()));
    if !product.description.is_empty() {
        println!("\n{}", product.description);
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for item in &cart.items {
        println!(
            "{:>5}  {:<width$}  x{:<3} {:>10}",
            item.id,
            truncate_string(item.title(), TITLE_WIDTH),
            item.quantity,
            format_amount(item.subtotal()),
            width = TITLE_WIDTH
        );
    }
    println!("{} item(s), total {}", cart.item_count(), format_amount(cart.total()));
}

fn print_orders(orders: &[Order], show_customer: bool) {
    if orders.is_empty() {
        println!("No orders yet");
        return;
    }
    for order in orders {
        let customer = if show_customer {
            order
                .user
                .as_ref()
                .map(|u| format!("  {}", u.username))
                .unwrap_or_default()
        } else {
            String::new()
        };
        println!(
            "#{:<5} {:<10} {:>10}  {}  {} item(s){}",
            order.id,
            order.status.as_str(),
            format_amount(order.total_value()),
            format_date(order.created_at.as_ref()),
            order.items.len(),
            customer
        );
    }
}
