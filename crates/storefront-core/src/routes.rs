//! Route authorization.
//!
//! Decides, from the session alone, whether a view may be shown. There is no
//! server round-trip here: a credential revoked on the backend is only noticed
//! on the next call through the gateway.

use std::fmt;

use crate::auth::{Identity, SessionEvent, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    ProductDetail(i64),
    Login,
    Register,
    Cart,
    Checkout,
    Orders,
    MyProducts,
    ListProduct,
    AdminDashboard,
    AdminProducts,
    AdminCategories,
    AdminOrders,
}

/// Who may see a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Public,
    Authenticated,
    Privileged,
}

/// Outcome of a navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

impl Navigation {
    /// The view that ends up on screen
    pub fn destination(&self) -> Route {
        match *self {
            Navigation::Render(route) | Navigation::Redirect(route) => route,
        }
    }
}

impl Route {
    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim().trim_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let route = match segments.as_slice() {
            [] => Route::Home,
            ["product", id] => Route::ProductDetail(id.parse().ok()?),
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["cart"] => Route::Cart,
            ["checkout"] => Route::Checkout,
            ["orders"] => Route::Orders,
            ["my-products"] => Route::MyProducts,
            ["my-products", "list"] => Route::ListProduct,
            ["admin"] => Route::AdminDashboard,
            ["admin", "products"] => Route::AdminProducts,
            ["admin", "categories"] => Route::AdminCategories,
            ["admin", "orders"] => Route::AdminOrders,
            _ => return None,
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::ProductDetail(id) => format!("/product/{}", id),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Cart => "/cart".to_string(),
            Route::Checkout => "/checkout".to_string(),
            Route::Orders => "/orders".to_string(),
            Route::MyProducts => "/my-products".to_string(),
            Route::ListProduct => "/my-products/list".to_string(),
            Route::AdminDashboard => "/admin".to_string(),
            Route::AdminProducts => "/admin/products".to_string(),
            Route::AdminCategories => "/admin/categories".to_string(),
            Route::AdminOrders => "/admin/orders".to_string(),
        }
    }

    pub fn policy(&self) -> Policy {
        match self {
            Route::Home | Route::ProductDetail(_) | Route::Login | Route::Register => Policy::Public,
            Route::Cart | Route::Checkout | Route::Orders | Route::MyProducts | Route::ListProduct => {
                Policy::Authenticated
            }
            Route::AdminDashboard
            | Route::AdminProducts
            | Route::AdminCategories
            | Route::AdminOrders => Policy::Privileged,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Apply the route's policy to the given identity (None = anonymous)
pub fn authorize(route: Route, identity: Option<&Identity>) -> Navigation {
    match (route.policy(), identity) {
        (Policy::Public, _) => Navigation::Render(route),
        (Policy::Authenticated, Some(_)) => Navigation::Render(route),
        (Policy::Authenticated, None) => Navigation::Redirect(Route::Login),
        (Policy::Privileged, Some(identity)) if identity.is_admin => Navigation::Render(route),
        (Policy::Privileged, _) => Navigation::Redirect(Route::Home),
    }
}

/// Navigate to `path` against the store's current snapshot.
/// Unknown paths fall back to the home view.
pub fn resolve(path: &str, session: &SessionStore) -> Navigation {
    match Route::parse(path) {
        Some(route) => authorize(route, session.identity().as_ref()),
        None => Navigation::Redirect(Route::Home),
    }
}

/// Where to go right after signing in
pub fn landing_route(identity: &Identity) -> Route {
    if identity.is_admin {
        Route::AdminDashboard
    } else {
        Route::Home
    }
}

/// Navigation the presentation layer performs in response to a session event
pub fn route_for_event(event: &SessionEvent) -> Option<Route> {
    match event {
        SessionEvent::Invalidated | SessionEvent::SignedOut => Some(Route::Login),
        SessionEvent::SignedIn(identity) => Some(landing_route(identity)),
        SessionEvent::Renewed => None,
    }
}
