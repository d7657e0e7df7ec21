//! Request middleware for the restaurant site.
//!
//! Every request runs through `SiteMiddleware::handle`, which walks the
//! phases `Start -> AuthRefreshed -> RouteChecked -> HeadersApplied -> Done`:
//!
//! 1. Ask the `IdentityProvider` for the current user and forward its cookie
//!    mutations as `Set-Cookie` headers.
//! 2. Redirect anonymous users away from protected paths and signed-in users
//!    away from the login page.
//! 3. Merge cache policy and compression headers.
//!
//! # Example
//!
//! ```ignore
//! let middleware = SiteMiddleware::new(identity, table, routes)
//!     .with_failure_policy(IdentityFailurePolicy::TreatAsAnonymous);
//! let response = middleware.handle(&mut ctx).await?;
//! if let Some(location) = response.location() {
//!     // send the redirect
//! }
//! ```

mod error;
mod identity;
mod middleware;
mod redirect;
mod response;

pub use error::*;
pub use identity::*;
pub use middleware::*;
pub use redirect::*;
pub use response::*;
