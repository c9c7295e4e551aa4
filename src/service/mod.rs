//! CrudService: resource operations over a `Store`.

mod crud;
mod validation;
pub use crud::{Created, CrudService, Listing};
pub use validation::RequestValidator;
