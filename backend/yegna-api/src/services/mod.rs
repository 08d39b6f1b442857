mod auth_service;
mod category_service;
mod post_service;
mod profile_service;

pub use auth_service::*;
pub use category_service::*;
pub use post_service::*;
pub use profile_service::*;
