pub mod auth_service;
pub mod ledger;
pub mod product_service;
pub mod sku_service;

pub use auth_service::AuthService;
pub use product_service::ProductService;
pub use sku_service::SkuService;
