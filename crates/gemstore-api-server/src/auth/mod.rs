pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtManager};
