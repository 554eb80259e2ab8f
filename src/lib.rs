mod database {
    pub mod actions;
    pub mod error;
    pub mod memory;
    pub mod pagination;
    pub mod query;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
mod api {
    pub mod attributes;
    pub mod payload;
    pub mod recipes;
    pub mod rejection;
    pub mod routes;
    pub mod shape;
}
mod config;
mod constants;
mod media;

pub use api::*;
pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use media::*;
