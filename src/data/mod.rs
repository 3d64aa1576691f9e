pub mod seed;

pub use seed::{seed_catalog, DefaultCatalog};
