pub mod core;
pub mod demo;
pub mod export;
pub mod imports;
pub mod records;
pub mod tenants;
