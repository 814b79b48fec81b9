pub mod connection;
pub mod cycles;
pub mod products;
pub mod stores;
pub mod subscribers;

pub use connection::Database;
