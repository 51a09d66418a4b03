pub mod csv;
pub mod material;
pub mod server;
