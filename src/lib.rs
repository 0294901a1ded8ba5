pub mod database;
pub mod filter;
pub mod model;
pub mod photos;
pub mod places;
pub mod state;
pub mod utils;
