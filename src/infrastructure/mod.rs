pub mod database;
pub mod entities;
pub mod identity;
pub mod repositories;
pub mod settings;
pub mod traits;
