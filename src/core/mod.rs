pub mod assistant;
pub mod authorization;
pub mod dashboard;
pub mod enrichment;
pub mod queries;
pub mod seed;
pub mod services;
pub mod session;
pub mod traits;
