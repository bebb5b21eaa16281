pub mod adapters;
pub mod chargify;
pub mod models;
pub mod service;

pub use adapters::BillingClient;
pub use chargify::ChargifyClient;
pub use models::{BillingPlan, CustomerRef, ManagementLink, ProductRef, SubscriptionStatus};
pub use service::BillingService;
