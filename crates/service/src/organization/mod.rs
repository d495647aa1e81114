pub mod domain;
pub mod repo;
pub mod repository;
pub mod service;

pub use domain::{Locale, Organization, OrganizationPatch, Product};
pub use repository::OrganizationRepository;
pub use service::{BalancePolicy, OrganizationService};
