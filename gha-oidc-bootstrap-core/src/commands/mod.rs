//! Commands module - service layer for stack operations

mod deploy;
pub(crate) mod service;

pub use deploy::{DeployRequest, DeployResult, DeployedRole, RoleArnDelivery};
pub use service::BootstrapService;
