pub mod app_config;
pub mod config;
pub mod messages;
pub mod permissions;
pub mod products;
#[cfg(feature = "axum")]
pub mod request_id;

use thiserror::Error;

pub use app_config::{
    CatalogueAuth, CatalogueConfig, ClientCredentials, Environment, ManagerConfig, ManagerUser,
};
pub use config::{
    load_catalogue_config, load_catalogue_config_from_env, load_manager_config,
    load_manager_config_from_env,
};
pub use messages::{message, Locale, PRODUCT_NOT_FOUND};
pub use permissions::EndpointPermission;
pub use products::{
    FieldViolation, PayloadKind, Product, ProductId, ProductPayload, ValidProduct,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
