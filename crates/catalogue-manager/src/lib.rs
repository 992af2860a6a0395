//! Manager front-end for the product catalogue: server-rendered pages that
//! call the catalogue REST API on behalf of signed-in managers.

pub mod client;
pub mod session;
mod token;
pub mod views;
pub mod web;

pub use client::{CatalogueClient, ClientError};
pub use web::{build_app, WebState};
