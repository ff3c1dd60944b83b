#![doc = "The `swapdesk` library crate."]
#![doc = ""]
#![doc = "This crate contains the core business logic for a swap-proposal marketplace:"]
#![doc = "the proposal domain model and its lifecycle, identity-provider authentication,"]
#![doc = "audit trail emission, request validation, routing configuration, and error"]
#![doc = "handling. It is used by the main binary (`main.rs`) to construct and run the"]
#![doc = "application."]

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod idp;
pub mod models;
pub mod routes;
pub mod sweep;
