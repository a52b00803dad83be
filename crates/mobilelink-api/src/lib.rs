// mobilelink-api: Async Rust client for the Generac MobileLink cloud API
//
// The vendor exposes no stable public contract: authentication is either a
// pre-authenticated bearer token, browser-harvested cookies, or a
// multi-step hosted sign-in flow scraped out of HTML, and the data
// endpoints come in two generations probed newest-first. This crate owns
// all of that; hosts consume two operations (`ApiClient::login`,
// `ApiClient::fetch_device_data`) and the `Error` taxonomy.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
mod signin;

pub use auth::{Account, Credentials};
pub use client::ApiClient;
pub use error::Error;
pub use models::{Apparatus, ApparatusDetail, Item};
