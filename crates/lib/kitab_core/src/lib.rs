//! # kitab_core
//!
//! Core domain logic for Kitab Ghar: authentication, session tokens,
//! membership-id generation, and the user stores.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod store;
