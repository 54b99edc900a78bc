//! Service-layer flows behind the request handlers.

pub mod auth;
