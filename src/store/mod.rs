//! Storefront domain: records, repositories and screen view-models.

pub mod models;
pub mod repositories;
pub mod viewmodels;
