//! Football statistics scrapers: a catalog of leagues and seasons per site,
//! one adapter per site, and a job runner that writes result tables to disk.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod services;

pub use domain::{Catalog, Page, Table};
pub use error::{Result, ScrapeError, ValidationError};
