pub mod catalog;
pub mod table;
pub mod validate;

pub use catalog::{Catalog, CatalogEntry, Leagues, Page, Resolved, SeasonId, SiteId};
pub use table::{cell_f64, Row, Table};
