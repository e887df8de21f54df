pub mod connection;
pub mod legacy;
pub mod migrations;
pub mod repositories;
pub mod stores;

pub use connection::{connect_from_config, connect_with_settings, DbPool};
pub use legacy::{import_directory, LegacyImportError, LegacyImportReport, LegacyStores};
pub use stores::Stores;
