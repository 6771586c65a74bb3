pub mod connection;
pub mod fixtures;
pub mod legacy;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, SeedResult, VerificationResult};
pub use legacy::{
    import_movements, ImportReport, LegacyExport, LegacyMappingError, LegacyValidators,
};
pub use repositories::{
    RepositoryError, SqlMovementStore, SqlNotificationOutbox, SqlPersonnelDirectory,
};
