//! Zip archives of the application store: full and incremental snapshots, listing, and restore.

mod router;
mod service;

pub use router::backup_router;
pub use service::{
    BackupEntry, BackupError, BackupKind, BackupManifest, BackupService, BackupStats,
    CreatedBackup, DatabaseCounts, ManifestFile, RestoreOutcome, INCREMENTAL_FALLBACK_HOURS,
};
