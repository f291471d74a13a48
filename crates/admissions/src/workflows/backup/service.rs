use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zip::ZipArchive;

use crate::config::BackupConfig;
use crate::workflows::applications::{ApplicantRecord, ApplicationRepository, RepositoryError};
use crate::workflows::export::{file_stamp, load_all, system_stats, write_zip};

/// Incremental backups with no earlier backup cover this many hours.
pub const INCREMENTAL_FALLBACK_HOURS: i64 = 6;

const MANIFEST: &str = "manifest.json";
const APPLICATIONS: &str = "applications.json";
const STATISTICS: &str = "statistics.json";
const FILE_MANIFEST: &str = "file-manifest.json";
const MANIFEST_VERSION: &str = "1.0";
const ARCHIVE_EXTENSION: &str = "zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupKind {
    Full,
    Incremental,
}

impl BackupKind {
    fn prefix(self) -> &'static str {
        match self {
            BackupKind::Full => "full-backup",
            BackupKind::Incremental => "incremental-backup",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Full => f.write_str("full"),
            BackupKind::Incremental => f.write_str("incremental"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatabaseCounts {
    pub applications: usize,
}

/// Stored as `manifest.json` inside every archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    #[serde(rename = "type")]
    pub kind: BackupKind,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub cutoff_date: Option<DateTime<Utc>>,
    pub files: Vec<ManifestFile>,
    pub database: DatabaseCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBackup {
    pub backup_name: String,
    pub manifest: BackupManifest,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BackupKind,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
    pub records: DatabaseCounts,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStats {
    pub total_backups: usize,
    pub total_size: u64,
    pub last_backup: Option<DateTime<Utc>>,
    pub full_backups: usize,
    pub incremental_backups: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    #[serde(rename = "type")]
    pub kind: BackupKind,
    pub restored: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaEntry<'a> {
    application_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    url: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("invalid backup name '{0}'")]
    InvalidName(String),
    #[error("backup '{0}' not found")]
    NotFound(String),
    #[error("backup storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("backup archive is unreadable: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("backup contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Writes and reads backup archives under the configured directory.
pub struct BackupService<R> {
    repository: Arc<R>,
    config: BackupConfig,
}

impl<R> BackupService<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: BackupConfig) -> Self {
        Self { repository, config }
    }

    /// Every application plus statistics and the media URL manifest.
    pub async fn create_full(&self, now: DateTime<Utc>) -> Result<CreatedBackup, BackupError> {
        let records = load_all(self.repository.as_ref()).await?;

        let media: Vec<MediaEntry<'_>> = records
            .iter()
            .flat_map(|record| {
                [("photo", &record.photo_url), ("signature", &record.signature_url)]
                    .into_iter()
                    .filter(|(_, url)| !url.is_empty())
                    .map(|(kind, url)| MediaEntry {
                        application_id: &record.id.0,
                        kind,
                        url,
                    })
            })
            .collect();

        let entries = vec![
            (APPLICATIONS, serde_json::to_vec_pretty(&records)?),
            (STATISTICS, serde_json::to_vec_pretty(&system_stats(&records, now))?),
            (FILE_MANIFEST, serde_json::to_vec_pretty(&media)?),
        ];
        self.write_backup(BackupKind::Full, now, None, records.len(), entries)
    }

    /// Applications submitted or archived since the most recent backup.
    pub async fn create_incremental(
        &self,
        now: DateTime<Utc>,
    ) -> Result<CreatedBackup, BackupError> {
        let cutoff = self
            .last_backup_time()?
            .unwrap_or_else(|| now - Duration::hours(INCREMENTAL_FALLBACK_HOURS));

        let changed: Vec<ApplicantRecord> = load_all(self.repository.as_ref())
            .await?
            .into_iter()
            .filter(|record| {
                record.submitted_at >= cutoff
                    || record.archived_at.is_some_and(|archived| archived >= cutoff)
            })
            .collect();

        let entries = vec![(APPLICATIONS, serde_json::to_vec_pretty(&changed)?)];
        self.write_backup(
            BackupKind::Incremental,
            now,
            Some(cutoff),
            changed.len(),
            entries,
        )
    }

    /// Backups newest first; archives without a readable manifest are skipped.
    pub fn list(&self) -> Result<Vec<BackupEntry>, BackupError> {
        let listing = match fs::read_dir(&self.config.dir) {
            Ok(listing) => listing,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut backups = Vec::new();
        for entry in listing {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ARCHIVE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            match read_manifest(&path) {
                Ok(manifest) => backups.push(BackupEntry {
                    name: name.to_string(),
                    kind: manifest.kind,
                    timestamp: manifest.timestamp,
                    size: fs::metadata(&path)?.len(),
                    records: manifest.database,
                }),
                Err(err) => warn!(backup = name, error = %err, "skipping unreadable backup"),
            }
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.name.cmp(&b.name)));
        Ok(backups)
    }

    pub fn stats(&self) -> Result<BackupStats, BackupError> {
        let backups = self.list()?;
        Ok(BackupStats {
            total_backups: backups.len(),
            total_size: backups.iter().map(|backup| backup.size).sum(),
            last_backup: backups.first().map(|backup| backup.timestamp),
            full_backups: backups
                .iter()
                .filter(|backup| backup.kind == BackupKind::Full)
                .count(),
            incremental_backups: backups
                .iter()
                .filter(|backup| backup.kind == BackupKind::Incremental)
                .count(),
        })
    }

    /// A full backup replaces the store; an incremental one overwrites only the records it holds.
    pub async fn restore(&self, name: &str) -> Result<RestoreOutcome, BackupError> {
        let path = self.archive_path(name)?;
        let manifest = read_manifest(&path)?;
        let records: Vec<ApplicantRecord> =
            serde_json::from_slice(&read_entry(&path, APPLICATIONS)?)?;

        match manifest.kind {
            BackupKind::Full => {
                for existing in load_all(self.repository.as_ref()).await? {
                    self.repository.delete(&existing.id).await?;
                }
            }
            BackupKind::Incremental => {
                for record in &records {
                    if self.repository.fetch(&record.id).await?.is_some() {
                        self.repository.delete(&record.id).await?;
                    }
                }
            }
        }

        let restored = records.len();
        for record in records {
            self.repository.insert(record).await?;
        }

        info!(backup = name, kind = %manifest.kind, restored, "backup restored");
        Ok(RestoreOutcome {
            kind: manifest.kind,
            restored,
        })
    }

    /// Raw archive bytes for download.
    pub fn archive(&self, name: &str) -> Result<Vec<u8>, BackupError> {
        let path = self.archive_path(name)?;
        Ok(fs::read(path)?)
    }

    pub fn delete(&self, name: &str) -> Result<(), BackupError> {
        let path = self.archive_path(name)?;
        fs::remove_file(&path)?;
        info!(backup = name, "backup deleted");
        Ok(())
    }

    fn last_backup_time(&self) -> Result<Option<DateTime<Utc>>, BackupError> {
        Ok(self.list()?.first().map(|backup| backup.timestamp))
    }

    /// Resolves an existing archive, accepting the name with or without `.zip`.
    fn archive_path(&self, name: &str) -> Result<PathBuf, BackupError> {
        let stem = name.trim();
        let stem = stem.strip_suffix(".zip").unwrap_or(stem);
        if stem.is_empty() || stem.contains(['/', '\\']) || stem.contains("..") {
            return Err(BackupError::InvalidName(name.to_string()));
        }

        let path = self.config.dir.join(format!("{stem}.{ARCHIVE_EXTENSION}"));
        if !path.is_file() {
            return Err(BackupError::NotFound(stem.to_string()));
        }
        Ok(path)
    }

    fn write_backup(
        &self,
        kind: BackupKind,
        now: DateTime<Utc>,
        cutoff: Option<DateTime<Utc>>,
        applications: usize,
        entries: Vec<(&str, Vec<u8>)>,
    ) -> Result<CreatedBackup, BackupError> {
        let backup_name = format!("{}-{}", kind.prefix(), file_stamp(now));
        let manifest = BackupManifest {
            kind,
            timestamp: now,
            version: MANIFEST_VERSION.to_string(),
            cutoff_date: cutoff,
            files: entries
                .iter()
                .map(|(name, contents)| ManifestFile {
                    name: name.to_string(),
                    size: contents.len() as u64,
                })
                .collect(),
            database: DatabaseCounts { applications },
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

        let mut parts: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(name, contents)| (*name, contents.as_slice()))
            .collect();
        parts.push((MANIFEST, manifest_bytes.as_slice()));

        fs::create_dir_all(&self.config.dir)?;
        let target = self.config.dir.join(format!("{backup_name}.{ARCHIVE_EXTENSION}"));
        let partial = target.with_extension("partial");
        let written = File::create(&partial)
            .map_err(BackupError::from)
            .and_then(|file| Ok(write_zip(BufWriter::new(file), &parts)?))
            .and_then(|writer| writer.into_inner().map_err(|err| err.into_error().into()))
            .and_then(|file| Ok(file.sync_all()?));
        if let Err(err) = written {
            fs::remove_file(&partial).ok();
            return Err(err);
        }
        fs::rename(&partial, &target)?;

        info!(backup = %backup_name, kind = %kind, applications, "backup created");
        Ok(CreatedBackup {
            backup_name,
            manifest,
        })
    }
}

fn read_entry(path: &Path, entry: &str) -> Result<Vec<u8>, BackupError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut file = archive.by_name(entry)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

fn read_manifest(path: &Path) -> Result<BackupManifest, BackupError> {
    Ok(serde_json::from_slice(&read_entry(path, MANIFEST)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::applications::{ApplicationFilter, ApplicationId, ApplicationStatus};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StoreDouble {
        records: Mutex<BTreeMap<ApplicationId, ApplicantRecord>>,
    }

    impl StoreDouble {
        fn with(records: Vec<ApplicantRecord>) -> Self {
            let store = Self::default();
            for record in records {
                store.records.lock().unwrap().insert(record.id.clone(), record);
            }
            store
        }

        fn ids(&self) -> Vec<String> {
            self.records.lock().unwrap().keys().map(|id| id.0.clone()).collect()
        }

        fn name_of(&self, id: &str) -> Option<String> {
            self.records
                .lock()
                .unwrap()
                .get(&ApplicationId(id.to_string()))
                .map(|record| record.name.clone())
        }
    }

    #[async_trait]
    impl ApplicationRepository for StoreDouble {
        async fn insert(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
            let mut guard = self.records.lock().unwrap();
            if guard.contains_key(&record.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(record.id.clone(), record.clone());
            Ok(record)
        }

        async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicantRecord>, RepositoryError> {
            Ok(self.records.lock().unwrap().get(id).cloned())
        }

        async fn find(
            &self,
            filter: &ApplicationFilter,
        ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect())
        }

        async fn update_status(
            &self,
            _id: &ApplicationId,
            _status: ApplicationStatus,
        ) -> Result<ApplicantRecord, RepositoryError> {
            Err(RepositoryError::Unavailable("not used".to_string()))
        }

        async fn set_archived(
            &self,
            _id: &ApplicationId,
            _archived_at: Option<DateTime<Utc>>,
        ) -> Result<ApplicantRecord, RepositoryError> {
            Err(RepositoryError::Unavailable("not used".to_string()))
        }

        async fn delete(&self, id: &ApplicationId) -> Result<(), RepositoryError> {
            self.records
                .lock()
                .unwrap()
                .remove(id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    fn record(id: &str, name: &str, submitted: DateTime<Utc>) -> ApplicantRecord {
        ApplicantRecord {
            id: ApplicationId(id.to_string()),
            name: name.to_string(),
            given_name: None,
            middle_name: None,
            last_name: None,
            email: format!("{id}@example.com"),
            contact: "09170000000".to_string(),
            course_applied: "Bachelor of Science in Nursing".to_string(),
            date_of_birth: None,
            status: ApplicationStatus::Pending,
            photo_url: format!("memory://photos/{id}.png"),
            signature_url: String::new(),
            submitted_at: submitted,
            archived: false,
            archived_at: None,
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "admissions-backup-{name}-{}",
            std::process::id()
        ));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    fn service(store: Arc<StoreDouble>, dir: &Path) -> BackupService<StoreDouble> {
        BackupService::new(
            store,
            BackupConfig {
                dir: dir.to_path_buf(),
            },
        )
    }

    #[tokio::test]
    async fn full_backup_writes_a_manifested_archive() {
        let dir = scratch_dir("full");
        let store = Arc::new(StoreDouble::with(vec![
            record("app-1", "Ana Cruz", at(1, 9)),
            record("app-2", "Ben Santos", at(2, 9)),
        ]));
        let backups = service(store, &dir);

        let created = backups.create_full(at(3, 2)).await.expect("backup created");
        assert_eq!(created.backup_name, "full-backup-2025-06-03T02-00-00-000Z");
        assert_eq!(created.manifest.database.applications, 2);
        assert_eq!(created.manifest.version, "1.0");
        let names: Vec<&str> = created.manifest.files.iter().map(|file| file.name.as_str()).collect();
        assert_eq!(names, vec![APPLICATIONS, STATISTICS, FILE_MANIFEST]);

        let path = dir.join("full-backup-2025-06-03T02-00-00-000Z.zip");
        assert_eq!(read_manifest(&path).expect("manifest readable"), created.manifest);
        let media: serde_json::Value =
            serde_json::from_slice(&read_entry(&path, FILE_MANIFEST).expect("file manifest"))
                .expect("json");
        assert_eq!(media.as_array().map(Vec::len), Some(2));
        assert_eq!(media[0]["type"], "photo");

        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn incremental_backup_takes_changes_since_the_last_backup() {
        let dir = scratch_dir("incremental");
        let store = Arc::new(StoreDouble::with(vec![record("app-1", "Ana Cruz", at(1, 9))]));
        let backups = service(Arc::clone(&store), &dir);

        backups.create_full(at(2, 0)).await.expect("full backup");
        store
            .insert(record("app-2", "Ben Santos", at(2, 8)))
            .await
            .expect("new submission");

        let created = backups
            .create_incremental(at(2, 12))
            .await
            .expect("incremental backup");
        assert_eq!(created.manifest.kind, BackupKind::Incremental);
        assert_eq!(created.manifest.cutoff_date, Some(at(2, 0)));
        assert_eq!(created.manifest.database.applications, 1);

        let listed = backups.list().expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].kind, BackupKind::Incremental);
        assert_eq!(listed[1].records.applications, 1);

        let stats = backups.stats().expect("stats");
        assert_eq!(stats.total_backups, 2);
        assert_eq!(stats.full_backups, 1);
        assert_eq!(stats.incremental_backups, 1);
        assert_eq!(stats.last_backup, Some(at(2, 12)));
        assert_eq!(stats.total_size, listed.iter().map(|entry| entry.size).sum::<u64>());

        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn first_incremental_backup_falls_back_to_six_hours() {
        let dir = scratch_dir("fallback");
        let store = Arc::new(StoreDouble::with(vec![
            record("app-1", "Ana Cruz", at(4, 1)),
            record("app-2", "Ben Santos", at(4, 9)),
        ]));
        let created = service(store, &dir)
            .create_incremental(at(4, 12))
            .await
            .expect("incremental backup");

        assert_eq!(created.manifest.cutoff_date, Some(at(4, 6)));
        assert_eq!(created.manifest.database.applications, 1);
        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn full_restore_replaces_the_store() {
        let dir = scratch_dir("restore-full");
        let store = Arc::new(StoreDouble::with(vec![record("app-1", "Ana Cruz", at(1, 9))]));
        let backups = service(Arc::clone(&store), &dir);
        let created = backups.create_full(at(2, 0)).await.expect("backup");

        store.delete(&ApplicationId("app-1".to_string())).await.expect("delete");
        store
            .insert(record("app-9", "Late Entry", at(3, 9)))
            .await
            .expect("insert");

        let outcome = backups.restore(&created.backup_name).await.expect("restore");
        assert_eq!(outcome.kind, BackupKind::Full);
        assert_eq!(outcome.restored, 1);
        assert_eq!(store.ids(), vec!["app-1"]);
        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn incremental_restore_only_overwrites_its_records() {
        let dir = scratch_dir("restore-incremental");
        let store = Arc::new(StoreDouble::with(vec![
            record("app-1", "Ana Cruz", at(1, 9)),
            record("app-2", "Ben Santos", at(5, 9)),
        ]));
        let backups = service(Arc::clone(&store), &dir);
        let created = backups.create_incremental(at(5, 12)).await.expect("backup");

        store.delete(&ApplicationId("app-2".to_string())).await.expect("delete");
        store
            .insert(record("app-2", "Renamed", at(5, 9)))
            .await
            .expect("insert");

        let outcome = backups
            .restore(&format!("{}.zip", created.backup_name))
            .await
            .expect("restore");
        assert_eq!(outcome.restored, 1);
        assert_eq!(store.ids(), vec!["app-1", "app-2"]);
        assert_eq!(store.name_of("app-2").as_deref(), Some("Ben Santos"));
        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn names_are_confined_to_the_backup_directory() {
        let dir = scratch_dir("names");
        let backups = service(Arc::new(StoreDouble::default()), &dir);

        for name in ["../secrets", "nested/backup", "..\\up", ""] {
            assert!(
                matches!(backups.archive(name), Err(BackupError::InvalidName(_))),
                "{name} should be rejected"
            );
        }
        assert!(matches!(
            backups.restore("full-backup-missing").await,
            Err(BackupError::NotFound(_))
        ));
        assert!(backups.list().expect("missing dir lists empty").is_empty());
    }

    #[tokio::test]
    async fn deleted_backups_leave_the_listing() {
        let dir = scratch_dir("delete");
        let backups = service(Arc::new(StoreDouble::default()), &dir);
        let created = backups.create_full(at(6, 0)).await.expect("backup");

        let bytes = backups.archive(&created.backup_name).expect("download");
        assert!(bytes.starts_with(b"PK\x03\x04"));

        backups.delete(&created.backup_name).expect("delete");
        assert!(backups.list().expect("list").is_empty());
        assert!(matches!(
            backups.delete(&created.backup_name),
            Err(BackupError::NotFound(_))
        ));
        fs::remove_dir_all(dir).ok();
    }
}
