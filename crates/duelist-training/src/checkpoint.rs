//! Persistent training state inside one output directory.
//!
//! | file | written by | policy |
//! |---|---|---|
//! | `best_genome_gen{N}.json` | [`CheckpointStore::save_generation_snapshot`] | created once, never overwritten |
//! | `best_genome.json` | [`CheckpointStore::save_current_best`] | replaced atomically |
//! | `evolution_stats.json` | [`CheckpointStore::append_stats`] | read, extended, replaced atomically |
//!
//! Replacements go through a sibling `.tmp` file followed by a rename, so an interrupted
//! run leaves either the previous or the new contents behind.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    genome::{self, Genome, GenomeError},
    stats::GenerationRecord,
};

pub const BEST_GENOME_FILE: &str = "best_genome.json";
const SNAPSHOT_PREFIX: &str = "best_genome_gen";
pub const STATS_FILE: &str = "evolution_stats.json";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CheckpointError {
    #[display("failed to create checkpoint directory {path}")]
    CreateDir { path: String, source: io::Error },
    #[display("snapshot {path} already exists")]
    SnapshotExists { path: String },
    #[display("failed to write {path}")]
    Io { path: String, source: io::Error },
    #[display("failed to serialize {path}")]
    Serialize {
        path: String,
        source: serde_json::Error,
    },
    #[display("failed to parse statistics log {path}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[display("invalid best genome checkpoint")]
    Genome { source: GenomeError },
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Opens `dir`, creating it if needed.
    pub fn new<P>(dir: P) -> Result<Self, CheckpointError>
    where
        P: Into<PathBuf>,
    {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CheckpointError::CreateDir {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn snapshot_path(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("{SNAPSHOT_PREFIX}{generation}.json"))
    }

    /// Highest generation with a snapshot file, complete or not.
    pub fn latest_snapshot(&self) -> Result<Option<usize>, CheckpointError> {
        let io_err = |source| CheckpointError::Io {
            path: self.dir.display().to_string(),
            source,
        };
        let mut latest = None;
        for entry in fs::read_dir(&self.dir).map_err(io_err)? {
            let name = entry.map_err(io_err)?.file_name();
            let generation = name
                .to_str()
                .and_then(|name| name.strip_prefix(SNAPSHOT_PREFIX))
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|n| n.parse::<usize>().ok());
            latest = latest.max(generation);
        }
        Ok(latest)
    }

    /// Returns `true` if an earlier run left any checkpoint file behind.
    pub fn has_checkpoints(&self) -> Result<bool, CheckpointError> {
        Ok(self.best_path().exists()
            || self.stats_path().exists()
            || self.latest_snapshot()?.is_some())
    }

    #[must_use]
    pub fn best_path(&self) -> PathBuf {
        self.dir.join(BEST_GENOME_FILE)
    }

    #[must_use]
    pub fn stats_path(&self) -> PathBuf {
        self.dir.join(STATS_FILE)
    }

    /// Writes the snapshot of `generation`. Fails if it was already written.
    pub fn save_generation_snapshot<G>(
        &self,
        genome: &G,
        generation: usize,
    ) -> Result<PathBuf, CheckpointError>
    where
        G: Genome,
    {
        let path = self.snapshot_path(generation);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| {
                if source.kind() == io::ErrorKind::AlreadyExists {
                    CheckpointError::SnapshotExists {
                        path: path.display().to_string(),
                    }
                } else {
                    CheckpointError::Io {
                        path: path.display().to_string(),
                        source,
                    }
                }
            })?;
        write_json(file, &path, &genome.to_record())?;
        Ok(path)
    }

    /// Replaces `best_genome.json`.
    pub fn save_current_best<G>(&self, genome: &G) -> Result<PathBuf, CheckpointError>
    where
        G: Genome,
    {
        let path = self.best_path();
        replace_json(&path, &genome.to_record())?;
        Ok(path)
    }

    /// Appends one record to the statistics log, keeping all earlier entries.
    pub fn append_stats(&self, record: &GenerationRecord) -> Result<(), CheckpointError> {
        let mut records = self.load_stats()?;
        records.push(record.clone());
        replace_json(&self.stats_path(), &records)
    }

    /// Reads the statistics log; a missing log is empty.
    pub fn load_stats(&self) -> Result<Vec<GenerationRecord>, CheckpointError> {
        let path = self.stats_path();
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no statistics log at {}, starting empty", path.display());
                return Ok(vec![]);
            }
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&json).map_err(|source| CheckpointError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads `best_genome.json`, or `None` if no run has written one yet.
    ///
    /// A present but invalid file is an error.
    pub fn load_best<G>(&self, shape: &G::Shape) -> Result<Option<G>, CheckpointError>
    where
        G: Genome,
    {
        let path = self.best_path();
        match genome::load_json(&path, shape) {
            Ok(genome) => {
                log::info!("loaded best genome from {}", path.display());
                Ok(Some(genome))
            }
            Err(GenomeError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                log::warn!(
                    "no best genome at {}, falling back to a fresh population",
                    path.display()
                );
                Ok(None)
            }
            Err(source) => Err(CheckpointError::Genome { source }),
        }
    }
}

fn write_json<T>(file: File, path: &Path, value: &T) -> Result<(), CheckpointError>
where
    T: Serialize,
{
    let io_err = |source| CheckpointError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| {
        CheckpointError::Serialize {
            path: path.display().to_string(),
            source,
        }
    })?;
    writeln!(writer).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    writer
        .into_inner()
        .map_err(|e| io_err(e.into_error()))?
        .sync_all()
        .map_err(io_err)
}

fn replace_json<T>(path: &Path, value: &T) -> Result<(), CheckpointError>
where
    T: Serialize,
{
    let tmp = path.with_extension("json.tmp");
    let file = File::create(&tmp).map_err(|source| CheckpointError::Io {
        path: tmp.display().to_string(),
        source,
    })?;
    write_json(file, &tmp, value)?;
    fs::rename(&tmp, path).map_err(|source| CheckpointError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::genome::{ParamGenome, ParamSpace};

    fn record(generation: usize) -> GenerationRecord {
        GenerationRecord {
            generation,
            best_fitness: 10.0,
            avg_fitness: 5.0,
            min_fitness: 1.0,
            max_fitness: 10.0,
            population_size: 4,
            elite_size: 2,
            tournament_size: 2,
        }
    }

    #[test]
    fn test_new_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("runs/a")).unwrap();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn test_snapshots_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let genome = ParamGenome::random(&ParamSpace::default(), &mut rng);

        let path = store.save_generation_snapshot(&genome, 3).unwrap();
        assert!(path.ends_with("best_genome_gen3.json"));
        let before = fs::read_to_string(&path).unwrap();

        let other = ParamGenome::random(&ParamSpace::default(), &mut rng);
        assert!(matches!(
            store.save_generation_snapshot(&other, 3),
            Err(CheckpointError::SnapshotExists { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_stats_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();
        assert!(store.load_stats().unwrap().is_empty());
        for generation in 0..3 {
            store.append_stats(&record(generation)).unwrap();
        }
        let records = store.load_stats().unwrap();
        assert_eq!(records, vec![record(0), record(1), record(2)]);
        assert!(!store.stats_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_latest_snapshot_scans_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();
        assert_eq!(store.latest_snapshot().unwrap(), None);
        assert!(!store.has_checkpoints().unwrap());

        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let genome = ParamGenome::random(&ParamSpace::default(), &mut rng);
        for generation in [0, 2, 11] {
            store.save_generation_snapshot(&genome, generation).unwrap();
        }
        // truncated leftovers still count, unrelated files do not
        fs::write(store.snapshot_path(12), "{").unwrap();
        fs::write(dir.path().join("best_genome_genx.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert_eq!(store.latest_snapshot().unwrap(), Some(12));
        assert!(store.has_checkpoints().unwrap());
    }

    #[test]
    fn test_stats_log_alone_counts_as_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();
        store.append_stats(&record(0)).unwrap();
        assert!(store.has_checkpoints().unwrap());
    }

    #[test]
    fn test_best_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();
        let space = ParamSpace::default();
        assert!(store.load_best::<ParamGenome>(&space).unwrap().is_none());

        let mut rng = Pcg64Mcg::seed_from_u64(2);
        let mut first = ParamGenome::random(&space, &mut rng);
        first.stats_mut().fitness = 40.0;
        store.save_current_best(&first).unwrap();
        let mut second = ParamGenome::random(&space, &mut rng);
        second.stats_mut().fitness = 55.0;
        store.save_current_best(&second).unwrap();

        let loaded = store.load_best::<ParamGenome>(&space).unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn test_corrupt_best_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();
        fs::write(store.best_path(), r#"{"genes": {"aggressive_distance": 1.0}}"#).unwrap();
        assert!(matches!(
            store.load_best::<ParamGenome>(&ParamSpace::default()),
            Err(CheckpointError::Genome { .. })
        ));
    }
}
