//! Persistent run state: parameters plus one population snapshot per generation.
//!
//! [`JsonlStore`] keeps an append-only JSON-lines log. Every record carries a
//! `schema_version`; `params` records replace earlier ones, `generation`
//! records must arrive with strictly increasing indices. Opening the log only
//! parses record headers and remembers byte offsets, so snapshots are read
//! back on demand.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::schema::RunParams;

use super::population::PopulationSnapshot;

/// Newest record layout this build reads and the one it writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Checkpoint store errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Checkpoint IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Checkpoint serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Corrupt checkpoint record on line {line}: {message}")]
    Corrupt { line: usize, message: String },
    #[error("Checkpoint schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("Generation {index} does not follow stored generation {last}")]
    NonMonotonic { index: usize, last: usize },
    #[error("No run parameters stored")]
    MissingParams,
    #[error("Generation {0} not found in checkpoint")]
    MissingGeneration(usize),
}

/// Storage contract used by the optimizer.
pub trait CheckpointStore {
    /// Latest stored run parameters.
    fn load_params(&self) -> Result<Option<RunParams>, CheckpointError>;

    fn save_params(&mut self, params: &RunParams) -> Result<(), CheckpointError>;

    /// Stored generation indices, ascending.
    fn generations(&self) -> Vec<usize>;

    fn last_generation(&self) -> Option<usize> {
        self.generations().last().copied()
    }

    fn load_generation(&self, index: usize) -> Result<PopulationSnapshot, CheckpointError>;

    /// Persist generation `index`; it must exceed every stored index.
    fn append_generation(
        &mut self,
        index: usize,
        snapshot: &PopulationSnapshot,
    ) -> Result<(), CheckpointError>;
}

fn check_monotonic(last: Option<usize>, index: usize) -> Result<(), CheckpointError> {
    match last {
        Some(last) if index <= last => Err(CheckpointError::NonMonotonic { index, last }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RecordKind {
    Params,
    Generation,
}

/// Fields needed to index a record without decoding its payload.
#[derive(Debug, Deserialize)]
struct RecordHeader {
    schema_version: u32,
    kind: RecordKind,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Serialize)]
struct ParamsRecordRef<'a> {
    schema_version: u32,
    kind: RecordKind,
    params: &'a RunParams,
}

#[derive(Serialize)]
struct GenerationRecordRef<'a> {
    schema_version: u32,
    kind: RecordKind,
    index: usize,
    population: &'a PopulationSnapshot,
}

#[derive(Deserialize)]
struct ParamsRecord {
    params: RunParams,
}

#[derive(Deserialize)]
struct GenerationRecord {
    index: usize,
    population: PopulationSnapshot,
}

/// Append-only JSON-lines checkpoint file.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    file: File,
    /// Bytes of valid records.
    len: u64,
    params: Option<RunParams>,
    /// Generation index to byte offset of its record.
    offsets: BTreeMap<usize, u64>,
}

impl JsonlStore {
    /// Open a checkpoint log, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        Self::open_with(path.as_ref(), true)
    }

    /// Open an existing checkpoint log.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        Self::open_with(path.as_ref(), false)
    }

    fn open_with(path: &Path, create: bool) -> Result<Self, CheckpointError> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(create)
            .open(path)?;

        let mut store = Self {
            path: path.to_path_buf(),
            file,
            len: 0,
            params: None,
            offsets: BTreeMap::new(),
        };
        store.scan()?;
        log::debug!(
            "Opened checkpoint {} ({} generations)",
            store.path.display(),
            store.offsets.len()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index every record. A torn final line from an interrupted write is cut off.
    fn scan(&mut self) -> Result<(), CheckpointError> {
        let mut reader = BufReader::new(&self.file);
        let mut buf = Vec::new();
        let mut offset = 0u64;
        let mut line = 0usize;
        let mut unterminated = false;

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            line += 1;
            let complete = buf.last() == Some(&b'\n');

            if buf.iter().all(u8::is_ascii_whitespace) {
                offset += read as u64;
                continue;
            }

            let header: RecordHeader = match serde_json::from_slice(&buf) {
                Ok(header) => header,
                Err(_) if !complete => {
                    log::warn!(
                        "Discarding incomplete record at end of {} (line {})",
                        self.path.display(),
                        line
                    );
                    break;
                }
                Err(e) => {
                    return Err(CheckpointError::Corrupt {
                        line,
                        message: e.to_string(),
                    });
                }
            };

            if header.schema_version > SCHEMA_VERSION {
                return Err(CheckpointError::UnsupportedVersion {
                    found: header.schema_version,
                    supported: SCHEMA_VERSION,
                });
            }

            match header.kind {
                RecordKind::Params => {
                    let record: ParamsRecord =
                        serde_json::from_slice(&buf).map_err(|e| CheckpointError::Corrupt {
                            line,
                            message: e.to_string(),
                        })?;
                    self.params = Some(record.params);
                }
                RecordKind::Generation => {
                    let index = header.index.ok_or_else(|| CheckpointError::Corrupt {
                        line,
                        message: "generation record without index".to_string(),
                    })?;
                    check_monotonic(self.offsets.keys().next_back().copied(), index)?;
                    self.offsets.insert(index, offset);
                }
            }
            offset += read as u64;
            unterminated = !complete;
        }

        drop(reader);
        let on_disk = self.file.metadata()?.len();
        if on_disk > offset {
            self.file.set_len(offset)?;
        }
        self.len = offset;
        if unterminated {
            self.file.write_all(b"\n")?;
            self.len += 1;
        }
        Ok(())
    }

    fn append_line<T: Serialize>(&mut self, record: &T) -> Result<u64, CheckpointError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let offset = self.len;
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        self.len += line.len() as u64;
        Ok(offset)
    }

    fn read_line_at(&self, offset: u64) -> Result<Vec<u8>, CheckpointError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        BufReader::new(file.take(self.len - offset)).read_until(b'\n', &mut buf)?;
        Ok(buf)
    }
}

impl CheckpointStore for JsonlStore {
    fn load_params(&self) -> Result<Option<RunParams>, CheckpointError> {
        Ok(self.params.clone())
    }

    fn save_params(&mut self, params: &RunParams) -> Result<(), CheckpointError> {
        self.append_line(&ParamsRecordRef {
            schema_version: SCHEMA_VERSION,
            kind: RecordKind::Params,
            params,
        })?;
        self.params = Some(params.clone());
        Ok(())
    }

    fn generations(&self) -> Vec<usize> {
        self.offsets.keys().copied().collect()
    }

    fn last_generation(&self) -> Option<usize> {
        self.offsets.keys().next_back().copied()
    }

    fn load_generation(&self, index: usize) -> Result<PopulationSnapshot, CheckpointError> {
        let offset = *self
            .offsets
            .get(&index)
            .ok_or(CheckpointError::MissingGeneration(index))?;
        let record: GenerationRecord = serde_json::from_slice(&self.read_line_at(offset)?)?;
        if record.index != index {
            return Err(CheckpointError::MissingGeneration(index));
        }
        Ok(record.population)
    }

    fn append_generation(
        &mut self,
        index: usize,
        snapshot: &PopulationSnapshot,
    ) -> Result<(), CheckpointError> {
        check_monotonic(self.last_generation(), index)?;
        let offset = self.append_line(&GenerationRecordRef {
            schema_version: SCHEMA_VERSION,
            kind: RecordKind::Generation,
            index,
            population: snapshot,
        })?;
        self.offsets.insert(index, offset);
        Ok(())
    }
}

/// In-process store for tests and throwaway runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    params: Option<RunParams>,
    generations: BTreeMap<usize, PopulationSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryStore {
    fn load_params(&self) -> Result<Option<RunParams>, CheckpointError> {
        Ok(self.params.clone())
    }

    fn save_params(&mut self, params: &RunParams) -> Result<(), CheckpointError> {
        self.params = Some(params.clone());
        Ok(())
    }

    fn generations(&self) -> Vec<usize> {
        self.generations.keys().copied().collect()
    }

    fn load_generation(&self, index: usize) -> Result<PopulationSnapshot, CheckpointError> {
        self.generations
            .get(&index)
            .cloned()
            .ok_or(CheckpointError::MissingGeneration(index))
    }

    fn append_generation(
        &mut self,
        index: usize,
        snapshot: &PopulationSnapshot,
    ) -> Result<(), CheckpointError> {
        check_monotonic(self.last_generation(), index)?;
        self.generations.insert(index, snapshot.clone());
        Ok(())
    }
}
