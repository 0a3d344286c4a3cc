//! # RotatedFilter — a ring of replica classic filters
//!
//! Approximates "membership within the last `r · rotate_interval`" without a
//! sudden drop in recall: every insert fans out to all `r` replicas, while
//! queries consult only the newest one (`current`). Periodically the oldest
//! replica is wiped and folded back in as the new newest slot — the
//! `current` cursor just advances around the ring.
use classic::{ClassicFilter, ClassicFilterError, FilterOptions as ClassicFilterOptions};
use format::{FilterKind, RotatedHeader};
use persist::{PersistenceProvider, PersistError};
use std::io::{Read, Write};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RotatedFilterError {
    #[error("illegal params: r must be in [2, 30]")]
    InvalidOptions,

    #[error("illegal load format: {0}")]
    IllegalLoadFormat(String),

    #[error("classic filter error: {0}")]
    Classic(#[from] ClassicFilterError),

    #[error("format error: {0}")]
    Format(#[from] format::FormatError),

    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validated construction options for a `RotatedFilter`.
#[derive(Debug, Clone)]
pub struct RotatedFilterOptions {
    pub name: String,
    pub n: u64,
    pub error_rate: f64,
    pub r: u32,
    pub rotate_interval: Duration,
}

struct RotationState {
    current: u32,
    last_rotated: SystemTime,
}

/// A ring of `r` identically-sized [`ClassicFilter`] replicas with an
/// advancing `current` cursor.
pub struct RotatedFilter {
    name: String,
    r: u32,
    rotate_interval: Duration,
    state: RwLock<RotationState>,
    replicas: Vec<ClassicFilter>,
}

impl RotatedFilter {
    pub fn new(options: RotatedFilterOptions) -> Result<Self, RotatedFilterError> {
        if !(2..=30).contains(&options.r) {
            return Err(RotatedFilterError::InvalidOptions);
        }

        let mut replicas = Vec::with_capacity(options.r as usize);
        for _ in 0..options.r {
            replicas.push(ClassicFilter::new(ClassicFilterOptions {
                name: options.name.clone(),
                n: options.n,
                error_rate: options.error_rate,
            })?);
        }

        Ok(Self {
            name: options.name,
            r: options.r,
            rotate_interval: options.rotate_interval,
            state: RwLock::new(RotationState {
                current: 0,
                last_rotated: SystemTime::now(),
            }),
            replicas,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn current(&self) -> u32 {
        self.state.read().expect("rotated filter lock poisoned").current
    }

    pub fn last_rotated(&self) -> SystemTime {
        self.state
            .read()
            .expect("rotated filter lock poisoned")
            .last_rotated
    }

    pub fn rotate_interval(&self) -> Duration {
        self.rotate_interval
    }

    /// Writes to every replica.
    pub fn add(&self, key: &[u8]) {
        for replica in &self.replicas {
            replica.add(key);
        }
    }

    /// Consults `replicas[current]` only.
    pub fn test(&self, key: &[u8]) -> bool {
        self.replicas[self.current() as usize].test(key)
    }

    /// Tests a specific replica directly; used to assert the ring-wide
    /// fan-out invariant and to inspect aged-out state.
    pub fn test_replica(&self, index: u32, key: &[u8]) -> bool {
        self.replicas[index as usize].test(key)
    }

    pub fn reset(&self) {
        for replica in &self.replicas {
            replica.reset();
        }
    }

    // Metrics intentionally proxy `replicas[current]` only -- see the design
    // notes on why Count/Capacity/FillRatio are not aggregated across replicas.
    fn current_replica(&self) -> &ClassicFilter {
        &self.replicas[self.current() as usize]
    }

    pub fn capacity(&self) -> u64 {
        self.current_replica().capacity()
    }

    pub fn k(&self) -> u32 {
        self.current_replica().k()
    }

    pub fn count(&self) -> u64 {
        self.current_replica().count()
    }

    pub fn fill_ratio(&self) -> f64 {
        self.current_replica().fill_ratio()
    }

    pub fn estimated_fill_ratio(&self) -> f64 {
        self.current_replica().estimated_fill_ratio()
    }

    /// Dump-then-advance rotation protocol.
    ///
    /// The snapshot is written before the cursor advances so a crash between
    /// the two leaves a durable snapshot of the pre-rotation state; the next
    /// maintenance pass either re-dumps and rotates, or (if not yet due)
    /// simply re-dumps again.
    pub fn period_maintenance(
        &self,
        provider: &dyn PersistenceProvider,
        force: bool,
        use_gzip: bool,
    ) -> Result<(), RotatedFilterError> {
        let observed_last_rotated = self.last_rotated();
        let now = SystemTime::now();
        let need_rotate = now
            .duration_since(observed_last_rotated)
            .unwrap_or(Duration::ZERO)
            >= self.rotate_interval;

        if !(need_rotate || force) {
            return Ok(());
        }

        let mut body = Vec::new();
        self.dump(&mut body)?;

        let mut writer = provider.new_writer(&self.name)?;
        format::write_framed(&mut writer, FilterKind::Rotated, use_gzip, &body)?;
        writer.finish()?;

        if need_rotate {
            let mut state = self.state.write().expect("rotated filter lock poisoned");
            // Double-checked: another maintenance pass may have raced and
            // already advanced the cursor since we observed `last_rotated`.
            if state.last_rotated == observed_last_rotated {
                self.replicas[state.current as usize].reset();
                state.current = (state.current + 1) % self.r;
                state.last_rotated = now;
            }
        }

        Ok(())
    }

    /// Writes `RotatedHeader` followed by `r` chunks, each a complete nested
    /// snapshot (its own `DumpHeader` + `ClassicHeader` + BitBuckets) of one
    /// replica. Nested snapshots are never gzip-wrapped themselves -- the
    /// outer framing (applied by the caller) compresses once for the whole
    /// file.
    pub fn dump(&self, w: &mut dyn Write) -> Result<(), RotatedFilterError> {
        let (current, last_rotated) = {
            let state = self.state.read().expect("rotated filter lock poisoned");
            (state.current, state.last_rotated)
        };
        let last_rotated_epoch_secs = last_rotated
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        RotatedHeader {
            r: self.r,
            current,
            name: self.name.clone(),
            rotate_interval_secs: self.rotate_interval.as_secs(),
            last_rotated_epoch_secs,
        }
        .write(w)?;

        for replica in &self.replicas {
            let mut inner_body = Vec::new();
            replica.dump(&mut inner_body)?;

            let mut nested = Vec::new();
            format::write_framed(&mut nested, FilterKind::Classic, false, &inner_body)?;
            format::write_chunk(w, &nested)?;
        }

        Ok(())
    }

    /// Reads a filter previously written by [`dump`](Self::dump).
    pub fn load(r: &mut dyn Read) -> Result<Self, RotatedFilterError> {
        let header = RotatedHeader::read(r)?;
        if header.r == 0 {
            return Err(RotatedFilterError::IllegalLoadFormat(
                "r is zero".to_string(),
            ));
        }

        let mut replicas = Vec::with_capacity(header.r as usize);
        for i in 0..header.r {
            let chunk = format::read_chunk(r)?;
            let (kind, inner_body) = format::read_framed(&mut &chunk[..])?;
            if kind != FilterKind::Classic {
                return Err(RotatedFilterError::IllegalLoadFormat(format!(
                    "replica {i} is not a classic snapshot"
                )));
            }
            replicas.push(ClassicFilter::load(&mut &inner_body[..])?);
        }

        let last_rotated = UNIX_EPOCH + Duration::from_secs(header.last_rotated_epoch_secs);

        Ok(Self {
            name: header.name,
            r: header.r,
            rotate_interval: Duration::from_secs(header.rotate_interval_secs),
            state: RwLock::new(RotationState {
                current: header.current,
                last_rotated,
            }),
            replicas,
        })
    }
}
