//! The registry's uniform view over the two filter disciplines. Everything
//! the maintenance loop and the request surface need -- add/test/metrics/
//! persistence -- is dispatched here so callers never match on the kind
//! themselves.
use crate::error::EngineError;
use classic::{ClassicFilter, FilterOptions as ClassicOptions};
use format::FilterKind;
use persist::PersistenceProvider;
use rotated::{RotatedFilter, RotatedFilterOptions};
use std::io::{Read, Write};
use std::time::Duration;

/// Validated construction options for `FilterRegistry::add`.
pub enum CreateOptions {
    Classic {
        name: String,
        n: u64,
        error_rate: f64,
    },
    Rotated {
        name: String,
        n: u64,
        error_rate: f64,
        r: u32,
        interval_hours: u32,
    },
}

impl CreateOptions {
    pub fn name(&self) -> &str {
        match self {
            CreateOptions::Classic { name, .. } => name,
            CreateOptions::Rotated { name, .. } => name,
        }
    }

    /// Validates per the request surface contract: `name != ""`, `n >= 1`,
    /// `0 < error_rate <= 0.1`, and for rotated filters `2 <= r <= 30` and
    /// `1 <= interval_hours <= 144`.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.name().is_empty() {
            return Err(EngineError::InvalidOptions("name must not be empty".into()));
        }
        let (n, error_rate) = match self {
            CreateOptions::Classic { n, error_rate, .. } => (*n, *error_rate),
            CreateOptions::Rotated { n, error_rate, .. } => (*n, *error_rate),
        };
        if n < 1 {
            return Err(EngineError::InvalidOptions("n must be >= 1".into()));
        }
        if !(error_rate > 0.0 && error_rate <= 0.1) {
            return Err(EngineError::InvalidOptions(
                "error_rate must be in (0, 0.1]".into(),
            ));
        }
        if let CreateOptions::Rotated {
            r, interval_hours, ..
        } = self
        {
            if !(2..=30).contains(r) {
                return Err(EngineError::InvalidOptions("r must be in [2, 30]".into()));
            }
            if !(1..=144).contains(interval_hours) {
                return Err(EngineError::InvalidOptions(
                    "interval_hours must be in [1, 144]".into(),
                ));
            }
        }
        Ok(())
    }
}

/// A named filter, either discipline.
pub enum Filter {
    Classic(ClassicFilter),
    Rotated(RotatedFilter),
}

impl Filter {
    pub fn new(options: CreateOptions) -> Result<Self, EngineError> {
        options.validate()?;
        Ok(match options {
            CreateOptions::Classic {
                name,
                n,
                error_rate,
            } => Filter::Classic(ClassicFilter::new(ClassicOptions {
                name,
                n,
                error_rate,
            })?),
            CreateOptions::Rotated {
                name,
                n,
                error_rate,
                r,
                interval_hours,
            } => Filter::Rotated(RotatedFilter::new(RotatedFilterOptions {
                name,
                n,
                error_rate,
                r,
                rotate_interval: Duration::from_secs(interval_hours as u64 * 3600),
            })?),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Filter::Classic(f) => f.name(),
            Filter::Rotated(f) => f.name(),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Classic(_) => FilterKind::Classic,
            Filter::Rotated(_) => FilterKind::Rotated,
        }
    }

    pub fn add(&self, key: &[u8]) {
        match self {
            Filter::Classic(f) => f.add(key),
            Filter::Rotated(f) => f.add(key),
        }
    }

    pub fn test(&self, key: &[u8]) -> bool {
        match self {
            Filter::Classic(f) => f.test(key),
            Filter::Rotated(f) => f.test(key),
        }
    }

    pub fn capacity(&self) -> u64 {
        match self {
            Filter::Classic(f) => f.capacity(),
            Filter::Rotated(f) => f.capacity(),
        }
    }

    pub fn k(&self) -> u32 {
        match self {
            Filter::Classic(f) => f.k(),
            Filter::Rotated(f) => f.k(),
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Filter::Classic(f) => f.count(),
            Filter::Rotated(f) => f.count(),
        }
    }

    pub fn fill_ratio(&self) -> f64 {
        match self {
            Filter::Classic(f) => f.fill_ratio(),
            Filter::Rotated(f) => f.fill_ratio(),
        }
    }

    pub fn estimated_fill_ratio(&self) -> f64 {
        match self {
            Filter::Classic(f) => f.estimated_fill_ratio(),
            Filter::Rotated(f) => f.estimated_fill_ratio(),
        }
    }

    /// Writes the outer-framed snapshot (`DumpHeader` + body) for this filter.
    pub fn dump_framed(&self, w: &mut dyn Write, use_gzip: bool) -> Result<(), EngineError> {
        match self {
            Filter::Classic(f) => {
                let mut body = Vec::new();
                f.dump(&mut body)?;
                format::write_framed(w, FilterKind::Classic, use_gzip, &body)
                    .map_err(EngineError::from)?;
            }
            Filter::Rotated(f) => {
                let mut body = Vec::new();
                f.dump(&mut body)?;
                format::write_framed(w, FilterKind::Rotated, use_gzip, &body)
                    .map_err(EngineError::from)?;
            }
        }
        Ok(())
    }

    /// Reads an outer-framed snapshot, dispatching on the tag in its header.
    pub fn load_framed(r: &mut dyn Read) -> Result<Self, EngineError> {
        let (kind, body) = format::read_framed(r)?;
        Ok(match kind {
            FilterKind::Classic => Filter::Classic(ClassicFilter::load(&mut &body[..])?),
            FilterKind::Rotated => Filter::Rotated(RotatedFilter::load(&mut &body[..])?),
        })
    }

    /// Runs this filter's share of one maintenance tick. A classic filter
    /// only ever dumps, and only when `force`; a rotated filter owns its own
    /// rotate-or-not decision (see [`rotated::RotatedFilter::period_maintenance`]).
    pub fn period_maintenance(
        &self,
        provider: &dyn PersistenceProvider,
        force: bool,
        use_gzip: bool,
    ) -> Result<(), EngineError> {
        match self {
            Filter::Classic(f) => {
                if force {
                    let mut body = Vec::new();
                    f.dump(&mut body)?;
                    let mut writer = provider.new_writer(f.name())?;
                    format::write_framed(&mut writer, FilterKind::Classic, use_gzip, &body)
                        .map_err(EngineError::from)?;
                    writer.finish()?;
                }
                Ok(())
            }
            Filter::Rotated(f) => {
                f.period_maintenance(provider, force, use_gzip)?;
                Ok(())
            }
        }
    }
}
