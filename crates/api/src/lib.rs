//! # Request surface — Create/Add/Test/Info
//!
//! A stateless adapter over [`registry::FilterRegistry`]. Request/response
//! types are `serde`-derived so a transport (out of scope here) can decode
//! them straight off the wire; the functions in this crate do the validation
//! and dispatch the transport would otherwise have to duplicate.
use registry::{CreateOptions, EngineError, FilterRegistry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CreateRequest {
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

impl From<CreateRequest> for CreateOptions {
    fn from(req: CreateRequest) -> Self {
        match req {
            CreateRequest::Classic {
                name,
                n,
                error_rate,
            } => CreateOptions::Classic {
                name,
                n,
                error_rate,
            },
            CreateRequest::Rotated {
                name,
                n,
                error_rate,
                r,
                interval_hours,
            } => CreateOptions::Rotated {
                name,
                n,
                error_rate,
                r,
                interval_hours,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRequest {
    pub name: String,
    pub keys: Vec<Vec<u8>>,
    /// Advisory hint only; the engine may insert sequentially regardless.
    pub wait: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRequest {
    pub name: String,
    pub keys: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResponse {
    pub bits: Vec<bool>,
    pub positives_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub capacity: u64,
    pub k: u32,
    pub count: u64,
    pub fill_ratio: f64,
    pub estimated_fill_ratio: f64,
}

/// **Create** — validates and registers a new named filter.
pub async fn create(registry: &FilterRegistry, req: CreateRequest) -> Result<(), EngineError> {
    registry.add(req.into()).await?;
    Ok(())
}

/// **Add** — resolves the filter and inserts every key. `wait` is accepted
/// for wire compatibility but does not change behavior: inserts are always
/// sequential in the caller's context (see the design notes on batch
/// fan-out).
pub async fn add(registry: &FilterRegistry, req: AddRequest) -> Result<(), EngineError> {
    registry.batch_add(&req.name, &req.keys).await
}

/// **Test** — resolves the filter and tests every key, returning the
/// per-key bits and the positive count.
pub async fn test(registry: &FilterRegistry, req: TestRequest) -> Result<TestResponse, EngineError> {
    let (bits, positives_count) = registry.batch_test(&req.name, &req.keys).await?;
    Ok(TestResponse {
        bits,
        positives_count,
    })
}

/// **Info** — a projection of filter metrics.
pub async fn info(registry: &FilterRegistry, name: &str) -> Result<InfoResponse, EngineError> {
    let filter = registry.get(name).await?;
    Ok(InfoResponse {
        capacity: filter.capacity(),
        k: filter.k(),
        count: filter.count(),
        fill_ratio: filter.fill_ratio(),
        estimated_fill_ratio: filter.estimated_fill_ratio(),
    })
}

#[cfg(test)]
mod tests;
