use thiserror::Error;

/// Failure to fetch or decode one of the map's input resources.
///
/// Row-level defects inside a CSV never produce a `LoadError`; those rows
/// are skipped by the parsers.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request for {resource} failed: {source}")]
    Request {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{resource} returned HTTP {status}")]
    Status { resource: String, status: u16 },

    #[error("{resource} is not valid GeoJSON: {source}")]
    GeoJson {
        resource: String,
        #[source]
        source: Box<geojson::Error>,
    },
}

impl LoadError {
    /// The locator of the resource that failed
    pub fn resource(&self) -> &str {
        match self {
            LoadError::Io { resource, .. }
            | LoadError::Request { resource, .. }
            | LoadError::Status { resource, .. }
            | LoadError::GeoJson { resource, .. } => resource,
        }
    }
}
