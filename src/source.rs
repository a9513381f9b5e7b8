use crate::error::LoadError;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Where a dataset lives: a local file or an HTTP(S) URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    File(PathBuf),
    Http(String),
}

impl Resource {
    /// Interpret a configured locator. Anything that isn't an http(s) URL is a path.
    pub fn parse(locator: &str) -> Self {
        let trimmed = locator.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Resource::Http(trimmed.to_string())
        } else {
            Resource::File(PathBuf::from(trimmed))
        }
    }

    /// Fetch the raw bytes. CSV callers decode row by row so one bad
    /// row can't fail the whole batch.
    pub fn fetch_bytes(&self) -> Result<Vec<u8>, LoadError> {
        match self {
            Resource::File(path) => fs::read(path).map_err(|source| LoadError::Io {
                resource: self.to_string(),
                source,
            }),
            Resource::Http(url) => {
                log::debug!("GET {}", url);
                let response = reqwest::blocking::get(url).map_err(|source| LoadError::Request {
                    resource: self.to_string(),
                    source,
                })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(LoadError::Status {
                        resource: self.to_string(),
                        status: status.as_u16(),
                    });
                }

                let body = response.bytes().map_err(|source| LoadError::Request {
                    resource: self.to_string(),
                    source,
                })?;
                Ok(body.to_vec())
            }
        }
    }

    /// Fetch the whole resource as text; invalid UTF-8 is replaced
    pub fn fetch_text(&self) -> Result<String, LoadError> {
        let bytes = self.fetch_bytes()?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("{}: not valid UTF-8, decoding lossily", self);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        })
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::File(path) => write!(f, "{}", path.display()),
            Resource::Http(url) => f.write_str(url),
        }
    }
}
