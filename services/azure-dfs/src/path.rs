use std::fmt::{Debug, Write};

use abfs_core::{Error, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};

use crate::Config;

/// Metadata the host attaches to every chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Start of the time window the chunk belongs to, in unix seconds.
    pub timekey: Option<i64>,
    /// Identifier of the chunk, stable across re-deliveries.
    pub unique_id: Vec<u8>,
}

/// ResolvePath turns chunk metadata and a rotation index into a blob path.
///
/// The returned path is relative to the container and starts with `/`.
/// Implementations must be deterministic in `index` for one chunk, or rotation
/// can't tell whether an index change moved the target.
pub trait ResolvePath: Debug + Send + Sync + 'static {
    /// Resolve the blob path for `metadata` at rotation `index`.
    fn resolve(&self, metadata: &ChunkMetadata, index: u32) -> String;
}

/// Path template with `%{...}` placeholders.
///
/// | placeholder          | value                                                    |
/// |----------------------|----------------------------------------------------------|
/// | `%{path}`            | configured path prefix                                   |
/// | `%{index}`           | rotation index                                           |
/// | `%{file_extension}`  | configured extension                                     |
/// | `%{time_slice}`      | chunk timekey in UTC with `time_slice_format`, or empty  |
/// | `%{date_slice}`      | same as `%{time_slice}`                                  |
/// | `%{hms_slice}`       | current time as `%H%M%S`                                 |
/// | `%{upload_timestamp}`| current time with `upload_timestamp_format`              |
/// | `%{hex_random}`      | reversed hex of the chunk id, cut to `hex_random_length` |
/// | `%{uuid_flush}`      | a random UUID, new on every resolution                   |
///
/// Unknown placeholders are kept verbatim. Substituted values are never
/// scanned for placeholders again.
#[derive(Debug, Clone)]
pub struct ObjectKeyFormat {
    format: String,
    path: String,
    file_extension: String,
    time_slice_format: String,
    upload_timestamp_format: String,
    hex_random_length: usize,
    localtime: bool,
}

impl ObjectKeyFormat {
    /// Build the template described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        for (name, fmt) in [
            ("time_slice_format", &config.time_slice_format),
            ("upload_timestamp_format", &config.upload_timestamp_format),
        ] {
            if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
                return Err(Error::config_invalid(format!(
                    "{name} '{fmt}' is not a valid strftime format"
                )));
            }
        }

        Ok(Self {
            format: config.object_key_format.clone(),
            path: config.path.clone(),
            file_extension: config.file_extension.clone(),
            time_slice_format: config.time_slice_format.clone(),
            upload_timestamp_format: config.upload_timestamp_format.clone(),
            hex_random_length: config.hex_random_length,
            localtime: config.localtime,
        })
    }

    /// Whether the template changes with the rotation index.
    pub fn uses_index(&self) -> bool {
        self.format.contains("%{index}")
    }

    fn now(&self, fmt: &str) -> String {
        if self.localtime {
            strftime(&Local::now(), fmt)
        } else {
            strftime(&Utc::now(), fmt)
        }
    }

    fn value(&self, key: &str, metadata: &ChunkMetadata, index: u32) -> Option<String> {
        let v = match key {
            "path" => self.path.clone(),
            "index" => index.to_string(),
            "file_extension" => self.file_extension.clone(),
            "time_slice" | "date_slice" => metadata
                .timekey
                .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
                .map(|t| strftime(&t, &self.time_slice_format))
                .unwrap_or_default(),
            "hms_slice" => self.now("%H%M%S"),
            "upload_timestamp" => self.now(&self.upload_timestamp_format),
            "hex_random" => hex::encode(&metadata.unique_id)
                .chars()
                .rev()
                .take(self.hex_random_length)
                .collect(),
            "uuid_flush" => uuid::Uuid::new_v4().to_string(),
            _ => return None,
        };
        Some(v)
    }
}

impl ResolvePath for ObjectKeyFormat {
    fn resolve(&self, metadata: &ChunkMetadata, index: u32) -> String {
        let mut out = String::with_capacity(self.format.len() + self.path.len() + 16);
        let mut rest = self.format.as_str();

        while let Some(start) = rest.find("%{") {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let Some(end) = tail.find('}') else {
                out.push_str(tail);
                rest = "";
                break;
            };
            let key = &tail[2..end];
            match self.value(key, metadata, index) {
                Some(v) => out.push_str(&v),
                None => out.push_str(&tail[..=end]),
            }
            rest = &tail[end + 1..];
        }
        out.push_str(rest);

        if !out.starts_with('/') {
            out.insert(0, '/');
        }
        out
    }
}

fn strftime<Tz: chrono::TimeZone>(t: &DateTime<Tz>, fmt: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut s = String::new();
    // Formats are validated up front; a failure here only truncates the value.
    let _ = write!(s, "{}", t.format(fmt));
    s
}
