use super::ConfigSchema;
use crate::error::{ConvertError, ConvertResult};
use crate::manifest::TypeHeader;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Decodes one kind of schema document.
///
/// Decoders are handed to the converter explicitly, so a run only knows
/// about the document kinds it was given.
pub trait SchemaDecoder: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &str;

    /// Whether a document with this header is a schema this decoder reads
    fn accepts(&self, header: &TypeHeader) -> bool;

    /// Decode the full document
    fn decode(&self, content: &str) -> Result<ConfigSchema, serde_yaml::Error>;
}

/// Reads `kots.io/v1beta1` `Config` documents
#[derive(Debug, Default, Clone, Copy)]
pub struct KotsConfigDecoder;

impl KotsConfigDecoder {
    pub const API_VERSION: &'static str = "kots.io/v1beta1";
    pub const KIND: &'static str = "Config";
}

#[derive(Deserialize)]
struct KotsConfigDocument {
    #[serde(default)]
    spec: ConfigSchema,
}

impl SchemaDecoder for KotsConfigDecoder {
    fn name(&self) -> &str {
        "kots-config"
    }

    fn accepts(&self, header: &TypeHeader) -> bool {
        header.is(Self::API_VERSION, Self::KIND)
    }

    fn decode(&self, content: &str) -> Result<ConfigSchema, serde_yaml::Error> {
        let document: KotsConfigDocument = serde_yaml::from_str(content)?;
        Ok(document.spec)
    }
}

/// A schema together with the file it came from
#[derive(Debug, Clone)]
pub struct LocatedSchema {
    pub path: PathBuf,
    pub schema: ConfigSchema,
}

/// Find and decode the first schema document under `root`.
///
/// Files are visited in file-name order. Binary files and documents without
/// a readable header are skipped; a document that is recognised but fails
/// to decode aborts the search.
pub fn locate_schema(root: &Path, decoders: &[&dyn SchemaDecoder]) -> ConvertResult<Option<LocatedSchema>> {
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let bytes = fs::read(path)?;
        let Ok(content) = String::from_utf8(bytes) else {
            continue;
        };

        let Some(header) = TypeHeader::parse(&content) else {
            continue;
        };

        let Some(decoder) = decoders.iter().find(|d| d.accepts(&header)) else {
            continue;
        };

        debug!("decoding {} with {}", path.display(), decoder.name());
        let schema = decoder.decode(&content).map_err(|source| ConvertError::SchemaDecode {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            "loaded config schema from {} ({} items)",
            path.display(),
            schema.item_count()
        );
        return Ok(Some(LocatedSchema {
            path: path.to_path_buf(),
            schema,
        }));
    }

    Ok(None)
}
