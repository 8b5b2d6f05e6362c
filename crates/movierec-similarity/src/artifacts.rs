//! Binary artifacts shared by the offline build and the query side.
//!
//! Each file is a bincode [`Envelope`]: magic, format version, artifact kind,
//! build id, an xxHash64 checksum and the bincode payload. The build id is the
//! checksum of the catalog payload and is shared by both files of a pair.
//! Loading checks every header field and the checksum before decoding the
//! payload, so floats come back bit-for-bit.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use twox_hash::XxHash64;

use movierec_core::config::{resolve_with_base, DataSettings};
use movierec_core::error::{Error, Result};
use movierec_core::types::CatalogRecord;

use crate::matrix::SimilarityMatrix;

const MAGIC: [u8; 4] = *b"MREC";
pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Catalog,
    Similarity,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 4],
    format_version: u32,
    kind: ArtifactKind,
    build_id: u64,
    checksum: u64,
    payload: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct SimilarityPayload {
    n: usize,
    data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub catalog: PathBuf,
    pub similarity: PathBuf,
}

impl ArtifactPaths {
    pub fn new(catalog: impl Into<PathBuf>, similarity: impl Into<PathBuf>) -> Self {
        Self { catalog: catalog.into(), similarity: similarity.into() }
    }

    /// Paths from config, relative ones resolved against `base`.
    pub fn from_settings(data: &DataSettings, base: &Path) -> Self {
        Self {
            catalog: resolve_with_base(base, &data.catalog_artifact),
            similarity: resolve_with_base(base, &data.similarity_artifact),
        }
    }
}

fn checksum(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

fn encode<T: Serialize>(kind: ArtifactKind, value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Artifact(format!("encode {kind:?}: {e}")))
}

fn seal(kind: ArtifactKind, build_id: u64, payload: Vec<u8>) -> Result<Vec<u8>> {
    let envelope = Envelope {
        magic: MAGIC,
        format_version: FORMAT_VERSION,
        kind,
        build_id,
        checksum: checksum(&payload),
        payload,
    };
    bincode::serialize(&envelope).map_err(|e| Error::Artifact(format!("encode envelope: {e}")))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `bytes` next to `path` without touching `path` itself.
fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = staging_path(path);
    fs::write(&tmp, bytes)?;
    Ok(tmp)
}

fn commit(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path)?;
    debug!(path = %path.display(), "artifact written");
    Ok(())
}

fn read_envelope<T: DeserializeOwned>(path: &Path, kind: ArtifactKind) -> Result<(T, u64)> {
    let bytes = fs::read(path).map_err(|e| Error::Artifact(format!("{}: {e}", path.display())))?;
    let envelope: Envelope = bincode::deserialize(&bytes)
        .map_err(|e| Error::Artifact(format!("{}: not an artifact: {e}", path.display())))?;
    if envelope.magic != MAGIC {
        return Err(Error::Artifact(format!("{}: bad magic", path.display())));
    }
    if envelope.format_version != FORMAT_VERSION {
        return Err(Error::Artifact(format!(
            "{}: format version {} (expected {FORMAT_VERSION})",
            path.display(),
            envelope.format_version
        )));
    }
    if envelope.kind != kind {
        return Err(Error::Artifact(format!(
            "{}: holds a {:?} artifact, expected {kind:?}",
            path.display(),
            envelope.kind
        )));
    }
    if checksum(&envelope.payload) != envelope.checksum {
        return Err(Error::Artifact(format!("{}: checksum mismatch", path.display())));
    }
    let value = bincode::deserialize(&envelope.payload)
        .map_err(|e| Error::Artifact(format!("{}: payload: {e}", path.display())))?;
    Ok((value, envelope.build_id))
}

fn similarity_payload(matrix: &SimilarityMatrix) -> SimilarityPayload {
    SimilarityPayload { n: matrix.size(), data: matrix.as_slice().to_vec() }
}

/// Write a catalog artifact. Returns its build id, the checksum of the
/// encoded records, which a matching similarity artifact must carry.
pub fn save_catalog(path: &Path, records: &[CatalogRecord]) -> Result<u64> {
    let payload = encode(ArtifactKind::Catalog, &records)?;
    let build_id = checksum(&payload);
    let tmp = stage(path, &seal(ArtifactKind::Catalog, build_id, payload)?)?;
    commit(&tmp, path)?;
    Ok(build_id)
}

pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRecord>> {
    Ok(read_envelope(path, ArtifactKind::Catalog)?.0)
}

pub fn save_similarity(path: &Path, matrix: &SimilarityMatrix, build_id: u64) -> Result<()> {
    let payload = encode(ArtifactKind::Similarity, &similarity_payload(matrix))?;
    let tmp = stage(path, &seal(ArtifactKind::Similarity, build_id, payload)?)?;
    commit(&tmp, path)
}

fn decode_similarity(path: &Path) -> Result<(SimilarityMatrix, u64)> {
    let (payload, build_id): (SimilarityPayload, u64) = read_envelope(path, ArtifactKind::Similarity)?;
    let n = payload.n;
    let matrix = SimilarityMatrix::from_parts(n, payload.data)
        .ok_or_else(|| Error::Artifact(format!("{}: data is not {n}x{n}", path.display())))?;
    Ok((matrix, build_id))
}

pub fn load_similarity(path: &Path) -> Result<SimilarityMatrix> {
    Ok(decode_similarity(path)?.0)
}

/// Write both artifacts under one build id. Both files are fully staged
/// before either existing artifact is replaced; a failed write leaves the
/// previous pair in place.
pub fn save_pair(paths: &ArtifactPaths, records: &[CatalogRecord], matrix: &SimilarityMatrix) -> Result<u64> {
    let catalog_payload = encode(ArtifactKind::Catalog, &records)?;
    let build_id = checksum(&catalog_payload);
    let catalog_bytes = seal(ArtifactKind::Catalog, build_id, catalog_payload)?;
    let similarity_bytes = seal(
        ArtifactKind::Similarity,
        build_id,
        encode(ArtifactKind::Similarity, &similarity_payload(matrix))?,
    )?;

    let catalog_tmp = stage(&paths.catalog, &catalog_bytes)?;
    let similarity_tmp = match stage(&paths.similarity, &similarity_bytes) {
        Ok(tmp) => tmp,
        Err(e) => {
            let _ = fs::remove_file(&catalog_tmp);
            return Err(e);
        }
    };
    commit(&catalog_tmp, &paths.catalog)?;
    commit(&similarity_tmp, &paths.similarity)?;
    info!(build_id = %format!("{build_id:016x}"), items = records.len(), "artifact pair written");
    Ok(build_id)
}

/// Load both artifacts and check that they come from the same build.
pub fn load_pair(paths: &ArtifactPaths) -> Result<(Vec<CatalogRecord>, SimilarityMatrix)> {
    let (records, catalog_build): (Vec<CatalogRecord>, u64) = read_envelope(&paths.catalog, ArtifactKind::Catalog)?;
    let (matrix, similarity_build) = decode_similarity(&paths.similarity)?;
    if records.len() != matrix.size() {
        return Err(Error::Artifact(format!(
            "catalog has {} items but similarity matrix is {}x{}",
            records.len(),
            matrix.size(),
            matrix.size()
        )));
    }
    if catalog_build != similarity_build {
        return Err(Error::Artifact(format!(
            "catalog and similarity artifacts come from different builds ({catalog_build:016x} vs {similarity_build:016x})"
        )));
    }
    info!(items = records.len(), "artifacts loaded");
    Ok((records, matrix))
}
