//! Artifact staging and object-storage upload.
//!
//! Staging decides what actually gets uploaded: a directory artifact is
//! zipped next to itself, a file artifact goes as-is, and the remote
//! key picks up the local extension.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use url::Url;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use crate::errors::PipelineError;

/// Destination for the trained model artifact.
pub trait ArtifactStore {
    /// Upload the file at `local` under `key`.
    fn put(
        &self,
        local: &Path,
        key: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A staged artifact, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    /// Local file to upload (the zip, for directory artifacts).
    pub local: PathBuf,
    /// Remote key, extension included.
    pub key: String,
}

/// Resolve the configured model path against `base_dir` and prepare it
/// for upload.
///
/// # Errors
///
/// Fails if the artifact does not exist, or if zipping a directory
/// artifact fails.
pub fn prepare_artifact(
    base_dir: &Path,
    rel_path: &str,
    remote_base: &str,
) -> Result<StagedArtifact, PipelineError> {
    let local = base_dir.join(rel_path.trim_end_matches('/'));

    if !local.exists() {
        return Err(PipelineError::MissingArtifact(local));
    }

    if local.is_dir() {
        let zip_path = PathBuf::from(format!("{}.zip", local.display()));
        zip_dir(&local, &zip_path).map_err(PipelineError::Upload)?;
        return Ok(StagedArtifact {
            local: zip_path,
            key: format!("{remote_base}.zip"),
        });
    }

    let key = match local.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{remote_base}.{ext}"),
        None => remote_base.to_string(),
    };
    Ok(StagedArtifact { local, key })
}

/// Zip the contents of `src` into `dest`, entry names relative to `src`.
fn zip_dir(src: &Path, dest: &Path) -> Result<()> {
    let file = File::create(dest)
        .with_context(|| format!("Failed to create archive at {}", dest.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(src) {
        let entry = entry.context("Failed to walk artifact directory")?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .context("walkdir produced a path outside the artifact directory")?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let name = rel.to_string_lossy().into_owned();

        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .context("Failed to add directory to archive")?;
        } else {
            writer
                .start_file(name, options)
                .context("Failed to add file to archive")?;
            let mut f = File::open(entry.path())
                .with_context(|| format!("Failed to read {}", entry.path().display()))?;
            std::io::copy(&mut f, &mut writer).context("Failed to write archive entry")?;
        }
    }

    writer.finish().context("Failed to finalize archive")?;
    Ok(())
}

/// S3-backed artifact store. The bucket name is the host segment of the
/// configured storage URL.
pub struct S3ArtifactStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArtifactStore {
    /// Build a store from a storage URL like `s3://my-models-bucket`.
    /// Credentials and region come from the ambient AWS environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or carries no host.
    pub async fn from_storage_url(storage_url: &str) -> Result<Self> {
        let parsed = Url::parse(storage_url)
            .with_context(|| format!("Invalid model storage URL '{storage_url}'"))?;
        let bucket = parsed
            .host_str()
            .with_context(|| format!("Model storage URL '{storage_url}' has no bucket host"))?
            .to_string();

        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Ok(Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, local: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local)
            .await
            .with_context(|| format!("Failed to read artifact at {}", local.display()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Upload to bucket '{}' key '{key}' failed", self.bucket))?;

        tracing::info!(bucket = %self.bucket, key, "model artifact uploaded");
        Ok(())
    }
}
