use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

/// URL prefix the upload directory is served under.
pub const UPLOAD_URL_PREFIX: &str = "/static/uploads";

const MAX_NAME_ATTEMPTS: usize = 8;

/// Raster formats browsers render as images. SVG is left out since it can
/// carry script.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Stores uploaded article images as flat files in one directory.
///
/// Client filenames are sanitized before they touch the filesystem, only
/// image extensions are accepted, and an existing file is never overwritten.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a name derived from `filename` and return the
    /// relative URL it will be served from.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let Some(ext) = image_extension(filename) else {
            bail!("not an image filename: {:?}", filename);
        };
        let base = match secure_filename(filename) {
            name if image_extension(&name).is_some() && !name.starts_with('.') => name,
            _ => format!("{}.{}", Uuid::new_v4().simple(), ext),
        };

        let mut name = base.clone();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(&name);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    info!("Stored upload {} ({} bytes)", name, bytes.len());
                    return Ok(format!("{}/{}", UPLOAD_URL_PREFIX, name));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!("Upload name {} taken, retrying with a prefix", name);
                    let prefix = Uuid::new_v4().simple().to_string();
                    name = format!("{}_{}", &prefix[..8], base);
                }
                Err(e) => return Err(e.into()),
            }
        }

        bail!("could not find a free name for upload {}", base)
    }

    /// Delete a file previously returned by `save`. References outside the
    /// upload prefix are ignored.
    pub async fn remove(&self, reference: &str) -> Result<()> {
        let Some(name) = reference
            .strip_prefix(UPLOAD_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            return Ok(());
        };
        if name != secure_filename(name) {
            bail!("refusing to remove {:?}", reference);
        }

        match fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                info!("Removed upload {}", name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The lowercased extension of `filename` when it is an accepted image type.
pub fn image_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Path separators become word breaks, anything outside `[A-Za-z0-9_.-]` is
/// dropped, runs of whitespace collapse to `_`, and leading/trailing `.` and
/// `_` are stripped. The result can be empty.
pub fn secure_filename(filename: &str) -> String {
    let spaced: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
