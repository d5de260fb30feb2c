use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;
use crate::filter::{check_filter_path, StagedArtifact};

/// Artifacts written into a working directory for the duration of one
/// encoder run. Files are removed when the manifest is dropped, whether the
/// run succeeded or not.
#[derive(Debug)]
pub struct StagedManifest {
    work_dir: PathBuf,
    staged: Vec<PathBuf>,
}

impl StagedManifest {
    pub async fn stage(work_dir: &Path, artifacts: &[StagedArtifact]) -> Result<Self> {
        let mut manifest = Self {
            work_dir: work_dir.to_path_buf(),
            staged: Vec::with_capacity(artifacts.len()),
        };

        for artifact in artifacts {
            check_filter_path(&artifact.file_name)?;
            let path = work_dir.join(&artifact.file_name);
            fs::write(&path, &artifact.contents).await?;
            debug!("Staged {:?} artifact {}", artifact.role, path.display());
            // Tracked as soon as it exists so a later failure still cleans it up
            manifest.staged.push(path);
        }

        Ok(manifest)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.staged
    }
}

impl Drop for StagedManifest {
    fn drop(&mut self) {
        for path in &self.staged {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove staged file {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VidError;
    use crate::filter::TrackRole;
    use assert_fs::prelude::*;

    fn artifact(name: &str) -> StagedArtifact {
        StagedArtifact {
            file_name: name.to_string(),
            role: TrackRole::Subtitles,
            contents: "[Script Info]\n".to_string(),
        }
    }

    #[tokio::test]
    async fn test_artifacts_live_while_manifest_is_held() {
        let temp = assert_fs::TempDir::new().unwrap();
        let artifacts = [artifact("job_original.ass"), artifact("job_translation.ass")];

        let manifest = StagedManifest::stage(temp.path(), &artifacts).await.unwrap();
        temp.child("job_original.ass").assert("[Script Info]\n");
        assert!(temp.child("job_translation.ass").path().exists());
        assert_eq!(manifest.paths().len(), 2);

        drop(manifest);
        assert!(!temp.child("job_original.ass").path().exists());
        assert!(!temp.child("job_translation.ass").path().exists());
    }

    #[tokio::test]
    async fn test_partial_staging_is_cleaned_up() {
        let temp = assert_fs::TempDir::new().unwrap();
        let artifacts = [artifact("good.ass"), artifact("bad:name.ass")];

        let err = StagedManifest::stage(temp.path(), &artifacts).await.unwrap_err();

        assert!(matches!(err, VidError::PathEncodingHazard { .. }));
        assert!(!temp.child("good.ass").path().exists());
    }

    #[tokio::test]
    async fn test_already_removed_file_does_not_panic() {
        let temp = assert_fs::TempDir::new().unwrap();
        let manifest = StagedManifest::stage(temp.path(), &[artifact("gone.ass")]).await.unwrap();

        std::fs::remove_file(temp.path().join("gone.ass")).unwrap();
        drop(manifest);
    }
}
