use std::fs::Metadata;
use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;

use crate::models::errors::ErrorExt;
use crate::Result;

/// A local file picked for upload. Metadata is read up front so size checks
/// happen before the content is loaded.
#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub metadata: Metadata,
}

impl FileInfo {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .context(format!("{} has no file name", path.display()))?;

        Ok(Self {
            path,
            file_name,
            metadata,
        })
    }

    pub fn len(&self) -> u64 {
        self.metadata.len()
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        let mut file = tokio::fs::File::open(&self.path).await?;

        let mut data = Vec::with_capacity(self.len().try_into().unwrap_or(0));

        file.read_to_end(&mut data).await?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_name_size_and_content() {
        let path = std::env::temp_dir().join(format!("skin-catalog-{}.png", std::process::id()));
        tokio::fs::write(&path, b"not really a png").await.unwrap();

        let info = FileInfo::open(&path).await.unwrap();

        assert!(info.file_name.ends_with(".png"));
        assert_eq!(info.len(), 16);
        assert_eq!(info.read().await.unwrap(), b"not really a png");

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
