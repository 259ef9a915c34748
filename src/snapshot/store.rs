use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{anyhow, Result};
use tokio::{fs, io::AsyncWriteExt};

use crate::{error::CrawlerError, logging, snapshot::Snapshot};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// 快照檔
///
/// 單一寫入者、多個讀取者。寫入時先寫到同目錄的暫存檔再 rename 取代，讀取端不會讀到寫到一半的內容。
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 以完整快照覆蓋舊的檔案
    pub async fn write(&self, snapshot: &Snapshot) -> Result<(), CrawlerError> {
        self.replace(snapshot).await.map_err(|why| CrawlerError::Persistence {
            path: self.path.display().to_string(),
            reason: format!("{:?}", why),
        })
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        if let Err(why) = write_synced(&temp, &json).await {
            let _ = fs::remove_file(&temp).await;
            return Err(why);
        }

        if let Err(why) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(anyhow!("Failed to rename {} because {:?}", temp.display(), why));
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);

        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", file_name, std::process::id(), seq))
    }

    /// 讀取目前的快照，檔案不存在時回傳 Ok(None)
    ///
    /// # Errors
    /// 檔案無法讀取或內容無法解析時回傳錯誤。
    pub async fn try_read(&self) -> Result<Option<Snapshot>> {
        let bytes = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(why) if why.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(why) => return Err(anyhow!("Failed to read {} because {:?}", self.path.display(), why)),
        };

        let snapshot = serde_json::from_slice::<Snapshot>(&bytes)
            .map_err(|why| anyhow!("Failed to parse {} because {:?}", self.path.display(), why))?;

        Ok(Some(snapshot))
    }

    /// 讀取目前的快照，沒有檔案或內容損毀時回傳 None，損毀會記錄下來
    pub async fn read(&self) -> Option<Snapshot> {
        match self.try_read().await {
            Ok(snapshot) => snapshot,
            Err(why) => {
                logging::error_file_async(format!("{:?}", why));
                None
            }
        }
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(content).await?;
    file.sync_all().await?;

    Ok(())
}
