use crate::error::{PipelineError, PipelineResult};
use crate::tools::{MediaInfo, probe_media, validate_file_exists};
use std::path::{Path, PathBuf};

/// 磁碟上的來源影片或區塊檔案
///
/// 寬高與長度在建立時取得一次，之後不再重新查詢。
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    path: PathBuf,
    width: u32,
    height: u32,
    duration: Option<f64>,
}

impl MediaAsset {
    /// 以 ffprobe 建立來源影片
    pub fn probe(ffprobe: &Path, path: &Path) -> PipelineResult<Self> {
        let info = probe_media(ffprobe, path)?;
        Ok(Self::from_info(path, info))
    }

    #[must_use]
    pub fn from_info(path: &Path, info: MediaInfo) -> Self {
        Self {
            path: path.to_path_buf(),
            width: info.width,
            height: info.height,
            duration: Some(info.duration_seconds),
        }
    }

    /// 區塊檔案沿用來源的寬高，不帶長度
    pub fn chunk_of(parent: &Self, chunk_path: &Path) -> PipelineResult<Self> {
        validate_file_exists(chunk_path)?;
        Ok(Self {
            path: chunk_path.to_path_buf(),
            width: parent.width,
            height: parent.height,
            duration: None,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    #[must_use]
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
    }

    /// 含前導點的副檔名；沒有副檔名時為空字串
    #[must_use]
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn require_duration(&self) -> PipelineResult<f64> {
        self.duration.ok_or_else(|| {
            PipelineError::InvalidArgument(format!(
                "影片長度未知，無法依時間切割: {}",
                self.path.display()
            ))
        })
    }
}
