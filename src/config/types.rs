use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 分塊縮放的使用者設定，儲存在 settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// 目標高度（像素）
    pub target_height: u32,
    /// 輸出寬高比，例如 16/9
    pub aspect_ratio: f64,
    /// 切割的區塊數量
    pub num_chunks: usize,
    /// 同時處理的區塊數量
    pub concurrency: usize,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_height: 720,
            aspect_ratio: 16.0 / 9.0,
            num_chunks: 5,
            concurrency: 5,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.target_height == 0 {
            return Err(PipelineError::InvalidArgument(
                "目標高度必須大於 0".to_string(),
            ));
        }
        if !self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0 {
            return Err(PipelineError::InvalidArgument(format!(
                "寬高比無效: {}",
                self.aspect_ratio
            )));
        }
        if self.num_chunks == 0 {
            return Err(PipelineError::InvalidArgument(
                "區塊數量必須至少為 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(PipelineError::InvalidArgument(
                "平行數量必須至少為 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: PipelineSettings,
}
