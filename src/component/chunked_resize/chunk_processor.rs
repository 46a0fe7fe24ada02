use super::media_asset::MediaAsset;
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{FfmpegCommand, MediaEngine, remove_file_if_exists};
use console::style;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// 縮放參數：目標高度與寬高比
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeRequest {
    pub target_height: u32,
    pub aspect_ratio: f64,
}

impl ResizeRequest {
    pub fn new(target_height: u32, aspect_ratio: f64) -> PipelineResult<Self> {
        if target_height == 0 {
            return Err(PipelineError::InvalidArgument(
                "目標高度必須大於 0".to_string(),
            ));
        }
        if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return Err(PipelineError::InvalidArgument(format!(
                "寬高比無效: {aspect_ratio}"
            )));
        }
        Ok(Self {
            target_height,
            aspect_ratio,
        })
    }

    /// `floor(target_height * aspect_ratio)`
    #[must_use]
    pub fn target_width(&self) -> u32 {
        (f64::from(self.target_height) * self.aspect_ratio).floor() as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
    Resized {
        output: PathBuf,
        width: u32,
        height: u32,
    },
    /// 目標高度不小於來源高度，不放大，檔案保持原樣
    Skipped {
        requested_height: u32,
        source_height: u32,
    },
}

impl ResizeOutcome {
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// 對整個來源影片或單一區塊執行縮放
pub struct ChunkProcessor<'a, E: MediaEngine> {
    asset: &'a MediaAsset,
    engine: &'a E,
}

impl<'a, E: MediaEngine> ChunkProcessor<'a, E> {
    #[must_use]
    pub const fn new(asset: &'a MediaAsset, engine: &'a E) -> Self {
        Self { asset, engine }
    }

    #[must_use]
    pub const fn asset(&self) -> &MediaAsset {
        self.asset
    }

    /// 縮放來源影片（`chunk` 為 `None`）或覆寫指定區塊
    pub fn resize(&self, request: &ResizeRequest, chunk: Option<&Path>) -> PipelineResult<ResizeOutcome> {
        let source_height = self.asset.height();
        if request.target_height >= source_height {
            println!(
                "{}",
                style(format!(
                    "無法縮放：目標高度 ({}) 不小於來源高度 ({source_height})",
                    request.target_height
                ))
                .yellow()
            );
            info!(
                "略過縮放 {}: 目標高度 {} >= 來源高度 {}",
                chunk.unwrap_or(self.asset.path()).display(),
                request.target_height,
                source_height
            );
            return Ok(ResizeOutcome::Skipped {
                requested_height: request.target_height,
                source_height,
            });
        }

        let target = match chunk {
            Some(path) => MediaAsset::chunk_of(self.asset, path).map_err(|_| {
                PipelineError::MissingChunk {
                    path: path.to_path_buf(),
                }
            })?,
            None => self.asset.clone(),
        };

        let width = request.target_width();
        let height = request.target_height;
        let output = self.output_path(&target, width, height);

        let (source_width, _) = self.asset.dimensions();
        let banner = format!(
            "{} {source_width}x{source_height} -> {width}x{height}",
            target
                .path()
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
        );
        println!("{banner}");
        println!("{}", "-".repeat(banner.chars().count()));

        let command = FfmpegCommand::scale(target.path(), width, height, &output);
        if let Err(failure) = self.engine.run(&command) {
            if let Err(e) = remove_file_if_exists(&output) {
                warn!("無法刪除不完整的輸出 {}: {e}", output.display());
            }
            return Err(PipelineError::Transform {
                path: target.path().to_path_buf(),
                failure,
            });
        }

        if chunk.is_none() {
            info!("縮放完成: {}", output.display());
            return Ok(ResizeOutcome::Resized {
                output,
                width,
                height,
            });
        }

        // ffmpeg 無法邊讀邊寫同一檔案，完成後再覆蓋原區塊
        fs::rename(&output, target.path()).map_err(|e| PipelineError::io(&output, e))?;
        info!("區塊縮放完成: {}", target.path().display());

        Ok(ResizeOutcome::Resized {
            output: target.path().to_path_buf(),
            width,
            height,
        })
    }

    /// `{stem}_{width}_{height}{ext}`，與輸入同資料夾
    fn output_path(&self, target: &MediaAsset, width: u32, height: u32) -> PathBuf {
        target.directory().join(format!(
            "{}_{width}_{height}{}",
            target.stem(),
            self.asset.extension()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_width_floors() {
        let request = ResizeRequest::new(720, 16.0 / 9.0).unwrap();
        assert_eq!(request.target_width(), 1280);

        let request = ResizeRequest::new(481, 4.0 / 3.0).unwrap();
        assert_eq!(request.target_width(), 641);
    }

    #[test]
    fn test_invalid_request() {
        assert!(ResizeRequest::new(0, 1.5).is_err());
        assert!(ResizeRequest::new(720, 0.0).is_err());
        assert!(ResizeRequest::new(720, -1.0).is_err());
        assert!(ResizeRequest::new(720, f64::INFINITY).is_err());
    }
}
