use super::manifest::{ChunkManifest, ChunkNaming};
use super::media_asset::MediaAsset;
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{FfmpegCommand, MediaEngine};
use console::style;
use log::{error, info};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Stitcher<'a, E: MediaEngine> {
    asset: &'a MediaAsset,
    engine: &'a E,
}

impl<'a, E: MediaEngine> Stitcher<'a, E> {
    #[must_use]
    pub const fn new(asset: &'a MediaAsset, engine: &'a E) -> Self {
        Self { asset, engine }
    }

    /// 依清單順序合併區塊，成功後刪除清單與區塊檔案
    ///
    /// 失敗時保留所有檔案以便檢查。
    pub fn stitch(&self, manifest: &ChunkManifest, suffix: Option<&str>) -> PipelineResult<PathBuf> {
        println!("{}", style("合併區塊中...").cyan());
        manifest.verify()?;

        let suffix = suffix.map_or_else(unique_suffix, ToString::to_string);
        let output = self.output_path(&suffix)?;

        info!(
            "合併 {} 個區塊: {} -> {}",
            manifest.len(),
            manifest.manifest_path().display(),
            output.display()
        );

        let command = FfmpegCommand::concat(manifest.manifest_path(), &output);
        if let Err(failure) = self.engine.run(&command) {
            error!("合併失敗，保留區塊檔案: {failure}");
            return Err(PipelineError::Stitch {
                manifest: manifest.manifest_path().to_path_buf(),
                failure,
            });
        }

        ChunkManifest::remove_session_files(&ChunkNaming::for_asset(self.asset))?;

        println!(
            "{}",
            style(format!("合併完成: {}", output.display())).green()
        );
        Ok(output)
    }

    /// `{stem}_{suffix}{ext}`，與來源同資料夾且不可覆蓋來源
    fn output_path(&self, suffix: &str) -> PipelineResult<PathBuf> {
        let output = self.asset.directory().join(format!(
            "{}_{suffix}{}",
            self.asset.stem(),
            self.asset.extension()
        ));
        if output == self.asset.path() || suffix.is_empty() {
            return Err(PipelineError::InvalidArgument(format!(
                "合併輸出不可與來源相同: {}",
                output.display()
            )));
        }
        Ok(output)
    }
}

/// 以毫秒時間戳避免與先前的輸出衝突
fn unique_suffix() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "stitched".to_string())
}
