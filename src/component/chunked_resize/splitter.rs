use super::manifest::{ChunkDescriptor, ChunkManifest, ChunkNaming};
use super::media_asset::MediaAsset;
use super::worker_pool::build_thread_pool;
use crate::error::{PipelineError, PipelineResult};
use crate::tools::{FfmpegCommand, MediaEngine, remove_file_if_exists};
use console::style;
use log::{error, info, warn};
use rayon::prelude::*;

/// 結構切割的結果，由呼叫端決定是否改用下一種策略
#[derive(Debug)]
pub enum SplitAttempt {
    Succeeded(ChunkManifest),
    Failed(PipelineError),
}

/// 每個區塊的名目長度（秒）：`ceil(duration / num_chunks)`，至少 1 秒
pub fn chunk_time(duration: f64, num_chunks: usize) -> PipelineResult<u64> {
    if num_chunks == 0 {
        return Err(PipelineError::InvalidArgument(
            "區塊數量必須至少為 1".to_string(),
        ));
    }
    if !duration.is_finite() || duration < 0.0 {
        return Err(PipelineError::InvalidArgument(format!(
            "影片長度無效: {duration}"
        )));
    }
    let seconds = (duration / num_chunks as f64).ceil() as u64;
    Ok(seconds.max(1))
}

/// 實際會產生的區塊數：起點已超過影片結尾的區塊不切
#[must_use]
pub fn planned_chunks(num_chunks: usize, chunk_time: u64, duration: f64) -> usize {
    (0..num_chunks)
        .filter(|&i| i == 0 || ((i as u64 * chunk_time) as f64) < duration)
        .count()
}

pub struct Splitter<'a, E: MediaEngine> {
    asset: &'a MediaAsset,
    engine: &'a E,
    naming: ChunkNaming,
}

impl<'a, E: MediaEngine> Splitter<'a, E> {
    #[must_use]
    pub fn new(asset: &'a MediaAsset, engine: &'a E) -> Self {
        Self {
            asset,
            engine,
            naming: ChunkNaming::for_asset(asset),
        }
    }

    #[must_use]
    pub const fn naming(&self) -> &ChunkNaming {
        &self.naming
    }

    /// 切割為 `num_chunks` 個區塊：先嘗試結構切割，失敗時改用手動切割
    pub fn split(&self, num_chunks: usize) -> PipelineResult<ChunkManifest> {
        let duration = self.asset.require_duration()?;
        let chunk_seconds = chunk_time(duration, num_chunks)?;
        self.ensure_no_session()?;

        println!(
            "{}",
            style(format!("切割為 {num_chunks} 個區塊（每段 {chunk_seconds} 秒）...")).cyan()
        );
        info!(
            "開始切割 {}: {} 個區塊, 每段 {} 秒",
            self.asset.path().display(),
            num_chunks,
            chunk_seconds
        );

        let manifest = match self.segment_split(chunk_seconds) {
            SplitAttempt::Succeeded(manifest) => manifest,
            SplitAttempt::Failed(reason) => {
                warn!("結構切割失敗，改用手動切割: {reason}");
                println!(
                    "{}",
                    style("無法使用 segment 切割，改用手動切割").yellow()
                );
                self.manual_split(num_chunks, chunk_seconds, duration)?
            }
        };

        if manifest.len() != num_chunks {
            info!(
                "實際切出 {} 個區塊（要求 {} 個）",
                manifest.len(),
                num_chunks
            );
        }
        println!(
            "{}",
            style(format!("切割完成，共 {} 個區塊", manifest.len())).green()
        );

        Ok(manifest)
    }

    /// 以單次 ffmpeg segment 呼叫切出全部區塊並產生清單
    ///
    /// 失敗時會刪除已寫出的清單與區塊，避免留下不完整的清單。
    pub fn segment_split(&self, chunk_seconds: u64) -> SplitAttempt {
        let command = FfmpegCommand::segment_split(
            self.asset.path(),
            chunk_seconds,
            &self.naming.manifest_path(),
            &self.naming.segment_pattern(),
        );

        let failure = match self.engine.run(&command) {
            Ok(()) => match ChunkManifest::load(&self.naming) {
                // ffmpeg 寫出的清單沒有區塊數，確認檔案後重寫並記錄
                Ok(Some(manifest)) if !manifest.is_empty() => match manifest
                    .verify_files()
                    .and_then(|()| ChunkManifest::write(&self.naming, manifest.descriptors().to_vec()))
                {
                    Ok(manifest) => return SplitAttempt::Succeeded(manifest),
                    Err(e) => e,
                },
                Ok(_) => PipelineError::Split {
                    reason: "segment 切割沒有產生清單".to_string(),
                },
                Err(e) => e,
            },
            Err(failure) => PipelineError::Split {
                reason: format!("segment 切割失敗: {failure}"),
            },
        };

        if let Err(e) = ChunkManifest::remove_session_files(&self.naming) {
            error!("無法清除不完整的切割結果: {e}");
        }
        SplitAttempt::Failed(failure)
    }

    /// 逐段 seek 切割，每成功一段就追加到清單
    pub fn manual_split(
        &self,
        num_chunks: usize,
        chunk_seconds: u64,
        duration: f64,
    ) -> PipelineResult<ChunkManifest> {
        let chunks = planned_chunks(num_chunks, chunk_seconds, duration);
        if chunks < num_chunks {
            warn!(
                "影片長度 {duration:.2} 秒只需 {chunks} 個區塊，略過其餘 {} 個",
                num_chunks - chunks
            );
        }

        ChunkManifest::begin(&self.naming, chunks)?;
        for index in 0..chunks {
            let descriptor = self.seek_split(index, chunk_seconds)?;
            ChunkManifest::append(&self.naming, &descriptor)?;
        }

        ChunkManifest::load(&self.naming)?.ok_or_else(|| PipelineError::Manifest {
            reason: format!("手動切割後找不到清單: {}", self.naming.manifest_path().display()),
        })
    }

    pub fn get_chunk_time(&self, num_workers: usize) -> PipelineResult<u64> {
        chunk_time(self.asset.require_duration()?, num_workers)
    }

    /// 只依序號與區塊長度切出單一區塊，不更動清單
    pub fn seek_split(&self, worker_index: usize, chunk_seconds: u64) -> PipelineResult<ChunkDescriptor> {
        let offset = worker_index as u64 * chunk_seconds;
        let output = self.naming.chunk_path(worker_index);
        let command = FfmpegCommand::seek_trim(self.asset.path(), offset, chunk_seconds, &output);

        if let Err(failure) = self.engine.run(&command) {
            if let Err(e) = remove_file_if_exists(&output) {
                warn!("無法刪除不完整的區塊 {}: {e}", output.display());
            }
            return Err(PipelineError::Split {
                reason: format!("區塊 {worker_index} (起點 {offset} 秒) 切割失敗: {failure}"),
            });
        }

        if !output.is_file() {
            return Err(PipelineError::Split {
                reason: format!("區塊 {worker_index} 未建立: {}", output.display()),
            });
        }

        info!("已切出區塊 {worker_index}: {}", output.display());
        Ok(ChunkDescriptor {
            index: worker_index,
            path: output,
        })
    }

    /// 每個區塊各自 seek 切割，`concurrency` 大於 1 時平行執行，全部完成後一次寫入清單
    pub fn seek_split_all(&self, num_workers: usize, concurrency: usize) -> PipelineResult<ChunkManifest> {
        let duration = self.asset.require_duration()?;
        let chunk_seconds = self.get_chunk_time(num_workers)?;
        self.ensure_no_session()?;

        let chunks = planned_chunks(num_workers, chunk_seconds, duration);
        println!(
            "{}",
            style(format!("以 seek 切割為 {chunks} 個區塊（每段 {chunk_seconds} 秒）...")).cyan()
        );

        let results: Vec<PipelineResult<ChunkDescriptor>> = if concurrency <= 1 {
            (0..chunks)
                .map(|index| self.seek_split(index, chunk_seconds))
                .collect()
        } else {
            build_thread_pool(concurrency)?.install(|| {
                (0..chunks)
                    .into_par_iter()
                    .map(|index| self.seek_split(index, chunk_seconds))
                    .collect()
            })
        };

        let descriptors = match results.into_iter().collect::<PipelineResult<Vec<_>>>() {
            Ok(descriptors) => descriptors,
            Err(e) => {
                if let Err(cleanup) = ChunkManifest::remove_session_files(&self.naming) {
                    error!("無法清除切割結果: {cleanup}");
                }
                return Err(e);
            }
        };

        ChunkManifest::write(&self.naming, descriptors)
    }

    fn ensure_no_session(&self) -> PipelineResult<()> {
        self.naming.ensure_source_outside_session()?;
        if ChunkManifest::exists(&self.naming) {
            return Err(PipelineError::SessionInProgress {
                manifest: self.naming.manifest_path(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_time_rounds_up() {
        assert_eq!(chunk_time(100.0, 5).unwrap(), 20);
        assert_eq!(chunk_time(100.04, 5).unwrap(), 21);
        assert_eq!(chunk_time(10.0, 3).unwrap(), 4);
        assert_eq!(chunk_time(7.5, 1).unwrap(), 8);
    }

    #[test]
    fn test_chunk_time_minimum_one_second() {
        assert_eq!(chunk_time(0.0, 4).unwrap(), 1);
        assert_eq!(chunk_time(2.0, 10).unwrap(), 1);
    }

    #[test]
    fn test_chunk_time_rejects_zero_chunks() {
        assert!(matches!(
            chunk_time(100.0, 0),
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(chunk_time(f64::NAN, 2).is_err());
    }

    #[test]
    fn test_planned_chunks_drops_chunks_past_end() {
        assert_eq!(planned_chunks(5, 20, 100.0), 5);
        // 10 秒切 6 段：每段 2 秒，第 6 段起點 10 秒已到結尾
        assert_eq!(planned_chunks(6, 2, 10.0), 5);
        assert_eq!(planned_chunks(3, 1, 0.0), 1);
    }
}
