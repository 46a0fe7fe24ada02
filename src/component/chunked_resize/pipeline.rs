//! 切割 → 平行縮放 → 合併 的完整流程與各階段計時

use super::chunk_processor::{ChunkProcessor, ResizeOutcome, ResizeRequest};
use super::manifest::{ChunkManifest, ChunkNaming};
use super::media_asset::MediaAsset;
use super::splitter::Splitter;
use super::stitcher::Stitcher;
use super::worker_pool::{PoolReport, WorkerPool};
use crate::error::PipelineResult;
use crate::tools::MediaEngine;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub split: Duration,
    pub resize: Duration,
    pub stitch: Duration,
    /// 最慢的單一區塊
    pub worst_chunk: Duration,
}

impl StageTimings {
    #[must_use]
    pub fn total(&self) -> Duration {
        self.split + self.resize + self.stitch
    }

    /// 每個區塊各由一台機器處理時的估計耗時：切割 + 最慢區塊 + 合併
    #[must_use]
    pub fn estimated_distributed(&self) -> Duration {
        self.split + self.worst_chunk + self.stitch
    }
}

#[derive(Debug)]
pub struct PipelineRun {
    pub output: PathBuf,
    pub report: PoolReport,
    pub timings: StageTimings,
}

pub struct ChunkedPipeline<'a, E: MediaEngine> {
    asset: &'a MediaAsset,
    engine: &'a E,
    shutdown_signal: Arc<AtomicBool>,
    show_progress: bool,
}

impl<'a, E: MediaEngine> ChunkedPipeline<'a, E> {
    #[must_use]
    pub const fn new(asset: &'a MediaAsset, engine: &'a E, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            asset,
            engine,
            shutdown_signal,
            show_progress: true,
        }
    }

    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// 不切割，直接縮放整個來源影片
    pub fn resize_whole(&self, request: &ResizeRequest) -> PipelineResult<(ResizeOutcome, Duration)> {
        let start = Instant::now();
        let outcome = ChunkProcessor::new(self.asset, self.engine).resize(request, None)?;
        let elapsed = start.elapsed();
        info!("整檔縮放耗時 {:.2} 秒", elapsed.as_secs_f64());
        Ok((outcome, elapsed))
    }

    /// 切割後以 `concurrency` 個工作執行緒縮放，最後合併
    pub fn run_parallel(
        &self,
        num_chunks: usize,
        request: &ResizeRequest,
        concurrency: usize,
    ) -> PipelineResult<PipelineRun> {
        let start = Instant::now();
        let manifest = Splitter::new(self.asset, self.engine).split(num_chunks)?;
        let split = start.elapsed();

        self.process_and_stitch(&manifest, request, concurrency, split)
    }

    /// 一次只處理一個區塊，用來估計分散式處理的耗時
    pub fn run_sequential_estimate(
        &self,
        num_chunks: usize,
        request: &ResizeRequest,
    ) -> PipelineResult<PipelineRun> {
        self.run_parallel(num_chunks, request, 1)
    }

    /// 從既有的清單（或依檔名找回的區塊）繼續縮放與合併
    ///
    /// 手動切割中途失敗留下的清單項目不足，`verify` 會拒絕，不會合併出殘缺的影片。
    pub fn resume(&self, request: &ResizeRequest, concurrency: usize) -> PipelineResult<PipelineRun> {
        let naming = ChunkNaming::for_asset(self.asset);
        naming.ensure_source_outside_session()?;
        let manifest = ChunkManifest::load_or_discover(&naming)?;
        manifest.verify()?;
        info!("沿用既有清單，共 {} 個區塊", manifest.len());

        self.process_and_stitch(&manifest, request, concurrency, Duration::ZERO)
    }

    /// 只做 seek 切割，`concurrency` 大於 1 時平行執行
    pub fn split_only(
        &self,
        num_workers: usize,
        concurrency: usize,
    ) -> PipelineResult<(ChunkManifest, Duration)> {
        let start = Instant::now();
        let manifest =
            Splitter::new(self.asset, self.engine).seek_split_all(num_workers, concurrency)?;
        Ok((manifest, start.elapsed()))
    }

    fn process_and_stitch(
        &self,
        manifest: &ChunkManifest,
        request: &ResizeRequest,
        concurrency: usize,
        split: Duration,
    ) -> PipelineResult<PipelineRun> {
        let processor = ChunkProcessor::new(self.asset, self.engine);
        let pool = WorkerPool::new(concurrency, Arc::clone(&self.shutdown_signal))?
            .with_progress(self.show_progress);

        let start = Instant::now();
        // 有任何區塊失敗就在這裡返回，不進行合併
        let report = pool.process_all(&processor, manifest, request)?;
        let resize = start.elapsed();

        let start = Instant::now();
        let output = Stitcher::new(self.asset, self.engine).stitch(manifest, None)?;
        let stitch = start.elapsed();

        let timings = StageTimings {
            split,
            resize,
            stitch,
            worst_chunk: report.worst_elapsed(),
        };
        info!(
            "流程完成: 切割 {:.2}s, 縮放 {:.2}s, 合併 {:.2}s",
            split.as_secs_f64(),
            resize.as_secs_f64(),
            stitch.as_secs_f64()
        );

        Ok(PipelineRun {
            output,
            report,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_timings() {
        let timings = StageTimings {
            split: Duration::from_secs(2),
            resize: Duration::from_secs(30),
            stitch: Duration::from_secs(1),
            worst_chunk: Duration::from_secs(7),
        };
        assert_eq!(timings.total(), Duration::from_secs(33));
        assert_eq!(timings.estimated_distributed(), Duration::from_secs(10));
    }
}
