use super::chunk_processor::{ChunkProcessor, ResizeOutcome, ResizeRequest};
use super::manifest::{ChunkDescriptor, ChunkManifest};
use crate::error::{PipelineError, PipelineResult};
use crate::tools::MediaEngine;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 建立固定執行緒數的 rayon 執行緒池
pub fn build_thread_pool(concurrency: usize) -> PipelineResult<ThreadPool> {
    if concurrency == 0 {
        return Err(PipelineError::InvalidArgument(
            "平行數量必須至少為 1".to_string(),
        ));
    }
    ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .thread_name(|i| format!("chunk-worker-{i}"))
        .build()
        .map_err(|e| PipelineError::InvalidArgument(format!("無法建立執行緒池: {e}")))
}

/// 單一區塊的處理結果
#[derive(Debug)]
pub struct ChunkResult {
    pub index: usize,
    pub path: PathBuf,
    pub elapsed: Duration,
    pub result: PipelineResult<ResizeOutcome>,
}

impl ChunkResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// 所有區塊的結果，依清單序號排列
#[derive(Debug, Default)]
pub struct PoolReport {
    results: Vec<ChunkResult>,
}

impl PoolReport {
    #[must_use]
    pub fn results(&self) -> &[ChunkResult] {
        &self.results
    }

    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.index)
            .collect()
    }

    #[must_use]
    pub fn succeeded_indices(&self) -> Vec<usize> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.index)
            .collect()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.results.iter().all(ChunkResult::is_success)
    }

    /// 最慢區塊的耗時，用於估算分散式處理時間
    #[must_use]
    pub fn worst_elapsed(&self) -> Duration {
        self.results
            .iter()
            .map(|r| r.elapsed)
            .max()
            .unwrap_or_default()
    }
}

/// 以固定數量的工作執行緒處理清單中的所有區塊
pub struct WorkerPool {
    concurrency: usize,
    shutdown_signal: Arc<AtomicBool>,
    show_progress: bool,
}

impl WorkerPool {
    pub fn new(concurrency: usize, shutdown_signal: Arc<AtomicBool>) -> PipelineResult<Self> {
        if concurrency == 0 {
            return Err(PipelineError::InvalidArgument(
                "平行數量必須至少為 1".to_string(),
            ));
        }
        Ok(Self {
            concurrency,
            shutdown_signal,
            show_progress: true,
        })
    }

    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 每個區塊縮放一次；單一區塊失敗不會中止其他區塊，
    /// 全部結束後若有失敗則回傳 `ChunksFailed`（內含每個區塊的結果）
    pub fn process_all<E: MediaEngine>(
        &self,
        processor: &ChunkProcessor<'_, E>,
        manifest: &ChunkManifest,
        request: &ResizeRequest,
    ) -> PipelineResult<PoolReport> {
        let descriptors: Vec<&ChunkDescriptor> = manifest.descriptors().iter().collect();
        self.process(processor, &descriptors, request)
    }

    /// 只重新處理指定序號的區塊（例如上一次回報失敗的區塊）
    pub fn process_selected<E: MediaEngine>(
        &self,
        processor: &ChunkProcessor<'_, E>,
        manifest: &ChunkManifest,
        request: &ResizeRequest,
        indices: &[usize],
    ) -> PipelineResult<PoolReport> {
        let descriptors: Vec<&ChunkDescriptor> = manifest
            .descriptors()
            .iter()
            .filter(|d| indices.contains(&d.index))
            .collect();
        if descriptors.len() != indices.len() {
            return Err(PipelineError::InvalidArgument(format!(
                "清單中找不到部分區塊序號: {indices:?}"
            )));
        }
        self.process(processor, &descriptors, request)
    }

    fn process<E: MediaEngine>(
        &self,
        processor: &ChunkProcessor<'_, E>,
        descriptors: &[&ChunkDescriptor],
        request: &ResizeRequest,
    ) -> PipelineResult<PoolReport> {
        info!(
            "開始處理 {} 個區塊，平行數量 {}",
            descriptors.len(),
            self.concurrency
        );

        let progress_bar = if self.show_progress {
            ProgressBar::new(descriptors.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar.set_message("縮放區塊中...");

        let pool = build_thread_pool(self.concurrency)?;
        let results: Vec<ChunkResult> = pool.install(|| {
            descriptors
                .par_iter()
                .map(|descriptor| {
                    // 已開始的區塊會跑完，尚未開始的直接標記為取消
                    if self.shutdown_signal.load(Ordering::SeqCst) {
                        return ChunkResult {
                            index: descriptor.index,
                            path: descriptor.path.clone(),
                            elapsed: Duration::ZERO,
                            result: Err(PipelineError::Cancelled),
                        };
                    }

                    let start = Instant::now();
                    let result = processor.resize(request, Some(descriptor.path.as_path()));
                    let elapsed = start.elapsed();

                    if let Err(e) = &result {
                        error!("區塊 {} 處理失敗: {e}", descriptor.index);
                    }
                    progress_bar.inc(1);

                    ChunkResult {
                        index: descriptor.index,
                        path: descriptor.path.clone(),
                        elapsed,
                        result,
                    }
                })
                .collect()
        });

        let report = PoolReport { results };
        if report.is_success() {
            progress_bar.finish_with_message("完成");
            info!("所有區塊處理完成");
            Ok(report)
        } else {
            progress_bar.abandon_with_message("部分區塊失敗");
            warn!("失敗的區塊: {:?}", report.failed_indices());
            Err(PipelineError::ChunksFailed { report })
        }
    }
}
