use super::chunk_processor::{ResizeOutcome, ResizeRequest};
use super::media_asset::MediaAsset;
use super::pipeline::{ChunkedPipeline, PipelineRun};
use crate::config::Config;
use crate::error::PipelineError;
use crate::tools::{FfmpegEngine, validate_file_exists};
use anyhow::Result;
use console::style;
use dialoguer::Input;
use log::{error, info};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 可從選單執行的實驗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Experiment {
    /// 不切割，整檔縮放
    WholeFile,
    /// 切割後平行縮放再合併
    ParallelChunks,
    /// 切割後逐一縮放，估算分散式耗時
    SequentialEstimate,
    /// 沿用既有區塊繼續處理
    Resume,
    /// 只做 seek 切割
    SeekSplit,
    /// 平行 seek 切割
    ParallelSeekSplit,
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::WholeFile => "整檔縮放（不切割）",
            Self::ParallelChunks => "分塊平行縮放",
            Self::SequentialEstimate => "分塊逐一縮放（估算分散式耗時）",
            Self::Resume => "沿用既有區塊繼續縮放與合併",
            Self::SeekSplit => "僅切割（逐一 seek）",
            Self::ParallelSeekSplit => "僅切割（平行 seek）",
        };
        write!(f, "{label}")
    }
}

pub struct ChunkedResizer {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl ChunkedResizer {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    pub fn run(&self, experiment: Experiment) -> Result<()> {
        println!("{}", style(format!("=== {experiment} ===")).cyan().bold());

        let settings = &self.config.settings;
        settings.validate()?;

        let source = PathBuf::from(self.prompt_input_path()?);
        validate_file_exists(&source)?;

        println!("{}", style("讀取影片資訊中...").dim());
        let asset = MediaAsset::probe(&settings.ffprobe_path, &source)?;
        let (width, height) = asset.dimensions();
        println!(
            "  {}x{}, {:.2} 秒",
            width,
            height,
            asset.duration().unwrap_or_default()
        );

        let request = ResizeRequest::new(settings.target_height, settings.aspect_ratio)?;
        let engine = FfmpegEngine::new(settings.ffmpeg_path.clone());
        let pipeline = ChunkedPipeline::new(&asset, &engine, Arc::clone(&self.shutdown_signal));

        let result = match experiment {
            Experiment::WholeFile => pipeline.resize_whole(&request).map(|(outcome, elapsed)| {
                Self::print_outcome(&outcome);
                println!("整檔縮放耗時（不切割）: {:.2} 秒", elapsed.as_secs_f64());
            }),
            Experiment::ParallelChunks => pipeline
                .run_parallel(settings.num_chunks, &request, settings.concurrency)
                .map(|run| Self::print_run(&run, false)),
            Experiment::SequentialEstimate => pipeline
                .run_sequential_estimate(settings.num_chunks, &request)
                .map(|run| Self::print_run(&run, true)),
            Experiment::Resume => pipeline
                .resume(&request, settings.concurrency)
                .map(|run| Self::print_run(&run, false)),
            Experiment::SeekSplit | Experiment::ParallelSeekSplit => {
                let concurrency = if experiment == Experiment::ParallelSeekSplit {
                    settings.concurrency
                } else {
                    1
                };
                pipeline
                    .split_only(settings.num_chunks, concurrency)
                    .map(|(manifest, elapsed)| {
                        println!(
                            "已切出 {} 個區塊，清單: {}",
                            manifest.len(),
                            manifest.manifest_path().display()
                        );
                        println!("切割耗時: {:.2} 秒", elapsed.as_secs_f64());
                    })
            }
        };

        if let Err(e) = result {
            error!("{experiment} 失敗: {e}");
            Self::print_failure(&e);
            return Err(e.into());
        }

        info!("{experiment} 完成");
        Ok(())
    }

    fn prompt_input_path(&self) -> Result<String> {
        let path: String = Input::new()
            .with_prompt("請輸入影片檔案路徑")
            .interact_text()?;
        Ok(path.trim().to_string())
    }

    fn print_outcome(outcome: &ResizeOutcome) {
        match outcome {
            ResizeOutcome::Resized {
                output,
                width,
                height,
            } => println!(
                "{}",
                style(format!("輸出 {width}x{height}: {}", output.display())).green()
            ),
            ResizeOutcome::Skipped { .. } => {
                println!("{}", style("未進行縮放").yellow());
            }
        }
    }

    fn print_run(run: &PipelineRun, show_estimate: bool) {
        let skipped = run
            .report
            .results()
            .iter()
            .filter(|r| matches!(&r.result, Ok(outcome) if outcome.is_skipped()))
            .count();

        println!();
        println!("{}", style("=== 處理摘要 ===").cyan().bold());
        println!("  區塊: {} 個", run.report.results().len());
        if skipped > 0 {
            println!("  未縮放: {} 個", style(skipped).yellow());
        }
        println!("  輸出: {}", run.output.display());
        println!("  切割: {:.2} 秒", run.timings.split.as_secs_f64());
        println!("  縮放: {:.2} 秒", run.timings.resize.as_secs_f64());
        println!("  合併: {:.2} 秒", run.timings.stitch.as_secs_f64());
        if show_estimate {
            println!(
                "  分塊縮放估計耗時（切割 + 最慢區塊 + 合併）: {:.2} 秒",
                run.timings.estimated_distributed().as_secs_f64()
            );
        } else {
            println!(
                "  分塊縮放總耗時: {:.2} 秒",
                run.timings.total().as_secs_f64()
            );
        }
    }

    fn print_failure(e: &PipelineError) {
        if let PipelineError::ChunksFailed { report } = e {
            println!();
            println!("{}", style("=== 區塊處理失敗 ===").red().bold());
            for result in report.results() {
                if let Err(reason) = &result.result {
                    println!("  [{}] {}: {}", result.index, result.path.display(), reason);
                }
            }
            println!(
                "{}",
                style("區塊與清單已保留，修正後可選擇「沿用既有區塊」重新處理").yellow()
            );
        }
    }
}
