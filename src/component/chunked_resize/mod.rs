//! 分塊縮放元件
//!
//! 四階段流程：
//! A. 取得影片資訊（ffprobe）
//! B. 切割為區塊並寫出清單（segment，失敗時改用逐段 seek）
//! C. 以固定數量的工作執行緒平行縮放每個區塊
//! D. 依清單順序無損合併並清除區塊

mod chunk_processor;
mod main;
mod manifest;
mod media_asset;
mod pipeline;
mod splitter;
mod stitcher;
mod worker_pool;

pub use chunk_processor::{ChunkProcessor, ResizeOutcome, ResizeRequest};
pub use main::{ChunkedResizer, Experiment};
pub use manifest::{
    CHUNK_FILENAME_BASE, ChunkDescriptor, ChunkManifest, ChunkNaming, MANIFEST_FILENAME,
};
pub use media_asset::MediaAsset;
pub use pipeline::{ChunkedPipeline, PipelineRun, StageTimings};
pub use splitter::{SplitAttempt, Splitter, chunk_time, planned_chunks};
pub use stitcher::Stitcher;
pub use worker_pool::{ChunkResult, PoolReport, WorkerPool, build_thread_pool};
