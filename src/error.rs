//! 分塊轉檔流程的錯誤類型

use crate::component::chunked_resize::PoolReport;
use crate::tools::EngineFailure;
use std::path::PathBuf;
use thiserror::Error;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// 輸入檔案不存在
    #[error("找不到檔案: {}", .path.display())]
    NotFound { path: PathBuf },

    /// ffprobe 失敗或輸出無法解析
    #[error("無法取得媒體資訊 {}: {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },

    /// 切割失敗（結構切割失敗時會改用手動切割）
    #[error("切割失敗: {reason}")]
    Split { reason: String },

    #[error("找不到區塊檔案: {}", .path.display())]
    MissingChunk { path: PathBuf },

    #[error("縮放失敗 {}: {failure}", .path.display())]
    Transform { path: PathBuf, failure: EngineFailure },

    #[error("合併失敗 {}: {failure}", .manifest.display())]
    Stitch {
        manifest: PathBuf,
        failure: EngineFailure,
    },

    /// 所有區塊都已處理完畢，但其中有失敗
    #[error("{} 個區塊處理失敗: {:?}", .report.failed_indices().len(), .report.failed_indices())]
    ChunksFailed { report: PoolReport },

    /// 同一資料夾已有未完成的切割清單
    #[error("已存在區塊清單，請先完成或清除: {}", .manifest.display())]
    SessionInProgress { manifest: PathBuf },

    #[error("清單不存在或已損毀: {reason}")]
    Manifest { reason: String },

    #[error("參數無效: {0}")]
    InvalidArgument(String),

    #[error("操作已取消")]
    Cancelled,

    #[error("檔案操作失敗 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
