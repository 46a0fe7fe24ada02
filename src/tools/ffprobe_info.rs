use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// 使用 ffprobe 取得影片的寬、高與長度
pub fn probe_media(ffprobe: &Path, path: &Path) -> PipelineResult<MediaInfo> {
    if !path.is_file() {
        return Err(PipelineError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| PipelineError::Probe {
            path: path.to_path_buf(),
            reason: format!("無法執行 ffprobe: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::Probe {
            path: path.to_path_buf(),
            reason: format!(
                "ffprobe 執行失敗 (exit code {:?}): {}",
                output.status.code(),
                stderr.trim()
            ),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&stdout).map_err(|reason| PipelineError::Probe {
        path: path.to_path_buf(),
        reason,
    })
}

/// 解析 ffprobe 的 JSON 輸出
pub fn parse_probe_output(json: &str) -> Result<MediaInfo, String> {
    let probe: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| format!("無法解析 ffprobe 輸出: {e}"))?;

    let streams = probe.streams.unwrap_or_default();

    // 優先使用標記為 video 的串流，其次為任何帶有寬高的串流
    let video_stream = streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .or_else(|| streams.iter().find(|s| s.width.is_some() && s.height.is_some()))
        .ok_or_else(|| "找不到視訊串流".to_string())?;

    let width = video_stream
        .width
        .ok_or_else(|| "無法取得影片寬度".to_string())?;
    let height = video_stream
        .height
        .ok_or_else(|| "無法取得影片高度".to_string())?;

    // 影片長度優先從 format 取得，其次從 stream
    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| "無法取得影片長度".to_string())?;

    Ok(MediaInfo {
        width,
        height,
        duration_seconds,
    })
}
