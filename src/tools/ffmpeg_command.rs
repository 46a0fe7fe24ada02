use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// 所有 ffmpeg 呼叫共用的前置參數
const BASE_OPTIONS: [&str; 5] = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"];

/// ffmpeg 以非零狀態結束（或無法啟動）時的資訊
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    /// 結束代碼；被信號終止或無法啟動時為 `None`
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl EngineFailure {
    #[must_use]
    pub fn new(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
        }
    }
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "exit code {code}")?,
            None => write!(f, "terminated without exit code")?,
        }
        if !self.stderr.is_empty() {
            write!(f, ": {}", self.stderr)?;
        }
        Ok(())
    }
}

/// 一次 ffmpeg 呼叫的參數（不含執行檔名稱）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    args: Vec<String>,
    output_path: PathBuf,
}

impl FfmpegCommand {
    fn with_output(mut args: Vec<String>, output_path: &Path) -> Self {
        let mut full: Vec<String> = BASE_OPTIONS.iter().map(ToString::to_string).collect();
        full.append(&mut args);
        full.push(output_path.to_string_lossy().to_string());
        Self {
            args: full,
            output_path: output_path.to_path_buf(),
        }
    }

    /// 以 segment muxer 一次切出所有區塊並同時寫出 ffconcat 清單
    #[must_use]
    pub fn segment_split(
        source_path: &Path,
        chunk_seconds: u64,
        manifest_path: &Path,
        segment_pattern: &Path,
    ) -> Self {
        let args = vec![
            "-i".to_string(),
            source_path.to_string_lossy().to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-f".to_string(),
            "segment".to_string(),
            "-segment_time".to_string(),
            chunk_seconds.to_string(),
            "-segment_list".to_string(),
            manifest_path.to_string_lossy().to_string(),
            "-segment_list_type".to_string(),
            "ffconcat".to_string(),
            "-reset_timestamps".to_string(),
            "1".to_string(),
        ];
        Self::with_output(args, segment_pattern)
    }

    /// 從 `offset` 秒開始複製 `duration` 秒（-ss 在 -i 前，快速跳至關鍵幀）
    #[must_use]
    pub fn seek_trim(source_path: &Path, offset: u64, duration: u64, output_path: &Path) -> Self {
        let args = vec![
            "-ss".to_string(),
            offset.to_string(),
            "-t".to_string(),
            duration.to_string(),
            "-i".to_string(),
            source_path.to_string_lossy().to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
        ];
        Self::with_output(args, output_path)
    }

    #[must_use]
    pub fn scale(source_path: &Path, width: u32, height: u32, output_path: &Path) -> Self {
        let args = vec![
            "-i".to_string(),
            source_path.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!("scale={width}:{height}"),
        ];
        Self::with_output(args, output_path)
    }

    /// 依清單順序以串流複製合併區塊
    #[must_use]
    pub fn concat(manifest_path: &Path, output_path: &Path) -> Self {
        let args = vec![
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest_path.to_string_lossy().to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
        ];
        Self::with_output(args, output_path)
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// 取得緊接在 `flag` 之後的參數值
    #[must_use]
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    #[must_use]
    pub fn build_command(&self, binary: &Path) -> Command {
        let mut cmd = Command::new(binary);
        cmd.args(&self.args);
        cmd
    }
}

/// 外部媒體引擎：輸入參數，成功或回傳失敗資訊
///
/// 每次呼叫都會阻塞直到程序結束。
pub trait MediaEngine: Sync {
    fn run(&self, command: &FfmpegCommand) -> Result<(), EngineFailure>;
}

/// 以子程序執行 ffmpeg
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: PathBuf,
}

impl FfmpegEngine {
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl MediaEngine for FfmpegEngine {
    fn run(&self, command: &FfmpegCommand) -> Result<(), EngineFailure> {
        debug!("執行: {} {}", self.binary.display(), command.args().join(" "));

        let output = command
            .build_command(&self.binary)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| EngineFailure::new(None, format!("無法啟動 ffmpeg: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(EngineFailure::new(output.status.code(), stderr.trim()))
        }
    }
}
