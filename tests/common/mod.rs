//! 測試用的假 ffmpeg
//!
//! 區塊檔案內容為文字：`seconds=<長度>`，縮放後追加 `scaled=<寬>x<高>`，
//! 合併時依清單順序串接內容，方便驗證長度總和與順序。

#![allow(dead_code)]

use chunked_transcoder::component::chunked_resize::MediaAsset;
use chunked_transcoder::tools::{EngineFailure, FfmpegCommand, MediaEngine, MediaInfo};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Default)]
pub struct FakeEngine {
    pub duration: f64,
    pub fail_segment: bool,
    pub fail_concat: bool,
    /// 縮放時會失敗的輸入檔名
    pub fail_scale: Mutex<HashSet<String>>,
    /// seek 切割在此起點（秒）失敗
    pub fail_seek_at: Option<u64>,
    pub scale_delay: Duration,
    pub invocations: Mutex<Vec<Vec<String>>>,
    pub concat_order: Mutex<Vec<String>>,
    pub running_scales: AtomicUsize,
    pub max_concurrent_scales: AtomicUsize,
}

impl FakeEngine {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn failing_scale_on(self, file_name: &str) -> Self {
        self.fail_scale
            .lock()
            .unwrap()
            .insert(file_name.to_string());
        self
    }

    pub fn count(&self, predicate: impl Fn(&[String]) -> bool) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|args| predicate(args))
            .count()
    }

    pub fn concat_calls(&self) -> usize {
        self.count(|args| args.iter().any(|a| a == "concat"))
    }

    pub fn scale_calls(&self) -> usize {
        self.count(|args| args.iter().any(|a| a == "-vf"))
    }

    fn segment(&self, command: &FfmpegCommand) -> Result<(), EngineFailure> {
        let segment_time: f64 = command
            .arg_value("-segment_time")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| EngineFailure::new(Some(1), "missing -segment_time"))?;
        let list = PathBuf::from(command.arg_value("-segment_list").unwrap_or_default());
        let pattern = command.output_path().to_string_lossy().to_string();

        let mut entries = vec!["ffconcat version 1.0".to_string()];
        let mut start = 0.0;
        let mut index = 0;
        while start < self.duration {
            let length = segment_time.min(self.duration - start);
            let path = PathBuf::from(pattern.replace("%04d", &format!("{index:04}")));
            fs::write(&path, format!("seconds={length}\n")).unwrap();
            entries.push(format!(
                "file {}",
                path.file_name().unwrap().to_string_lossy()
            ));
            start += segment_time;
            index += 1;

            if self.fail_segment {
                // 寫出部分清單後失敗
                fs::write(&list, entries.join("\n") + "\n").unwrap();
                return Err(EngineFailure::new(Some(1), "segment muxer failed"));
            }
        }

        fs::write(&list, entries.join("\n") + "\n").unwrap();
        Ok(())
    }

    fn seek_trim(&self, command: &FfmpegCommand) -> Result<(), EngineFailure> {
        let offset: f64 = command.arg_value("-ss").unwrap().parse().unwrap();
        if self.fail_seek_at.is_some_and(|at| at as f64 == offset) {
            return Err(EngineFailure::new(Some(1), "Invalid data found when processing input"));
        }
        let length: f64 = command.arg_value("-t").unwrap().parse().unwrap();
        let length = length.min(self.duration - offset).max(0.0);
        fs::write(command.output_path(), format!("seconds={length}\n")).unwrap();
        Ok(())
    }

    fn scale(&self, command: &FfmpegCommand) -> Result<(), EngineFailure> {
        let running = self.running_scales.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_scales.fetch_max(running, Ordering::SeqCst);
        thread::sleep(self.scale_delay);

        let input = PathBuf::from(command.arg_value("-i").unwrap());
        let file_name = input.file_name().unwrap().to_string_lossy().to_string();
        let filter = command.arg_value("-vf").unwrap().replace("scale=", "");

        let result = if self.fail_scale.lock().unwrap().contains(&file_name) {
            // 失敗時留下不完整的輸出
            fs::write(command.output_path(), "partial").unwrap();
            Err(EngineFailure::new(Some(234), "Error while filtering"))
        } else {
            let content = fs::read_to_string(&input).unwrap();
            fs::write(
                command.output_path(),
                format!("{content}scaled={}\n", filter.replace(':', "x")),
            )
            .unwrap();
            Ok(())
        };

        self.running_scales.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn concat(&self, command: &FfmpegCommand) -> Result<(), EngineFailure> {
        if self.fail_concat {
            return Err(EngineFailure::new(Some(1), "Impossible to open chunk"));
        }
        let list = PathBuf::from(command.arg_value("-i").unwrap());
        let directory = list.parent().unwrap().to_path_buf();
        let mut output = String::new();
        for line in fs::read_to_string(&list).unwrap().lines() {
            if let Some(name) = line.strip_prefix("file ") {
                self.concat_order.lock().unwrap().push(name.to_string());
                output.push_str(&fs::read_to_string(directory.join(name)).unwrap());
            }
        }
        fs::write(command.output_path(), output).unwrap();
        Ok(())
    }
}

impl MediaEngine for FakeEngine {
    fn run(&self, command: &FfmpegCommand) -> Result<(), EngineFailure> {
        self.invocations.lock().unwrap().push(command.args().to_vec());

        if command.arg_value("-f") == Some("segment") {
            self.segment(command)
        } else if command.arg_value("-f") == Some("concat") {
            self.concat(command)
        } else if command.arg_value("-vf").is_some() {
            self.scale(command)
        } else if command.arg_value("-ss").is_some() {
            self.seek_trim(command)
        } else {
            Err(EngineFailure::new(Some(1), "unknown command"))
        }
    }
}

/// 在暫存資料夾建立來源影片
pub fn create_source(dir: &Path, width: u32, height: u32, duration: f64) -> MediaAsset {
    create_named_source(dir, "movie.mp4", width, height, duration)
}

pub fn create_named_source(
    dir: &Path,
    file_name: &str,
    width: u32,
    height: u32,
    duration: f64,
) -> MediaAsset {
    let path = dir.join(file_name);
    fs::write(&path, format!("seconds={duration}\n")).unwrap();
    MediaAsset::from_info(
        &path,
        MediaInfo {
            width,
            height,
            duration_seconds: duration,
        },
    )
}

/// 加總檔案中所有 `seconds=` 行
pub fn total_seconds(path: &Path) -> f64 {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("seconds="))
        .map(|v| v.parse::<f64>().unwrap())
        .sum()
}
