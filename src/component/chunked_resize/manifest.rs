//! 區塊清單
//!
//! 清單是 ffconcat 格式的文字檔，同時是合併時 ffmpeg concat demuxer 的輸入：
//!
//! ```text
//! ffconcat version 1.0
//! file chunk0000.mp4
//! file chunk0001.mp4
//! # chunks 2
//! ```
//!
//! `# chunks N` 記錄切割完成時的區塊數；手動切割會先寫入此行，
//! 中途失敗時清單項目少於記錄數，`verify` 會拒絕這種清單。

use super::media_asset::MediaAsset;
use crate::error::{PipelineError, PipelineResult};
use crate::tools::remove_file_if_exists;
use log::{debug, info, warn};
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

pub const MANIFEST_FILENAME: &str = "chunks.txt";
pub const CHUNK_FILENAME_BASE: &str = "chunk";
const MANIFEST_HEADER: &str = "ffconcat version 1.0";

/// 固定寬度序號，確保字典序與數字序一致（chunk0009 < chunk0010）
const ORDINAL_WIDTH: usize = 4;

static REGEX_MANIFEST_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^file\s+'?([^']+?)'?\s*$").expect("Invalid regex"));

static REGEX_CHUNK_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s*chunks\s+(\d+)\s*$").expect("Invalid regex"));

static REGEX_CHUNK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^chunk(\d+)(\.[^.]+)?$").expect("Invalid regex"));

/// 縮放區塊時的暫存輸出，例如 `chunk0002_1280_720.mp4`
static REGEX_CHUNK_TEMPORARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^chunk\d+_\d+_\d+(\.[^.]+)?$").expect("Invalid regex"));

/// 區塊檔名規則：固定前綴 + 補零序號 + 來源副檔名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkNaming {
    directory: PathBuf,
    extension: String,
    /// 來源影片；清除工作階段時永遠略過
    source: Option<PathBuf>,
}

impl ChunkNaming {
    #[must_use]
    pub fn new(directory: &Path, extension: &str) -> Self {
        Self {
            directory: directory.to_path_buf(),
            extension: extension.to_string(),
            source: None,
        }
    }

    #[must_use]
    pub fn for_asset(asset: &MediaAsset) -> Self {
        Self {
            source: Some(asset.path().to_path_buf()),
            ..Self::new(asset.directory(), &asset.extension())
        }
    }

    /// 來源檔名若符合區塊命名規則，會與區塊檔案混淆而被清除
    pub fn ensure_source_outside_session(&self) -> PipelineResult<()> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if self.parse_ordinal(name).is_some() || self.is_temporary(name) {
            return Err(PipelineError::InvalidArgument(format!(
                "來源檔名與區塊命名規則衝突，請先更名: {}",
                source.display()
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(MANIFEST_FILENAME)
    }

    #[must_use]
    pub fn file_name(&self, index: usize) -> String {
        format!(
            "{CHUNK_FILENAME_BASE}{index:0width$}{}",
            self.extension,
            width = ORDINAL_WIDTH
        )
    }

    #[must_use]
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.directory.join(self.file_name(index))
    }

    /// ffmpeg segment muxer 的輸出樣板，例如 `chunk%04d.mp4`
    #[must_use]
    pub fn segment_pattern(&self) -> PathBuf {
        self.directory.join(format!(
            "{CHUNK_FILENAME_BASE}%0{ORDINAL_WIDTH}d{}",
            self.extension
        ))
    }

    /// 從檔名解析序號；不符合命名規則時回傳 `None`
    #[must_use]
    pub fn parse_ordinal(&self, file_name: &str) -> Option<usize> {
        let captures = REGEX_CHUNK_NAME.captures(file_name)?;
        let extension = captures.get(2).map_or("", |m| m.as_str());
        if extension != self.extension {
            return None;
        }
        captures.get(1)?.as_str().parse().ok()
    }

    fn is_temporary(&self, file_name: &str) -> bool {
        REGEX_CHUNK_TEMPORARY
            .captures(file_name)
            .is_some_and(|c| c.get(1).map_or("", |m| m.as_str()) == self.extension)
    }

    /// 候選檔案都在來源所在的資料夾，比較檔名即可
    fn is_source(&self, path: &Path) -> bool {
        self.source
            .as_deref()
            .and_then(Path::file_name)
            .is_some_and(|name| Some(name) == path.file_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// 從 0 開始的連續序號，決定合併順序
    pub index: usize,
    pub path: PathBuf,
}

/// 已寫入磁碟的區塊清單
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkManifest {
    manifest_path: PathBuf,
    descriptors: Vec<ChunkDescriptor>,
    /// `# chunks N` 記錄的區塊數；沒有此行時為 `None`
    expected_chunks: Option<usize>,
}

impl ChunkManifest {
    #[must_use]
    pub fn exists(naming: &ChunkNaming) -> bool {
        naming.manifest_path().is_file()
    }

    /// 讀取清單；清單不存在時回傳 `None`
    pub fn load(naming: &ChunkNaming) -> PipelineResult<Option<Self>> {
        let manifest_path = naming.manifest_path();
        if !manifest_path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&manifest_path)
            .map_err(|e| PipelineError::io(&manifest_path, e))?;

        Ok(Some(Self {
            descriptors: parse_entries(naming.directory(), &content),
            expected_chunks: parse_chunk_count(&content),
            manifest_path,
        }))
    }

    /// 一次寫入完整清單（覆寫既有內容），並記錄區塊數
    pub fn write(naming: &ChunkNaming, descriptors: Vec<ChunkDescriptor>) -> PipelineResult<Self> {
        let manifest_path = naming.manifest_path();
        let mut content = format!("{MANIFEST_HEADER}\n");
        for descriptor in &descriptors {
            content.push_str(&render_entry(&descriptor.path));
        }
        content.push_str(&render_chunk_count(descriptors.len()));

        fs::write(&manifest_path, content).map_err(|e| PipelineError::io(&manifest_path, e))?;
        debug!(
            "已寫入區塊清單 {} ({} 個區塊)",
            manifest_path.display(),
            descriptors.len()
        );

        Ok(Self {
            manifest_path,
            expected_chunks: Some(descriptors.len()),
            descriptors,
        })
    }

    /// 開始逐筆追加的清單：寫入標頭與預計的區塊數
    pub fn begin(naming: &ChunkNaming, planned_chunks: usize) -> PipelineResult<()> {
        let manifest_path = naming.manifest_path();
        let content = format!("{MANIFEST_HEADER}\n{}", render_chunk_count(planned_chunks));
        fs::write(&manifest_path, content).map_err(|e| PipelineError::io(&manifest_path, e))
    }

    /// 追加一筆區塊；清單不存在時先寫入標頭
    pub fn append(naming: &ChunkNaming, descriptor: &ChunkDescriptor) -> PipelineResult<()> {
        let manifest_path = naming.manifest_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&manifest_path)
            .map_err(|e| PipelineError::io(&manifest_path, e))?;

        let is_new = file
            .metadata()
            .map(|m| m.len() == 0)
            .map_err(|e| PipelineError::io(&manifest_path, e))?;

        let mut content = String::new();
        if is_new {
            content.push_str(MANIFEST_HEADER);
            content.push('\n');
        }
        content.push_str(&render_entry(&descriptor.path));

        file.write_all(content.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| PipelineError::io(&manifest_path, e))
    }

    /// 降級復原：沒有清單時依命名規則找出區塊檔案並依序號排序
    ///
    /// 只回傳記憶體中的清單，不寫入磁碟。
    pub fn discover(naming: &ChunkNaming) -> PipelineResult<Option<Self>> {
        let mut found: Vec<(usize, PathBuf)> = chunk_files_in(naming)?;
        if found.is_empty() {
            return Ok(None);
        }

        found.sort_by_key(|(ordinal, _)| *ordinal);

        let is_dense = found
            .iter()
            .enumerate()
            .all(|(position, (ordinal, _))| position == *ordinal);
        if !is_dense {
            warn!("區塊序號不連續，合併結果可能缺少片段: {}", naming.directory().display());
        }

        let descriptors = found
            .into_iter()
            .enumerate()
            .map(|(index, (_, path))| ChunkDescriptor { index, path })
            .collect();

        Ok(Some(Self {
            manifest_path: naming.manifest_path(),
            descriptors,
            expected_chunks: None,
        }))
    }

    /// 優先讀取清單；沒有清單時以命名規則找回區塊並補寫清單
    pub fn load_or_discover(naming: &ChunkNaming) -> PipelineResult<Self> {
        if let Some(manifest) = Self::load(naming)? {
            return Ok(manifest);
        }

        warn!(
            "找不到區塊清單，改以檔名尋找區塊: {}",
            naming.directory().display()
        );
        let discovered = Self::discover(naming)?.ok_or_else(|| PipelineError::Manifest {
            reason: format!("{} 中沒有清單也沒有區塊檔案", naming.directory().display()),
        })?;

        Self::write(naming, discovered.descriptors)
    }

    /// 確認切割已完成（項目數等於記錄的區塊數），且引用的每個區塊檔案都存在
    pub fn verify(&self) -> PipelineResult<()> {
        if self.descriptors.is_empty() {
            return Err(PipelineError::Manifest {
                reason: format!("清單沒有任何區塊: {}", self.manifest_path.display()),
            });
        }
        match self.expected_chunks {
            Some(expected) if expected == self.descriptors.len() => {}
            Some(expected) => {
                return Err(PipelineError::Manifest {
                    reason: format!(
                        "切割未完成，清單只有 {} / {expected} 個區塊: {}",
                        self.descriptors.len(),
                        self.manifest_path.display()
                    ),
                });
            }
            None => {
                return Err(PipelineError::Manifest {
                    reason: format!("清單缺少區塊數記錄: {}", self.manifest_path.display()),
                });
            }
        }
        self.verify_files()
    }

    /// 只確認引用的區塊檔案存在
    pub fn verify_files(&self) -> PipelineResult<()> {
        match self.descriptors.iter().find(|d| !d.path.is_file()) {
            Some(missing) => Err(PipelineError::MissingChunk {
                path: missing.path.clone(),
            }),
            None => Ok(()),
        }
    }

    /// 刪除清單、所有符合命名規則的區塊檔案與縮放暫存檔，回傳刪除的區塊數
    ///
    /// 來源影片永遠不會被刪除。
    pub fn remove_session_files(naming: &ChunkNaming) -> PipelineResult<usize> {
        remove_file_if_exists(&naming.manifest_path())?;

        let mut removed = 0;
        for (_, path) in chunk_files_in(naming)? {
            if remove_file_if_exists(&path)? {
                removed += 1;
            }
        }
        for path in temporary_files_in(naming)? {
            if remove_file_if_exists(&path)? {
                debug!("已刪除殘留的暫存檔: {}", path.display());
            }
        }

        info!(
            "已清除區塊清單與 {} 個區塊檔案: {}",
            removed,
            naming.directory().display()
        );
        Ok(removed)
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    #[must_use]
    pub const fn expected_chunks(&self) -> Option<usize> {
        self.expected_chunks
    }

    #[must_use]
    pub fn descriptors(&self) -> &[ChunkDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn render_entry(path: &Path) -> String {
    let name = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy());
    format!("file {name}\n")
}

fn render_chunk_count(chunks: usize) -> String {
    format!("# chunks {chunks}\n")
}

fn parse_chunk_count(content: &str) -> Option<usize> {
    content
        .lines()
        .filter_map(|line| REGEX_CHUNK_COUNT.captures(line.trim()))
        .filter_map(|captures| captures.get(1)?.as_str().parse().ok())
        .last()
}

fn parse_entries(directory: &Path, content: &str) -> Vec<ChunkDescriptor> {
    content
        .lines()
        .filter_map(|line| REGEX_MANIFEST_ENTRY.captures(line.trim()))
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
        .enumerate()
        .map(|(index, name)| ChunkDescriptor {
            index,
            path: directory.join(name),
        })
        .collect()
}

/// 資料夾中的一般檔案（不含來源影片）
fn session_candidates(naming: &ChunkNaming) -> PipelineResult<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(naming.directory())
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(naming.directory()).to_path_buf();
            PipelineError::io(path, std::io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() || naming.is_source(entry.path()) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.push((name.to_string(), entry.into_path()));
        }
    }
    Ok(files)
}

fn chunk_files_in(naming: &ChunkNaming) -> PipelineResult<Vec<(usize, PathBuf)>> {
    Ok(session_candidates(naming)?
        .into_iter()
        .filter_map(|(name, path)| naming.parse_ordinal(&name).map(|ordinal| (ordinal, path)))
        .collect())
}

fn temporary_files_in(naming: &ChunkNaming) -> PipelineResult<Vec<PathBuf>> {
    Ok(session_candidates(naming)?
        .into_iter()
        .filter(|(name, _)| naming.is_temporary(name))
        .map(|(_, path)| path)
        .collect())
}
