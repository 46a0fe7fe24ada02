use crate::error::{PipelineError, PipelineResult};
use std::fs;
use std::path::Path;

pub fn validate_file_exists(path: &Path) -> PipelineResult<()> {
    if !path.is_file() {
        return Err(PipelineError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// 刪除檔案；檔案不存在時視為成功
pub fn remove_file_if_exists(path: &Path) -> PipelineResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PipelineError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_file_exists() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.mp4");
        assert!(validate_file_exists(&file).is_err());
        fs::write(&file, "x").unwrap();
        assert!(validate_file_exists(&file).is_ok());
        assert!(validate_file_exists(temp_dir.path()).is_err());
    }

    #[test]
    fn test_remove_file_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();
        assert!(remove_file_if_exists(&file).unwrap());
        assert!(!remove_file_if_exists(&file).unwrap());
    }
}
