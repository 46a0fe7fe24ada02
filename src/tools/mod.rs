mod ffmpeg_command;
mod ffprobe_info;
mod path_validator;

pub use ffmpeg_command::{EngineFailure, FfmpegCommand, FfmpegEngine, MediaEngine};
pub use ffprobe_info::{MediaInfo, parse_probe_output, probe_media};
pub use path_validator::{remove_file_if_exists, validate_file_exists};
