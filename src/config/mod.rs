pub mod load;
pub mod save;
pub mod types;

pub use load::SETTINGS_FILENAME;
pub use save::save_settings;
pub use types::{Config, PipelineSettings};
