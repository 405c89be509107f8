//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Filesystem layout and request parameters for one host application.
///
/// Staged files live in `cache_dir/scratch_dir_name/`, the avatar in
/// `files_dir/avatar_file_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Host cache directory (may be cleared by the platform).
    pub cache_dir: PathBuf,
    /// Host private files directory.
    pub files_dir: PathBuf,
    /// Authority the share provider issues staged-file handles under.
    pub authority: String,
    pub scratch_dir_name: String,
    pub picked_file_name: String,
    pub cropped_file_name: String,
    pub avatar_file_name: String,
    /// MIME filter handed to the picker.
    pub mime_filter: String,
    /// Buffer size for streaming picked content into staging (bytes).
    pub copy_buffer_size: usize,
    /// Crop output size used until the host reports the display size.
    pub default_output_size: (u32, u32),
}

impl PipelineConfig {
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        files_dir: impl Into<PathBuf>,
        authority: impl Into<String>,
    ) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            files_dir: files_dir.into(),
            authority: authority.into(),
            scratch_dir_name: "temporary_images".to_string(),
            picked_file_name: "temporary_picked_holder.jpg".to_string(),
            cropped_file_name: "temporary_cropped_holder.jpg".to_string(),
            avatar_file_name: "user_image".to_string(),
            mime_filter: "image/*".to_string(),
            copy_buffer_size: 64 * 1024,
            default_output_size: (512, 512),
        }
    }

    pub fn with_avatar_file_name(mut self, name: impl Into<String>) -> Self {
        self.avatar_file_name = name.into();
        self
    }

    pub fn with_scratch_dir_name(mut self, name: impl Into<String>) -> Self {
        self.scratch_dir_name = name.into();
        self
    }

    pub fn with_copy_buffer_size(mut self, bytes: usize) -> Self {
        self.copy_buffer_size = bytes.max(1);
        self
    }

    pub fn with_default_output_size(mut self, width: u32, height: u32) -> Self {
        self.default_output_size = (width, height);
        self
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.scratch_dir_name)
    }

    pub fn avatar_path(&self) -> PathBuf {
        self.files_dir.join(&self.avatar_file_name)
    }
}
