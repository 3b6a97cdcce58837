//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings + rubric override):
//!   Windows: %APPDATA%\ielts-speaking-eval\
//!   macOS:   ~/Library/Application Support/ielts-speaking-eval/
//!   Linux:   ~/.config/ielts-speaking-eval/
//!
//! Data dir (evaluation output):
//!   Windows: %LOCALAPPDATA%\ielts-speaking-eval\results\
//!   macOS:   ~/Library/Application Support/ielts-speaking-eval/results/
//!   Linux:   ~/.local/share/ielts-speaking-eval/results/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml` and `rubric.txt`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Conventional location of a user-supplied rubric that replaces the
    /// built-in one.
    pub rubric_file: PathBuf,
    /// Default directory for feedback files and score reports.
    pub results_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "ielts-speaking-eval";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let rubric_file = config_dir.join("rubric.txt");
        let results_dir = data_dir.join("results");

        Self {
            config_dir,
            settings_file,
            rubric_file,
            results_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
