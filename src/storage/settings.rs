//! Chat settings and configuration

use crate::{storage::message::TOMBSTONE_TEXT, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat settings
///
/// Stored as JSON; missing fields take their defaults.
///
/// # Example
/// ```rust,no_run
/// use campuschat::storage::ChatSettings;
///
/// // Load settings (returns default if file doesn't exist)
/// let mut settings = ChatSettings::load("chat_settings.json").expect("Failed to load");
///
/// // Shorten the typing window and auto-save
/// settings.update_typing_idle(1500, "chat_settings.json").expect("Failed to update");
///
/// println!("Typing idle window: {:?}", settings.typing_idle());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Idle time after the last keystroke before "typing" is withdrawn (milliseconds)
    pub typing_idle_ms: u64,
    /// How long a jumped-to message stays highlighted (milliseconds)
    pub jump_highlight_ms: u64,
    /// SQLite database file
    pub database_path: String,
    /// Capacity of the realtime event channel
    pub event_buffer: usize,
    /// Text substituted for messages deleted for everyone
    pub tombstone_text: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl ChatSettings {
    /// Load settings from a JSON file
    ///
    /// # Returns
    /// The loaded settings, or default settings if the file doesn't exist or is empty
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Storage(format!("Failed to read settings: {}", e)))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut settings: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Storage(format!("Failed to parse settings: {}", e)))?;
        settings.sanitize();

        Ok(settings)
    }

    /// Save settings to a JSON file, creating the parent directory if needed
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| Error::Storage(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Update the typing idle window and auto-save
    pub fn update_typing_idle<P: AsRef<std::path::Path>>(
        &mut self,
        idle_ms: u64,
        save_path: P,
    ) -> Result<()> {
        self.typing_idle_ms = idle_ms;
        self.sanitize();
        self.save(save_path)
    }

    /// Typing idle window as a `Duration`
    pub fn typing_idle(&self) -> Duration {
        Duration::from_millis(self.typing_idle_ms)
    }

    /// Jump highlight duration as a `Duration`
    pub fn jump_highlight(&self) -> Duration {
        Duration::from_millis(self.jump_highlight_ms)
    }

    /// Replace values that would break the runtime with defaults
    fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.typing_idle_ms == 0 {
            self.typing_idle_ms = defaults.typing_idle_ms;
        }
        if self.event_buffer == 0 {
            self.event_buffer = defaults.event_buffer;
        }
        if self.tombstone_text.trim().is_empty() {
            self.tombstone_text = defaults.tombstone_text;
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            typing_idle_ms: 2_000,
            jump_highlight_ms: 1_000,
            database_path: "./app_data/campuschat.db".to_string(),
            event_buffer: 256,
            tombstone_text: TOMBSTONE_TEXT.to_string(),
            log_filter: "campuschat=info".to_string(),
        }
    }
}
