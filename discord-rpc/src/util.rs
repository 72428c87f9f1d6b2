use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use directories::{BaseDirs, UserDirs};

pub fn current_unix_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or(0)
}

pub fn get_appdata_file(suffix: &str) -> Option<PathBuf> {
    BaseDirs::new().map(|base_dirs| base_dirs.config_dir().join(suffix))
}

/// `<Documents>/Slippi`, where Slippi Launcher saves replays by default.
pub fn default_replay_root() -> Option<PathBuf> {
    UserDirs::new().and_then(|user_dirs| user_dirs.document_dir().map(|documents| documents.join("Slippi")))
}

/// Slippi files replays into a `YYYY-MM` folder per month.
pub fn month_folder(now: DateTime<Local>) -> String {
    now.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn month_folder_is_zero_padded() {
        let march = Local.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).single().expect("valid local time");
        assert_eq!(month_folder(march), "2024-03");

        let december = Local.with_ymd_and_hms(2023, 12, 31, 12, 0, 0).single().expect("valid local time");
        assert_eq!(month_folder(december), "2023-12");
    }
}
