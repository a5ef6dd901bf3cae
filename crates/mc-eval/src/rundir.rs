//! Timestamped output directories.

use std::path::{Path, PathBuf};

use chrono::Local;
use mc_core::Result;

/// Directory name for a run started at local time `now`.
pub fn run_dir_name<Tz: chrono::TimeZone>(now: &chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("run_{}", now.format("%Y%m%d_%H%M"))
}

/// Create `<base>/run_YYYYMMDD_HHMM/` (local time) and any missing parents.
pub fn create_timestamped_dir(base: &Path) -> Result<PathBuf> {
    let dir = base.join(run_dir_name(&Local::now()));
    std::fs::create_dir_all(&dir)?;
    tracing::info!(dir = %dir.display(), "created run directory");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn name_format() {
        let t = chrono::Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 59).unwrap();
        assert_eq!(run_dir_name(&t), "run_20240307_0905");
    }

    #[test]
    fn creates_nested_dir() {
        let base = std::env::temp_dir()
            .join(format!("mc_eval_rundir_{}", std::process::id()))
            .join("nested");
        let dir = create_timestamped_dir(&base).unwrap();
        assert!(dir.is_dir());
        assert!(dir.file_name().unwrap().to_string_lossy().starts_with("run_"));
    }
}
