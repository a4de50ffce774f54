use std::error::Error;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories_next::BaseDirs;

use super::settings::Settings;

pub fn config_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|base| base.config_dir().join("PromptDJ"))
}

fn settings_path(dir: &Path) -> PathBuf {
    dir.join("settings.json")
}

pub fn save_settings(
    dir: &Path,
    settings: &Settings,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(settings)?;
    let path = settings_path(dir);
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    fs::write(&path, json)?;
    Ok(path)
}

pub fn load_settings(dir: &Path) -> Result<Settings, Box<dyn Error>> {
    let json = fs::read_to_string(settings_path(dir))?;
    let settings = serde_json::from_str::<Settings>(&json)?;
    Ok(settings)
}

pub fn load_settings_if_exists(
    dir: &Path,
) -> Result<Option<Settings>, Box<dyn Error>> {
    match load_settings(dir) {
        Ok(settings) => Ok(Some(settings)),
        Err(err) => {
            if err
                .downcast_ref::<std::io::Error>()
                .is_some_and(|e| e.kind() == ErrorKind::NotFound)
            {
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}
