use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use log::info;

use crate::core::{
    AnkiflagError,
    CriteriaOverrides,
};

const APP_NAME: &str = "ankiflag";
const PROFILE_FILE: &str = "profile.json";

/// `<config dir>/ankiflag/profile.json`, if the platform has a config dir.
pub fn default_profile_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(PROFILE_FILE))
}

pub fn load_profile(path: &Path) -> Result<CriteriaOverrides, AnkiflagError> {
    let json = fs::read_to_string(path)
        .map_err(|e| AnkiflagError::Config(format!("{}: {}", path.display(), e)))?;
    let profile = serde_json::from_str(&json)
        .map_err(|e| AnkiflagError::Config(format!("{}: {}", path.display(), e)))?;
    info!("Profile loaded from: {}", path.display());
    Ok(profile)
}

/// An explicit path must exist; the default location is optional.
pub fn load_profile_or_default(
    explicit: Option<&Path>,
) -> Result<CriteriaOverrides, AnkiflagError> {
    if let Some(path) = explicit {
        return load_profile(path);
    }

    match default_profile_path() {
        Some(path) if path.exists() => load_profile(&path),
        _ => Ok(CriteriaOverrides::default()),
    }
}
