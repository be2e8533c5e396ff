use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind::NotFound,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;

//Flat string store, every write is persisted immediately
#[derive(Debug)]
pub struct Settings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Reading settings: {}", path.display());

        let values = match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::default(),
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("Malformed settings file: {}", path.display()))?,
            Err(e) if e.kind() == NotFound => BTreeMap::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read settings: {}", path.display()));
            }
        };

        Ok(Self {
            path: path.to_owned(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    //Empty values read the same as unset ones
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map_or("", String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    pub fn set_many(&mut self, pairs: &[(&str, &str)]) -> Result<()> {
        for (key, value) in pairs {
            if value.is_empty() {
                self.values.remove(*key);
            } else {
                self.values.insert((*key).to_owned(), (*value).to_owned());
            }
        }

        self.save()
    }

    fn save(&self) -> Result<()> {
        debug!("Writing settings: {}", self.path.display());
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }

        fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)
            .with_context(|| format!("Failed to write settings: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();

        assert_eq!(settings.get("jiotv_token"), "");
    }

    #[test]
    fn values_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revtv").join("settings.json");

        let mut settings = Settings::load(&path).unwrap();
        settings
            .set_many(&[("jiotv_token", "abc"), ("jiotv_mobile", "9876543210")])
            .unwrap();
        settings.set("jiotv_mobile", "").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.get("jiotv_token"), "abc");
        assert_eq!(settings.get("jiotv_mobile"), "");
        assert_eq!(settings.path(), path);
    }

    #[test]
    fn malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2").unwrap();

        assert!(Settings::load(&path).is_err());
    }
}
