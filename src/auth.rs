use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use log::debug;

use crate::settings::Settings;

//Per-service session kept in the settings store under "<service>_*" keys
pub struct TokenManager {
    settings: Settings,
    service: &'static str,
}

impl TokenManager {
    pub const fn new(settings: Settings, service: &'static str) -> Self {
        Self { settings, service }
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn token(&self) -> Option<&str> {
        self.value("token")
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.value("refresh_token")
    }

    pub fn token_time(&self) -> Option<u64> {
        self.value("token_time").and_then(|t| t.parse().ok())
    }

    pub fn mobile(&self) -> Option<&str> {
        self.value("mobile")
    }

    pub fn is_valid(&self) -> bool {
        self.token().is_some()
    }

    //A refresh without a rotated refresh token keeps the stored one
    pub fn set_token(&mut self, token: &str, refresh_token: Option<&str>) -> Result<()> {
        debug!("Storing {} token", self.service);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
            .to_string();

        let token_key = self.key("token");
        let time_key = self.key("token_time");
        let refresh_key = self.key("refresh_token");

        let mut pairs = vec![(token_key.as_str(), token), (time_key.as_str(), now.as_str())];
        if let Some(refresh_token) = refresh_token.filter(|t| !t.is_empty()) {
            pairs.push((refresh_key.as_str(), refresh_token));
        }

        self.settings.set_many(&pairs)
    }

    pub fn set_mobile(&mut self, mobile: &str) -> Result<()> {
        let key = self.key("mobile");
        self.settings.set(&key, mobile)
    }

    pub fn clear_token(&mut self) -> Result<()> {
        debug!("Clearing {} token", self.service);

        let token_key = self.key("token");
        let refresh_key = self.key("refresh_token");
        self.settings
            .set_many(&[(token_key.as_str(), ""), (refresh_key.as_str(), "")])
    }

    fn key(&self, name: &str) -> String {
        format!("{}_{name}", self.service)
    }

    fn value(&self, name: &str) -> Option<&str> {
        Some(self.settings.get(&self.key(name))).filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
pub mod tests {
    use tempfile::TempDir;

    use super::*;

    pub fn create_manager(dir: &TempDir) -> TokenManager {
        TokenManager::new(
            Settings::load(&dir.path().join("settings.json")).unwrap(),
            "jiotv",
        )
    }

    #[test]
    fn logged_out_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let manager = create_manager(&dir);

        assert!(!manager.is_valid());
        assert_eq!(manager.token(), None);
        assert_eq!(manager.refresh_token(), None);
        assert_eq!(manager.token_time(), None);
    }

    #[test]
    fn token_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = create_manager(&dir);

        manager.set_token("bearer", Some("refresh")).unwrap();
        assert!(manager.is_valid());
        assert!(manager.token_time().is_some());

        //Survives a restart
        let mut manager = create_manager(&dir);
        assert_eq!(manager.token(), Some("bearer"));
        assert_eq!(manager.refresh_token(), Some("refresh"));

        manager.set_token("bearer2", None).unwrap();
        assert_eq!(manager.token(), Some("bearer2"));
        assert_eq!(manager.refresh_token(), Some("refresh"));

        manager.set_mobile("9876543210").unwrap();
        manager.clear_token().unwrap();
        assert!(!manager.is_valid());
        assert_eq!(manager.refresh_token(), None);
        assert_eq!(manager.mobile(), Some("9876543210"));
    }

    #[test]
    fn keys_are_per_service() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = create_manager(&dir);
        manager.set_token("bearer", None).unwrap();

        let other = TokenManager::new(
            Settings::load(&dir.path().join("settings.json")).unwrap(),
            "zee5",
        );
        assert!(!other.is_valid());
        assert_eq!(manager.settings().get("jiotv_token"), "bearer");
    }
}
