use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "ordersms";
const KEYCHAIN_SERVICE: &str = "ordersms.gateway.credentials";

/// Environment variable consulted before the keychain for the gateway password.
pub const PASSWORD_ENV: &str = "CLICKATELL_PASSWORD";

/// Gateway settings as the host stores them. `api_id` stays a string at
/// rest and is parsed to a number when the gateway client is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmsSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Per-store overlay: a field that is `Some` overrides the base record
/// within that store's scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsOverride {
    pub enabled: Option<bool>,
    pub api_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub phone_number: Option<String>,
}

impl SettingsOverride {
    /// Fold another patch on top of this one; absent fields keep their
    /// current state.
    pub fn merge(&mut self, patch: SettingsOverride) {
        if patch.enabled.is_some() {
            self.enabled = patch.enabled;
        }
        if patch.api_id.is_some() {
            self.api_id = patch.api_id;
        }
        if patch.username.is_some() {
            self.username = patch.username;
        }
        if patch.password.is_some() {
            self.password = patch.password;
        }
        if patch.phone_number.is_some() {
            self.phone_number = patch.phone_number;
        }
    }
}

impl SmsSettings {
    pub fn apply(&mut self, patch: &SettingsOverride) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(api_id) = &patch.api_id {
            self.api_id = api_id.clone();
        }
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(password) = &patch.password {
            self.password = password.clone();
        }
        if let Some(phone_number) = &patch.phone_number {
            self.phone_number = phone_number.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    Enabled,
    ApiId,
    Username,
    Password,
    PhoneNumber,
}

/// The base settings record plus one store's overlay.
#[derive(Debug, Clone)]
pub struct ScopedSettings {
    pub base: SmsSettings,
    pub scope: Option<u64>,
    pub overrides: SettingsOverride,
}

impl ScopedSettings {
    /// Base record with overridden fields replaced.
    pub fn effective(&self) -> SmsSettings {
        let mut settings = self.base.clone();
        settings.apply(&self.overrides);
        settings
    }

    pub fn is_overridden(&self, field: SettingField) -> bool {
        match field {
            SettingField::Enabled => self.overrides.enabled.is_some(),
            SettingField::ApiId => self.overrides.api_id.is_some(),
            SettingField::Username => self.overrides.username.is_some(),
            SettingField::Password => self.overrides.password.is_some(),
            SettingField::PhoneNumber => self.overrides.phone_number.is_some(),
        }
    }
}

fn profile_name(scope: u64) -> String {
    format!("store-{scope}")
}

/// Load settings for a scope: the base record plus that store's overlay.
/// `None` loads the base record alone.
pub fn load(scope: Option<u64>) -> Result<ScopedSettings> {
    let base: SmsSettings = confy::load(APP_NAME, None).context("Failed to load SMS settings")?;
    let overrides = match scope {
        Some(id) => confy::load(APP_NAME, Some(profile_name(id).as_str()))
            .context("Failed to load store-scope overrides")?,
        None => SettingsOverride::default(),
    };
    Ok(ScopedSettings {
        base,
        scope,
        overrides,
    })
}

pub fn store_base(settings: &SmsSettings) -> Result<()> {
    confy::store(APP_NAME, None, settings).context("Failed to store SMS settings")?;
    Ok(())
}

pub fn store_overrides(scope: u64, overrides: &SettingsOverride) -> Result<()> {
    confy::store(APP_NAME, Some(profile_name(scope).as_str()), overrides)
        .context("Failed to store store-scope overrides")?;
    Ok(())
}

/// Store a secret in the OS keychain
pub fn store_secret(key: &str, value: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.set_password(value)?;
    Ok(())
}

/// Retrieve a secret from the OS keychain
pub fn get_secret(key: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    let password = entry.get_password()?;
    Ok(password)
}

/// Delete a secret from the OS keychain
pub fn delete_secret(key: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYCHAIN_SERVICE, key)?;
    entry.delete_password()?;
    Ok(())
}

/// Gateway password resolution order: environment, OS keychain, stored value.
pub fn resolve_password(settings: &SmsSettings) -> String {
    std::env::var(PASSWORD_ENV)
        .or_else(|_| get_secret("clickatell_password"))
        .unwrap_or_else(|_| settings.password.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SmsSettings {
        SmsSettings {
            enabled: true,
            api_id: "12345".into(),
            username: "owner".into(),
            password: "pw".into(),
            phone_number: "15551234567".into(),
        }
    }

    #[test]
    fn effective_without_overrides_is_the_base() {
        let scoped = ScopedSettings {
            base: base(),
            scope: None,
            overrides: SettingsOverride::default(),
        };
        let effective = scoped.effective();
        assert!(effective.enabled);
        assert_eq!(effective.phone_number, "15551234567");
        assert!(!scoped.is_overridden(SettingField::PhoneNumber));
    }

    #[test]
    fn overridden_fields_replace_base_values() {
        let scoped = ScopedSettings {
            base: base(),
            scope: Some(2),
            overrides: SettingsOverride {
                enabled: Some(false),
                phone_number: Some("15559876543".into()),
                ..Default::default()
            },
        };
        let effective = scoped.effective();
        assert!(!effective.enabled);
        assert_eq!(effective.phone_number, "15559876543");
        assert_eq!(effective.username, "owner");
        assert!(scoped.is_overridden(SettingField::Enabled));
        assert!(!scoped.is_overridden(SettingField::Username));
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let mut overrides = SettingsOverride {
            enabled: Some(true),
            ..Default::default()
        };
        overrides.merge(SettingsOverride {
            phone_number: Some("15550000000".into()),
            ..Default::default()
        });
        assert_eq!(overrides.enabled, Some(true));
        assert_eq!(overrides.phone_number.as_deref(), Some("15550000000"));
    }
}
