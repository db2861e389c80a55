use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::role::{Capability, Role};

#[derive(Debug, Error, PartialEq)]
pub enum AccessError {
    #[error("not signed in; run `capstone-grader login` first")]
    SignedOut,

    #[error("{name} ({role}) is not allowed to {capability}")]
    Forbidden {
        name: String,
        role: Role,
        capability: Capability,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub role: Role,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorPreference {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorPreference {
    /// Resolve against whether stdout is a terminal
    pub fn use_colors(self, is_terminal: bool) -> bool {
        match self {
            ColorPreference::Auto => is_terminal,
            ColorPreference::Always => true,
            ColorPreference::Never => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub color: ColorPreference,
}

/// Who is using the tool and how they want output displayed.
///
/// Passed explicitly to every command that checks identity or role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppContext {
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub preferences: Preferences,
}

/// Default session file path (<config dir>/session.json)
pub fn get_session_path() -> Result<PathBuf> {
    Ok(crate::config::get_config_dir()?.join("session.json"))
}

impl AppContext {
    /// Load the saved session. A missing file is a signed-out context.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open session file at {}", path.display()))?;
        let context: AppContext =
            serde_json::from_reader(file).context("Failed to load session")?;

        if let Some(profile) = &context.profile {
            tracing::debug!(name = %profile.name, role = %profile.role, "session loaded");
        }
        Ok(context)
    }

    /// Save the session atomically, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut file = AtomicWriteFile::open(path)
            .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;
        serde_json::to_writer_pretty(&mut file, self).context("Failed to serialize session")?;
        file.commit().context("Failed to save session")?;
        Ok(())
    }

    pub fn sign_in(&mut self, name: impl Into<String>, role: Role) -> &Profile {
        self.profile.insert(Profile {
            name: name.into(),
            role,
            signed_in_at: Utc::now(),
        })
    }

    /// Forget the profile. Preferences are kept.
    pub fn sign_out(&mut self) -> Option<Profile> {
        self.profile.take()
    }

    pub fn is_signed_in(&self) -> bool {
        self.profile.is_some()
    }

    pub fn require(&self, capability: Capability) -> Result<&Profile, AccessError> {
        let profile = self.profile.as_ref().ok_or(AccessError::SignedOut)?;
        if profile.role.can(capability) {
            Ok(profile)
        } else {
            Err(AccessError::Forbidden {
                name: profile.name.clone(),
                role: profile.role,
                capability,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_out_by_default() {
        let ctx = AppContext::default();
        assert!(!ctx.is_signed_in());
        assert_eq!(ctx.require(Capability::ViewGrades), Err(AccessError::SignedOut));
    }

    #[test]
    fn test_require_checks_role() {
        let mut ctx = AppContext::default();
        ctx.sign_in("sam", Role::Student);

        assert!(ctx.require(Capability::ViewGrades).is_ok());
        let err = ctx.require(Capability::EditGrades).unwrap_err();
        assert_eq!(err.to_string(), "sam (student) is not allowed to edit grades");
    }

    #[test]
    fn test_sign_out_keeps_preferences() {
        let mut ctx = AppContext::default();
        ctx.preferences.color = ColorPreference::Never;
        ctx.sign_in("dr.lee", Role::Teacher);

        let previous = ctx.sign_out().unwrap();
        assert_eq!(previous.name, "dr.lee");
        assert!(!ctx.is_signed_in());
        assert_eq!(ctx.preferences.color, ColorPreference::Never);
    }

    #[test]
    fn test_load_missing_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::load(&dir.path().join("session.json")).unwrap();
        assert_eq!(ctx, AppContext::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut ctx = AppContext::default();
        ctx.sign_in("ada", Role::Admin);
        ctx.preferences.color = ColorPreference::Always;
        ctx.save(&path).unwrap();

        let loaded = AppContext::load(&path).unwrap();
        assert_eq!(loaded, ctx);
        assert!(loaded.require(Capability::ManageCriteria).is_ok());
    }

    #[test]
    fn test_color_preference_resolution() {
        assert!(ColorPreference::Auto.use_colors(true));
        assert!(!ColorPreference::Auto.use_colors(false));
        assert!(ColorPreference::Always.use_colors(false));
        assert!(!ColorPreference::Never.use_colors(true));
    }
}
