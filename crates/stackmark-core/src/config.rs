//! # Error Tracking Configuration
//!
//! In-app classification settings, built once per SDK instance.
//!
//! The include list is seeded with the host application's own identity
//! (bundle identifier, then executable name) before any user entry is added,
//! so host code is classified in-app under default settings.
//!
//! ## Example
//!
//! ```rust
//! use stackmark_core::config::{ErrorTrackingConfig, ErrorTrackingConfigBuilder};
//!
//! let config = ErrorTrackingConfigBuilder::unseeded()
//!     .include("MyApp")
//!     .exclude("Alamofire")
//!     .in_app_by_default(true)
//!     .build();
//!
//! assert_eq!(config.in_app_includes(), ["MyApp"]);
//! assert_eq!(config.in_app_excludes(), ["Alamofire"]);
//! assert!(config.in_app_by_default());
//!
//! // Seeded with the running executable's name.
//! let seeded = ErrorTrackingConfig::builder().build();
//! assert!(!seeded.in_app_includes().is_empty());
//! ```

use std::env;

use tracing::warn;

/// Environment variable that launch services set for bundled applications.
const BUNDLE_IDENTIFIER_ENV: &str = "__CFBundleIdentifier";

/// Identity of the host application, used to seed the include list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostIdentity
{
    /// Bundle identifier (e.g. `com.example.MyApp`), when running from a bundle.
    pub bundle_identifier: Option<String>,
    /// File name of the running executable.
    pub executable_name: Option<String>,
}

impl HostIdentity
{
    /// Build an identity from explicit values.
    pub fn new(bundle_identifier: Option<String>, executable_name: Option<String>) -> Self
    {
        Self {
            bundle_identifier,
            executable_name,
        }
    }

    /// Detect the identity of the running process.
    ///
    /// The bundle identifier comes from `__CFBundleIdentifier`; the executable
    /// name from the last component of `std::env::current_exe()`. Either may be
    /// absent.
    pub fn detect() -> Self
    {
        let bundle_identifier = env::var(BUNDLE_IDENTIFIER_ENV).ok().filter(|value| !value.is_empty());
        let executable_name = env::current_exe()
            .ok()
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .filter(|name| !name.is_empty());

        Self {
            bundle_identifier,
            executable_name,
        }
    }

    fn seeds(&self) -> impl Iterator<Item = &String>
    {
        self.bundle_identifier.iter().chain(self.executable_name.iter())
    }
}

/// Immutable in-app classification settings.
///
/// Construct through [`ErrorTrackingConfig::builder`] (seeded with the host
/// identity) or [`ErrorTrackingConfigBuilder::unseeded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTrackingConfig
{
    in_app_includes: Vec<String>,
    in_app_excludes: Vec<String>,
    in_app_by_default: bool,
}

impl ErrorTrackingConfig
{
    /// Builder seeded with the detected host identity.
    pub fn builder() -> ErrorTrackingConfigBuilder
    {
        ErrorTrackingConfigBuilder::for_host(&HostIdentity::detect())
    }

    /// Module-name prefixes that are always in-app. Highest priority.
    pub fn in_app_includes(&self) -> &[String]
    {
        &self.in_app_includes
    }

    /// Module-name prefixes that are never in-app, unless also included.
    pub fn in_app_excludes(&self) -> &[String]
    {
        &self.in_app_excludes
    }

    /// Classification for modules no list matches.
    pub fn in_app_by_default(&self) -> bool
    {
        self.in_app_by_default
    }
}

impl Default for ErrorTrackingConfig
{
    /// Seeded with the detected host identity, `in_app_by_default = true`.
    fn default() -> Self
    {
        Self::builder().build()
    }
}

/// Builder for [`ErrorTrackingConfig`].
#[derive(Debug, Clone)]
pub struct ErrorTrackingConfigBuilder
{
    config: ErrorTrackingConfig,
}

impl ErrorTrackingConfigBuilder
{
    /// Start with empty lists and `in_app_by_default = true`.
    pub fn unseeded() -> Self
    {
        Self {
            config: ErrorTrackingConfig {
                in_app_includes: Vec::new(),
                in_app_excludes: Vec::new(),
                in_app_by_default: true,
            },
        }
    }

    /// Start with the includes seeded from `host`: bundle identifier first,
    /// then executable name.
    pub fn for_host(host: &HostIdentity) -> Self
    {
        let mut builder = Self::unseeded();
        builder.config.in_app_includes.extend(host.seeds().cloned());
        builder
    }

    /// Append an include prefix.
    #[must_use]
    pub fn include(mut self, prefix: impl Into<String>) -> Self
    {
        self.config.in_app_includes.push(prefix.into());
        self
    }

    /// Append an exclude prefix.
    #[must_use]
    pub fn exclude(mut self, prefix: impl Into<String>) -> Self
    {
        self.config.in_app_excludes.push(prefix.into());
        self
    }

    /// Set the fallback classification.
    #[must_use]
    pub fn in_app_by_default(mut self, value: bool) -> Self
    {
        self.config.in_app_by_default = value;
        self
    }

    /// Apply overrides from `<PREFIX>_IN_APP_INCLUDES`,
    /// `<PREFIX>_IN_APP_EXCLUDES` (comma separated, appended) and
    /// `<PREFIX>_IN_APP_BY_DEFAULT`.
    #[must_use]
    pub fn apply_env(self, prefix: &str) -> Self
    {
        self.apply_vars(prefix, |name| env::var(name).ok())
    }

    fn apply_vars(mut self, prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self
    {
        if let Some(value) = lookup(&format!("{prefix}_IN_APP_INCLUDES")) {
            self.config.in_app_includes.extend(split_list(&value));
        }
        if let Some(value) = lookup(&format!("{prefix}_IN_APP_EXCLUDES")) {
            self.config.in_app_excludes.extend(split_list(&value));
        }

        let by_default_var = format!("{prefix}_IN_APP_BY_DEFAULT");
        if let Some(value) = lookup(&by_default_var) {
            match parse_bool(&value) {
                Some(flag) => self.config.in_app_by_default = flag,
                None => warn!(variable = %by_default_var, %value, "ignoring unparsable boolean"),
            }
        }

        self
    }

    /// Finish building.
    pub fn build(self) -> ErrorTrackingConfig
    {
        self.config
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_
{
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
}

fn parse_bool(value: &str) -> Option<bool>
{
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String>
    {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_host_seeds_come_first()
    {
        let host = HostIdentity::new(Some("com.example.MyApp".into()), Some("MyApp".into()));
        let config = ErrorTrackingConfigBuilder::for_host(&host).include("SharedUtils").build();

        assert_eq!(config.in_app_includes(), ["com.example.MyApp", "MyApp", "SharedUtils"]);
        assert!(config.in_app_by_default());
    }

    #[test]
    fn test_missing_host_parts_are_skipped()
    {
        let host = HostIdentity::new(None, Some("MyApp".into()));
        let config = ErrorTrackingConfigBuilder::for_host(&host).build();
        assert_eq!(config.in_app_includes(), ["MyApp"]);
    }

    #[test]
    fn test_env_overrides_append()
    {
        let lookup = vars(&[
            ("SM_IN_APP_INCLUDES", "Core, Shared ,,"),
            ("SM_IN_APP_EXCLUDES", "Alamofire"),
            ("SM_IN_APP_BY_DEFAULT", "no"),
        ]);
        let config = ErrorTrackingConfigBuilder::unseeded()
            .include("MyApp")
            .apply_vars("SM", lookup)
            .build();

        assert_eq!(config.in_app_includes(), ["MyApp", "Core", "Shared"]);
        assert_eq!(config.in_app_excludes(), ["Alamofire"]);
        assert!(!config.in_app_by_default());
    }

    #[test]
    fn test_env_bad_boolean_is_ignored()
    {
        let config = ErrorTrackingConfigBuilder::unseeded()
            .in_app_by_default(false)
            .apply_vars("SM", vars(&[("SM_IN_APP_BY_DEFAULT", "maybe")]))
            .build();
        assert!(!config.in_app_by_default());
    }

    #[test]
    fn test_detect_finds_executable_name()
    {
        assert!(HostIdentity::detect().executable_name.is_some());
    }
}
