//! Host capabilities and client configuration.
//!
//! [`Capabilities`] describes which binary and form primitives the host can actually deliver.
//! It is resolved once by the embedder when the engine starts and then passed by value into the
//! classifier, every [`Body`](crate::body::Body) and the [`FetchClient`](crate::net::FetchClient).
//! Nothing in this crate mutates it afterwards.
//!
//! [`FetchConfig`] carries the settings of the transport side (user agent, timeout) together
//! with the capabilities.
//!
//! # Examples
//!
//! ```rust
//! use gosub_fetch::config::Capabilities;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let caps = Capabilities::builder()
//!     .blob(false)
//!     .form_data(false)
//!     .build()?;
//! assert!(caps.array_buffer);
//! assert!(!caps.blob);
//! # Ok(()) }
//! ```

use std::fmt;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "Gosub/1.0 (X11; Linux x86_64) Gecko/20250802 GosubBrowser/1.0";

/// A single host primitive that may or may not be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Blob,
    FormData,
    SearchParams,
    ArrayBuffer,
    DataView,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Blob => write!(f, "Blob"),
            Capability::FormData => write!(f, "FormData"),
            Capability::SearchParams => write!(f, "URLSearchParams"),
            Capability::ArrayBuffer => write!(f, "ArrayBuffer"),
            Capability::DataView => write!(f, "DataView"),
        }
    }
}

/// Support flags for the host primitives a body can be built from or read into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Binary blobs and an asynchronous reader for them.
    pub blob: bool,
    /// Multipart form data containers.
    pub form_data: bool,
    /// URL search parameter collections.
    pub search_params: bool,
    /// Raw buffers and typed-array views over them.
    pub array_buffer: bool,
    /// Untyped data views over raw buffers.
    pub data_view: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            blob: true,
            form_data: true,
            search_params: true,
            array_buffer: true,
            data_view: true,
        }
    }
}

impl Capabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    /// A host that only offers raw buffers next to plain text.
    pub fn legacy() -> Self {
        Self {
            blob: false,
            form_data: false,
            search_params: false,
            array_buffer: true,
            data_view: false,
        }
    }

    /// A host that only offers plain text.
    pub fn none() -> Self {
        Self {
            blob: false,
            form_data: false,
            search_params: false,
            array_buffer: false,
            data_view: false,
        }
    }

    /// Returns whether the given capability is present.
    pub fn supports(&self, cap: Capability) -> bool {
        match cap {
            Capability::Blob => self.blob,
            Capability::FormData => self.form_data,
            Capability::SearchParams => self.search_params,
            Capability::ArrayBuffer => self.array_buffer,
            Capability::DataView => self.data_view,
        }
    }
}

/// Builder for [`Capabilities`], mirroring the zone config builder.
#[derive(Debug, Clone, Default)]
pub struct CapabilitiesBuilder {
    inner: Capabilities,
}

impl CapabilitiesBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut Capabilities)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn blob(self, on: bool) -> Self { self.map(|c| c.blob = on) }
    pub fn form_data(self, on: bool) -> Self { self.map(|c| c.form_data = on) }
    pub fn search_params(self, on: bool) -> Self { self.map(|c| c.search_params = on) }
    pub fn array_buffer(self, on: bool) -> Self { self.map(|c| c.array_buffer = on) }
    pub fn data_view(self, on: bool) -> Self { self.map(|c| c.data_view = on) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut Capabilities)) -> Self { self.map(f) }

    /// Validate and build the final capabilities.
    pub fn build(self) -> Result<Capabilities, ConfigError> {
        validate_capabilities(&self.inner)?;
        Ok(self.inner)
    }
}

/// Configuration for a [`FetchClient`](crate::net::FetchClient).
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Overall request timeout, `None` waits forever
    pub timeout: Option<Duration>,
    /// Host primitives available to bodies built by the client
    pub capabilities: Capabilities,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            capabilities: Capabilities::default(),
        }
    }
}

impl FetchConfig {
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchConfigBuilder {
    inner: FetchConfig,
}

impl FetchConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut FetchConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn user_agent<S: Into<String>>(self, ua: S) -> Self { self.map(|c| c.user_agent = ua.into()) }
    pub fn timeout(self, timeout: Duration) -> Self { self.map(|c| c.timeout = Some(timeout)) }
    pub fn capabilities(self, caps: Capabilities) -> Self { self.map(|c| c.capabilities = caps) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<FetchConfig, ConfigError> {
        validate_capabilities(&self.inner.capabilities)?;
        if self.inner.timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A capability was enabled while one it builds upon is missing.
    MissingPrerequisite { capability: Capability, requires: Capability },
    ZeroTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingPrerequisite { capability, requires } =>
                write!(f, "{capability} support requires {requires} support"),
            ConfigError::ZeroTimeout =>
                write!(f, "timeout must be larger than zero"),
        }
    }
}
impl std::error::Error for ConfigError {}

fn validate_capabilities(c: &Capabilities) -> Result<(), ConfigError> {
    if c.data_view && !c.array_buffer {
        return Err(ConfigError::MissingPrerequisite {
            capability: Capability::DataView,
            requires: Capability::ArrayBuffer,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_supports_everything() {
        let caps = Capabilities::default();
        for cap in [
            Capability::Blob,
            Capability::FormData,
            Capability::SearchParams,
            Capability::ArrayBuffer,
            Capability::DataView,
        ] {
            assert!(caps.supports(cap), "{cap} should be supported");
        }
    }

    #[test]
    fn builder_toggles_flags() {
        let caps = Capabilities::builder()
            .blob(false)
            .search_params(false)
            .build()
            .unwrap();

        assert!(!caps.blob);
        assert!(!caps.search_params);
        assert!(caps.form_data);
    }

    #[test]
    fn data_view_without_array_buffer_is_rejected() {
        let err = Capabilities::builder()
            .array_buffer(false)
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::MissingPrerequisite {
                capability: Capability::DataView,
                requires: Capability::ArrayBuffer,
            }
        );
        assert_eq!(err.to_string(), "DataView support requires ArrayBuffer support");
    }

    #[test]
    fn legacy_and_none_presets_validate() {
        assert!(Capabilities::builder().with(|c| *c = Capabilities::legacy()).build().is_ok());
        assert!(Capabilities::builder().with(|c| *c = Capabilities::none()).build().is_ok());
    }

    #[test]
    fn fetch_config_rejects_zero_timeout() {
        let err = FetchConfig::builder().timeout(Duration::ZERO).build().unwrap_err();
        assert_eq!(err, ConfigError::ZeroTimeout);

        let cfg = FetchConfig::builder()
            .user_agent("Gosub/0.1")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(cfg.user_agent, "Gosub/0.1");
        assert_eq!(cfg.timeout, Some(Duration::from_secs(5)));
    }
}
