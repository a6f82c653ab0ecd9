//! Capture configuration: built-in defaults merged with inbound overrides.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fixed output geometry every capture is normalized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub width: u32,
    pub height: u32,
}

impl Crop {
    /// Largest canvas side a browser will allocate
    pub const MAX_SIDE: u32 = 32_767;
    /// Largest canvas area a browser will allocate, in pixels
    pub const MAX_AREA: u64 = 268_435_456;

    /// Pixel count, or `None` when the canvas cannot be allocated
    pub fn area(&self) -> Option<u64> {
        let area = u64::from(self.width) * u64::from(self.height);
        (self.width <= Self::MAX_SIDE && self.height <= Self::MAX_SIDE && area <= Self::MAX_AREA)
            .then_some(area)
    }
}

impl Default for Crop {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1500,
        }
    }
}

/// Opaque post/asset identifier forwarded to the persistence endpoint.
///
/// Hosts send either a number or a string; the value is passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostId {
    Number(i64),
    Text(String),
}

impl From<i64> for PostId {
    fn from(v: i64) -> Self {
        PostId::Number(v)
    }
}

impl From<&str> for PostId {
    fn from(v: &str) -> Self {
        PostId::Text(v.to_string())
    }
}

/// A recognized video-embed host.
///
/// `pattern` is matched against the iframe `src`; its first capture group is
/// the video id. `thumbnail` is a URL template where `{id}` is substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoProvider {
    pub name: String,
    pub pattern: String,
    pub thumbnail: String,
}

impl VideoProvider {
    pub fn youtube() -> Self {
        Self {
            name: "youtube".to_string(),
            pattern: r#"^.*(?:youtu\.be/|youtube(?:-nocookie)?\.com/(?:(?:watch)?\??(?:.*&)?vi?=|(?:embed|v|vi|user)/))([^?&"'>]+)"#.to_string(),
            thumbnail: "https://img.youtube.com/vi/{id}/0.jpg".to_string(),
        }
    }

    /// Compile the pattern; it must carry at least one capture group.
    pub fn compile(&self) -> Result<CompiledProvider> {
        let regex = Regex::new(&self.pattern)
            .map_err(|e| Error::Config(format!("video provider {}: {}", self.name, e)))?;
        if regex.captures_len() < 2 {
            return Err(Error::Config(format!(
                "video provider {}: pattern has no capture group",
                self.name
            )));
        }
        Ok(CompiledProvider {
            name: self.name.clone(),
            regex,
            thumbnail: self.thumbnail.clone(),
        })
    }
}

/// A provider with its pattern compiled, ready for matching
#[derive(Debug, Clone)]
pub struct CompiledProvider {
    pub name: String,
    regex: Regex,
    thumbnail: String,
}

impl CompiledProvider {
    /// Extract the video id from `src`, if this provider recognizes it
    pub fn video_id(&self, src: &str) -> Option<String> {
        self.regex
            .captures(src)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|id| !id.is_empty())
    }

    pub fn thumbnail_url(&self, id: &str) -> String {
        self.thumbnail.replace("{id}", id)
    }
}

/// Configuration for a single capture run.
///
/// Built once from [`CaptureConfig::default`] plus the host's overrides and
/// read-only afterwards.
///
/// # Examples
///
/// ```
/// let cfg = rfshot::CaptureConfig::from_json(
///     r##"{"selector":"#root","home_url":"https://site.test","post_id":42}"##,
/// ).unwrap();
/// assert_eq!(cfg.crop.width, 1200);
/// assert_eq!(cfg.timeout_ms, 5000);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// CSS selector of the target root
    pub selector: String,
    /// Output geometry
    pub crop: Crop,
    /// Stylesheet URL prefixes that are never proxied
    pub exclude_css_urls: Vec<String>,
    /// Upper bound on the wait for the page load event, in milliseconds
    pub timeout_ms: u64,
    /// Same-origin base URL; also the proxy endpoint
    pub home_url: String,
    /// Proxy authentication token
    pub nonce: String,
    /// Identifier forwarded to persistence
    pub post_id: Option<PostId>,
    /// Emit progress diagnostics
    pub debug: bool,
    /// Name of the elapsed-time timer attached to progress diagnostics
    pub timer_label: String,
    /// Recognized video-embed hosts, tried in order
    pub video_providers: Vec<VideoProvider>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            selector: String::new(),
            crop: Crop::default(),
            exclude_css_urls: vec!["https://kit-pro.fontawesome.com".to_string()],
            timeout_ms: 5000,
            home_url: String::new(),
            nonce: String::new(),
            post_id: None,
            debug: false,
            timer_label: "timer".to_string(),
            video_providers: vec![VideoProvider::youtube()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CropOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Host-supplied configuration, keyed the way the host sends it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureOverrides {
    pub selector: Option<String>,
    pub crop: Option<CropOverrides>,
    #[serde(rename = "excludeCssUrls")]
    pub exclude_css_urls: Option<Vec<String>>,
    pub timeout: Option<u64>,
    pub home_url: Option<String>,
    pub nonce: Option<String>,
    pub post_id: Option<PostId>,
    #[serde(alias = "isDebug")]
    pub debug: Option<bool>,
    #[serde(rename = "timerLabel")]
    pub timer_label: Option<String>,
    #[serde(rename = "videoProviders")]
    pub video_providers: Option<Vec<VideoProvider>>,
}

impl CaptureConfig {
    /// Apply `overrides` over `self`. Lists replace; crop keys merge individually.
    pub fn merge(mut self, overrides: CaptureOverrides) -> Self {
        if let Some(v) = overrides.selector {
            self.selector = v;
        }
        if let Some(crop) = overrides.crop {
            if let Some(w) = crop.width {
                self.crop.width = w;
            }
            if let Some(h) = crop.height {
                self.crop.height = h;
            }
        }
        if let Some(v) = overrides.exclude_css_urls {
            self.exclude_css_urls = v;
        }
        if let Some(v) = overrides.timeout {
            self.timeout_ms = v;
        }
        if let Some(v) = overrides.home_url {
            self.home_url = v;
        }
        if let Some(v) = overrides.nonce {
            self.nonce = v;
        }
        if overrides.post_id.is_some() {
            self.post_id = overrides.post_id;
        }
        if let Some(v) = overrides.debug {
            self.debug = v;
        }
        if let Some(v) = overrides.timer_label {
            self.timer_label = v;
        }
        if let Some(v) = overrides.video_providers {
            self.video_providers = v;
        }
        self
    }

    /// Merge overrides over the defaults and validate the result
    pub fn from_overrides(overrides: CaptureOverrides) -> Result<Self> {
        let cfg = Self::default().merge(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a JSON configuration object, merge it over the defaults and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: CaptureOverrides = serde_json::from_str(json)?;
        Self::from_overrides(overrides)
    }

    pub fn validate(&self) -> Result<()> {
        if self.selector.trim().is_empty() {
            return Err(Error::Config("selector is required".into()));
        }
        crate::dom::parse_selector(&self.selector)?;
        if self.crop.width == 0 || self.crop.height == 0 {
            return Err(Error::Config(format!(
                "crop dimensions must be positive, got {}x{}",
                self.crop.width, self.crop.height
            )));
        }
        if self.crop.area().is_none() {
            return Err(Error::Config(format!(
                "crop {}x{} exceeds the canvas limit of {} per side and {} pixels",
                self.crop.width,
                self.crop.height,
                Crop::MAX_SIDE,
                Crop::MAX_AREA
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("timeout must be greater than zero".into()));
        }
        url::Url::parse(&self.home_url)
            .map_err(|e| Error::Config(format!("home_url {:?}: {}", self.home_url, e)))?;
        for provider in &self.video_providers {
            provider.compile()?;
        }
        Ok(())
    }

    /// Same-origin proxy URL tunnelling `url`.
    ///
    /// `url` is inserted verbatim; the proxy endpoint reads everything after
    /// `href=` as the target.
    pub fn proxy_url(&self, url: &str) -> String {
        format!(
            "{}?screenshot_proxy&nonce={}&href={}",
            self.home_url, self.nonce, url
        )
    }

    pub fn compiled_providers(&self) -> Result<Vec<CompiledProvider>> {
        self.video_providers.iter().map(|p| p.compile()).collect()
    }
}
