//! `data:` URI encoding and decoding for bitmaps

use crate::{Error, Result};
use base64::Engine as Base64Engine;

/// A decoded `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DataUri {
    /// Parse `data:[<mime>][;params][;base64],<payload>`
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| Error::Decode("not a data URI".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::Decode("data URI has no payload separator".into()))?;

        let mut parts = meta.split(';');
        let mime_type = match parts.next().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_ascii_lowercase(),
            _ => "text/plain".to_string(),
        };
        let is_base64 = parts.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        let data = if is_base64 {
            let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD.decode(cleaned)?
        } else {
            payload.as_bytes().to_vec()
        };
        Ok(Self { mime_type, data })
    }

    /// Serialize as a base64 `data:` URI
    pub fn encode(mime_type: &str, data: &[u8]) -> String {
        format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(data)
        )
    }
}
