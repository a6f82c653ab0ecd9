//! Inline style declarations (`style="a: b; c: d"`) as an ordered map

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    declarations: Vec<(String, String)>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a declaration block. Semicolons inside quotes or parentheses
    /// (e.g. `url("a;b")`) do not split declarations.
    pub fn parse(text: &str) -> Self {
        let mut style = Style::new();
        for decl in split_declarations(text) {
            if let Some((prop, value)) = decl.split_once(':') {
                let prop = prop.trim();
                let value = value.trim();
                if !prop.is_empty() && !value.is_empty() {
                    style.set(prop, value);
                }
            }
        }
        style
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        let property = property.to_ascii_lowercase();
        self.declarations
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, replacing an earlier value in place
    pub fn set(&mut self, property: &str, value: &str) {
        let property = property.to_ascii_lowercase();
        if let Some(slot) = self.declarations.iter_mut().find(|(p, _)| *p == property) {
            slot.1 = value.to_string();
        } else {
            self.declarations.push((property, value.to_string()));
        }
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let property = property.to_ascii_lowercase();
        let idx = self.declarations.iter().position(|(p, _)| *p == property)?;
        Some(self.declarations.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations.iter().map(|(p, v)| (p.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (p, v)) in self.declarations.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {};", p, v)?;
        }
        Ok(())
    }
}

fn split_declarations(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                out.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&text[start..]);
    out
}

/// Parse a CSS length in pixels (`"560"`, `"560px"`, `"12.5px"`)
pub fn parse_px(value: &str) -> Option<u32> {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v).trim();
    let n: f64 = v.parse().ok()?;
    if n.is_finite() && n >= 0.0 {
        Some(n.round() as u32)
    } else {
        None
    }
}
