//! Entry filter: decides which archive entries get republished.

use crate::config::FilterConfig;

/// Case-insensitive extension allow-list over entry names.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    extensions: Vec<String>,
    media_type: String,
}

impl EntryFilter {
    pub fn new<I, S>(extensions: I, media_type: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| normalise_extension(ext.as_ref()))
            .filter(|ext| ext.len() > 1)
            .collect();
        Self {
            extensions,
            media_type: media_type.into(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(&config.extensions, config.media_type.clone())
    }

    /// True when `name` is a file entry whose extension is on the allow-list.
    ///
    /// Directory entries (empty name or trailing separator) never match.
    pub fn accepts(&self, name: &str) -> bool {
        if is_directory(name) {
            return false;
        }
        match extension(name) {
            Some(ext) => self
                .extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// Media type declared for every accepted entry.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

fn normalise_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

fn is_directory(name: &str) -> bool {
    name.is_empty() || name.ends_with('/') || name.ends_with('\\')
}

/// Final extension of the last path component, including the dot.
pub(crate) fn extension(name: &str) -> Option<&str> {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    file_name.rfind('.').map(|dot| &file_name[dot..])
}
