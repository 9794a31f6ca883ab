//! Placeholder substitution for paths carried in setting values.
//!
//! Supported placeholders: `%h` host name, `%n` user name, `%H` home
//! directory, `%t` temporary directory and `%%` for a literal percent sign.
//! Unknown placeholders are kept as-is.

use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait ParameterSubstitutor: Send + Sync + 'static {
    fn substitute(
        &self,
        source: &str,
    ) -> String;
}

#[derive(Debug, Clone)]
pub struct DefaultParameterSubstitutor {
    host: String,
    user: String,
    home: PathBuf,
    temp: PathBuf,
}

impl DefaultParameterSubstitutor {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        home: impl Into<PathBuf>,
        temp: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            home: home.into(),
            temp: temp.into(),
        }
    }

    /// Resolves the placeholders from the process environment
    pub fn from_env() -> Self {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        let home = std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("/"));
        Self::new(host, user, home, std::env::temp_dir())
    }
}

impl ParameterSubstitutor for DefaultParameterSubstitutor {
    fn substitute(
        &self,
        source: &str,
    ) -> String {
        let mut out = String::with_capacity(source.len());
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('h') => out.push_str(&self.host),
                Some('n') => out.push_str(&self.user),
                Some('H') => out.push_str(&self.home.to_string_lossy()),
                Some('t') => out.push_str(&self.temp.to_string_lossy()),
                Some('%') => out.push('%'),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        }
        out
    }
}
