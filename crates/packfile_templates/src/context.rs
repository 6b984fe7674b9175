//! Template context and environment variable snapshots.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{TemplateError, TemplateResult};

/// A mutable snapshot of environment variables.
///
/// Templates read variables from the store instead of the process
/// environment, and environment files are loaded into it, so every
/// compilation works on its own isolated copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentStore {
    vars: BTreeMap<String, String>,
}

impl EnvironmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Load a dotenv file into the store.
    ///
    /// Variables that are already set keep their value. `$VAR` and `${VAR}`
    /// references expand against entries earlier in the same file and then
    /// against the store, never against the process environment. Returns
    /// the number of variables added.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> TemplateResult<usize> {
        let path = path.as_ref();
        let env_file_error = |message: String| TemplateError::EnvironmentFile {
            path: path.to_path_buf(),
            message,
        };

        let content = fs::read_to_string(path).map_err(|e| env_file_error(e.to_string()))?;
        #[allow(deprecated)]
        let entries = dotenv::from_path_iter(path).map_err(|e| env_file_error(e.to_string()))?;

        // dotenv yields one entry per assignment line, in file order
        let mut lines = content.lines().filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        });

        let mut parsed: BTreeMap<String, String> = BTreeMap::new();
        let mut added = 0;
        for entry in entries {
            let (key, value) = entry.map_err(|e| env_file_error(e.to_string()))?;

            let value = match lines.next().and_then(raw_value) {
                Some(raw) if raw.contains('$') => expand_value(raw, |name| {
                    parsed.get(name).or_else(|| self.vars.get(name)).cloned()
                })
                .map_err(|message| env_file_error(format!("{}: {}", key, message)))?,
                _ => value,
            };
            parsed.insert(key.clone(), value.clone());

            if self.vars.contains_key(&key) {
                continue;
            }
            self.vars.insert(key, value);
            added += 1;
        }

        debug!("Loaded {} variables from {:?}", added, path);
        Ok(added)
    }

    /// Build the template context for an environment from the current contents.
    pub fn context(&self, environment: impl Into<String>) -> TemplateContext {
        TemplateContext {
            environment: EnvironmentContext {
                name: environment.into(),
            },
            env: self.vars.clone(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// `.Environment` in templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentContext {
    /// `.Environment.Name`
    pub name: String,
}

/// Data visible to a template: `.Environment` and `.Env`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    pub environment: EnvironmentContext,
    pub env: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: EnvironmentContext {
                name: environment.into(),
            },
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// The unparsed value of a `KEY=value` line.
fn raw_value(line: &str) -> Option<&str> {
    let (_, value) = line.split_once('=')?;
    let value = value.trim();
    if value.starts_with('#') {
        return None;
    }
    Some(value)
}

/// Decode a dotenv value, resolving references through `lookup`.
///
/// Single quotes are literal. Double quotes and bare values honour
/// backslash escapes and references. A bare value ends at whitespace,
/// after which only a comment may follow.
fn expand_value(input: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String, String> {
    let mut output = String::new();
    let mut chars = input.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), c) => output.push(c),
            (_, '\\') => match chars.next() {
                Some(c @ ('\\' | '\'' | '"' | '$' | ' ')) => output.push(c),
                Some('n') => output.push('\n'),
                Some(other) => return Err(format!("invalid escape sequence \\{}", other)),
                None => return Err("trailing backslash".to_string()),
            },
            (_, '$') => {
                let name = if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => return Err("unterminated ${ reference".to_string()),
                        }
                    }
                    name
                } else {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek().filter(|c| c.is_alphanumeric() || **c == '_') {
                        name.push(c);
                        chars.next();
                    }
                    name
                };
                if let Some(value) = lookup(&name) {
                    output.push_str(&value);
                }
            }
            (Some('"'), '"') => quote = None,
            (Some(_), c) => output.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, ' ' | '\t') => {
                let rest: String = chars.collect();
                let rest = rest.trim_start();
                if !rest.is_empty() && !rest.starts_with('#') {
                    return Err(format!("unexpected {:?} after value", rest));
                }
                break;
            }
            (None, c) => output.push(c),
        }
    }

    if quote.is_some() {
        return Err("unterminated quoted value".to_string());
    }
    Ok(output)
}
