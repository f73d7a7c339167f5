//! Property file parser
//!
//! Parses the nested, namespace-based text format used by game object
//! definition files:
//!
//! ```text
//! // comment
//! enemy
//! {
//!     speed = 3.0
//! }
//!
//! sprite_animation walk {
//!     scale = ${AnimationScale}
//! }
//!
//! ${AnimationScale} = 0.2
//! child = enemy_trigger
//! ```
//!
//! A namespace header is `name [id]`, followed by `{` on the same or the next
//! line. `key = value` lines are properties; `${Name} = value` lines define
//! variables visible to the defining namespace and everything nested in it.
//! Lines starting with `#`, `//` comments and `/* */` block comments are ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::foundation::math::{Vec2, Vec3};

/// Property file errors
#[derive(Debug, Error)]
pub enum PropertiesError {
    /// The file could not be read
    #[error("failed to read '{path}': {source}")]
    Io {
        /// File that failed to load
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The text is not well formed
    #[error("line {line}: {message}")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
}

/// A namespace of properties, possibly containing nested namespaces
///
/// The value returned by [`Properties::parse`] is an unnamed root namespace
/// holding the file's top-level properties and namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    namespace: String,
    id: Option<String>,
    values: Vec<(String, String)>,
    variables: Vec<(String, String)>,
    namespaces: Vec<Properties>,
}

impl Properties {
    /// Create an empty namespace
    pub fn new(namespace: impl Into<String>, id: Option<&str>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.map(str::to_string),
            ..Self::default()
        }
    }

    /// An empty, unnamed property block
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a property (builder pattern)
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    /// Append a nested namespace (builder pattern)
    pub fn with_namespace(mut self, namespace: Properties) -> Self {
        self.namespaces.push(namespace);
        self
    }

    /// Load and parse a property file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PropertiesError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| PropertiesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse property text into an unnamed root namespace
    pub fn parse(contents: &str) -> Result<Self, PropertiesError> {
        let mut stack = vec![Properties::default()];
        let mut pending: Option<(Properties, usize)> = None;
        let mut in_block_comment = false;
        let mut last_line = 0;

        for (index, raw) in contents.lines().enumerate() {
            let line_num = index + 1;
            last_line = line_num;

            let stripped = strip_comments(raw, &mut in_block_comment);
            let line = stripped.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line == "{" {
                let (namespace, _) =
                    pending.take().ok_or_else(|| syntax(line_num, "'{' without a namespace header"))?;
                stack.push(namespace);
                continue;
            }

            if let Some((namespace, header_line)) = &pending {
                return Err(syntax(
                    *header_line,
                    format!("namespace '{}' is missing '{{'", namespace.namespace),
                ));
            }

            if line.starts_with('}') {
                if line != "}" {
                    return Err(syntax(line_num, "unexpected text after '}'"));
                }
                if stack.len() == 1 {
                    return Err(syntax(line_num, "unmatched '}'"));
                }
                if let Some(closed) = stack.pop() {
                    current(&mut stack).namespaces.push(closed);
                }
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    return Err(syntax(line_num, "property is missing a name"));
                }
                let value = unquote(value.trim()).to_string();
                let namespace = current(&mut stack);
                match key.strip_prefix("${").and_then(|k| k.strip_suffix('}')) {
                    Some(variable) => namespace.variables.push((variable.to_string(), value)),
                    None => namespace.values.push((key.to_string(), value)),
                }
                continue;
            }

            let (header, opens) = match line.strip_suffix('{') {
                Some(header) => (header.trim_end(), true),
                None => (line, false),
            };
            let mut tokens = header.split_whitespace();
            let name = tokens
                .next()
                .ok_or_else(|| syntax(line_num, "namespace header is missing a name"))?;
            let id = tokens.next();
            if let Some(extra) = tokens.next() {
                return Err(syntax(
                    line_num,
                    format!("unexpected token '{extra}' in namespace header"),
                ));
            }

            let namespace = Properties::new(name, id);
            if opens {
                stack.push(namespace);
            } else {
                pending = Some((namespace, line_num));
            }
        }

        if let Some((namespace, header_line)) = pending {
            return Err(syntax(
                header_line,
                format!("namespace '{}' is missing '{{'", namespace.namespace),
            ));
        }

        if stack.len() > 1 {
            let open = &stack[stack.len() - 1];
            return Err(syntax(
                last_line,
                format!("namespace '{}' is never closed", open.namespace),
            ));
        }

        let mut root = stack.pop().unwrap_or_default();
        root.resolve_variables(&HashMap::new());
        Ok(root)
    }

    fn resolve_variables(&mut self, inherited: &HashMap<String, String>) {
        let mut scope = inherited.clone();
        for (name, value) in &self.variables {
            let resolved = substitute(value, &scope);
            scope.insert(name.clone(), resolved);
        }

        for (_, value) in &mut self.values {
            if value.contains("${") {
                *value = substitute(value, &scope);
            }
        }

        for namespace in &mut self.namespaces {
            namespace.resolve_variables(&scope);
        }
    }

    /// Namespace name; empty for the root of a file
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Explicit id given in the namespace header
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Properties of this namespace in file order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Nested namespaces in file order
    pub fn namespaces(&self) -> impl Iterator<Item = &Properties> {
        self.namespaces.iter()
    }

    /// Find a nested namespace (at any depth) by id
    pub fn find_namespace(&self, id: &str) -> Option<&Properties> {
        self.namespaces.iter().find_map(|namespace| {
            if namespace.id() == Some(id) {
                Some(namespace)
            } else {
                namespace.find_namespace(id)
            }
        })
    }

    /// Whether a property with this name exists
    pub fn exists(&self, name: &str) -> bool {
        self.values.iter().any(|(k, _)| k == name)
    }

    /// Whether the namespace has no properties and no nested namespaces
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.namespaces.is_empty()
    }

    /// First value of a property
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated property, in file order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.values
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parse a property with [`FromStr`]
    pub fn get<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get_str(name)?.trim().parse().ok()
    }

    /// Float property
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name)
    }

    /// Integer property
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get(name)
    }

    /// Boolean property; only `true` and `false` are accepted
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get_str(name)?.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Two component vector written as `x, y`
    pub fn get_vec2(&self, name: &str) -> Option<Vec2> {
        let [x, y] = self.get_components::<2>(name)?;
        Some(Vec2::new(x, y))
    }

    /// Three component vector written as `x, y, z`
    pub fn get_vec3(&self, name: &str) -> Option<Vec3> {
        let [x, y, z] = self.get_components::<3>(name)?;
        Some(Vec3::new(x, y, z))
    }

    fn get_components<const N: usize>(&self, name: &str) -> Option<[f32; N]> {
        let mut out = [0.0; N];
        let mut parts = self.get_str(name)?.split(',');
        for slot in &mut out {
            *slot = parts.next()?.trim().parse().ok()?;
        }
        if parts.next().is_some() {
            return None;
        }
        Some(out)
    }

    /// Overwrite `out` if the property exists and parses
    ///
    /// Returns whether `out` was written.
    pub fn set_if_exists<T: FromStr>(&self, name: &str, out: &mut T) -> bool {
        match self.get(name) {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }
}

fn current(stack: &mut [Properties]) -> &mut Properties {
    let last = stack.len() - 1;
    &mut stack[last]
}

fn syntax(line: usize, message: impl Into<String>) -> PropertiesError {
    PropertiesError::Syntax {
        line,
        message: message.into(),
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Remove `//` and `/* */` comments, tracking block comments across lines
fn strip_comments(line: &str, in_block_comment: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    loop {
        if *in_block_comment {
            match rest.find("*/") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    *in_block_comment = false;
                }
                None => return out,
            }
        }

        match (rest.find("/*"), rest.find("//")) {
            (Some(block), Some(line_comment)) if line_comment < block => {
                out.push_str(&rest[..line_comment]);
                return out;
            }
            (Some(block), _) => {
                out.push_str(&rest[..block]);
                rest = &rest[block + 2..];
                *in_block_comment = true;
            }
            (None, Some(line_comment)) => {
                out.push_str(&rest[..line_comment]);
                return out;
            }
            (None, None) => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Replace `${Name}` references with values from `scope`
fn substitute(value: &str, scope: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match scope.get(name) {
            Some(resolved) => out.push_str(resolved),
            None => {
                log::warn!("Unresolved property variable '{}'", name);
                out.push_str(&rest[start..start + end + 3]);
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
