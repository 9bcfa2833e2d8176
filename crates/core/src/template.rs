//! Prompt templates — strings with named `{placeholder}` slots.
//!
//! Placeholder names are ASCII letters, digits, `_` and `.` (dots let a
//! chain refer to a field of an earlier structured step, e.g.
//! `{product.name}`). `{{` and `}}` render as literal braces.
//!
//! Rendering is pure: the template is scanned left to right and the first
//! placeholder without a value aborts with [`Error::MissingVariable`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::message::Message;

/// Caller-supplied values for template placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variables(BTreeMap<String, String>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Variables {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A parsed piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(std::borrow::Cow<'a, str>),
    Placeholder(&'a str),
}

/// A prompt template with named placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Check the template syntax without rendering it.
    pub fn validate(&self) -> Result<()> {
        self.segments().map(|_| ())
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for segment in self.segments()? {
            if let Segment::Placeholder(name) = segment {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Instantiate the template. Extra variables are ignored.
    pub fn render(&self, vars: &Variables) -> Result<String> {
        let segments = self.segments()?;
        let mut out = String::with_capacity(self.source.len());
        for segment in segments {
            match segment {
                Segment::Literal(text) => out.push_str(&text),
                Segment::Placeholder(name) => {
                    let value = vars.get(name).ok_or_else(|| Error::MissingVariable {
                        name: name.to_string(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    fn segments(&self) -> Result<Vec<Segment<'_>>> {
        let src = self.source.as_str();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = src.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let start = pos + 1;
                    let mut end = None;
                    while let Some(&(j, d)) = chars.peek() {
                        if d == '}' {
                            chars.next();
                            end = Some(j);
                            break;
                        }
                        if !is_name_char(d) {
                            return Err(Error::MalformedTemplate {
                                position: j,
                                reason: format!("invalid character {d:?} in placeholder"),
                            });
                        }
                        chars.next();
                    }
                    let end = end.ok_or_else(|| Error::MalformedTemplate {
                        position: pos,
                        reason: "unclosed placeholder".into(),
                    })?;
                    if end == start {
                        return Err(Error::MalformedTemplate {
                            position: pos,
                            reason: "empty placeholder".into(),
                        });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal).into()));
                    }
                    segments.push(Segment::Placeholder(&src[start..end]));
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(Error::MalformedTemplate {
                        position: pos,
                        reason: "unmatched '}' (use '}}' for a literal brace)".into(),
                    });
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal.into()));
        }
        Ok(segments)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

impl From<&str> for PromptTemplate {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for PromptTemplate {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

/// A system + human message pair, rendered together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<PromptTemplate>,
    pub human: PromptTemplate,
}

impl ChatTemplate {
    /// A template with only a human turn.
    pub fn new(human: impl Into<PromptTemplate>) -> Self {
        Self {
            system: None,
            human: human.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<PromptTemplate>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Render to an ordered message list (system first, if any).
    pub fn render(&self, vars: &Variables) -> Result<Vec<Message>> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(Message::system(system.render(vars)?));
        }
        messages.push(Message::user(self.human.render(vars)?));
        Ok(messages)
    }
}

impl From<PromptTemplate> for ChatTemplate {
    fn from(human: PromptTemplate) -> Self {
        Self {
            system: None,
            human,
        }
    }
}

impl From<&str> for ChatTemplate {
    fn from(human: &str) -> Self {
        Self::new(human)
    }
}

impl From<String> for ChatTemplate {
    fn from(human: String) -> Self {
        Self::new(human)
    }
}
