//! Template resolution.
//!
//! Packfile fields use the `{{ .Environment.Name }}` / `{{ .Env.VAR }}`
//! action syntax. Only the subset needed to address the context is
//! supported: field chains, string literals, comments, whitespace trim
//! markers and the `index` function.
//!
//! Lookups of fields that do not exist yield an empty value instead of an
//! error, so `{{ .Env.UNSET }}` renders as `""`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use regex::Regex;

use crate::context::{EnvironmentContext, TemplateContext};
use crate::error::{TemplateError, TemplateResult};

/// Template resolver for packfile fields.
pub struct TemplateResolver {
    action_pattern: Regex,
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateResolver {
    /// Create a new template resolver.
    pub fn new() -> Self {
        Self {
            // A comment action, or the shortest run of quoted strings and
            // other characters that reaches a closing `}}`
            action_pattern: Regex::new(
                r#"(?s)\{\{(-?\s*/\*.*?\*/\s*-?|(?:"(?:[^"\\]|\\.)*"|`[^`]*`|[^"`])*?)\}\}"#,
            )
            .expect("action pattern is valid"),
        }
    }

    /// Resolve a template against a context.
    pub fn resolve(&self, template: &str, context: &TemplateContext) -> TemplateResult<String> {
        let nodes = self.parse(template)?;

        let mut output = String::with_capacity(template.len());
        for node in &nodes {
            match node {
                Node::Text(text) => output.push_str(text),
                Node::Action(command) => {
                    let value = command
                        .evaluate(context)
                        .map_err(|message| TemplateError::execute(template, message))?;
                    value.write_to(&mut output);
                }
            }
        }

        Ok(output)
    }

    fn parse(&self, template: &str) -> TemplateResult<Vec<Node>> {
        let mut nodes = Vec::new();
        let mut last = 0;
        let mut trim_next = false;

        for caps in self.action_pattern.captures_iter(template) {
            let whole = caps.get(0).expect("capture 0 always matches");
            let inner = &caps[1];

            let (inner, trim_left) = match inner.strip_prefix('-') {
                Some(rest) if rest.starts_with(char::is_whitespace) => (rest, true),
                _ => (inner, false),
            };
            let (inner, trim_right) = match inner.strip_suffix('-') {
                Some(rest) if rest.ends_with(char::is_whitespace) => (rest, true),
                _ => (inner, false),
            };

            let mut text = &template[last..whole.start()];
            if text.contains("{{") {
                return Err(TemplateError::parse(template, "unclosed action"));
            }
            if trim_next {
                text = text.trim_start();
            }
            if trim_left {
                text = text.trim_end();
            }
            if !text.is_empty() {
                nodes.push(Node::Text(text.to_string()));
            }

            let body = inner.trim();
            if let Some(comment) = body.strip_prefix("/*") {
                if !comment.ends_with("*/") {
                    return Err(TemplateError::parse(template, "unclosed comment"));
                }
            } else {
                let command =
                    Command::parse(body).map_err(|message| TemplateError::parse(template, message))?;
                nodes.push(Node::Action(command));
            }

            trim_next = trim_right;
            last = whole.end();
        }

        let mut tail = &template[last..];
        if tail.contains("{{") {
            return Err(TemplateError::parse(template, "unclosed action"));
        }
        if trim_next {
            tail = tail.trim_start();
        }
        if !tail.is_empty() {
            nodes.push(Node::Text(tail.to_string()));
        }

        Ok(nodes)
    }
}

#[derive(Debug)]
enum Node {
    Text(String),
    Action(Command),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// `.`, `.Env`, `.Env.HOME`
    Field(Vec<String>),
    Str(String),
    Ident(String),
}

#[derive(Debug)]
enum Command {
    Operand(Token),
    Index(Token, Vec<Token>),
}

impl Command {
    fn parse(body: &str) -> Result<Self, String> {
        let mut tokens = tokenize(body)?.into_iter();

        let first = tokens
            .next()
            .ok_or_else(|| "missing value for command".to_string())?;

        match first {
            Token::Ident(name) if name == "index" => {
                let target = tokens
                    .next()
                    .ok_or_else(|| "wrong number of args for index: want at least 1 got 0".to_string())?;
                if let Token::Ident(name) = &target {
                    return Err(format!("function {:?} not defined", name));
                }
                let keys: Vec<Token> = tokens.collect();
                if let Some(Token::Ident(name)) = keys.iter().find(|t| matches!(t, Token::Ident(_))) {
                    return Err(format!("function {:?} not defined", name));
                }
                Ok(Command::Index(target, keys))
            }
            Token::Ident(name) => Err(format!("function {:?} not defined", name)),
            operand => match tokens.next() {
                Some(_) => Err(format!("can't give argument to non-function {}", body.trim())),
                None => Ok(Command::Operand(operand)),
            },
        }
    }

    fn evaluate<'a>(&'a self, context: &'a TemplateContext) -> Result<Value<'a>, String> {
        match self {
            Command::Operand(token) => evaluate_operand(token, context),
            Command::Index(target, keys) => {
                let mut value = evaluate_operand(target, context)?;
                for key in keys {
                    let key = match evaluate_operand(key, context)? {
                        Value::Str(key) => key,
                        Value::Missing => "",
                        other => {
                            return Err(format!("cannot index with key of type {}", other.type_name()))
                        }
                    };
                    value = value.index(key)?;
                }
                Ok(value)
            }
        }
    }
}

fn evaluate_operand<'a>(token: &'a Token, context: &'a TemplateContext) -> Result<Value<'a>, String> {
    match token {
        Token::Str(s) => Ok(Value::Str(s.as_str())),
        Token::Field(path) => {
            let mut value = Value::Root(context);
            for field in path {
                value = value.field(field)?;
            }
            Ok(value)
        }
        Token::Ident(name) => Err(format!("function {:?} not defined", name)),
    }
}

/// A value produced while executing an action.
#[derive(Debug, Clone, Copy)]
enum Value<'a> {
    Root(&'a TemplateContext),
    Environment(&'a EnvironmentContext),
    Map(&'a BTreeMap<String, String>),
    Str(&'a str),
    Missing,
}

impl<'a> Value<'a> {
    fn field(self, name: &str) -> Result<Value<'a>, String> {
        match self {
            Value::Root(context) => Ok(match name {
                "Environment" => Value::Environment(&context.environment),
                "Env" => Value::Map(&context.env),
                _ => Value::Missing,
            }),
            Value::Environment(environment) => Ok(match name {
                "Name" => Value::Str(&environment.name),
                _ => Value::Missing,
            }),
            Value::Map(map) => Ok(map
                .get(name)
                .map(|v| Value::Str(v.as_str()))
                .unwrap_or(Value::Missing)),
            Value::Str(_) => Err(format!("can't evaluate field {} in type string", name)),
            Value::Missing => Ok(Value::Missing),
        }
    }

    fn index(self, key: &str) -> Result<Value<'a>, String> {
        match self {
            Value::Map(map) => Ok(map
                .get(key)
                .map(|v| Value::Str(v.as_str()))
                .unwrap_or(Value::Missing)),
            Value::Missing => Ok(Value::Missing),
            other => Err(format!("can't index item of type {}", other.type_name())),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Root(_) | Value::Environment(_) => "struct",
            Value::Map(_) => "map[string]string",
            Value::Str(_) => "string",
            Value::Missing => "nil",
        }
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Value::Str(s) => out.push_str(s),
            Value::Missing => {}
            Value::Map(map) => write_map(map, out),
            Value::Environment(environment) => {
                let _ = write!(out, "{{{}}}", environment.name);
            }
            Value::Root(context) => {
                let _ = write!(out, "{{{{{}}} ", context.environment.name);
                write_map(&context.env, out);
                out.push('}');
            }
        }
    }
}

fn write_map(map: &BTreeMap<String, String>, out: &mut String) {
    out.push_str("map[");
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{}:{}", k, v);
    }
    out.push(']');
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(body: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        match c {
            '.' => {
                let mut path = Vec::new();
                while chars.peek() == Some(&'.') {
                    chars.next();
                    let mut ident = String::new();
                    while let Some(&c) = chars.peek().filter(|c| is_ident_char(**c)) {
                        ident.push(c);
                        chars.next();
                    }
                    if ident.is_empty() {
                        // A bare `.` is only valid on its own
                        if !path.is_empty() || chars.peek().is_some_and(|c| !c.is_whitespace()) {
                            return Err(format!("bad field reference in {:?}", body));
                        }
                        break;
                    }
                    if !ident.starts_with(is_ident_start) {
                        return Err(format!("bad field name {:?}", ident));
                    }
                    path.push(ident);
                }
                tokens.push(Token::Field(path));
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err("unterminated quoted string".to_string()),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some('\\') => value.push('\\'),
                            Some('"') => value.push('"'),
                            Some(other) => {
                                return Err(format!("invalid escape sequence \\{}", other))
                            }
                            None => return Err("unterminated quoted string".to_string()),
                        },
                        Some(c) => value.push(c),
                    }
                }
                tokens.push(Token::Str(value));
            }
            '`' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        None => return Err("unterminated raw quoted string".to_string()),
                        Some('`') => break,
                        Some(c) => value.push(c),
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if is_ident_start(c) => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek().filter(|c| is_ident_char(**c)) {
                    ident.push(c);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected {:?} in command", other)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TemplateContext {
        TemplateContext::new("staging")
            .with_env("NOMAD_TOKEN", "secret")
            .with_env("DC", "dc1")
    }

    fn resolve(template: &str) -> TemplateResult<String> {
        TemplateResolver::new().resolve(template, &context())
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        assert_eq!(resolve("http://nomad:4646").unwrap(), "http://nomad:4646");
        assert_eq!(resolve("").unwrap(), "");
    }

    #[test]
    fn test_environment_name() {
        assert_eq!(
            resolve("vars/{{ .Environment.Name }}.hcl").unwrap(),
            "vars/staging.hcl"
        );
        assert_eq!(resolve("{{.Environment.Name}}").unwrap(), "staging");
    }

    #[test]
    fn test_env_lookup() {
        assert_eq!(resolve("{{ .Env.NOMAD_TOKEN }}").unwrap(), "secret");
        assert_eq!(resolve(r#"{{ index .Env "DC" }}"#).unwrap(), "dc1");
    }

    #[test]
    fn test_missing_fields_render_empty() {
        assert_eq!(resolve("{{.Undefined}}").unwrap(), "");
        assert_eq!(resolve("a{{ .Env.NOT_SET }}b").unwrap(), "ab");
        assert_eq!(resolve("{{ .Environment.Region }}").unwrap(), "");
        assert_eq!(resolve("{{ .Undefined.Deeper }}").unwrap(), "");
        assert_eq!(resolve(r#"{{ index .Env "NOT_SET" }}"#).unwrap(), "");
    }

    #[test]
    fn test_string_literals_and_comments() {
        assert_eq!(resolve(r#"{{ "lit\"eral" }}"#).unwrap(), "lit\"eral");
        assert_eq!(resolve("{{ `raw` }}").unwrap(), "raw");
        assert_eq!(resolve("a{{/* note */}}b").unwrap(), "ab");
    }

    #[test]
    fn test_closing_delimiters_inside_literals_and_comments() {
        assert_eq!(resolve(r#"{{ "a}}b" }}"#).unwrap(), "a}}b");
        assert_eq!(resolve(r#"{{ "q\"}}" }}"#).unwrap(), "q\"}}");
        assert_eq!(resolve("{{ `}}` }}").unwrap(), "}}");
        assert_eq!(resolve("a{{/* x }} y */}}b").unwrap(), "ab");
        assert_eq!(resolve("a {{- /* x }} */ -}} b").unwrap(), "ab");
        assert_eq!(resolve("{{ .Env.DC }}}").unwrap(), "dc1}");
    }

    #[test]
    fn test_trim_markers() {
        assert_eq!(resolve("a  {{- .Env.DC -}}  b").unwrap(), "adc1b");
        assert_eq!(resolve("a {{ .Env.DC -}}\n  b").unwrap(), "a dc1b");
    }

    #[test]
    fn test_struct_values_render_like_go() {
        assert_eq!(resolve("{{ .Environment }}").unwrap(), "{staging}");
        assert_eq!(resolve("{{ .Env }}").unwrap(), "map[DC:dc1 NOMAD_TOKEN:secret]");
    }

    #[test]
    fn test_parse_errors() {
        for template in [
            "{{ .Env.DC",
            "{{ }}",
            "{{ printf \"x\" }}",
            "{{ \"unterminated }}",
            "{{ .Env.DC .Env.DC }}",
            "{{ $x }}",
            "{{/* open }}",
            "{{ \"x {{ .Env.DC }}",
        ] {
            match resolve(template) {
                Err(TemplateError::Parse { template: reported, .. }) => {
                    assert_eq!(reported, template)
                }
                other => panic!("expected parse error for {:?}, got {:?}", template, other),
            }
        }
    }

    #[test]
    fn test_execution_errors() {
        for template in ["{{ .Environment.Name.Foo }}", r#"{{ index .Environment "Name" }}"#] {
            match resolve(template) {
                Err(TemplateError::Execute { template: reported, .. }) => {
                    assert_eq!(reported, template)
                }
                other => panic!("expected execution error for {:?}, got {:?}", template, other),
            }
        }
    }
}
