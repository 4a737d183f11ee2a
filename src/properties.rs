//! Java-style `.properties` files as a figment [`Provider`].
//!
//! Dotted keys nest, so `connection.pool.maxPoolSize=20` lands at
//! `connection -> pool -> maxPoolSize`. Every value is kept as a string; typed
//! conversion happens when the configuration is resolved.
//!
//! [`StringEnv`] layers environment variables the same way, without figment's
//! scalar inference, so `007` stays `007`.

use figment::value::{Dict, Map, Tag, Value};
use figment::providers::Env;
use figment::{Error, Metadata, Profile, Provider, Source};
use std::path::PathBuf;

enum PropertiesSource {
    File(PathBuf),
    Inline(String),
}

pub struct PropertiesFile {
    source: PropertiesSource,
}

impl PropertiesFile {
    /// A file on disk. A missing file contributes no values.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: PropertiesSource::File(path.into()),
        }
    }

    pub fn string(contents: impl Into<String>) -> Self {
        Self {
            source: PropertiesSource::Inline(contents.into()),
        }
    }
}

impl Provider for PropertiesFile {
    fn metadata(&self) -> Metadata {
        match &self.source {
            PropertiesSource::File(path) => {
                Metadata::named("properties file").source(Source::File(path.clone()))
            }
            PropertiesSource::Inline(_) => Metadata::named("inline properties"),
        }
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let contents = match &self.source {
            PropertiesSource::File(path) => match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
                Err(e) => {
                    return Err(Error::from(format!(
                        "failed to read {}: {e}",
                        path.display()
                    )));
                }
            },
            PropertiesSource::Inline(s) => s.clone(),
        };

        let mut root = Dict::new();
        for (key, value) in parse(&contents) {
            insert_nested(&mut root, &key, value)?;
        }
        Ok(Profile::Default.collect(root))
    }
}

/// Prefixed environment variables as raw strings; `__` nests.
pub struct StringEnv {
    prefix: String,
}

impl StringEnv {
    pub fn prefixed(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl Provider for StringEnv {
    fn metadata(&self) -> Metadata {
        Metadata::named(format!("`{}` environment variable(s)", self.prefix))
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut root = Dict::new();
        for (key, value) in Env::prefixed(&self.prefix).split("__").iter() {
            insert_nested(&mut root, &key.as_str().to_ascii_lowercase(), value)?;
        }
        Ok(Profile::Default.collect(root))
    }
}

/// Parse `.properties` text into ordered key/value pairs. Later duplicates
/// win when inserted.
pub fn parse(contents: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut pending = String::new();

    for raw in contents.lines() {
        let line = raw.trim_start();
        if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        if ends_with_continuation(line) {
            pending.push_str(&line[..line.len() - 1]);
            continue;
        }
        pending.push_str(line);

        let logical = std::mem::take(&mut pending);
        if let Some(pair) = split_pair(&logical) {
            pairs.push(pair);
        }
    }

    if !pending.is_empty()
        && let Some(pair) = split_pair(&pending)
    {
        pairs.push(pair);
    }

    pairs
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn split_pair(line: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    key.push(unescape(escaped));
                }
            }
            '=' | ':' => break,
            c if c.is_whitespace() => {
                // whitespace separator may be followed by an explicit `=` or `:`
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                if matches!(chars.peek(), Some('=') | Some(':')) {
                    chars.next();
                }
                break;
            }
            c => key.push(c),
        }
    }

    if key.is_empty() {
        return None;
    }

    let rest: String = chars.collect();
    let mut value = String::new();
    let mut chars = rest.trim_start().chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(unescape(escaped));
            }
        } else {
            value.push(c);
        }
    }

    Some((key, value))
}

fn unescape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{c}',
        other => other,
    }
}

fn insert_nested(root: &mut Dict, key: &str, value: String) -> Result<(), Error> {
    let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for segment in parents {
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
        current = match entry {
            Value::Dict(_, dict) => dict,
            _ => {
                return Err(Error::from(format!(
                    "property `{key}` conflicts with scalar property `{segment}`"
                )));
            }
        };
    }

    if matches!(current.get(*last), Some(Value::Dict(..))) {
        return Err(Error::from(format!(
            "property `{key}` conflicts with nested properties below it"
        )));
    }
    current.insert((*last).to_string(), Value::String(Tag::Default, value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;

    #[test]
    fn parses_comments_separators_and_continuations() {
        let text = "# comment\n! also comment\n\njdbc.driver=org.sqlite.JDBC\njdbc.user : scott\njdbc.password   tiger\nlong.value = first \\\n    second\nescaped\\=key=a\\tb\n";
        let pairs = parse(text);
        assert_eq!(
            pairs,
            vec![
                ("jdbc.driver".to_string(), "org.sqlite.JDBC".to_string()),
                ("jdbc.user".to_string(), "scott".to_string()),
                ("jdbc.password".to_string(), "tiger".to_string()),
                ("long.value".to_string(), "first second".to_string()),
                ("escaped=key".to_string(), "a\tb".to_string()),
            ]
        );
    }

    #[test]
    fn empty_value_is_kept() {
        assert_eq!(
            parse("jdbc.password="),
            vec![("jdbc.password".to_string(), String::new())]
        );
    }

    #[test]
    fn dotted_keys_nest_in_figment() {
        let figment = Figment::from(PropertiesFile::string(
            "connection.pool.maxPoolSize=20\njdbc.url=jdbc:sqlite:demo.db\n",
        ));
        let max: String = figment
            .extract_inner("connection.pool.maxPoolSize")
            .expect("max pool size present");
        assert_eq!(max, "20");
        let url: String = figment.extract_inner("jdbc.url").expect("url present");
        assert_eq!(url, "jdbc:sqlite:demo.db");
    }

    #[test]
    fn scalar_and_nested_conflict_is_an_error() {
        let figment = Figment::from(PropertiesFile::string("jdbc=x\njdbc.url=y\n"));
        assert!(figment.extract_inner::<String>("jdbc.url").is_err());
    }

    #[test]
    fn env_values_stay_verbatim() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("WARDEN_TEST_JDBC__PASSWORD", "007");
            jail.set_env("WARDEN_TEST_JDBC__USER", "1.50");
            jail.set_env("WARDEN_TEST_SERVER__INSECURECOOKIE", "true");

            let figment = Figment::from(StringEnv::prefixed("WARDEN_TEST_"));
            let password: String = figment.extract_inner("jdbc.password")?;
            let user: String = figment.extract_inner("jdbc.user")?;
            let insecure: String = figment.extract_inner("server.insecurecookie")?;
            assert_eq!(password, "007");
            assert_eq!(user, "1.50");
            assert_eq!(insecure, "true");
            Ok(())
        });
    }

    #[test]
    fn missing_file_contributes_nothing() {
        let provider = PropertiesFile::file("/definitely/not/here.properties");
        assert!(provider.data().expect("missing file is not an error").is_empty());
    }
}
