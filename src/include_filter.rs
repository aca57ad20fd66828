//! Gitignore-like include/exclude lists used to pick which files of a game
//! project are packed into a template.

use regex::Regex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternType {
    Include,
    Exclude,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchOption {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternType,
    pub regex: Regex,
    /// The pattern line after trimming, without a leading `!`.
    pub original_pattern: String,
    pub regex_pattern: String,
}

impl Pattern {
    pub fn is_match(&self, item: &str) -> bool {
        self.regex.is_match(item)
    }
}

/// Parses a newline separated pattern list. Empty lines and lines starting
/// with `#` are skipped.
pub fn create_pattern_list(text: &str, option: MatchOption) -> Vec<Pattern> {
    create_pattern_list_from_lines(text.lines(), option)
}

pub fn create_pattern_list_from_lines<I, S>(lines: I, option: MatchOption) -> Vec<Pattern>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_pattern(line.as_ref(), option))
        .collect()
}

fn parse_pattern(line: &str, option: MatchOption) -> Option<Pattern> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (kind, body) = match line.strip_prefix('!') {
        Some(rest) => (PatternType::Exclude, rest),
        None => (PatternType::Include, line),
    };
    let mut original_pattern = match option {
        MatchOption::CaseInsensitive => body.to_lowercase(),
        MatchOption::CaseSensitive => body.to_string(),
    };
    original_pattern = original_pattern.replace('\\', "/");

    let regex_pattern = pattern_to_regex_string(&original_pattern);
    match Regex::new(&regex_pattern) {
        Ok(regex) => Some(Pattern {
            kind,
            regex,
            original_pattern,
            regex_pattern,
        }),
        Err(err) => {
            warn!(pattern = %original_pattern, error = %err, "dropping invalid pattern");
            None
        }
    }
}

/// Translates a glob into an unanchored regex that matches whole path
/// sections: `name` matches `name` and `dir/name/file` but not `name.dat`.
pub fn pattern_to_regex_string(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut regex = String::with_capacity(pattern.len() * 2 + 12);

    if !pattern.starts_with('/') {
        regex.push_str("(^|/)");
    }

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '[' => {
                let mut j = i;
                if chars.get(j) == Some(&'!') {
                    j += 1;
                }
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    regex.push_str("\\[");
                    continue;
                }

                let class: String = chars[i..j].iter().collect();
                i = j + 1;
                regex.push('[');
                if let Some(negated) = class.strip_prefix('!') {
                    regex.push('^');
                    regex.push_str(negated);
                } else if class.starts_with('^') {
                    regex.push('\\');
                    regex.push_str(&class);
                } else {
                    regex.push_str(&class);
                }
                regex.push(']');
            }
            c if c.is_alphanumeric() || c == '_' => regex.push(c),
            '/' => regex.push_str("\\/"),
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }

    if !pattern.ends_with('/') {
        regex.push_str("($|/)");
    }
    regex
}

/// Keeps the items that the last matching pattern includes. Items no
/// pattern matches are left out.
pub fn filter_item_list<'a, S: AsRef<str>>(items: &'a [S], patterns: &[Pattern], option: MatchOption) -> Vec<&'a str> {
    items
        .iter()
        .map(AsRef::as_ref)
        .filter(|item| is_included(item, patterns, option))
        .collect()
}

pub fn is_included(item: &str, patterns: &[Pattern], option: MatchOption) -> bool {
    let mut normalized = match option {
        MatchOption::CaseInsensitive => item.to_lowercase(),
        MatchOption::CaseSensitive => item.to_string(),
    };
    normalized = normalized.replace('\\', "/");

    let mut included = false;
    for pattern in patterns {
        if pattern.is_match(&normalized) {
            included = pattern.kind == PatternType::Include;
        }
    }
    debug!(item, included, "filtered");
    included
}
