// ABOUTME: A single compiled ignore rule translated from glob syntax to a regex
// ABOUTME: Supports *, ?, [...] classes, whole-segment ** and backslash escapes

use regex::Regex;

use super::error::{PatternError, Result};

#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pub pattern: String,
    /// `!` prefix: a match re-includes the path
    pub negated: bool,
    /// Trailing `/`: only matches directories
    pub directory_only: bool,
    /// Matches from the workspace root instead of at any depth
    pub anchored: bool,
    regex: Regex,
}

impl IgnoreRule {
    pub fn compile(pattern: &str, index: usize) -> Result<Self> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut start = 0;
        let mut end = chars.len();

        let negated = chars.first() == Some(&'!');
        if negated {
            start += 1;
        }

        let directory_only = end > start && chars[end - 1] == '/';
        if directory_only {
            end -= 1;
        }

        let leading_slash = start < end && chars[start] == '/';
        if leading_slash {
            start += 1;
        }

        if start >= end {
            return Err(PatternError::Empty {
                pattern: pattern.to_string(),
                index,
            });
        }

        let body = &chars[start..end];
        let anchored = leading_slash || body.contains(&'/');

        let translator = Translator {
            pattern,
            index,
            body,
            offset: start,
        };
        let translated = translator.translate()?;

        let source = if anchored {
            format!("^{}$", translated)
        } else {
            format!("^(?:.*/)?{}$", translated)
        };
        let regex = Regex::new(&source).map_err(|source| PatternError::Regex {
            pattern: pattern.to_string(),
            index,
            source,
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            negated,
            directory_only,
            anchored,
            regex,
        })
    }

    /// `path` is relative to the workspace root, without leading or trailing slashes
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.directory_only && !is_dir {
            return false;
        }
        self.regex.is_match(path)
    }
}

struct Translator<'a> {
    pattern: &'a str,
    index: usize,
    body: &'a [char],
    offset: usize,
}

impl Translator<'_> {
    fn translate(&self) -> Result<String> {
        let body = self.body;
        let mut out = String::new();
        let mut i = 0;

        while i < body.len() {
            match body[i] {
                '\\' => {
                    let escaped = body.get(i + 1).ok_or_else(|| self.trailing_escape(i))?;
                    out.push_str(&literal(*escaped));
                    i += 2;
                    continue;
                }
                '*' if body.get(i + 1) == Some(&'*') => {
                    let segment_start = i == 0 || body[i - 1] == '/';
                    match body.get(i + 2) {
                        None if segment_start => {
                            out.push_str(".*");
                            i += 2;
                        }
                        Some('/') if segment_start => {
                            out.push_str("(?:.*/)?");
                            i += 3;
                        }
                        _ => {
                            return Err(PatternError::MisplacedGlobstar {
                                pattern: self.pattern.to_string(),
                                index: self.index,
                                position: self.offset + i,
                            })
                        }
                    }
                    continue;
                }
                '*' => out.push_str("[^/]*"),
                '?' => out.push_str("[^/]"),
                '[' => {
                    let (class, next) = self.class(i)?;
                    out.push_str(&class);
                    i = next;
                    continue;
                }
                c @ ('{' | '}') => return Err(self.unsupported(i, c)),
                c if c.is_control() => return Err(self.unsupported(i, c)),
                c => out.push_str(&literal(c)),
            }
            i += 1;
        }

        Ok(out)
    }

    /// Translate the class opening at `open`; returns the regex and the index after `]`
    fn class(&self, open: usize) -> Result<(String, usize)> {
        let body = self.body;
        let mut out = String::from("[");
        let mut j = open + 1;

        if matches!(body.get(j), Some('!') | Some('^')) {
            out.push_str("^/");
            j += 1;
        }
        let first = j;

        loop {
            match body.get(j) {
                None => {
                    return Err(PatternError::UnclosedClass {
                        pattern: self.pattern.to_string(),
                        index: self.index,
                        position: self.offset + open,
                    })
                }
                Some(']') if j > first => break,
                Some('\\') => {
                    let escaped = body.get(j + 1).ok_or_else(|| self.trailing_escape(j))?;
                    out.push_str(&literal(*escaped));
                    j += 2;
                    continue;
                }
                Some('-') if j > first && body.get(j + 1) != Some(&']') => out.push('-'),
                Some(c) if c.is_control() => return Err(self.unsupported(j, *c)),
                Some(c) => out.push_str(&literal(*c)),
            }
            j += 1;
        }

        out.push(']');
        Ok((out, j + 1))
    }

    fn trailing_escape(&self, at: usize) -> PatternError {
        PatternError::TrailingEscape {
            pattern: self.pattern.to_string(),
            index: self.index,
            position: self.offset + at,
        }
    }

    fn unsupported(&self, at: usize, character: char) -> PatternError {
        PatternError::UnsupportedCharacter {
            pattern: self.pattern.to_string(),
            index: self.index,
            position: self.offset + at,
            character,
        }
    }
}

fn literal(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}
