//! Filename encoding for characters the remote rejects
//!
//! The remote refuses control characters, the Windows-reserved set
//! `< > : " \ | ? *`, names of `.`/`..`, and leading or trailing spaces. Each is swapped for a visually similar placeholder
//! (fullwidth forms and Unicode control pictures). A placeholder that already
//! appears in a local name is escaped with `‛` so decoding is exact.

use serde::{Deserialize, Serialize};

const QUOTE: char = '‛';

/// Which substitutions to apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingPolicy {
    /// Control characters, `\`, the Windows-reserved set, edge spaces, dot names
    #[default]
    Default,
    /// Pass names through untouched
    None,
}

/// Converts names between their local (standard) and remote spelling
#[derive(Debug, Clone, Copy, Default)]
pub struct NameEncoder {
    policy: EncodingPolicy,
}

impl NameEncoder {
    pub fn new(policy: EncodingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.policy
    }

    /// Local name -> remote name
    pub fn encode(&self, name: &str) -> String {
        if self.policy == EncodingPolicy::None {
            return name.to_string();
        }
        match name {
            "." => return "．".to_string(),
            ".." => return "．．".to_string(),
            _ => {}
        }

        let chars: Vec<char> = name.chars().collect();
        let len = chars.len();
        let mut out = String::with_capacity(name.len());

        for (i, &c) in chars.iter().enumerate() {
            if let Some(replacement) = substitute(c, i, len) {
                out.push(replacement);
            } else if is_placeholder(c) {
                out.push(QUOTE);
                out.push(c);
            } else if c == QUOTE {
                out.push(QUOTE);
                // A quote directly ahead of anything the decoder treats as
                // special must itself be escaped.
                if let Some(&next) = chars.get(i + 1) {
                    if substitute(next, i + 1, len).is_some()
                        || is_placeholder(next)
                        || next == QUOTE
                    {
                        out.push(QUOTE);
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Remote name -> local name
    pub fn decode(&self, name: &str) -> String {
        if self.policy == EncodingPolicy::None {
            return name.to_string();
        }
        match name {
            "．" => return ".".to_string(),
            "．．" => return "..".to_string(),
            _ => {}
        }

        let mut out = String::with_capacity(name.len());
        let mut chars = name.chars().peekable();
        while let Some(c) = chars.next() {
            if c == QUOTE {
                match chars.peek() {
                    Some(&next) if is_placeholder(next) || next == QUOTE => {
                        out.push(next);
                        chars.next();
                    }
                    _ => out.push(c),
                }
            } else {
                out.push(restore(c).unwrap_or(c));
            }
        }
        out
    }

    /// Encode every segment of a slash-separated path, keeping the slashes
    pub fn encode_path(&self, path: &str) -> String {
        path.split('/')
            .map(|segment| {
                if segment.is_empty() {
                    String::new()
                } else {
                    self.encode(segment)
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Placeholder for `c` at position `i` of a `len`-character name
fn substitute(c: char, i: usize, len: usize) -> Option<char> {
    match c {
        '\u{0}'..='\u{1f}' => char::from_u32(0x2400 + c as u32),
        '\u{7f}' => Some('␡'),
        ' ' if i == 0 || i + 1 == len => Some('␠'),
        '\\' => Some('＼'),
        ':' => Some('：'),
        '?' => Some('？'),
        '"' => Some('＂'),
        '*' => Some('＊'),
        '<' => Some('＜'),
        '>' => Some('＞'),
        '|' => Some('｜'),
        _ => None,
    }
}

fn restore(c: char) -> Option<char> {
    match c {
        '\u{2400}'..='\u{241f}' => char::from_u32(c as u32 - 0x2400),
        '␠' => Some(' '),
        '␡' => Some('\u{7f}'),
        '＼' => Some('\\'),
        '：' => Some(':'),
        '？' => Some('?'),
        '＂' => Some('"'),
        '＊' => Some('*'),
        '＜' => Some('<'),
        '＞' => Some('>'),
        '｜' => Some('|'),
        _ => None,
    }
}

fn is_placeholder(c: char) -> bool {
    c == '．' || restore(c).is_some()
}
