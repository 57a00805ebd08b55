// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Ignore pattern matching.
//!
//! Directory scans of the live root skip anything matched by an
//! [`IgnoreMatcher`]. Paths picked explicitly by the user are never filtered.
//!
//! # Pattern Language
//!
//! Patterns match whole slash-separated relative paths:
//!
//! - `*` matches any run of characters except `/`.
//! - `**` matches any run of characters, `/` included, possibly empty.
//! - `**/` at the start of a pattern, or right after a `/`, matches zero or
//!   more whole directories. Thus `**/node_modules` matches `node_modules`
//!   as well as `a/b/node_modules`.
//! - Every other character matches itself.
//!
//! A directory also matches when its path with a trailing slash matches. So
//! `node_modules/**` excludes the `node_modules` directory during a scan,
//! but not a regular file named `node_modules`.

use regex::Regex;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Patterns ignored when no override is configured.
pub const DEFAULT_IGNORE_GLOBS: [&str; 4] = [
    "node_modules",
    "node_modules/**",
    "**/node_modules",
    "**/node_modules/**",
];

/// Compiled set of ignore patterns.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    globs: Vec<Glob>,
}

impl IgnoreMatcher {
    /// Compile listing of ignore patterns.
    ///
    /// Patterns are sanitized through [`sanitize`] first.
    ///
    /// # Errors
    ///
    /// - Return [`MatcherError::EmptyPattern`] if a pattern has no content.
    /// - Return [`MatcherError::Regex`] if a translated pattern fails to
    ///   compile.
    pub fn compile(patterns: impl IntoIterator<Item = impl AsRef<str>>) -> Result<Self> {
        let globs = sanitize(patterns)
            .into_iter()
            .map(|pattern| pattern.parse())
            .collect::<Result<Vec<Glob>>>()?;

        Ok(Self { globs })
    }

    /// Check if relative path should be skipped.
    ///
    /// Blank paths and the root itself (`.`) never match.
    pub fn is_ignored(&self, rel: impl AsRef<str>, is_dir: bool) -> bool {
        let rel = rel.as_ref().trim().replace('\\', "/");
        if rel.is_empty() || rel == "." {
            return false;
        }

        let as_dir = format!("{rel}/");
        self.globs
            .iter()
            .any(|glob| glob.matches(&rel) || (is_dir && glob.matches(&as_dir)))
    }

    /// Sanitized source patterns in compiled order.
    pub fn patterns(&self) -> Vec<String> {
        self.globs.iter().map(ToString::to_string).collect()
    }
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        let globs = DEFAULT_IGNORE_GLOBS
            .iter()
            .filter_map(|pattern| Glob::compile(pattern).ok())
            .collect();

        Self { globs }
    }
}

/// Clean up listing of raw patterns.
///
/// Trims each pattern, converts backslashes to slashes, strips a leading `./`,
/// drops blanks, then sorts and removes duplicates.
pub fn sanitize(patterns: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    let mut sanitized = patterns
        .into_iter()
        .map(|pattern| {
            let pattern = pattern.as_ref().trim().replace('\\', "/");
            match pattern.strip_prefix("./") {
                Some(rest) => rest.to_string(),
                None => pattern,
            }
        })
        .filter(|pattern| !pattern.is_empty())
        .collect::<Vec<_>>();
    sanitized.sort();
    sanitized.dedup();

    sanitized
}

#[derive(Debug, Clone)]
struct Glob {
    source: String,
    regex: Regex,
}

impl Glob {
    fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&translate(pattern)).map_err(|source| MatcherError::Regex {
            source: Box::new(source),
            pattern: pattern.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl std::str::FromStr for Glob {
    type Err = MatcherError;

    fn from_str(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(MatcherError::EmptyPattern);
        }

        Self::compile(pattern)
    }
}

impl Display for Glob {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.source)
    }
}

// Anchored regex source for a glob pattern.
fn translate(pattern: &str) -> String {
    let chars = pattern.chars().collect::<Vec<_>>();
    let mut source = String::from("^");
    let mut literal = String::new();
    let mut idx = 0;

    while idx < chars.len() {
        if chars[idx] != '*' {
            literal.push(chars[idx]);
            idx += 1;
            continue;
        }

        source.push_str(&regex::escape(&literal));
        literal.clear();

        if chars.get(idx + 1) == Some(&'*') {
            let segment_start = idx == 0 || chars[idx - 1] == '/';
            if segment_start && chars.get(idx + 2) == Some(&'/') {
                source.push_str("(?:.*/)?");
                idx += 3;
            } else {
                source.push_str(".*");
                idx += 2;
            }
        } else {
            source.push_str("[^/]*");
            idx += 1;
        }
    }
    source.push_str(&regex::escape(&literal));
    source.push('$');

    source
}

/// Ignore pattern error types.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// Pattern has nothing to match with.
    #[error("invalid ignore glob: empty pattern")]
    EmptyPattern,

    /// Translated pattern was rejected by the regex engine.
    #[error("invalid ignore glob {pattern:?}")]
    Regex {
        #[source]
        source: Box<regex::Error>,
        pattern: String,
    },
}

/// Friendly result alias :3
type Result<T, E = MatcherError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn matcher(pattern: &str) -> IgnoreMatcher {
        IgnoreMatcher::compile([pattern]).unwrap()
    }

    #[test_case("node_modules/**", "node_modules/pkg/index.js", false, true; "double star tail")]
    #[test_case("node_modules/**", "node_modules", false, false; "double star tail skips bare file")]
    #[test_case("node_modules/**", "node_modules", true, true; "double star tail covers dir")]
    #[test_case("**/node_modules", "a/b/node_modules", true, true; "leading double star nested")]
    #[test_case("**/node_modules", "node_modules", true, true; "leading double star top level")]
    #[test_case("**/node_modules", "a/node_modules/x", false, false; "leading double star anchored")]
    #[test_case("*.log", "debug.log", false, true; "star in segment")]
    #[test_case("*.log", "app/debug.log", false, false; "star stops at separator")]
    #[test_case("app/*/cache", "app/x/cache", true, true; "star inner segment")]
    #[test_case("app/*/cache", "app/x/y/cache", true, false; "star spans one segment")]
    #[test_case("a/**/b", "a/b", false, true; "interior double star empty")]
    #[test_case("a/**/b", "a/x/y/b", false, true; "interior double star deep")]
    #[test_case("foo**", "foo/bar/baz", false, true; "trailing anything")]
    #[test_case("file.txt", "fileXtxt", false, false; "dot is literal")]
    #[test_case("what?.rc", "what?.rc", false, true; "question mark is literal")]
    #[test_case("what?.rc", "whatx.rc", false, false; "question mark is not wildcard")]
    #[test_case("[ab].conf", "[ab].conf", false, true; "brackets are literal")]
    #[test]
    fn glob_semantics(pattern: &str, path: &str, is_dir: bool, expect: bool) {
        pretty_assertions::assert_eq!(matcher(pattern).is_ignored(path, is_dir), expect);
    }

    #[test]
    fn blank_and_root_never_match() {
        let matcher = matcher("**");
        assert!(!matcher.is_ignored("", true));
        assert!(!matcher.is_ignored(".", true));
        assert!(matcher.is_ignored("x", false));
    }

    #[test]
    fn default_set_covers_node_modules() {
        let matcher = IgnoreMatcher::default();
        assert!(matcher.is_ignored("node_modules", true));
        assert!(matcher.is_ignored("nvim/node_modules", true));
        assert!(matcher.is_ignored("nvim/node_modules/pkg/index.js", false));
        assert!(!matcher.is_ignored("nvim/init.lua", false));
        assert_eq!(matcher.patterns(), DEFAULT_IGNORE_GLOBS.to_vec());
    }

    #[test]
    fn sanitize_cleans_and_dedups() {
        let result = sanitize([" ./cache/** ", "", "vendor\\**", "cache/**", "   "]);
        assert_eq!(result, vec!["cache/**".to_string(), "vendor/**".to_string()]);
    }

    #[test]
    fn compile_sanitizes_patterns() {
        let matcher = IgnoreMatcher::compile(["./target", "target"]).unwrap();
        assert_eq!(matcher.patterns(), vec!["target".to_string()]);
        assert!(matcher.is_ignored("target", true));
    }

    #[test]
    fn empty_glob_is_rejected() {
        assert!(matches!("  ".parse::<Glob>(), Err(MatcherError::EmptyPattern)));
    }

    #[test_case("a.b+c(d)|e{1}^$", "a.b+c(d)|e{1}^$", true; "metacharacters are literal")]
    #[test_case("a.b+c(d)|e{1}^$", "aXbbc(d)|e{1}^$", false; "escaped dot stays literal")]
    #[test_case("**/*.swp", ".vim.swp", true; "leading directories then star")]
    #[test_case("**/*.swp", "nvim/tmp/.init.lua.swp", true; "nested swap file")]
    #[test]
    fn translated_regex(pattern: &str, path: &str, expect: bool) {
        pretty_assertions::assert_eq!(matcher(pattern).is_ignored(path, false), expect);
    }

    #[test]
    fn repeated_double_star_stays_fast() {
        let matcher = matcher("**a**a**a**a**a**a**b");
        let path = "a".repeat(4096);
        let started = std::time::Instant::now();
        assert!(!matcher.is_ignored(&path, false));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn translate_anchors_and_escapes() {
        assert_eq!(translate("**/node_modules/**"), "^(?:.*/)?node_modules/.*$");
        assert_eq!(translate("*.log"), "^[^/]*\\.log$");
        assert_eq!(translate("what?.rc"), "^what\\?\\.rc$");
    }
}
