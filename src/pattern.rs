/*!
 * Wildcard matching and ignore-file parsing
 *
 * Patterns are deliberately simpler than full glob semantics: a bare name
 * matches as a path suffix, a single `*` only looks at the basename, and
 * `**` is translated into a regular expression over the whole path.
 */

use regex::Regex;

/// A pattern prepared for repeated matching
#[derive(Debug, Clone)]
pub enum Pattern {
    /// No wildcard: exact path or `/`-suffix match
    Literal(String),
    /// Single-star glob, full match against the basename
    Basename(Regex),
    /// Contains `**`, searched in the whole path
    Deep(Regex),
}

impl Pattern {
    /// Prepare a raw pattern string
    pub fn new(pattern: &str) -> Self {
        if !pattern.contains('*') {
            return Pattern::Literal(pattern.to_string());
        }

        if pattern.contains("**") {
            let (anchor, body) = match pattern.strip_prefix("**/") {
                Some(rest) => ("(^|/)", rest),
                None => ("", pattern),
            };
            let expr = format!("{}{}", anchor, translate_deep(body));
            return compile(&expr)
                .map_or_else(|| Pattern::Literal(pattern.to_string()), Pattern::Deep);
        }

        let expr = format!("^{}$", translate_simple(pattern));
        compile(&expr).map_or_else(
            || Pattern::Literal(pattern.to_string()),
            Pattern::Basename,
        )
    }

    /// Whether `filepath` matches this pattern
    pub fn matches(&self, filepath: &str) -> bool {
        match self {
            Pattern::Literal(p) => {
                filepath == p
                    || filepath
                        .strip_suffix(p.as_str())
                        .is_some_and(|head| head.ends_with('/'))
            }
            Pattern::Basename(re) => re.is_match(basename(filepath)),
            Pattern::Deep(re) => re.is_match(filepath),
        }
    }
}

/// Match a path against a wildcard pattern
///
/// - no `*`: exact match, or the path ends with `/` + pattern
/// - `**`: `**` spans separators, `*` does not; a leading `**/` anchors at
///   the start of the path or right after a `/`
/// - single `*`: full match against the final path segment
pub fn matches_wildcard(filepath: &str, pattern: &str) -> bool {
    Pattern::new(pattern).matches(filepath)
}

/// Parse `.gitignore` content into plain patterns
///
/// Blank lines and `#` comments are dropped; surrounding slashes are
/// stripped. Negation and anchoring are not interpreted.
pub fn parse_gitignore(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut pattern = line;
            loop {
                let next = pattern.trim_matches('/').trim();
                if next == pattern {
                    break;
                }
                pattern = next;
            }
            if pattern.is_empty() || pattern.starts_with('#') {
                None
            } else {
                Some(pattern.to_string())
            }
        })
        .collect()
}

/// Split user-entered patterns on commas and newlines
pub fn split_custom_patterns(input: &str) -> Vec<String> {
    input
        .split([',', '\n'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Final `/`-separated segment of a path
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn translate_deep(pattern: &str) -> String {
    pattern
        .split("**")
        .map(|part| {
            part.split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join("[^/]*")
        })
        .collect::<Vec<_>>()
        .join(".*")
}

fn translate_simple(pattern: &str) -> String {
    pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

fn compile(expr: &str) -> Option<Regex> {
    match Regex::new(expr) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Unusable wildcard expression '{}': {}", expr, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_wildcards() {
        assert!(matches_wildcard("src/app.test.js", "*.test.js"));
        assert!(matches_wildcard("src/deep/x.pyc", "*.pyc"));
        assert!(!matches_wildcard("src/pyc/readme.md", "*.pyc"));
        assert!(matches_wildcard("notes~", "*~"));
        assert!(matches_wildcard("logs/test-output.log", "test*"));
        // `.` is literal, not any character
        assert!(!matches_wildcard("fileXpyc", "*.pyc"));
    }

    #[test]
    fn test_literal_suffix_rule() {
        assert!(matches_wildcard("a/b/c.js", "b/c.js"));
        assert!(matches_wildcard("a/b/c.js", "c.js"));
        assert!(matches_wildcard("c.js", "c.js"));
        assert!(!matches_wildcard("a/bc.js", "c.js"));
        assert!(!matches_wildcard("a/b/c.js", "a/b"));
    }

    #[test]
    fn test_bare_name_is_suffix_only_not_inner_segment() {
        // inner-segment hits are the job of exclusion pattern lists
        assert!(!matches_wildcard("a/b/c.js", "b"));
        assert!(matches_wildcard("a/b", "b"));
    }

    #[test]
    fn test_literal_name_at_depth() {
        assert!(matches_wildcard("proj/a/b", "b"));
        assert!(!matches_wildcard("proj/a/bb", "b"));
    }

    #[test]
    fn test_double_star() {
        assert!(!matches_wildcard("a/b/c.js", "**/cache/*"));
        assert!(matches_wildcard("a/cache/c.js", "**/cache/*"));
        assert!(matches_wildcard("cache/c.js", "**/cache/*"));
        assert!(!matches_wildcard("a/mycache/c.js", "**/cache/*"));
        assert!(matches_wildcard("src/x/y/z.min.js", "src/**/*.min.js"));
        assert!(!matches_wildcard("src/x/y/z.js", "src/**/*.min.js"));
    }

    #[test]
    fn test_parse_gitignore() {
        let content = "# deps\nnode_modules/\n\n/dist\n  *.log  \r\n/build/\n#comment\n";
        assert_eq!(
            parse_gitignore(content),
            vec!["node_modules", "dist", "*.log", "build"]
        );
    }

    #[test]
    fn test_parse_gitignore_is_idempotent() {
        let content = "/a/\n//b//\n/\n/ #x\nc/d/\n!keep.txt\n";
        let first = parse_gitignore(content);
        let second = parse_gitignore(&first.join("\n"));
        assert_eq!(first, second);
        assert!(!first.iter().any(|p| p.is_empty()));
    }

    #[test]
    fn test_split_custom_patterns() {
        assert_eq!(
            split_custom_patterns("*.log, secrets\n\n fixtures ,"),
            vec!["*.log", "secrets", "fixtures"]
        );
        assert!(split_custom_patterns(" , \n").is_empty());
    }
}
