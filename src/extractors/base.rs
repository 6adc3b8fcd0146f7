// Shared extraction helpers
//
// Regex compilation with field-tagged errors, "last captured group" selection,
// and group-reference templates (`\1`, `\g<name>`) compiled down to the
// `regex` crate's `${..}` replacement syntax.

use crate::error::ConfigError;
use regex::{Captures, Regex};

/// Compile a configured regex, tagging failures with the config field name
pub fn compile_regex(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
        field,
        pattern: pattern.to_string(),
        source,
    })
}

/// Compile an optional regex setting
pub fn compile_optional(
    field: &'static str,
    pattern: Option<&str>,
) -> Result<Option<Regex>, ConfigError> {
    pattern.map(|p| compile_regex(field, p)).transpose()
}

/// Text of the group that closed last in the match, if any group participated
///
/// Sequential groups resolve to the rightmost one; a nested group loses to
/// the group enclosing it, since the enclosing group closes after it. When
/// two groups end at the same offset, only the pattern's group structure
/// tells the two cases apart.
pub fn last_group<'h>(regex: &Regex, caps: &Captures<'h>) -> Option<&'h str> {
    let mut parents: Option<Vec<Option<usize>>> = None;
    let mut best: Option<(usize, regex::Match<'h>)> = None;
    for (index, group) in caps.iter().enumerate().skip(1) {
        let Some(group) = group else {
            continue;
        };
        let closes_later = match best {
            None => true,
            Some((_, current)) if group.end() != current.end() => group.end() > current.end(),
            Some((current, _)) => {
                let parents = parents.get_or_insert_with(|| group_parents(regex.as_str()));
                !is_nested(parents, index, current)
            }
        };
        if closes_later {
            best = Some((index, group));
        }
    }
    best.map(|(_, m)| m.as_str())
}

/// Enclosing capture group of every group, indexed by group number
///
/// Index 0 is the whole match and has no parent.
fn group_parents(pattern: &str) -> Vec<Option<usize>> {
    let bytes = pattern.as_bytes();
    let mut parents = vec![None];
    let mut open: Vec<Option<usize>> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => i = class_end(bytes, i),
            b'(' => {
                let rest = &bytes[i + 1..];
                let capturing = !rest.starts_with(b"?")
                    || rest.starts_with(b"?P<")
                    || (rest.starts_with(b"?<")
                        && !rest.starts_with(b"?<=")
                        && !rest.starts_with(b"?<!"));
                if capturing {
                    parents.push(open.iter().rev().find_map(|g| *g));
                    open.push(Some(parents.len() - 1));
                } else {
                    open.push(None);
                }
            }
            b')' => {
                open.pop();
            }
            _ => {}
        }
        i += 1;
    }
    parents
}

/// Offset of the `]` closing the class opened at `start`
fn class_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }
    let mut depth = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

fn is_nested(parents: &[Option<usize>], inner: usize, outer: usize) -> bool {
    let mut group = parents.get(inner).copied().flatten();
    while let Some(parent) = group {
        if parent == outer {
            return true;
        }
        group = parents.get(parent).copied().flatten();
    }
    false
}

fn is_octal(c: char) -> bool {
    ('0'..='7').contains(&c)
}

fn push_literal(replacement: &mut String, c: char) {
    if c == '$' {
        replacement.push_str("$$");
    } else {
        replacement.push(c);
    }
}

/// A replacement template written with backslash group references
///
/// `\0` and three-digit escapes such as `\101` are octal character escapes;
/// one or two digits otherwise name a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    replacement: String,
}

impl Template {
    /// Compile `template` for use with matches of `regex`
    ///
    /// Every group reference must name a group that exists in `regex`.
    pub fn compile(
        field: &'static str,
        template: &str,
        regex: &Regex,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTemplate {
            field,
            template: template.to_string(),
            reason,
        };

        let chars: Vec<char> = template.chars().collect();
        let mut replacement = String::with_capacity(template.len() + 8);
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            i += 1;
            if c != '\\' {
                push_literal(&mut replacement, c);
                continue;
            }

            let Some(&escaped) = chars.get(i) else {
                replacement.push('\\');
                break;
            };
            i += 1;
            match escaped {
                '0' => {
                    let mut octal = String::from("0");
                    while octal.len() < 3 && chars.get(i).copied().is_some_and(is_octal) {
                        octal.push(chars[i]);
                        i += 1;
                    }
                    let value = u32::from_str_radix(&octal, 8).unwrap_or(0);
                    push_literal(&mut replacement, char::from_u32(value).unwrap_or('\0'));
                }
                d if d.is_ascii_digit() => {
                    let mut index = d.to_string();
                    if let Some(&second) = chars.get(i).filter(|c| c.is_ascii_digit()) {
                        index.push(second);
                        i += 1;
                        let third = chars.get(i).copied().filter(|&c| is_octal(c));
                        if let (true, true, Some(third)) = (is_octal(d), is_octal(second), third) {
                            index.push(third);
                            i += 1;
                            let value = u32::from_str_radix(&index, 8)
                                .map_err(|_| invalid(format!("bad octal escape \\{}", index)))?;
                            if value > 0o377 {
                                return Err(invalid(format!(
                                    "octal escape value \\{} outside of range 0-0o377",
                                    index
                                )));
                            }
                            push_literal(&mut replacement, char::from_u32(value).unwrap_or('\0'));
                            continue;
                        }
                    }
                    let group: usize = index
                        .parse()
                        .map_err(|_| invalid(format!("bad group reference \\{}", index)))?;
                    if group >= regex.captures_len() {
                        return Err(invalid(format!("invalid group reference {}", group)));
                    }
                    replacement.push_str(&format!("${{{}}}", group));
                }
                'g' => {
                    if chars.get(i) != Some(&'<') {
                        return Err(invalid("missing < after \\g".to_string()));
                    }
                    i += 1;
                    let Some(len) = chars[i..].iter().position(|&ch| ch == '>') else {
                        return Err(invalid("missing > in \\g<...>".to_string()));
                    };
                    let name: String = chars[i..i + len].iter().collect();
                    i += len + 1;
                    let known = match name.parse::<usize>() {
                        Ok(group) => group < regex.captures_len(),
                        Err(_) => regex.capture_names().flatten().any(|n| n == name),
                    };
                    if !known {
                        return Err(invalid(format!("unknown group name {:?}", name)));
                    }
                    replacement.push_str(&format!("${{{}}}", name));
                }
                'n' => replacement.push('\n'),
                't' => replacement.push('\t'),
                'r' => replacement.push('\r'),
                '\\' => replacement.push('\\'),
                other if other.is_ascii_alphabetic() => {
                    return Err(invalid(format!("bad escape \\{}", other)));
                }
                other => {
                    replacement.push('\\');
                    push_literal(&mut replacement, other);
                }
            }
        }

        Ok(Self { replacement })
    }

    /// Expand against a match; groups that did not participate expand to ""
    pub fn expand(&self, caps: &Captures<'_>) -> String {
        let mut out = String::new();
        caps.expand(&self.replacement, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps<'h>(re: &Regex, text: &'h str) -> Captures<'h> {
        re.captures(text).unwrap()
    }

    #[test]
    fn test_last_group_sequential() {
        let re = Regex::new(r"(a)(b)").unwrap();
        assert_eq!(last_group(&re, &caps(&re, "ab")), Some("b"));
    }

    #[test]
    fn test_last_group_prefers_enclosing_group() {
        let re = Regex::new(r"((a)b)").unwrap();
        assert_eq!(last_group(&re, &caps(&re, "ab")), Some("ab"));

        let re = Regex::new(r"((a))").unwrap();
        assert_eq!(last_group(&re, &caps(&re, "a")), Some("a"));
    }

    #[test]
    fn test_last_group_trailing_empty_group() {
        let re = Regex::new(r"(a)(b?)").unwrap();
        assert_eq!(last_group(&re, &caps(&re, "a")), Some(""));
    }

    #[test]
    fn test_last_group_enclosing_group_beats_empty_nested_group() {
        let re = Regex::new(r"^(\s*//\s?(.*))$").unwrap();
        assert_eq!(last_group(&re, &caps(&re, "//")), Some("//"));
        assert_eq!(last_group(&re, &caps(&re, "// text")), Some("// text"));

        let re = Regex::new(r"(?:[(]x)?(a(?P<rest>b?))").unwrap();
        assert_eq!(last_group(&re, &caps(&re, "a")), Some("a"));
    }

    #[test]
    fn test_group_parents() {
        assert_eq!(group_parents(r"(a)(b)"), vec![None, None, None]);
        assert_eq!(group_parents(r"((a)(?:b(c)))"), vec![None, None, Some(1), Some(1)]);
        assert_eq!(group_parents(r"[(\]](x)\((y)"), vec![None, None, None]);
    }

    #[test]
    fn test_last_group_skips_non_participating() {
        let re = Regex::new(r"(x)|(y)").unwrap();
        assert_eq!(last_group(&re, &caps(&re, "x")), Some("x"));
    }

    #[test]
    fn test_last_group_none_without_groups() {
        let re = Regex::new(r"STOP").unwrap();
        assert_eq!(last_group(&re, &caps(&re, "STOP")), None);
    }

    #[test]
    fn test_template_numbered_groups() {
        let re = Regex::new(r"(.*)\.txt").unwrap();
        let template = Template::compile("destination", r"\1_output.md", &re).unwrap();
        assert_eq!(template.expand(&caps(&re, "example.txt")), "example_output.md");
    }

    #[test]
    fn test_template_named_groups_and_escapes() {
        let re = Regex::new(r"(?P<title>\w+)!").unwrap();
        let template = Template::compile("replace", r"# \g<title>\n$5 \\", &re).unwrap();
        assert_eq!(template.expand(&caps(&re, "Hello!")), "# Hello\n$5 \\");
    }

    #[test]
    fn test_template_octal_escapes() {
        let re = Regex::new(r"(a)").unwrap();
        let template = Template::compile("replace", r"[\0]\101\1", &re).unwrap();
        assert_eq!(template.expand(&caps(&re, "a")), "[\0]Aa");

        let re = Regex::new(r"(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)(k)").unwrap();
        let template = Template::compile("replace", r"\11-\9", &re).unwrap();
        assert_eq!(template.expand(&caps(&re, "abcdefghijk")), "k-i");

        assert!(Template::compile("replace", r"\477", &re).is_err());
    }

    #[test]
    fn test_template_rejects_unknown_groups() {
        let re = Regex::new(r"(a)").unwrap();
        assert!(matches!(
            Template::compile("replace", r"\2", &re),
            Err(ConfigError::InvalidTemplate { .. })
        ));
        assert!(Template::compile("replace", r"\g<missing>", &re).is_err());
        assert!(Template::compile("replace", r"\q", &re).is_err());
    }

    #[test]
    fn test_compile_regex_reports_field() {
        let err = compile_regex("terminate", "[unclosed").unwrap_err();
        match err {
            ConfigError::InvalidRegex { field, pattern, .. } => {
                assert_eq!(field, "terminate");
                assert_eq!(pattern, "[unclosed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
