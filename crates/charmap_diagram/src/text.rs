// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shape analysis of node text.
//!
//! Everything here is a pure function of the text: how lines group into
//! statements, which statements produce an output, and how many `$` inputs
//! a line consumes.

/// Split node text into lines, tolerating `\r\n` endings
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Group lines into statements, returning the line count of each.
///
/// A newline ends a statement only at bracket depth zero; an unterminated
/// `(` or `[` absorbs every remaining line.
pub fn group_statements<S: AsRef<str>>(lines: &[S]) -> Vec<usize> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut n_lines = 0;

    for line in lines {
        n_lines += 1;
        for c in line.as_ref().chars() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        if depth == 0 {
            groups.push(n_lines);
            n_lines = 0;
        }
    }
    if n_lines > 0 {
        groups.push(n_lines);
    }
    groups
}

/// Whether a statement yields an output value.
///
/// Blank statements and assignments (`name = ...`) do not; anything else does.
pub fn statement_has_output(text: &str) -> bool {
    !(text.trim().is_empty() || assignment_target(text).is_some())
}

/// The assigned name if the text starts with `ident =`
pub fn assignment_target(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let end = identifier_len(trimmed)?;
    let rest = trimmed[end..].trim_start();
    (rest.starts_with('=')).then(|| &trimmed[..end])
}

/// An assignment with nothing yet after the `=`
pub fn is_incomplete_assignment(text: &str) -> bool {
    assignment_target(text).is_some()
        && text
            .split_once('=')
            .is_some_and(|(_, value)| value.trim().is_empty())
}

/// Number of `$` placeholders on a line.
///
/// This is a raw character count; a `$` inside a string literal is counted too.
pub fn count_inputs(line: &str) -> usize {
    line.chars().filter(|&c| c == '$').count()
}

/// Byte length of the identifier at the start of `text`
pub fn identifier_len(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if is_identifier_start(c) => {}
        _ => return None,
    }
    Some(
        chars
            .find(|&(_, c)| !is_identifier_continue(c))
            .map_or(text.len(), |(i, _)| i),
    )
}

/// Characters that may begin an identifier
pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Characters that may continue an identifier
pub fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_statement_per_line() {
        assert_eq!(group_statements(&["x = 1", "x", ""]), vec![1, 1, 1]);
    }

    #[test]
    fn test_brackets_join_lines() {
        let lines = split_lines("v = [1,\n2,\n(3\n)]\nv");
        assert_eq!(group_statements(&lines), vec![4, 1]);
    }

    #[test]
    fn test_unterminated_bracket_absorbs_rest() {
        let lines = split_lines("x=(5\nreturn x*x\n$");
        assert_eq!(group_statements(&lines), vec![3]);
    }

    #[test]
    fn test_stray_closer_does_not_underflow() {
        assert_eq!(group_statements(&["1)", "(2", ")"]), vec![1, 2]);
    }

    #[test]
    fn test_has_output() {
        assert!(!statement_has_output(""));
        assert!(!statement_has_output("   "));
        assert!(!statement_has_output("x = 5"));
        assert!(!statement_has_output("  long_name=$"));
        assert!(statement_has_output("x"));
        assert!(statement_has_output("$ + 1"));
        assert!(statement_has_output("return x"));
        assert!(statement_has_output("show(x)"));
        assert!(statement_has_output("2 = 3"));
    }

    #[test]
    fn test_assignment_target() {
        assert_eq!(assignment_target(" pos = $"), Some("pos"));
        assert_eq!(assignment_target("pos"), None);
        assert!(is_incomplete_assignment("pos = "));
        assert!(!is_incomplete_assignment("pos = 1"));
    }

    #[test]
    fn test_count_inputs() {
        assert_eq!(count_inputs("$ + $*2"), 2);
        assert_eq!(count_inputs("1"), 0);
        // Raw scan: strings are not special.
        assert_eq!(count_inputs("show(\"$\")"), 1);
    }

    #[test]
    fn test_crlf_lines() {
        assert_eq!(split_lines("a\r\nb"), vec!["a", "b"]);
    }
}
