//! Bounded text for agent-facing messages.
//!
//! Block messages quote the offending command or file list. Both are capped so a
//! heredoc or a long plan cannot flood the agent's context.

const CUT_MARKER: &str = " [...]";

/// Fold whitespace onto one line and cut at the last word that fits in `max_chars`.
/// A single word longer than the budget is cut mid-word.
pub fn single_line(input: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut width = 0;
    for word in input.split_whitespace() {
        let gap = usize::from(width > 0);
        let len = word.chars().count();
        if width + gap + len > max_chars {
            if width == 0 {
                out.extend(word.chars().take(max_chars));
            }
            out.push_str(CUT_MARKER);
            return out;
        }
        if gap > 0 {
            out.push(' ');
        }
        out.push_str(word);
        width += gap + len;
    }
    out
}

/// Backtick-quoted, comma-separated items; anything past `max_items` is counted.
pub fn quoted_list<S: AsRef<str>>(items: &[S], max_items: usize) -> String {
    let (shown, hidden) = items.split_at(items.len().min(max_items));
    let mut out = String::new();
    for (i, item) in shown.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('`');
        out.push_str(item.as_ref());
        out.push('`');
    }
    match (shown.is_empty(), hidden.len()) {
        (true, 0) => "(none)".to_string(),
        (_, 0) => out,
        (_, n) => format!("{out} (+{n} more)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_folds_heredocs() {
        assert_eq!(single_line("cat <<EOF\n  hello\nEOF", 100), "cat <<EOF hello EOF");
    }

    #[test]
    fn test_single_line_cuts_at_word_boundary() {
        assert_eq!(single_line("one two three", 8), "one two [...]");
        assert_eq!(single_line("abcdef", 3), "abc [...]");
        assert_eq!(single_line("abc", 3), "abc");
    }

    #[test]
    fn quoted_list_counts_hidden_items() {
        assert_eq!(quoted_list::<&str>(&[], 3), "(none)");
        assert_eq!(quoted_list(&["a", "b"], 3), "`a`, `b`");
        assert_eq!(quoted_list(&["a", "b", "c"], 2), "`a`, `b` (+1 more)");
    }
}
