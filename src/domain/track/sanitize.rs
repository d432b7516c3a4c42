//! Filesystem-safe path segments

/// Maximum length (in characters) of a sanitized segment
pub const MAX_SEGMENT_LEN: usize = 70;

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-')
}

fn is_filler(c: char) -> bool {
    c == '_' || c == ' '
}

/// Convert arbitrary metadata text into a filesystem-safe path segment.
///
/// Surrounding whitespace is dropped first. Every character outside letters,
/// digits, space, `.`, `_` and `-` then becomes `_`. Runs of two or more `_`/space collapse to a single `_`, the result is
/// cut to [`MAX_SEGMENT_LEN`] characters and stripped of leading/trailing
/// `_`/space. The function is pure and idempotent.
pub fn sanitize_segment(text: &str) -> String {
    let replaced: Vec<char> = text
        .trim()
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    let mut i = 0;
    while i < replaced.len() {
        let c = replaced[i];
        if is_filler(c) {
            let mut run = 1;
            while i + run < replaced.len() && is_filler(replaced[i + run]) {
                run += 1;
            }
            if run >= 2 {
                collapsed.push('_');
            } else {
                collapsed.push(c);
            }
            i += run;
        } else {
            collapsed.push(c);
            i += 1;
        }
    }

    let truncated: String = collapsed.chars().take(MAX_SEGMENT_LEN).collect();
    truncated.trim_matches(is_filler).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_text() {
        assert_eq!(sanitize_segment("Artist Name"), "Artist Name");
        assert_eq!(sanitize_segment("a.b_c-d"), "a.b_c-d");
    }

    #[test]
    fn replaces_unsafe_characters() {
        assert_eq!(sanitize_segment("AC/DC"), "AC_DC");
        assert_eq!(sanitize_segment("What?"), "What");
        assert_eq!(sanitize_segment("a:b*c"), "a_b_c");
    }

    #[test]
    fn collapses_filler_runs() {
        assert_eq!(sanitize_segment("a  b"), "a_b");
        assert_eq!(sanitize_segment("Song (Live)"), "Song_Live");
        assert_eq!(sanitize_segment("a / b"), "a_b");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(sanitize_segment("  padded  "), "padded");
        assert_eq!(sanitize_segment("__x__"), "x");
        assert_eq!(sanitize_segment("???"), "");
    }

    #[test]
    fn keeps_unicode_letters() {
        assert_eq!(sanitize_segment("Beyoncé"), "Beyoncé");
        assert_eq!(sanitize_segment("東京事変"), "東京事変");
    }

    #[test]
    fn truncates_to_max_len() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_segment(&long).chars().count(), MAX_SEGMENT_LEN);
    }

    #[test]
    fn truncation_does_not_leave_trailing_filler() {
        let text = format!("{} tail", "y".repeat(69));
        let out = sanitize_segment(&text);
        assert_eq!(out, "y".repeat(69));
    }

    #[test]
    fn leading_space_does_not_cost_length() {
        let out = sanitize_segment(&format!(" {}", "x".repeat(80)));
        assert_eq!(out, "x".repeat(MAX_SEGMENT_LEN));

        let out = sanitize_segment(&format!("\t  {}  ", "z".repeat(75)));
        assert_eq!(out.chars().count(), MAX_SEGMENT_LEN);
    }

    #[test]
    fn is_idempotent_and_restricted() {
        let inputs = [
            "Artist - Song (feat. Someone) [Remix]",
            "  lots   of    space  ",
            "/// slashes \\\\ and | pipes",
            "emoji 🎵 in title",
            "tab\tand\nnewline",
            &format!("{} x", "ab ".repeat(40)),
            "",
        ];
        for input in inputs {
            let once = sanitize_segment(input);
            let twice = sanitize_segment(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
            assert!(once.chars().count() <= MAX_SEGMENT_LEN);
            assert!(once.chars().all(is_allowed), "bad char in {once:?}");
        }
    }
}
