//! SPDX front-matter removal.
//!
//! License files from the SPDX data set start with a YAML block fenced by
//! `---` lines. The block carries metadata, not license text, so it is cut
//! before hashing.

const FENCE: &str = "---\n";

/// Removes everything from the first `---\n` through the last `---\n`.
///
/// The span is greedy: if the body itself contains a later fence, it is
/// swallowed too. Text with fewer than two fences, or where the two fences
/// overlap, is returned unchanged.
///
/// ```rust
/// use canonical::strip_spdx_heading;
///
/// let text = "---\ntitle: MIT\n---\nPermission is hereby granted";
/// assert_eq!(strip_spdx_heading(text), "Permission is hereby granted");
/// assert_eq!(strip_spdx_heading("no heading"), "no heading");
/// ```
pub fn strip_spdx_heading(text: &str) -> String {
    let (Some(first), Some(last)) = (text.find(FENCE), text.rfind(FENCE)) else {
        return text.to_string();
    };
    // The fenced block needs at least one byte between the fences.
    if last <= first + FENCE.len() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() - (last + FENCE.len() - first));
    out.push_str(&text[..first]);
    out.push_str(&text[last + FENCE.len()..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_front_matter() {
        let text = "---\ntitle: Apache License 2.0\nspdx-id: Apache-2.0\n---\n\nApache License\n";
        assert_eq!(strip_spdx_heading(text), "\nApache License\n");
    }

    #[test]
    fn keeps_prefix_before_first_fence() {
        let text = "header\n---\nmeta\n---\nbody";
        assert_eq!(strip_spdx_heading(text), "header\nbody");
    }

    #[test]
    fn greedy_to_last_fence() {
        let text = "---\na\n---\nb\n---\nc";
        assert_eq!(strip_spdx_heading(text), "c");
    }

    #[test]
    fn single_fence_unchanged() {
        let text = "---\nonly one fence";
        assert_eq!(strip_spdx_heading(text), text);
    }

    #[test]
    fn adjacent_fences_unchanged() {
        let text = "---\n---\nbody";
        assert_eq!(strip_spdx_heading(text), text);
    }

    #[test]
    fn dashes_without_newline_ignored() {
        let text = "a --- b --- c";
        assert_eq!(strip_spdx_heading(text), text);
    }
}
