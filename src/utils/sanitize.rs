/// Sanitize untrusted text before it becomes a stored attribute: strip
/// `<script>` blocks, then escape HTML special characters.
pub fn sanitize_input(input: &str) -> String {
    escape_html(&strip_script_blocks(input))
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn strip_script_blocks(input: &str) -> String {
    const OPEN: &str = "<script";
    const CLOSE: &str = "</script>";

    let mut out = String::with_capacity(input.len());
    let mut idx = 0;
    while let Some(open) = find_ascii_ci(input, OPEN, idx) {
        // An unterminated block is left as-is; escaping defuses it anyway.
        match find_ascii_ci(input, CLOSE, open) {
            Some(close) => {
                out.push_str(&input[idx..open]);
                idx = close + CLOSE.len();
            }
            None => break,
        }
    }
    out.push_str(&input[idx..]);
    out
}

/// Case-insensitive search for an ASCII needle; byte offsets are safe to
/// slice at because the needle starts and ends on ASCII.
fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if haystack.len() < from + needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| {
        haystack[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_ascii_lowercase() == b.to_ascii_lowercase())
    })
}
