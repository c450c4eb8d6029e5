//! Diff rendering for fixture comparison.

/// Render a text diff between expected and actual output.
///
/// Hex outputs are one long line, so the first differing byte pair is
/// reported as well.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let e = expected_lines.get(i).copied().unwrap_or("");
        let a = actual_lines.get(i).copied().unwrap_or("");
        if e != a {
            out.push_str(&format!("@@ line {} @@\n", i + 1));
            out.push_str(&format!("-{e}\n"));
            out.push_str(&format!("+{a}\n"));
            if let Some(col) = first_difference(e, a) {
                out.push_str(&format!("   first difference at column {}\n", col + 1));
            }
        }
    }
    out
}

fn first_difference(a: &str, b: &str) -> Option<usize> {
    a.bytes()
        .zip(b.bytes())
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}
