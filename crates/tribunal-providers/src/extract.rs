/// Locate the JSON object embedded in a model completion.
///
/// Providers are asked for bare JSON but routinely wrap it in prose or a
/// markdown code fence. The search order is: fenced ```json block, any
/// fenced block, then the first balanced `{...}` group in the text. Returns
/// `None` when no balanced object exists; strict schema validation happens
/// downstream.
pub fn extract_json(text: &str) -> Option<&str> {
    let candidate = fenced_block(text).unwrap_or_else(|| text.trim());
    first_balanced_group(candidate)
}

fn fenced_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    for marker in ["```json", "```"] {
        if let Some(start) = trimmed.find(marker) {
            let body_start = start + marker.len();
            if let Some(end) = trimmed[body_start..].find("```") {
                return Some(trimmed[body_start..body_start + end].trim());
            }
        }
    }
    None
}

/// First balanced `{...}` group, tracking string literals and escapes so
/// braces inside JSON strings do not confuse the depth count.
fn first_balanced_group(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
