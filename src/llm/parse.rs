use regex::Regex;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+-]*)[ \t]*\r?\n(.*?)```")
            .unwrap_or_else(|e| panic!("invalid fence regex: {e}"))
    })
}

/// Pull the code out of a model reply.
///
/// Prefers the first ```python block, then the first fenced block of any
/// language. A reply without fences is taken as code when it is not prose.
/// Returns an empty string when nothing usable is found.
pub fn extract_code(reply: &str) -> String {
    let blocks: Vec<(&str, &str)> = fence_regex()
        .captures_iter(reply)
        .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
        .collect();

    let chosen = blocks
        .iter()
        .find(|(lang, _)| lang.eq_ignore_ascii_case("python") || lang.eq_ignore_ascii_case("py"))
        .or_else(|| blocks.first())
        .map(|(_, body)| *body);

    if let Some(body) = chosen {
        return body.trim_matches('\n').trim_end().to_string();
    }

    let bare = strip_markdown_fences(reply);
    if looks_like_code(bare) {
        bare.to_string()
    } else {
        String::new()
    }
}

/// Strip a lone, possibly unterminated, fence pair around a reply.
fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let clean = match trimmed.strip_prefix("```") {
        Some(rest) => rest
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim_start(),
        None => trimmed,
    };
    clean.strip_suffix("```").unwrap_or(clean).trim()
}

fn looks_like_code(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("def ")
            || line.starts_with("class ")
            || line.starts_with("import ")
            || line.starts_with("from ")
            || line.starts_with("return ")
    })
}
