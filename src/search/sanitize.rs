//! Input normalization for the search action.

/// Smallest and largest accepted value for either result limit
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 50;

/// Remove `<...>` markup, keeping the text between tags. A `<` that is
/// never closed is kept as text.
fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Normalize raw search text: tags stripped, control characters dropped,
/// whitespace runs collapsed to one space, trimmed
pub fn normalize_text(input: &str) -> String {
    let stripped = strip_tags(input);
    let cleaned: String = stripped
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn an identifier into a slug: lowercase, whitespace to `-`,
/// everything outside `[a-z0-9_-]` dropped
pub fn sanitize_slug(input: &str) -> String {
    let stripped = strip_tags(input);
    let mut slug = String::with_capacity(stripped.len());
    for c in stripped.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            slug.push(c);
        } else if c.is_whitespace() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug
}

/// Leading-integer parse: "12abc" is 12, "abc" is 0
fn parse_leading_int(input: &str) -> i64 {
    let input = input.trim();
    let (sign, digits) = match input.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, input.strip_prefix('+').unwrap_or(input)),
    };
    let digits: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().map(|n| sign * n).unwrap_or(if digits.is_empty() {
        0
    } else {
        // Overflowing digit runs saturate
        sign * i64::MAX
    })
}

/// Resolve a limit field: absent gives `default`, present is clamped to [1, 50]
pub fn clamp_limit(raw: Option<&str>, default: u32) -> u32 {
    match raw {
        None => default,
        Some(raw) => parse_leading_int(raw).clamp(i64::from(MIN_LIMIT), i64::from(MAX_LIMIT)) as u32,
    }
}

/// Minimal HTML escaping for text interpolated into markup
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
