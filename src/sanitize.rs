//! Markup stripping for user supplied text. No tag or attribute survives.

/// Elements whose contents are dropped together with the tags.
const DISCARDED_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "option"];

/// Removes every tag and comment from `input` and trims the result.
///
/// A `<` that cannot open a tag (`1 < 2`, `<3`) is kept as text; one that
/// looks like the start of an unterminated tag is dropped. Passes repeat
/// until nothing changes, so fragments left around a removed tag cannot
/// join into a new one. Text between the tags is kept verbatim.
pub fn strip_markup(input: &str) -> String {
    let mut current = strip_pass(input);
    loop {
        let next = strip_pass(&current);
        // A pass never grows its input, so equal length means unchanged.
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

fn strip_pass(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];

        if let Some(after) = candidate.strip_prefix("<!--") {
            rest = match after.find("-->") {
                Some(end) => &after[end + 3..],
                None => "",
            };
            continue;
        }

        let Some(tag) = parse_tag(candidate) else {
            if !opens_tag(&candidate[1..]) {
                out.push('<');
            }
            rest = &candidate[1..];
            continue;
        };

        rest = &candidate[tag.len..];
        if !tag.closing && !tag.self_closing && DISCARDED_ELEMENTS.contains(&tag.name.as_str()) {
            rest = skip_element_body(rest, &tag.name);
        }
    }
    out.push_str(rest);

    out.trim().to_owned()
}

fn opens_tag(after_lt: &str) -> bool {
    after_lt
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
}

struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
    len: usize,
}

/// Parses a tag at the start of `s`, which begins with `<`.
fn parse_tag(s: &str) -> Option<Tag> {
    let inner = &s[1..];
    let (closing, inner) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };

    let starts_tag = inner
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || (!closing && c == '!'));
    if !starts_tag {
        return None;
    }

    let end = find_tag_end(inner)?;
    let name: String = inner
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '!')
        .collect::<String>()
        .to_ascii_lowercase();

    Some(Tag {
        name,
        closing,
        self_closing: inner[..end].trim_end().ends_with('/'),
        len: s.len() - inner.len() + end + 1,
    })
}

// Quoted attribute values may contain `>`.
fn find_tag_end(inner: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in inner.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i),
            _ => {},
        }
    }
    None
}

fn skip_element_body<'a>(s: &'a str, name: &str) -> &'a str {
    let closing = format!("</{name}");
    let lower = s.to_ascii_lowercase();
    let Some(start) = lower.find(&closing) else {
        return "";
    };
    match s[start..].find('>') {
        Some(end) => &s[start + end + 1..],
        None => "",
    }
}
