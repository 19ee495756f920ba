//! Slug generation (§1, out-of-scope as a real SEO algorithm — "interfaces only"). This is a
//! minimal title/URL-derived fallback used only when the Scraper collaborator doesn't provide
//! one (§4.3 step 7); a production slug/SEO algorithm is explicitly not this crate's concern.

/// Derive a URL-safe slug from a title, falling back to the URL's path when the title is empty
/// after normalization.
pub fn generate(title: &str, url: &str) -> String {
    let from_title = normalize(title);
    if !from_title.is_empty() {
        return from_title;
    }
    normalize(url)
}

fn normalize(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_was_dash = true; // suppress leading dashes
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_from_title() {
        assert_eq!(generate("Hello, World!", "https://example.com/a"), "hello-world");
    }

    #[test]
    fn falls_back_to_url_when_title_is_empty() {
        assert_eq!(generate("   ", "https://example.com/a/b"), "https-example-com-a-b");
    }

    #[test]
    fn collapses_runs_of_punctuation() {
        assert_eq!(generate("a -- b __ c", "https://example.com"), "a-b-c");
    }
}
