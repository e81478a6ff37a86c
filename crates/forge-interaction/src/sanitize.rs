//! HTML clean-up for card fields before they reach Anki.

use std::collections::{HashMap, HashSet};

/// Formatting tags a card may keep. Everything else is unwrapped to its
/// text, and `script`/`style` are removed together with their content.
pub const ALLOWED_TAGS: [&str; 16] = [
    "b", "i", "em", "strong", "code", "pre", "sup", "sub", "br", "hr", "p", "div", "span",
    "ul", "ol", "li",
];

/// Strips every attribute and every tag outside [`ALLOWED_TAGS`].
pub fn sanitize_card_html(input: &str) -> String {
    ammonia::Builder::default()
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(HashMap::new())
        .url_schemes(HashSet::new())
        .link_rel(None)
        .clean(input)
        .to_string()
}
