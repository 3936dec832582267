//! Slug helpers shared by the loader and routing code.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s_-]").unwrap());
static RE_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").unwrap());

/// Turn a work title into its URL slug ("Tsumi to Batsu no Spica" ->
/// "tsumi-to-batsu-no-spica").
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let stripped = RE_NON_SLUG.replace_all(&lowered, "");
    let dashed = RE_SEPARATORS.replace_all(&stripped, "-");
    dashed.trim_matches('-').to_string()
}
