use regex::Regex;
use std::sync::LazyLock;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("bracket regex is valid"));

/// Derives the version-group key from a card name
///
/// Square-bracketed qualifiers are removed and whitespace is collapsed.
/// A name made only of qualifiers keys on its condensed self, so it never
/// collapses into the empty group.
///
/// # Examples
///
/// ```
/// use dokkan_archive::group_key;
///
/// assert_eq!(group_key("Son Goku [Super Saiyan]"), "Son Goku");
/// assert_eq!(group_key("  Vegeta   [Majin]  [EZA] "), "Vegeta");
/// ```
pub fn group_key(name: &str) -> String {
    let stripped = BRACKETED.replace_all(name, " ");
    let key = condense(&stripped);
    if key.is_empty() {
        condense(name)
    } else {
        key
    }
}

fn condense(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
