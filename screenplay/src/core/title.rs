//! Step title rendering.

use std::sync::LazyLock;

use regex::Regex;

static WORD_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-z0-9])([A-Z])|([A-Z])([A-Z][a-z])").expect("valid word boundary regex")
});

/// Placeholder replaced by the actor's name (or pronoun) in step titles.
pub const ACTOR_PLACEHOLDER: &str = "{0}";

/// Substitute every `{0}` in `template` with `actor`.
pub fn inject_actor(template: &str, actor: &str) -> String {
    template.replace(ACTOR_PLACEHOLDER, actor)
}

/// Turn a Rust type name into a sentence-case title.
///
/// `my_app::tasks::OpenTheApp` becomes `Open the app`; generic arguments are
/// dropped.
pub fn humanize_type_name(type_name: &str) -> String {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    let last = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    let spaced = WORD_BOUNDARY.replace_all(last, "$1$3 $2$4");
    let spaced = spaced.replace('_', " ");

    let mut words = spaced.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };
    let mut title = capitalize(first);
    for word in words {
        title.push(' ');
        if word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) {
            title.push_str(word);
        } else {
            title.push_str(&word.to_lowercase());
        }
    }
    title
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
