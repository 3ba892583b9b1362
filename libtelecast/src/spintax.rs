//! Spintax expansion
//!
//! `{Hello|Hi} {world|there}` expands to one of four sentences. Groups may
//! nest; the innermost group is resolved first. Braces without a partner are
//! kept as written.

use rand::Rng;

/// Expand every `{a|b|...}` group using the thread-local RNG
pub fn spin(template: &str) -> String {
    expand(template, &mut rand::thread_rng())
}

/// Expand every `{a|b|...}` group, picking alternatives with `rng`
pub fn expand<R: Rng + ?Sized>(template: &str, rng: &mut R) -> String {
    let mut text = template.to_string();

    while let Some((start, end)) = innermost_group(&text) {
        let inner = &text[start + 1..end];
        let options: Vec<&str> = inner.split('|').collect();
        let choice = options[rng.gen_range(0..options.len())].to_string();
        text.replace_range(start..=end, &choice);
    }

    text
}

/// Byte range of the first `{...}` that contains no other brace
fn innermost_group(text: &str) -> Option<(usize, usize)> {
    let mut open = None;
    for (i, c) in text.char_indices() {
        match c {
            '{' => open = Some(i),
            '}' => {
                if let Some(start) = open {
                    return Some((start, i));
                }
            }
            _ => {}
        }
    }
    None
}
