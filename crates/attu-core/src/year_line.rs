//! The heading posted into lore channels when a year begins.
//!
//! Each year gets a decorated markdown heading such as
//! `# <<< Year 5 PC >>>`. The decoration cycles through a fixed table so
//! consecutive years look different. Entries are stored markdown-escaped.

/// Separator table, indexed by `year mod len`.
const SEPARATORS: [&str; 19] = [
    "<", "=", "+", "\\>", "/", "&", ":", "$", "\\*", "%", "@", "\u{2042}", "xXx", "\\\\", "?",
    "^", "\\|", "\\~", "-",
];

/// Separators whose right-hand side is mirrored.
const MIRRORED: [(&str, &str); 4] = [("<", ">"), ("\\>", "<"), ("/", "\\\\"), ("\\\\", "/")];

/// Render the year-marker heading for `year`.
pub fn format_year_line(year: i64) -> String {
    let sep = separator_for(year);

    if sep.chars().count() > 2 {
        return format!("# {sep} Year {year} PC {sep}");
    }

    let right = MIRRORED
        .iter()
        .find(|(left, _)| *left == sep)
        .map_or(sep, |(_, mirrored)| *mirrored);

    format!("# {} Year {year} PC {}", sep.repeat(3), right.repeat(3))
}

fn separator_for(year: i64) -> &'static str {
    let len = i64::try_from(SEPARATORS.len()).unwrap_or(1);
    let index = year
        .checked_rem_euclid(len)
        .and_then(|i| usize::try_from(i).ok())
        .unwrap_or(0);
    SEPARATORS.get(index).copied().unwrap_or("-")
}
