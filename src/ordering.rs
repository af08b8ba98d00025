//! Builders for the `ordering` request parameter

use crate::request::term;

/// Ascending sort direction
pub const ASCENDING: bool = true;

/// Descending sort direction
pub const DESCENDING: bool = false;

/// Direction keyword
pub fn order(ascending: bool) -> &'static str {
    if ascending {
        "ascending"
    } else {
        "descending"
    }
}

/// Sort by relevance
pub fn relevance(ascending: bool) -> String {
    format!("<relevance>{}</relevance>", order(ascending))
}

/// Sort numerically by the value at `tag`
pub fn numeric(tag: &str, ascending: bool) -> String {
    format!("<numeric>{}</numeric>", term(order(ascending), tag))
}

/// Sort by the date at `tag`
pub fn date(tag: &str, ascending: bool) -> String {
    format!("<date>{}</date>", term(order(ascending), tag))
}

/// Sort by the string at `tag` using collation `lang` (e.g. `en`)
pub fn string(tag: &str, lang: &str, ascending: bool) -> String {
    format!(
        "<string>{}</string>",
        term(&format!("{},{lang}", order(ascending)), tag)
    )
}

/// Sort by geographic distance
///
/// `coords` pairs a tag path with the reference value, e.g.
/// `[("lat", "56.9"), ("lng", "24.1")]`.
pub fn lat_lon_distance(coords: &[(&str, &str)], ascending: bool) -> String {
    distance("latlong", coords, ascending)
}

/// Sort by euclidean distance in the plane
pub fn plane_distance(coords: &[(&str, &str)], ascending: bool) -> String {
    distance("plane", coords, ascending)
}

fn distance(kind: &str, coords: &[(&str, &str)], ascending: bool) -> String {
    let mut out = format!(r#"<distance type="{kind}" order="{}">"#, order(ascending));
    for (tag, value) in coords {
        out.push_str(&term(value, tag));
    }
    out.push_str("</distance>");
    out
}
