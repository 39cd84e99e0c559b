use chrono::NaiveDateTime;

const FALLBACK_COMPONENT: &str = "company";
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// `<prefix>_<company>_<ddmmYYYY_HHMM>.pptx`.
///
/// Minute resolution: two fills for the same company within one minute share
/// a name and the later one replaces the earlier file.
pub fn output_file_name(prefix: &str, company: &str, at: NaiveDateTime) -> String {
    format!("{}_{}_{}.pptx", sanitize_component(prefix), sanitize_component(company), at.format("%d%m%Y_%H%M"))
}

/// Makes `value` safe as a single path component on every platform.
pub fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|ch| if RESERVED.contains(&ch) || ch.is_control() { '_' } else { ch })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();

    if cleaned.is_empty() {
        FALLBACK_COMPONENT.to_string()
    } else {
        cleaned
    }
}
