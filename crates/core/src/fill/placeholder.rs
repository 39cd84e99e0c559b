use std::collections::BTreeMap;

use tracing::debug;

use crate::deck::{Presentation, RunMut};

/// Replaces `placeholder` with `company` on the first slide.
///
/// Only the first text shape whose text contains the placeholder is touched,
/// and within it only runs that hold the whole placeholder. Returns false when
/// no such shape exists, or when the placeholder is split across runs.
pub fn replace_company_name(
    presentation: &mut Presentation,
    placeholder: &str,
    company: &str,
    font_family: Option<&str>,
) -> bool {
    if placeholder.is_empty() {
        return false;
    }
    let Some(slide) = presentation.slides_mut().first_mut() else {
        return false;
    };

    for mut shape in slide.text_shapes_mut() {
        if !shape.text().contains(placeholder) {
            continue;
        }

        let mut replaced = 0;
        for mut run in shape.runs_mut() {
            let text = run.text();
            if text.contains(placeholder) {
                run.replace_text(&text.replace(placeholder, company), font_family);
                replaced += 1;
            }
        }
        debug!(
            event_name = "fill.company.replaced",
            shape = shape.name().unwrap_or_default(),
            runs = replaced,
            "company placeholder processed"
        );
        return replaced > 0;
    }
    false
}

/// Occurrences replaced per placeholder key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Replacements {
    by_key: BTreeMap<String, usize>,
}

impl Replacements {
    pub fn total(&self) -> usize {
        self.by_key.values().sum()
    }

    pub fn count(&self, key: &str) -> usize {
        self.by_key.get(key).copied().unwrap_or_default()
    }

    fn add(&mut self, key: &str, occurrences: usize) {
        *self.by_key.entry(key.to_string()).or_default() += occurrences;
    }

    fn merge(&mut self, other: Replacements) {
        for (key, occurrences) in other.by_key {
            self.add(&key, occurrences);
        }
    }
}

/// Substitutes `{{KEY}}` and then `{KEY}` in every paragraph of every slide.
///
/// Runs are substituted one at a time first, so a token inside a single run
/// keeps that run's style. A token that is still split across neighbouring
/// runs is then matched on their joined text: the result goes into the first
/// run of the stretch and the following runs are emptied, so the merged text
/// takes the first run's style. Line breaks and fields are never crossed.
pub fn replace_placeholders(
    presentation: &mut Presentation,
    values: &BTreeMap<String, String>,
    font_family: Option<&str>,
) -> Replacements {
    let mut replaced = Replacements::default();
    for slide in presentation.slides_mut() {
        for mut paragraph in slide.paragraphs_mut() {
            for mut runs in paragraph.run_spans_mut() {
                for run in &mut runs {
                    let (text, found) = substitute(&run.text(), values);
                    if found.total() > 0 {
                        run.replace_text(&text, font_family);
                        replaced.merge(found);
                    }
                }
                replaced.merge(merge_split_tokens(&mut runs, values, font_family));
            }
        }
    }
    replaced
}

fn merge_split_tokens(
    runs: &mut [RunMut<'_>],
    values: &BTreeMap<String, String>,
    font_family: Option<&str>,
) -> Replacements {
    let Some((first, rest)) = runs.split_first_mut() else {
        return Replacements::default();
    };
    if rest.is_empty() {
        return Replacements::default();
    }

    let joined: String = std::iter::once(&*first).chain(rest.iter()).map(RunMut::text).collect();
    let (text, found) = substitute(&joined, values);
    if found.total() == 0 {
        return found;
    }

    let merged = rest.len() + 1;
    first.replace_text(&text, font_family);
    for run in rest {
        run.replace_text("", None);
    }
    debug!(
        event_name = "fill.placeholder.merged_runs",
        runs = merged,
        "placeholder split across runs replaced"
    );
    found
}

pub fn substitute(text: &str, values: &BTreeMap<String, String>) -> (String, Replacements) {
    let mut output = text.to_string();
    let mut replaced = Replacements::default();

    for (open, close) in [("{{", "}}"), ("{", "}")] {
        for (key, value) in values {
            let token = format!("{open}{key}{close}");
            let occurrences = output.matches(token.as_str()).count();
            if occurrences > 0 {
                output = output.replace(token.as_str(), value);
                replaced.add(key, occurrences);
            }
        }
    }
    (output, replaced)
}
