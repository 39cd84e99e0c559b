use regex::NoExpand;

use crate::deck::Presentation;
use crate::money::money_pattern;

/// Rewrites the amount in the first text shape containing `marker`.
///
/// Every run of that shape holding a money amount gets all of its amounts
/// replaced by `formatted_total`. Returns false when no shape carries the
/// marker, or the marked shape has no amount to replace.
pub fn update_price_summary(
    presentation: &mut Presentation,
    marker: &str,
    formatted_total: &str,
    font_family: Option<&str>,
) -> bool {
    if marker.is_empty() {
        return false;
    }

    for slide in presentation.slides_mut() {
        for mut shape in slide.text_shapes_mut() {
            if !shape.text().contains(marker) {
                continue;
            }

            let mut replaced = false;
            for mut run in shape.runs_mut() {
                let text = run.text();
                if money_pattern().is_match(&text) {
                    let updated = money_pattern().replace_all(&text, NoExpand(formatted_total));
                    run.replace_text(&updated, font_family);
                    replaced = true;
                }
            }
            return replaced;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::update_price_summary;
    use crate::deck::fixtures::{DeckSpec, RunSpec, ShapeSpec, SlideSpec};
    use crate::deck::{Presentation, RunStyle};

    const MARKER: &str = "Стоимость HRlink на 12 месяцев";

    fn open(slides: Vec<SlideSpec>) -> Presentation {
        Presentation::from_bytes(&DeckSpec { slides }.to_bytes().expect("fixture")).expect("open")
    }

    #[test]
    fn amount_run_is_rewritten_with_style_kept() {
        let emphasis = RunStyle { size: Some(2400), bold: Some(true), ..RunStyle::default() };
        let mut presentation = open(vec![
            SlideSpec { shapes: vec![ShapeSpec::plain_text("Intro", "Итого 1 ₽")] },
            SlideSpec {
                shapes: vec![
                    ShapeSpec::text(
                        "Summary",
                        vec![
                            RunSpec::plain(format!("{MARKER}: ")),
                            RunSpec::styled("0 ₽", emphasis.clone()),
                        ],
                    ),
                    ShapeSpec::text("Second", vec![RunSpec::plain(format!("{MARKER}: 5 ₽"))]),
                ],
            },
        ]);

        assert!(update_price_summary(&mut presentation, MARKER, "95 000 ₽", None));

        assert_eq!(presentation.slides()[0].text_shape_texts(), ["Итого 1 ₽"]);
        assert_eq!(
            presentation.slides()[1].text_shape_texts(),
            [format!("{MARKER}: 95 000 ₽"), format!("{MARKER}: 5 ₽")]
        );
        let slide = &mut presentation.slides_mut()[1];
        let mut shapes = slide.text_shapes_mut();
        assert_eq!(shapes[0].runs_mut()[1].style(), emphasis);
    }

    #[test]
    fn amount_sharing_a_run_with_the_marker_is_replaced() {
        let mut presentation = open(vec![SlideSpec {
            shapes: vec![ShapeSpec::plain_text("Summary", &format!("{MARKER}: 1 234 ₽ в год"))],
        }]);

        assert!(update_price_summary(&mut presentation, MARKER, "0 ₽", None));
        assert_eq!(presentation.slides()[0].text_shape_texts(), [format!("{MARKER}: 0 ₽ в год")]);
    }

    #[test]
    fn missing_marker_or_amount_is_not_matched() {
        let mut no_marker =
            open(vec![SlideSpec { shapes: vec![ShapeSpec::plain_text("Summary", "Итого: 0 ₽")] }]);
        assert!(!update_price_summary(&mut no_marker, MARKER, "95 000 ₽", None));

        let mut no_amount =
            open(vec![SlideSpec { shapes: vec![ShapeSpec::plain_text("Summary", MARKER)] }]);
        assert!(!update_price_summary(&mut no_amount, MARKER, "95 000 ₽", None));
    }
}
