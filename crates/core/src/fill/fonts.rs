use tracing::debug;

use crate::deck::Presentation;

/// Sets `family` on every run in text shapes and table cells. Size, weight,
/// slant, underline and color are left as they were. Returns the number of
/// runs visited.
pub fn normalize_fonts(presentation: &mut Presentation, family: &str) -> usize {
    let mut runs = 0;
    for slide in presentation.slides_mut() {
        for mut run in slide.runs_mut() {
            run.set_font_family(family);
            runs += 1;
        }
    }

    debug!(event_name = "fill.fonts.normalized", family, runs, "font family normalized");
    runs
}

#[cfg(test)]
mod tests {
    use super::normalize_fonts;
    use crate::deck::fixtures::{DeckSpec, RunSpec, ShapeSpec, SlideSpec};
    use crate::deck::{Presentation, RunStyle};

    fn deck() -> Presentation {
        let styled = RunStyle {
            font_family: Some("Arial".to_string()),
            size: Some(1800),
            bold: Some(true),
            italic: Some(true),
            underline: Some("sng".to_string()),
            color: Some("C00000".to_string()),
        };
        let spec = DeckSpec {
            slides: vec![SlideSpec {
                shapes: vec![
                    ShapeSpec::text(
                        "Body",
                        vec![RunSpec::styled("Акцент", styled), RunSpec::plain(" и обычный текст")],
                    ),
                    ShapeSpec::table("Grid", &[&["a", "b"], &["c", ""]]),
                ],
            }],
        };
        Presentation::from_bytes(&spec.to_bytes().expect("fixture")).expect("open")
    }

    fn styles(presentation: &mut Presentation) -> Vec<RunStyle> {
        presentation
            .slides_mut()
            .iter_mut()
            .flat_map(|slide| slide.runs_mut().iter().map(|run| run.style()).collect::<Vec<_>>())
            .collect()
    }

    #[test]
    fn every_run_gets_the_family_and_keeps_its_formatting() {
        let mut presentation = deck();
        let before = styles(&mut presentation);

        let visited = normalize_fonts(&mut presentation, "Montserrat");
        let after = styles(&mut presentation);

        assert_eq!(visited, before.len());
        for (old, new) in before.iter().zip(&after) {
            assert_eq!(new.font_family.as_deref(), Some("Montserrat"));
            assert_eq!(old.clone().with_font_family("Montserrat"), *new);
        }
        assert_eq!(after[0].color.as_deref(), Some("C00000"));
        assert_eq!(after[0].underline.as_deref(), Some("sng"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut presentation = deck();
        normalize_fonts(&mut presentation, "Montserrat");
        let once = presentation.slides().to_vec();

        normalize_fonts(&mut presentation, "Montserrat");

        assert_eq!(presentation.slides(), once.as_slice());
    }
}
