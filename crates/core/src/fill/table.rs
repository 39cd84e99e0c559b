use serde::Serialize;
use tracing::debug;

use crate::deck::{Presentation, Table};
use crate::layout::{row_signature, RowRole, TemplateLayout};
use crate::money::format_money;
use crate::pricing::PriceBreakdown;

/// A classified row too short to hold one of the target columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MalformedRow {
    /// 0-based row index within the pricing table.
    pub row: usize,
    pub cells: usize,
    pub column: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableFill {
    /// A table exists at the layout's ordinal.
    pub found: bool,
    /// Rows matched by a row rule. Zero means the table at the ordinal is not
    /// a pricing table.
    pub rows_classified: usize,
    pub rows_written: usize,
    pub malformed: Vec<MalformedRow>,
}

impl TableFill {
    pub fn filled(&self) -> bool {
        self.found && self.rows_classified > 0
    }
}

/// Writes quantities and line totals into the pricing table, and the grand
/// total into its total row.
pub fn fill_pricing_table(
    presentation: &mut Presentation,
    layout: &TemplateLayout,
    breakdown: &PriceBreakdown,
    font_family: Option<&str>,
) -> TableFill {
    let Some(mut table) = nth_table(presentation, layout.pricing_table_ordinal) else {
        return TableFill::default();
    };

    let grand_total = format_money(breakdown.grand_total);
    let mut fill = TableFill { found: true, ..TableFill::default() };

    for (index, mut row) in table.rows_mut().into_iter().enumerate() {
        let Some(role) = layout.classify(&row_signature(&row.cell_texts())) else {
            continue;
        };
        fill.rows_classified += 1;

        let writes = match role {
            RowRole::Total => vec![(layout.price_column, grand_total.clone())],
            role => match breakdown.item(role) {
                Some(item) => vec![
                    (layout.quantity_column, format!("{} {}", item.quantity, layout.unit_label)),
                    (layout.price_column, format_money(item.line_total)),
                ],
                None => Vec::new(),
            },
        };

        let mut cells = row.cells_mut();
        let cell_count = cells.len();
        let mut wrote = false;
        for (column, text) in writes {
            match cells.get_mut(column) {
                Some(cell) => wrote |= cell.replace_text(&text, font_family),
                None => {
                    debug!(
                        event_name = "fill.table.row_malformed",
                        row = index,
                        cells = cell_count,
                        column,
                        "pricing row is too short for target column"
                    );
                    fill.malformed.push(MalformedRow { row: index, cells: cell_count, column });
                }
            }
        }
        if wrote {
            fill.rows_written += 1;
        }
    }

    if let Some(family) = font_family {
        for mut run in table.runs_mut() {
            run.set_font_family(family);
        }
    }

    debug!(
        event_name = "fill.table.completed",
        ordinal = layout.pricing_table_ordinal,
        rows_classified = fill.rows_classified,
        rows_written = fill.rows_written,
        "pricing table processed"
    );
    fill
}

/// The `ordinal`-th table (1-based) counting slides in presentation order and
/// top-level shapes in document order.
fn nth_table(presentation: &mut Presentation, ordinal: usize) -> Option<Table<'_>> {
    let mut remaining = ordinal.checked_sub(1)?;
    for slide in presentation.slides_mut() {
        let count = slide.table_count();
        if remaining < count {
            return slide.tables_mut().into_iter().nth(remaining);
        }
        remaining -= count;
    }
    None
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{fill_pricing_table, MalformedRow};
    use crate::deck::fixtures::{DeckSpec, ShapeSpec, SlideSpec};
    use crate::deck::Presentation;
    use crate::domain::request::ProposalRequest;
    use crate::layout::TemplateLayout;
    use crate::pricing::{PriceBreakdown, PriceModel};

    fn breakdown() -> PriceBreakdown {
        let request = ProposalRequest {
            hr_licenses: 2,
            employee_licenses: 50,
            ..ProposalRequest::new("ООО Ромашка")
        };
        PriceModel::default().breakdown(&request).expect("breakdown")
    }

    fn deck(tables: Vec<ShapeSpec>) -> Presentation {
        let spec = DeckSpec { slides: vec![SlideSpec { shapes: tables }] };
        Presentation::from_bytes(&spec.to_bytes().expect("fixture")).expect("open")
    }

    fn filler(name: &str) -> ShapeSpec {
        ShapeSpec::table(name, &[&["Возможность", "Описание"]])
    }

    fn pricing() -> ShapeSpec {
        ShapeSpec::table(
            "Pricing",
            &[
                &["Наименование", "", "Количество", "Цена", "Сумма"],
                &["Базовая лицензия", "", "0 шт", "15 000 ₽", "0 ₽"],
                &["Лицензия кадровика", "", "0 шт", "15 000 ₽", "0 ₽"],
                &["Лицензия сотрудника", "", "0 шт", "1 000 ₽", "0 ₽"],
                &["Размещение On-premise", "", "0 шт", "600 000 ₽", "0 ₽"],
                &["Итого", "", "", "", ""],
            ],
        )
    }

    fn rows(presentation: &mut Presentation, ordinal: usize) -> Vec<Vec<String>> {
        let mut tables: Vec<_> =
            presentation.slides_mut().iter_mut().flat_map(|slide| slide.tables_mut()).collect();
        tables[ordinal - 1].rows_mut().iter().map(|row| row.cell_texts()).collect()
    }

    #[test]
    fn third_table_receives_quantities_and_totals() {
        let mut presentation = deck(vec![filler("A"), filler("B"), pricing()]);

        let fill = fill_pricing_table(&mut presentation, &TemplateLayout::kedo(), &breakdown(), None);

        assert!(fill.filled());
        assert_eq!(fill.rows_written, 5);
        let rows = rows(&mut presentation, 3);
        assert_eq!(rows[1][2..], ["1 шт", "15 000 ₽", "15 000 ₽"]);
        assert_eq!(rows[2][2..], ["2 шт", "15 000 ₽", "30 000 ₽"]);
        assert_eq!(rows[3][2..], ["50 шт", "1 000 ₽", "50 000 ₽"]);
        assert_eq!(rows[4][2..], ["0 шт", "600 000 ₽", "0 ₽"]);
        assert_eq!(rows[5][4], "95 000 ₽");
    }

    #[test]
    fn pricing_table_in_fourth_position_is_not_filled() {
        let mut presentation = deck(vec![filler("A"), filler("B"), filler("C"), pricing()]);

        let fill = fill_pricing_table(&mut presentation, &TemplateLayout::kedo(), &breakdown(), None);

        assert!(fill.found);
        assert!(!fill.filled());
        assert_eq!(rows(&mut presentation, 4)[5][4], "");
    }

    #[test]
    fn fewer_tables_than_ordinal_means_not_found() {
        let mut presentation = deck(vec![filler("A"), pricing()]);

        let fill = fill_pricing_table(&mut presentation, &TemplateLayout::kedo(), &breakdown(), None);

        assert!(!fill.found);
        assert_eq!(fill.rows_written, 0);
    }

    #[test]
    fn short_rows_are_reported_and_skipped() {
        let short = ShapeSpec::table(
            "Pricing",
            &[&["Базовая лицензия", "", "0 шт"], &["Итого", "x", "y", "z", "0 ₽"]],
        );
        let mut presentation = deck(vec![filler("A"), filler("B"), short]);

        let fill = fill_pricing_table(&mut presentation, &TemplateLayout::kedo(), &breakdown(), None);

        assert_eq!(fill.malformed, vec![MalformedRow { row: 0, cells: 3, column: 4 }]);
        let rows = rows(&mut presentation, 3);
        assert_eq!(rows[0][2], "1 шт");
        assert_eq!(rows[1][4], "95 000 ₽");
        assert_eq!(fill.rows_written, 2);
    }

    #[test]
    fn font_family_reaches_every_table_run() {
        let mut presentation = deck(vec![filler("A"), filler("B"), pricing()]);
        let total = breakdown();
        assert_eq!(total.grand_total, Decimal::from(95_000));

        fill_pricing_table(&mut presentation, &TemplateLayout::kedo(), &total, Some("Montserrat"));

        let slide = &mut presentation.slides_mut()[0];
        let mut tables = slide.tables_mut();
        for run in tables[2].runs_mut() {
            assert_eq!(run.style().font_family.as_deref(), Some("Montserrat"));
        }
    }
}
