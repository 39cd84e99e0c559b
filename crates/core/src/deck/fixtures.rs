//! Declarative builder for small but well-formed PPTX packages.
//!
//! Used by tests and by `deckfill sample` to produce stand-in templates with
//! the same shape as the production proposal decks: a title with the company
//! placeholder, two descriptive tables, and the pricing table with its summary
//! line. The output opens in deckfill and LibreOffice; it carries no masters or
//! themes, so it is not a designed deck.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::deck::style::RunStyle;
use crate::deck::xml::{XmlDocument, XmlElement};
use crate::deck::DeckError;
use crate::domain::variant::TemplateVariant;
use crate::layout::TemplateLayout;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const TYPE_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const TYPE_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const TABLE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

const SLIDE_WIDTH: u64 = 12_192_000;
const SLIDE_HEIGHT: u64 = 6_858_000;
const COLUMN_WIDTH: u64 = 2_000_000;
const ROW_HEIGHT: u64 = 370_840;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeckSpec {
    pub slides: Vec<SlideSpec>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SlideSpec {
    pub shapes: Vec<ShapeSpec>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeSpec {
    Text { name: String, paragraphs: Vec<Vec<RunSpec>> },
    /// One run per cell; an empty cell text produces a cell with no runs.
    Table { name: String, rows: Vec<Vec<RunSpec>> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunSpec {
    pub text: String,
    pub style: RunStyle,
}

impl RunSpec {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: RunStyle::default() }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self { text: text.into(), style }
    }
}

impl ShapeSpec {
    pub fn plain_text(name: &str, text: &str) -> Self {
        Self::text(name, vec![RunSpec::plain(text)])
    }

    pub fn text(name: &str, runs: Vec<RunSpec>) -> Self {
        Self::Text { name: name.to_string(), paragraphs: vec![runs] }
    }

    pub fn table(name: &str, rows: &[&[&str]]) -> Self {
        Self::Table {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| RunSpec::plain(*cell)).collect())
                .collect(),
        }
    }
}

impl DeckSpec {
    pub fn to_bytes(&self) -> Result<Vec<u8>, DeckError> {
        let mut parts: Vec<(String, XmlDocument)> = vec![
            ("[Content_Types].xml".to_string(), self.content_types()),
            ("_rels/.rels".to_string(), package_relationships()),
            ("ppt/presentation.xml".to_string(), self.presentation()),
            ("ppt/_rels/presentation.xml.rels".to_string(), self.presentation_relationships()),
        ];
        for (index, slide) in self.slides.iter().enumerate() {
            parts.push((format!("ppt/slides/slide{}.xml", index + 1), slide.document()));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, document) in parts {
            let bytes = document
                .to_bytes()
                .map_err(|error| DeckError::Xml { part: name.clone(), message: error.0 })?;
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&bytes)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    pub fn write(&self, path: &Path) -> Result<(), DeckError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    fn content_types(&self) -> XmlDocument {
        let mut types = XmlElement::new("Types")
            .with_attr("xmlns", NS_TYPES)
            .with_child(
                XmlElement::new("Default")
                    .with_attr("Extension", "rels")
                    .with_attr("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
            )
            .with_child(
                XmlElement::new("Default")
                    .with_attr("Extension", "xml")
                    .with_attr("ContentType", "application/xml"),
            )
            .with_child(
                XmlElement::new("Override")
                    .with_attr("PartName", "/ppt/presentation.xml")
                    .with_attr("ContentType", TYPE_PRESENTATION),
            );
        for index in 1..=self.slides.len() {
            types = types.with_child(
                XmlElement::new("Override")
                    .with_attr("PartName", format!("/ppt/slides/slide{index}.xml"))
                    .with_attr("ContentType", TYPE_SLIDE),
            );
        }
        XmlDocument::from_root(types)
    }

    fn presentation(&self) -> XmlDocument {
        let mut list = XmlElement::new("p:sldIdLst");
        for index in 1..=self.slides.len() {
            list = list.with_child(
                XmlElement::new("p:sldId")
                    .with_attr("id", (255 + index).to_string())
                    .with_attr("r:id", format!("rId{index}")),
            );
        }
        let root = XmlElement::new("p:presentation")
            .with_attr("xmlns:a", NS_A)
            .with_attr("xmlns:r", NS_R)
            .with_attr("xmlns:p", NS_P)
            .with_child(list)
            .with_child(
                XmlElement::new("p:sldSz")
                    .with_attr("cx", SLIDE_WIDTH.to_string())
                    .with_attr("cy", SLIDE_HEIGHT.to_string()),
            )
            .with_child(
                XmlElement::new("p:notesSz")
                    .with_attr("cx", SLIDE_HEIGHT.to_string())
                    .with_attr("cy", SLIDE_WIDTH.to_string()),
            );
        XmlDocument::from_root(root)
    }

    fn presentation_relationships(&self) -> XmlDocument {
        let mut root = XmlElement::new("Relationships").with_attr("xmlns", NS_RELS);
        for index in 1..=self.slides.len() {
            root = root.with_child(
                XmlElement::new("Relationship")
                    .with_attr("Id", format!("rId{index}"))
                    .with_attr("Type", REL_SLIDE)
                    .with_attr("Target", format!("slides/slide{index}.xml")),
            );
        }
        XmlDocument::from_root(root)
    }
}

impl SlideSpec {
    fn document(&self) -> XmlDocument {
        let mut tree = XmlElement::new("p:spTree")
            .with_child(
                XmlElement::new("p:nvGrpSpPr")
                    .with_child(XmlElement::new("p:cNvPr").with_attr("id", "1").with_attr("name", ""))
                    .with_child(XmlElement::new("p:cNvGrpSpPr"))
                    .with_child(XmlElement::new("p:nvPr")),
            )
            .with_child(XmlElement::new("p:grpSpPr"));

        for (index, shape) in self.shapes.iter().enumerate() {
            tree = tree.with_child(shape.element(index + 2));
        }

        let root = XmlElement::new("p:sld")
            .with_attr("xmlns:a", NS_A)
            .with_attr("xmlns:r", NS_R)
            .with_attr("xmlns:p", NS_P)
            .with_child(XmlElement::new("p:cSld").with_child(tree));
        XmlDocument::from_root(root)
    }
}

impl ShapeSpec {
    fn element(&self, id: usize) -> XmlElement {
        match self {
            Self::Text { name, paragraphs } => {
                let mut body = text_body();
                for runs in paragraphs {
                    body = body.with_child(paragraph(runs));
                }
                XmlElement::new("p:sp")
                    .with_child(
                        XmlElement::new("p:nvSpPr")
                            .with_child(non_visual(id, name))
                            .with_child(XmlElement::new("p:cNvSpPr"))
                            .with_child(XmlElement::new("p:nvPr")),
                    )
                    .with_child(XmlElement::new("p:spPr"))
                    .with_child(body)
            }
            Self::Table { name, rows } => {
                let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
                let mut grid = XmlElement::new("a:tblGrid");
                for _ in 0..columns {
                    grid = grid.with_child(
                        XmlElement::new("a:gridCol").with_attr("w", COLUMN_WIDTH.to_string()),
                    );
                }
                let mut table = XmlElement::new("a:tbl")
                    .with_child(XmlElement::new("a:tblPr").with_attr("firstRow", "1"))
                    .with_child(grid);
                for row in rows {
                    let mut row_element =
                        XmlElement::new("a:tr").with_attr("h", ROW_HEIGHT.to_string());
                    for cell in row {
                        let runs: &[RunSpec] =
                            if cell.text.is_empty() { &[] } else { std::slice::from_ref(cell) };
                        row_element = row_element.with_child(
                            XmlElement::new("a:tc")
                                .with_child(text_body().with_child(paragraph(runs)))
                                .with_child(XmlElement::new("a:tcPr")),
                        );
                    }
                    table = table.with_child(row_element);
                }

                XmlElement::new("p:graphicFrame")
                    .with_child(
                        XmlElement::new("p:nvGraphicFramePr")
                            .with_child(non_visual(id, name))
                            .with_child(XmlElement::new("p:cNvGraphicFramePr"))
                            .with_child(XmlElement::new("p:nvPr")),
                    )
                    .with_child(
                        XmlElement::new("p:xfrm")
                            .with_child(XmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                            .with_child(
                                XmlElement::new("a:ext")
                                    .with_attr("cx", (COLUMN_WIDTH * columns as u64).to_string())
                                    .with_attr("cy", (ROW_HEIGHT * rows.len() as u64).to_string()),
                            ),
                    )
                    .with_child(
                        XmlElement::new("a:graphic").with_child(
                            XmlElement::new("a:graphicData")
                                .with_attr("uri", TABLE_URI)
                                .with_child(table),
                        ),
                    )
            }
        }
    }
}

fn package_relationships() -> XmlDocument {
    XmlDocument::from_root(
        XmlElement::new("Relationships").with_attr("xmlns", NS_RELS).with_child(
            XmlElement::new("Relationship")
                .with_attr("Id", "rId1")
                .with_attr("Type", REL_OFFICE_DOCUMENT)
                .with_attr("Target", "ppt/presentation.xml"),
        ),
    )
}

fn non_visual(id: usize, name: &str) -> XmlElement {
    XmlElement::new("p:cNvPr").with_attr("id", id.to_string()).with_attr("name", name)
}

fn text_body() -> XmlElement {
    XmlElement::new("p:txBody").with_child(XmlElement::new("a:bodyPr")).with_child(XmlElement::new("a:lstStyle"))
}

fn paragraph(runs: &[RunSpec]) -> XmlElement {
    let mut paragraph = XmlElement::new("a:p");
    for run in runs {
        let mut element = XmlElement::new("a:r").with_child(XmlElement::new("a:t").with_text(&run.text));
        run.style.apply(&mut element);
        paragraph = paragraph.with_child(element);
    }
    paragraph.with_child(XmlElement::new("a:endParaRPr").with_attr("lang", "ru-RU"))
}

/// A stand-in proposal template for `variant`, laid out the way `layout`
/// expects: the pricing table is the `pricing_table_ordinal`-th table.
pub fn proposal_template(variant: TemplateVariant, layout: &TemplateLayout) -> DeckSpec {
    let heading = RunStyle {
        size: Some(3200),
        bold: Some(true),
        color: Some("1F3864".to_string()),
        ..RunStyle::default()
    };
    let emphasis = RunStyle { size: Some(2400), bold: Some(true), ..RunStyle::default() };
    let cell = RunStyle { size: Some(1200), ..RunStyle::default() };

    let mut slides = vec![SlideSpec {
        shapes: vec![ShapeSpec::text(
            "Title",
            vec![
                RunSpec::styled("Коммерческое предложение для ", heading.clone()),
                RunSpec::styled(layout.company_placeholder.clone(), heading),
            ],
        )],
    }];

    if variant == TemplateVariant::Long {
        slides.push(SlideSpec {
            shapes: vec![ShapeSpec::plain_text(
                "About",
                "Кадровый электронный документооборот: подписание документов с сотрудниками онлайн",
            )],
        });
    }

    let filler_tables = layout.pricing_table_ordinal.saturating_sub(1);
    let mut feature_slide = SlideSpec::default();
    for index in 0..filler_tables {
        feature_slide.shapes.push(ShapeSpec::table(
            &format!("Features {}", index + 1),
            &[&["Возможность", "Описание"], &["Подписание", "УНЭП и ПЭП"]],
        ));
    }
    slides.push(feature_slide);

    let width = layout.quantity_column.max(layout.price_column) + 1;
    let pricing_row = |label: &str, unit_price: &str| -> Vec<RunSpec> {
        let mut row = vec![RunSpec::styled("", cell.clone()); width];
        row[0] = RunSpec::styled(label, cell.clone());
        if width > 3 {
            row[width - 2] = RunSpec::styled(unit_price, cell.clone());
        }
        row[layout.quantity_column] =
            RunSpec::styled(format!("0 {}", layout.unit_label), cell.clone());
        row[layout.price_column] = RunSpec::styled("0 ₽", cell.clone());
        row
    };
    let mut header = vec![RunSpec::styled("", cell.clone()); width];
    header[0] = RunSpec::styled("Наименование", cell.clone());
    header[layout.quantity_column] = RunSpec::styled("Количество", cell.clone());
    header[layout.price_column] = RunSpec::styled("Сумма", cell.clone());
    let mut total = vec![RunSpec::styled("", cell.clone()); width];
    total[0] = RunSpec::styled("Итого", emphasis.clone());
    total[layout.price_column] = RunSpec::styled("0 ₽", emphasis.clone());

    slides.push(SlideSpec {
        shapes: vec![
            ShapeSpec::text(
                "Summary",
                vec![
                    RunSpec::plain(format!("{}: ", layout.summary_marker)),
                    RunSpec::styled("0 ₽", emphasis),
                ],
            ),
            ShapeSpec::Table {
                name: "Pricing".to_string(),
                rows: vec![
                    header,
                    pricing_row("Базовая лицензия", "15 000 ₽"),
                    pricing_row("Лицензия кадровика", "15 000 ₽"),
                    pricing_row("Лицензия сотрудника", "1 000 ₽"),
                    pricing_row("Размещение On-premise", "600 000 ₽"),
                    total,
                ],
            },
        ],
    });

    DeckSpec { slides }
}

#[cfg(test)]
mod tests {
    use super::proposal_template;
    use crate::deck::Presentation;
    use crate::domain::variant::TemplateVariant;
    use crate::layout::TemplateLayout;

    #[test]
    fn proposal_template_puts_pricing_table_at_layout_ordinal() {
        for variant in [TemplateVariant::Short, TemplateVariant::Long] {
            let layout = TemplateLayout::for_variant(variant);
            let bytes = proposal_template(variant, &layout).to_bytes().expect("bytes");
            let presentation = Presentation::from_bytes(&bytes).expect("open");

            assert_eq!(presentation.table_count(), layout.pricing_table_ordinal);
            let title = presentation.slides()[0].text_shape_texts();
            assert!(title[0].contains(&layout.company_placeholder));
        }
    }
}
