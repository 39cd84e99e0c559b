//! Typed views over a slide's shape tree.
//!
//! Only top-level shapes of `p:spTree` are visited, in document order. Group
//! shapes are treated as opaque, which matches how the templates are authored.

use crate::deck::style::RunStyle;
use crate::deck::xml::{XmlDocument, XmlElement, XmlNode};

/// Separator used between paragraphs when reading a text frame as one string.
const PARAGRAPH_SEPARATOR: &str = "\n";
/// Stand-in for `a:br` line breaks, as presentation tools expose them.
const LINE_BREAK: char = '\u{b}';

#[derive(Clone, Debug, PartialEq)]
pub struct Slide {
    part_name: String,
    document: XmlDocument,
}

impl Slide {
    pub fn new(part_name: impl Into<String>, document: XmlDocument) -> Self {
        Self { part_name: part_name.into(), document }
    }

    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    /// Shapes with a text frame (`p:sp` carrying `p:txBody`).
    pub fn text_shapes_mut(&mut self) -> Vec<TextShape<'_>> {
        self.shapes_mut()
            .into_iter()
            .filter(|shape| shape.is("sp") && shape.child("txBody").is_some())
            .map(|element| TextShape { element })
            .collect()
    }

    /// Tables held by graphic frames on this slide.
    pub fn tables_mut(&mut self) -> Vec<Table<'_>> {
        self.shapes_mut()
            .into_iter()
            .filter(|shape| shape.is("graphicFrame"))
            .filter_map(table_element_mut)
            .map(|element| Table { element })
            .collect()
    }

    /// Every run on the slide: text shapes first, then table cells, each in
    /// document order.
    pub fn runs_mut(&mut self) -> Vec<RunMut<'_>> {
        let mut runs = Vec::new();
        for shape in self.shapes_mut() {
            if shape.is("sp") {
                if let Some(body) = shape.child_mut("txBody") {
                    runs.extend(body.find_all_mut("r").into_iter().map(RunMut::new));
                }
            } else if shape.is("graphicFrame") {
                if let Some(table) = table_element_mut(shape) {
                    runs.extend(table.find_all_mut("r").into_iter().map(RunMut::new));
                }
            }
        }
        runs
    }

    /// Every `a:p` paragraph on the slide, in the same order as `runs_mut`.
    pub fn paragraphs_mut(&mut self) -> Vec<ParagraphMut<'_>> {
        let mut paragraphs = Vec::new();
        for shape in self.shapes_mut() {
            let container = if shape.is("sp") {
                shape.child_mut("txBody")
            } else if shape.is("graphicFrame") {
                table_element_mut(shape)
            } else {
                None
            };
            if let Some(container) = container {
                paragraphs
                    .extend(container.find_all_mut("p").into_iter().map(|element| ParagraphMut { element }));
            }
        }
        paragraphs
    }

    pub fn text_shape_texts(&self) -> Vec<String> {
        self.shapes()
            .into_iter()
            .filter(|shape| shape.is("sp"))
            .filter_map(|shape| shape.child("txBody"))
            .map(frame_text)
            .collect()
    }

    pub fn table_count(&self) -> usize {
        self.shapes()
            .into_iter()
            .filter(|shape| shape.is("graphicFrame"))
            .filter(|shape| table_element(shape).is_some())
            .count()
    }

    fn shapes(&self) -> Vec<&XmlElement> {
        self.document
            .root()
            .and_then(|root| root.child("cSld"))
            .and_then(|common| common.child("spTree"))
            .map(|tree| tree.elements().collect())
            .unwrap_or_default()
    }

    fn shapes_mut(&mut self) -> Vec<&mut XmlElement> {
        self.document
            .root_mut()
            .and_then(|root| root.child_mut("cSld"))
            .and_then(|common| common.child_mut("spTree"))
            .map(|tree| tree.elements_mut().collect())
            .unwrap_or_default()
    }
}

pub struct TextShape<'a> {
    element: &'a mut XmlElement,
}

impl TextShape<'_> {
    pub fn name(&self) -> Option<&str> {
        self.element.child("nvSpPr").and_then(|props| props.child("cNvPr")).and_then(|c| c.attr("name"))
    }

    /// Paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.element.child("txBody").map(frame_text).unwrap_or_default()
    }

    pub fn runs_mut(&mut self) -> Vec<RunMut<'_>> {
        match self.element.child_mut("txBody") {
            Some(body) => body.find_all_mut("r").into_iter().map(RunMut::new).collect(),
            None => Vec::new(),
        }
    }
}

pub struct Table<'a> {
    element: &'a mut XmlElement,
}

impl Table<'_> {
    pub fn rows_mut(&mut self) -> Vec<Row<'_>> {
        self.element.elements_mut().filter(|child| child.is("tr")).map(|element| Row { element }).collect()
    }

    pub fn row_count(&self) -> usize {
        self.element.elements().filter(|child| child.is("tr")).count()
    }

    pub fn runs_mut(&mut self) -> Vec<RunMut<'_>> {
        self.element.find_all_mut("r").into_iter().map(RunMut::new).collect()
    }
}

pub struct Row<'a> {
    element: &'a mut XmlElement,
}

impl Row<'_> {
    pub fn cell_texts(&self) -> Vec<String> {
        self.element.elements().filter(|child| child.is("tc")).map(cell_text).collect()
    }

    pub fn cells_mut(&mut self) -> Vec<Cell<'_>> {
        self.element.elements_mut().filter(|child| child.is("tc")).map(|element| Cell { element }).collect()
    }
}

pub struct Cell<'a> {
    element: &'a mut XmlElement,
}

impl Cell<'_> {
    pub fn text(&self) -> String {
        cell_text(self.element)
    }

    /// Puts `new_text` into the first run that contains the cell's current text
    /// or is non-blank, keeping that run's style. Other runs are left as they
    /// are. A cell without runs gets a fresh run styled like the paragraph end.
    ///
    /// Returns false when the cell has no text frame at all.
    pub fn replace_text(&mut self, new_text: &str, font_family: Option<&str>) -> bool {
        let current = self.text();
        let Some(body) = self.element.child_mut("txBody") else {
            return false;
        };

        let target = body.find_all_mut("r").into_iter().map(RunMut::new).find(|run| {
            let text = run.text();
            text.contains(&current) || !text.trim().is_empty()
        });
        if let Some(mut run) = target {
            run.replace_text(new_text, font_family);
            return true;
        }

        let Some(paragraph) = body.child_mut("p") else {
            return false;
        };
        let mut run = new_run_for(paragraph, new_text);
        if let Some(family) = font_family {
            RunStyle::capture(&run).with_font_family(family).apply(&mut run);
        }
        let index = paragraph.position_of_any(&["endParaRPr"]).unwrap_or(paragraph.children.len());
        paragraph.insert_child(index, run);
        true
    }
}

/// A mutable `a:p` paragraph.
pub struct ParagraphMut<'a> {
    element: &'a mut XmlElement,
}

impl ParagraphMut<'_> {
    /// Runs grouped into stretches of uninterrupted text. Line breaks and
    /// fields end a stretch.
    pub fn run_spans_mut(&mut self) -> Vec<Vec<RunMut<'_>>> {
        let mut spans = vec![Vec::new()];
        for child in self.element.elements_mut() {
            if child.is("r") {
                if let Some(span) = spans.last_mut() {
                    span.push(RunMut::new(child));
                }
            } else if child.is("br") || child.is("fld") {
                spans.push(Vec::new());
            }
        }
        spans.retain(|span| !span.is_empty());
        spans
    }
}

/// A mutable `a:r` text run.
pub struct RunMut<'a> {
    element: &'a mut XmlElement,
}

impl<'a> RunMut<'a> {
    pub fn new(element: &'a mut XmlElement) -> Self {
        Self { element }
    }

    pub fn text(&self) -> String {
        self.element.child("t").map(XmlElement::text).unwrap_or_default()
    }

    pub fn style(&self) -> RunStyle {
        RunStyle::capture(self.element)
    }

    /// Assigns text, then restores the run's captured style. When a family is
    /// given it replaces the run's font family; everything else stays as it was.
    pub fn replace_text(&mut self, text: &str, font_family: Option<&str>) {
        let style = self.style();
        set_raw_text(self.element, text);
        let style = match font_family {
            Some(family) => style.with_font_family(family),
            None => style,
        };
        style.apply(self.element);
    }

    pub fn set_font_family(&mut self, family: &str) {
        self.style().with_font_family(family).apply(self.element);
    }
}

fn set_raw_text(run: &mut XmlElement, text: &str) {
    match run.child_mut("t") {
        Some(element) => element.set_text(text),
        None => {
            let name = format!("{}t", run.prefix());
            run.children.push(XmlNode::Element(XmlElement::new(name).with_text(text)));
        }
    }
}

fn new_run_for(paragraph: &XmlElement, text: &str) -> XmlElement {
    let prefix = paragraph.prefix();
    let mut run = XmlElement::new(format!("{prefix}r"));
    if let Some(end) = paragraph.child("endParaRPr") {
        let mut properties = end.clone();
        properties.name = format!("{prefix}rPr");
        run.children.push(XmlNode::Element(properties));
    }
    run.with_child(XmlElement::new(format!("{prefix}t")).with_text(text))
}

fn table_element(frame: &XmlElement) -> Option<&XmlElement> {
    frame.child("graphic")?.child("graphicData")?.child("tbl")
}

fn table_element_mut(frame: &mut XmlElement) -> Option<&mut XmlElement> {
    frame.child_mut("graphic")?.child_mut("graphicData")?.child_mut("tbl")
}

fn cell_text(cell: &XmlElement) -> String {
    cell.child("txBody").map(frame_text).unwrap_or_default()
}

fn frame_text(body: &XmlElement) -> String {
    body.elements()
        .filter(|child| child.is("p"))
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR)
}

fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut text = String::new();
    for child in paragraph.elements() {
        match child.local_name() {
            "r" | "fld" => {
                if let Some(t) = child.child("t") {
                    text.push_str(&t.text());
                }
            }
            "br" => text.push(LINE_BREAK),
            _ => {}
        }
    }
    text
}
