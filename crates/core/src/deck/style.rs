use serde::{Deserialize, Serialize};

use crate::deck::xml::{XmlElement, XmlNode};

/// Children of `a:rPr` that must come after the fill group, in schema order.
const AFTER_FILL: &[&str] = &[
    "effectLst",
    "effectDag",
    "highlight",
    "uLnTx",
    "uLn",
    "uFillTx",
    "uFill",
    "latin",
    "ea",
    "cs",
    "sym",
    "hlinkClick",
    "hlinkMouseOver",
    "rtl",
    "extLst",
];

/// Children of `a:rPr` that must come after `a:latin`.
const AFTER_LATIN: &[&str] = &["ea", "cs", "sym", "hlinkClick", "hlinkMouseOver", "rtl", "extLst"];

const FILLS: &[&str] = &["noFill", "solidFill", "gradFill", "blipFill", "pattFill", "grpFill"];

/// Character formatting of a single text run.
///
/// `None` means "not set on the run" (inherited from the paragraph, shape or
/// master). Size is in hundredths of a point, color is an sRGB hex string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStyle {
    pub font_family: Option<String>,
    pub size: Option<u32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<String>,
    pub color: Option<String>,
}

impl RunStyle {
    /// Reads the explicit formatting of an `a:r` element.
    pub fn capture(run: &XmlElement) -> Self {
        let Some(properties) = run.child("rPr") else {
            return Self::default();
        };

        Self {
            font_family: properties
                .child("latin")
                .and_then(|latin| latin.attr("typeface"))
                .map(str::to_string),
            size: properties.attr("sz").and_then(|value| value.parse().ok()),
            bold: properties.attr("b").map(parse_flag),
            italic: properties.attr("i").map(parse_flag),
            underline: properties.attr("u").map(str::to_string),
            color: properties
                .child("solidFill")
                .and_then(|fill| fill.child("srgbClr"))
                .and_then(|color| color.attr("val"))
                .map(str::to_string),
        }
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    /// Writes this style onto an `a:r` element.
    ///
    /// Bold, italic and underline are restored exactly (set or cleared). Size,
    /// color and family are only written when present; an unset value leaves
    /// whatever the run inherits alone.
    pub fn apply(&self, run: &mut XmlElement) {
        if *self == Self::default() && run.child("rPr").is_none() {
            return;
        }

        let properties = properties_mut(run);

        if let Some(size) = self.size {
            properties.set_attr("sz", size.to_string());
        }
        set_or_clear(properties, "b", self.bold.map(flag_value));
        set_or_clear(properties, "i", self.italic.map(flag_value));
        set_or_clear(properties, "u", self.underline.clone());

        if let Some(color) = &self.color {
            set_solid_color(properties, color);
        }
        if let Some(family) = &self.font_family {
            set_latin_typeface(properties, family);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "on")
}

fn flag_value(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn set_or_clear(element: &mut XmlElement, key: &str, value: Option<String>) {
    match value {
        Some(value) => element.set_attr(key, value),
        None => element.remove_attr(key),
    }
}

fn properties_mut(run: &mut XmlElement) -> &mut XmlElement {
    if run.child("rPr").is_none() {
        let name = format!("{}rPr", run.prefix());
        run.insert_child(0, XmlElement::new(name));
    }
    match run.child_mut("rPr") {
        Some(properties) => properties,
        None => unreachable!("rPr was inserted above"),
    }
}

fn set_solid_color(properties: &mut XmlElement, color: &str) {
    let prefix = properties.prefix().to_string();
    let color_element = XmlElement::new(format!("{prefix}srgbClr")).with_attr("val", color);

    if let Some(fill) = properties.child_mut("solidFill") {
        fill.children.clear();
        fill.children.push(XmlNode::Element(color_element));
        return;
    }

    properties.children.retain(|node| match node {
        XmlNode::Element(element) => !FILLS.contains(&element.local_name()),
        _ => true,
    });
    let fill = XmlElement::new(format!("{prefix}solidFill")).with_child(color_element);
    let index = properties.position_of_any(AFTER_FILL).unwrap_or(properties.children.len());
    properties.insert_child(index, fill);
}

fn set_latin_typeface(properties: &mut XmlElement, family: &str) {
    if let Some(latin) = properties.child_mut("latin") {
        latin.set_attr("typeface", family);
        return;
    }
    let latin = XmlElement::new(format!("{}latin", properties.prefix())).with_attr("typeface", family);
    let index = properties.position_of_any(AFTER_LATIN).unwrap_or(properties.children.len());
    properties.insert_child(index, latin);
}
