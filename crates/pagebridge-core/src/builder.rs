//! Type-safe layout builders.
//!
//! The builders mirror the container rules of the neutral vocabulary: a row
//! only accepts columns, a list only accepts items, and a button group only
//! accepts buttons.
//!
//! # Example
//!
//! ```rust
//! use pagebridge_core::builder::*;
//!
//! let layout = layout("gutenberg", |l| l
//!     .heading(2, "Pricing")
//!     .row(|r| r
//!         .column("50%", |c| c.paragraph("Basic"))
//!         .column("50%", |c| c.paragraph("Pro"))
//!     )
//! );
//! assert_eq!(layout.elements.len(), 2);
//! ```

use crate::{ElementType, NeutralElement, NeutralLayout, attr};

/// Build a layout for the given builder.
pub fn layout<F>(builder: &str, f: F) -> NeutralLayout
where
    F: FnOnce(ElementsBuilder) -> ElementsBuilder,
{
    NeutralLayout::new(builder).with_elements(f(ElementsBuilder::new()).build())
}

/// Builder for a sequence of block-level elements.
#[derive(Default)]
pub struct ElementsBuilder {
    children: Vec<NeutralElement>,
}

impl ElementsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary element.
    pub fn element(mut self, element: NeutralElement) -> Self {
        self.children.push(element);
        self
    }

    /// Add a heading with a specific level.
    pub fn heading(self, level: i64, text: impl Into<String>) -> Self {
        self.element(
            NeutralElement::new(ElementType::Heading)
                .attr(attr::LEVEL, level)
                .content(text),
        )
    }

    /// Add a paragraph.
    pub fn paragraph(self, text: impl Into<String>) -> Self {
        self.element(NeutralElement::new(ElementType::Paragraph).content(text))
    }

    /// Add an image.
    pub fn image(self, src: impl Into<String>, alt: impl Into<String>) -> Self {
        self.element(
            NeutralElement::new(ElementType::Image)
                .attr(attr::SRC, src.into())
                .attr(attr::ALT, alt.into()),
        )
    }

    /// Add a single button.
    pub fn button(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.element(button(url, text))
    }

    /// Add a group of buttons.
    pub fn buttons<F>(self, f: F) -> Self
    where
        F: FnOnce(ButtonsBuilder) -> ButtonsBuilder,
    {
        let group = f(ButtonsBuilder::default());
        self.element(NeutralElement::new(ElementType::Buttons).children(group.children))
    }

    /// Add a separator, optionally with a style variant.
    pub fn separator(self, style: Option<&str>) -> Self {
        self.element(NeutralElement::new(ElementType::Separator).attr_opt(attr::STYLE, style))
    }

    /// Add vertical space.
    pub fn spacer(self, height: impl Into<String>) -> Self {
        self.element(NeutralElement::new(ElementType::Spacer).attr(attr::HEIGHT, height.into()))
    }

    /// Add a row of columns.
    pub fn row<F>(self, f: F) -> Self
    where
        F: FnOnce(RowBuilder) -> RowBuilder,
    {
        let row = f(RowBuilder::default());
        self.element(NeutralElement::new(ElementType::Row).children(row.columns))
    }

    /// Add a generic section.
    pub fn section<F>(self, f: F) -> Self
    where
        F: FnOnce(ElementsBuilder) -> ElementsBuilder,
    {
        let inner = f(ElementsBuilder::new());
        self.element(NeutralElement::new(ElementType::Section).children(inner.children))
    }

    /// Add a quote.
    pub fn quote<F>(self, citation: Option<&str>, f: F) -> Self
    where
        F: FnOnce(ElementsBuilder) -> ElementsBuilder,
    {
        let inner = f(ElementsBuilder::new());
        self.element(
            NeutralElement::new(ElementType::Quote)
                .attr_opt(attr::CITATION, citation)
                .children(inner.children),
        )
    }

    /// Add a list.
    pub fn list<F>(self, ordered: bool, f: F) -> Self
    where
        F: FnOnce(ListBuilder) -> ListBuilder,
    {
        let list = f(ListBuilder::default());
        self.element(
            NeutralElement::new(ElementType::List)
                .attr(attr::ORDERED, ordered)
                .children(list.items),
        )
    }

    /// Add a code block.
    pub fn code(self, code: impl Into<String>) -> Self {
        self.element(NeutralElement::new(ElementType::Code).content(code))
    }

    /// Add raw HTML.
    pub fn html(self, html: impl Into<String>) -> Self {
        self.element(NeutralElement::new(ElementType::Html).content(html))
    }

    pub fn build(self) -> Vec<NeutralElement> {
        self.children
    }
}

fn button(url: impl Into<String>, text: impl Into<String>) -> NeutralElement {
    NeutralElement::new(ElementType::Button)
        .attr(attr::URL, url.into())
        .content(text)
}

/// Builder for a row (accepts columns only).
#[derive(Default)]
pub struct RowBuilder {
    columns: Vec<NeutralElement>,
}

impl RowBuilder {
    /// Add a column with a CSS width.
    pub fn column<F>(mut self, width: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(ElementsBuilder) -> ElementsBuilder,
    {
        let inner = f(ElementsBuilder::new());
        self.columns.push(
            NeutralElement::new(ElementType::Column)
                .attr(attr::WIDTH, width.into())
                .children(inner.children),
        );
        self
    }
}

/// Builder for a list (accepts items only).
#[derive(Default)]
pub struct ListBuilder {
    items: Vec<NeutralElement>,
}

impl ListBuilder {
    pub fn item(mut self, text: impl Into<String>) -> Self {
        self.items
            .push(NeutralElement::new(ElementType::ListItem).content(text));
        self
    }
}

/// Builder for a button group (accepts buttons only).
#[derive(Default)]
pub struct ButtonsBuilder {
    children: Vec<NeutralElement>,
}

impl ButtonsBuilder {
    pub fn button(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.children.push(button(url, text));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttrsExt;

    #[test]
    fn test_build_nested_layout() {
        let l = layout("gutenberg", |l| {
            l.heading(1, "Title")
                .row(|r| {
                    r.column("50%", |c| c.paragraph("left"))
                        .column("50%", |c| c.paragraph("right"))
                })
                .list(true, |l| l.item("one").item("two"))
        });

        assert_eq!(l.elements.len(), 3);
        let row = &l.elements[1];
        assert_eq!(row.kind, ElementType::Row);
        assert_eq!(row.children.len(), 2);
        assert_eq!(row.children[0].attrs.get_str(attr::WIDTH), Some("50%"));
        assert_eq!(l.elements[2].children[1].content.as_deref(), Some("two"));
    }
}
