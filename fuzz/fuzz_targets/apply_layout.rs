#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pagebridge_core::{
    ApplyOptions, BuilderAdapter, ElementType, ExtractOptions, NeutralElement, NeutralLayout, attr,
};

/// A layout element with arbitrary shape and text.
#[derive(Debug, Arbitrary)]
enum Element {
    Paragraph(String),
    Heading(u8, String),
    Button(String, String),
    Separator(Option<String>),
    Spacer(String),
    Html(String),
    Code(String),
    Unknown(String),
    Row(Vec<(u8, Vec<Element>)>),
    Section(Vec<Element>),
    List(bool, Vec<String>),
    Quote(Vec<Element>),
}

const MAX_DEPTH: usize = 6;

impl Element {
    fn build(&self, depth: usize) -> NeutralElement {
        let nested = |children: &[Element]| -> Vec<NeutralElement> {
            if depth >= MAX_DEPTH {
                return Vec::new();
            }
            children.iter().map(|c| c.build(depth + 1)).collect()
        };
        match self {
            Element::Paragraph(t) => NeutralElement::new(ElementType::Paragraph).content(t.clone()),
            Element::Heading(level, t) => NeutralElement::new(ElementType::Heading)
                .attr(attr::LEVEL, i64::from(*level))
                .content(t.clone()),
            Element::Button(url, t) => NeutralElement::new(ElementType::Button)
                .attr(attr::URL, url.clone())
                .content(t.clone()),
            Element::Separator(style) => {
                NeutralElement::new(ElementType::Separator).attr_opt(attr::STYLE, style.clone())
            }
            Element::Spacer(h) => NeutralElement::new(ElementType::Spacer).attr(attr::HEIGHT, h.clone()),
            Element::Html(h) => NeutralElement::new(ElementType::Html).content(h.clone()),
            Element::Code(c) => NeutralElement::new(ElementType::Code).content(c.clone()),
            Element::Unknown(c) => NeutralElement::new(ElementType::Unknown).content(c.clone()),
            Element::Row(columns) => NeutralElement::new(ElementType::Row).children(
                columns.iter().map(|(width, children)| {
                    NeutralElement::new(ElementType::Column)
                        .attr(attr::WIDTH, format!("{}%", width % 101))
                        .children(nested(children))
                }),
            ),
            Element::Section(children) => {
                NeutralElement::new(ElementType::Section).children(nested(children))
            }
            Element::List(ordered, items) => NeutralElement::new(ElementType::List)
                .attr(attr::ORDERED, *ordered)
                .children(
                    items
                        .iter()
                        .map(|t| NeutralElement::new(ElementType::ListItem).content(t.clone())),
                ),
            Element::Quote(children) => {
                NeutralElement::new(ElementType::Quote).children(nested(children))
            }
        }
    }
}

fuzz_target!(|input: (u8, Vec<Element>)| {
    let (source, elements) = input;
    let builders: [&dyn BuilderAdapter; 3] = [
        &pagebridge_gutenberg::GutenbergAdapter,
        &pagebridge_elementor::ElementorAdapter,
        &pagebridge_wpbakery::WpBakeryAdapter,
    ];
    let source_name = builders[usize::from(source) % builders.len()].name();
    let layout = NeutralLayout::new(source_name)
        .with_elements(elements.iter().map(|e| e.build(0)).collect());

    // Any layout can be written by any builder, and what is written reads back
    for adapter in builders {
        let markup = adapter.apply_layout(&layout, &ApplyOptions::default());
        assert!(markup.success, "{} failed to apply", adapter.name());
        let back = adapter.extract_layout_from_content(&markup.data, &ExtractOptions::default());
        assert!(back.success, "{} failed to read its own output", adapter.name());
    }
});
