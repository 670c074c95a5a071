use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::BufRead;

// Minimal owned XML element. Only attributes and child elements are kept; TEES stores
// all text in attributes.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    // Direct children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

// Streams `<document>` subtrees out of a TEES corpus so only one document is held at a time.
pub struct DocumentReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    stack: Vec<Element>,
}

impl<R: BufRead> DocumentReader<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            stack: Vec::new(),
        }
    }

    // Return the next complete `<document>` element, or None at end of input.
    pub fn next_document(&mut self) -> Result<Option<Element>> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .with_context(|| format!("reading XML near byte {position}"))?;
            match event {
                Event::Start(start) => {
                    let element = element_from(&start)?;
                    if !self.stack.is_empty() || element.name == "document" {
                        self.stack.push(element);
                    }
                }
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    if let Some(parent) = self.stack.last_mut() {
                        parent.children.push(element);
                    } else if element.name == "document" {
                        return Ok(Some(element));
                    }
                }
                Event::End(_) => {
                    let Some(element) = self.stack.pop() else {
                        continue;
                    };
                    match self.stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(Some(element)),
                    }
                }
                Event::Eof => {
                    if let Some(open) = self.stack.first() {
                        anyhow::bail!("unexpected end of input inside <{}>", open.name);
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for DocumentReader<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_document().transpose()
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.with_context(|| format!("malformed attribute on <{name}>"))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .with_context(|| format!("unescaping attribute `{key}` on <{name}>"))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_each_document_subtree() {
        let xml = r#"<?xml version="1.0"?>
<corpus source="x">
  <document id="a" origId="1" text="one"><sentence id="a.s0"/></document>
  <document id="b" origId="2" text="two &amp; three"/>
</corpus>"#;
        let docs: Vec<Element> = DocumentReader::new(xml.as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].attr("origId"), Some("1"));
        assert_eq!(docs[0].children_named("sentence").count(), 1);
        assert_eq!(docs[1].attr("text"), Some("two & three"));
        assert!(docs[1].children.is_empty());
    }

    #[test]
    fn children_named_only_matches_direct_children() {
        let xml = r#"<document id="a" origId="1" text="">
            <analyses><token id="deep"/></analyses>
            <token id="shallow"/>
          </document>"#;
        let doc = DocumentReader::new(xml.as_bytes())
            .next_document()
            .unwrap()
            .unwrap();
        let ids: Vec<_> = doc
            .children_named("token")
            .filter_map(|t| t.attr("id"))
            .collect();
        assert_eq!(ids, vec!["shallow"]);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let xml = r#"<corpus><document id="a" origId="1" text=""><sentence id="s">"#;
        let mut reader = DocumentReader::new(xml.as_bytes());
        assert!(reader.next_document().is_err());
    }
}
