// firebridge-xml: minimal XML element tree for EC2-family query responses.
//
// The query API returns small, deeply nested documents that are navigated
// by element name only. Attributes (the response namespace declaration is
// the only one that ever appears) carry no information the adapter needs,
// so the tree keeps just tag, text, and children.

use quick_xml::Reader;
use quick_xml::events::Event;
use quick_xml::name::QName;
use thiserror::Error;

/// Errors from turning raw response bytes into an [`Element`] tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input could not be tokenized as XML.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Tag or text bytes were not valid UTF-8.
    #[error("invalid UTF-8 in XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Failed to decode an escaped text entity.
    #[error("failed to decode XML text: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    /// Structural issue in the document.
    #[error("malformed XML: {0}")]
    Malformed(String),
}

/// A single element in a parsed response document.
///
/// Sibling order is preserved: repeated `item` lists map 1:1 onto the
/// order they appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element tag name.
    pub tag: String,
    /// Child elements, in document order.
    pub children: Vec<Element>,
    /// Text content, if any.
    pub text: Option<String>,
}

impl Element {
    /// Create an empty element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            children: Vec::new(),
            text: None,
        }
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All direct children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Every descendant (including self) with the given tag, depth-first.
    ///
    /// Mirrors DOM `getElementsByTagName`: the query responses bury the
    /// interesting lists at varying depths depending on the action.
    pub fn find_all<'a>(&'a self, tag: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(tag, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, tag: &str, found: &mut Vec<&'a Element>) {
        if self.tag == tag {
            found.push(self);
        }
        for child in &self.children {
            child.collect_named(tag, found);
        }
    }

    /// Trimmed text content of this element.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Trimmed text of the first direct child with the given tag.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).and_then(Element::text)
    }
}

/// Parse a complete XML document into an [`Element`] tree.
pub fn parse(xml: &[u8]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                stack.push(Element::new(tag_name(e.name())?));
            }
            Event::Empty(e) => {
                let node = Element::new(tag_name(e.name())?);
                attach(node, &mut stack, &mut root)?;
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    let text = e.unescape()?.into_owned();
                    if !text.trim().is_empty() {
                        match &mut current.text {
                            Some(existing) => existing.push_str(&text),
                            None => current.text = Some(text),
                        }
                    }
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    let text = std::str::from_utf8(e.as_ref())?.to_string();
                    if !text.trim().is_empty() {
                        match &mut current.text {
                            Some(existing) => existing.push_str(&text),
                            None => current.text = Some(text),
                        }
                    }
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    ParseError::Malformed("closing tag without open tag".to_string())
                })?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed(
            "unclosed element(s) at end of document".to_string(),
        ));
    }

    root.ok_or_else(|| ParseError::Malformed("no root element found".to_string()))
}

fn attach(
    node: Element,
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    } else {
        return Err(ParseError::Malformed(
            "multiple top-level elements found".to_string(),
        ));
    }
    Ok(())
}

fn tag_name(name: QName<'_>) -> Result<String, ParseError> {
    Ok(std::str::from_utf8(name.as_ref())?.to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Element, parse};

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<DescribeSecurityGroupsResponse xmlns="http://ec2.amazonaws.com/doc/2012-07-20/">
  <requestId>abc-123</requestId>
  <securityGroupInfo>
    <item>
      <groupId>sg-1a2b3c4d</groupId>
      <groupName>web</groupName>
      <ipPermissions>
        <item>
          <ipProtocol>tcp</ipProtocol>
          <fromPort>80</fromPort>
          <toPort>80</toPort>
          <ipRanges>
            <item><cidrIp>0.0.0.0/0</cidrIp></item>
            <item><cidrIp>10.0.0.0/8</cidrIp></item>
          </ipRanges>
        </item>
      </ipPermissions>
    </item>
  </securityGroupInfo>
</DescribeSecurityGroupsResponse>"#;

    #[test]
    fn parses_nested_response() {
        let doc = parse(SAMPLE.as_bytes()).unwrap();

        assert_eq!(doc.tag, "DescribeSecurityGroupsResponse");
        assert_eq!(doc.child_text("requestId"), Some("abc-123"));

        let info = doc.child("securityGroupInfo").unwrap();
        let item = info.child("item").unwrap();
        assert_eq!(item.child_text("groupId"), Some("sg-1a2b3c4d"));
        assert_eq!(item.child_text("groupName"), Some("web"));
    }

    #[test]
    fn find_all_reaches_any_depth() {
        let doc = parse(SAMPLE.as_bytes()).unwrap();

        let cidrs: Vec<_> = doc
            .find_all("cidrIp")
            .into_iter()
            .filter_map(Element::text)
            .collect();
        assert_eq!(cidrs, vec!["0.0.0.0/0", "10.0.0.0/8"]);
    }

    #[test]
    fn item_order_is_preserved() {
        let doc = parse(SAMPLE.as_bytes()).unwrap();
        let ranges = doc.find_all("ipRanges");
        let items: Vec<_> = ranges[0].children_named("item").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].child_text("cidrIp"), Some("0.0.0.0/0"));
    }

    #[test]
    fn empty_elements_have_no_text() {
        let doc = parse(b"<a><b/><c></c></a>").unwrap();
        assert_eq!(doc.child("b").unwrap().text(), None);
        assert_eq!(doc.child("c").unwrap().text(), None);
    }

    #[test]
    fn whitespace_only_text_is_ignored() {
        let doc = parse(b"<a>\n  <b>  </b>\n</a>").unwrap();
        assert_eq!(doc.text(), None);
        assert_eq!(doc.child("b").unwrap().text(), None);
    }

    #[test]
    fn unclosed_document_is_rejected() {
        assert!(parse(b"<a><b></b>").is_err());
    }

    #[test]
    fn escaped_entities_are_decoded() {
        let doc = parse(b"<a><msg>this &amp; that</msg></a>").unwrap();
        assert_eq!(doc.child_text("msg"), Some("this & that"));
    }
}
