// site-listings/src/markup.rs

//! Tiny element tree for widget output. Text and attribute values are escaped
//! on serialization; `Node::Raw` is emitted verbatim and must only carry
//! trusted markup (the fallback avatar icon).

use std::fmt::{self, Write};

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Raw(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

const VOID_TAGS: &[&str] = &["img", "br", "hr", "input", "meta", "link"];

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Default::default() }
    }

    pub fn class(self, class: impl Into<String>) -> Self { self.attr("class", class) }
    pub fn id(self, id: impl Into<String>) -> Self { self.attr("id", id) }

    /// Sets an attribute, replacing any previous value under the same name.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn raw(mut self, html: impl Into<String>) -> Self {
        self.children.push(Node::Raw(html.into()));
        self
    }

    pub fn child(mut self, el: Element) -> Self {
        self.children.push(Node::Element(el));
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class").is_some_and(|c| c.split_whitespace().any(|x| x == class))
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) { return; }
        let joined = match self.get_attr("class") {
            Some(c) if !c.trim().is_empty() => format!("{} {}", c.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        let Some(current) = self.get_attr("class") else { return; };
        let kept: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
        let kept = kept.join(" ");
        self.set_attr("class", kept);
    }

    /// Replaces all children with a single text node (`textContent = ...`).
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() { self.children.push(Node::Text(text)); }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n { Node::Element(e) => Some(e), _ => None })
    }

    pub fn to_html(&self) -> String { self.to_string() }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for n in nodes {
        match n {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
            Node::Raw(_) => {}
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (k, v) in &self.attrs {
            write!(f, " {}=\"", k)?;
            escape_into(f, v, true)?;
            f.write_char('"')?;
        }
        f.write_char('>')?;
        if VOID_TAGS.contains(&self.tag.as_str()) { return Ok(()); }
        for c in &self.children { write!(f, "{c}")?; }
        write!(f, "</{}>", self.tag)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(e) => write!(f, "{e}"),
            Node::Text(t) => escape_into(f, t, false),
            Node::Raw(html) => f.write_str(html),
        }
    }
}

fn escape_into(f: &mut impl Write, s: &str, attr: bool) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '&' => f.write_str("&amp;")?,
            '<' => f.write_str("&lt;")?,
            '>' => f.write_str("&gt;")?,
            '"' if attr => f.write_str("&quot;")?,
            '\'' if attr => f.write_str("&#39;")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_text_and_attributes() {
        let a = Element::new("a").attr("href", "https://x.test/?a=1&b=\"2\"").text("<Slides & notes>");
        assert_eq!(a.to_html(), r#"<a href="https://x.test/?a=1&amp;b=&quot;2&quot;">&lt;Slides &amp; notes&gt;</a>"#);
    }

    #[test]
    fn void_tags_have_no_closing_tag() {
        assert_eq!(Element::new("img").attr("src", "a.png").to_html(), r#"<img src="a.png">"#);
    }

    #[test]
    fn class_list_toggles() {
        let mut el = Element::new("div").class("panel hidden");
        el.remove_class("hidden");
        assert_eq!(el.get_attr("class"), Some("panel"));
        assert!(!el.has_class("hidden"));
        el.add_class("hidden");
        el.add_class("hidden");
        assert_eq!(el.get_attr("class"), Some("panel hidden"));
    }

    #[test]
    fn text_content_skips_raw_markup() {
        let el = Element::new("div").raw("<svg></svg>").child(Element::new("h3").text("Ada"));
        assert_eq!(el.text_content(), "Ada");
        assert_eq!(Element::new("img").attr("alt", "it's").to_html(), r#"<img alt="it&#39;s">"#);
    }
}
