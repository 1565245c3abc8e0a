/// A generic markup element: the common shape both rule dialects parse into.
///
/// Text content is dropped; the rule dialect carries everything in
/// element names, attributes, and nesting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    #[must_use]
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing an earlier value with the same name.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_owned(), value)),
        }
    }

    #[must_use]
    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Immediate children with the given element name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_attr_replaces() {
        let el = Element::new("rule").attr("type", "eq").attr("type", "range");
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.get_attr("type"), Some("range"));
    }

    #[test]
    fn children_named_filters_in_order() {
        let el = Element::new("rule")
            .child(Element::new("el").attr("name", "a"))
            .child(Element::new("errtarget"))
            .child(Element::new("el").attr("name", "b"));
        let names: Vec<_> = el
            .children_named("el")
            .filter_map(|c| c.get_attr("name"))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
