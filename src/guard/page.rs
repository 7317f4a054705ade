/// A rendered page whose elements can be looked up by class.
pub trait Document {
    /// Set the text content of every element carrying `class`.
    /// Returns how many elements were written.
    fn set_text_by_class(&mut self, class: &str, text: &str) -> usize;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub classes: Vec<String>,
    pub text: String,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Flat in-memory element list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }
}

impl Document for Page {
    fn set_text_by_class(&mut self, class: &str, text: &str) -> usize {
        let mut written = 0;
        for element in self.elements.iter_mut().filter(|e| e.has_class(class)) {
            element.text = text.to_string();
            written += 1;
        }
        written
    }
}
