use std::sync::Arc;

use crate::element::Element;

/// Augments a content block before it is rendered (link detection, keyword
/// highlighting and the like). Runs on the render tick, never during routing.
pub trait TextDecorator: Send + Sync {
    fn decorate(&self, element: Element) -> Element;
}

impl<F> TextDecorator for F
where
    F: Fn(Element) -> Element + Send + Sync,
{
    fn decorate(&self, element: Element) -> Element {
        self(element)
    }
}

/// Ordered set of decorators applied one after another.
#[derive(Clone, Default)]
pub struct Decorations {
    decorators: Vec<Arc<dyn TextDecorator>>,
}

impl Decorations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, decorator: impl TextDecorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    pub fn apply(&self, element: Element) -> Element {
        self.decorators
            .iter()
            .fold(element, |element, decorator| decorator.decorate(element))
    }
}

impl std::fmt::Debug for Decorations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decorations")
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorators_apply_in_order() {
        let decorations = Decorations::new()
            .with(|e: Element| e.with_text("1"))
            .with(|e: Element| e.with_text("2"));
        let out = decorations.apply(Element::new("pre").with_text("0"));
        assert_eq!(out.text(), "012");
        assert_eq!(decorations.len(), 2);
    }

    #[test]
    fn empty_chain_is_identity() {
        let el = Element::new("pre").with_text("x");
        assert_eq!(Decorations::new().apply(el.clone()), el);
    }
}
