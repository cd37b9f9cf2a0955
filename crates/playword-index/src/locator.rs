//! Locator synthesis
//!
//! Produces one stable xpath per candidate element. Attribute-based
//! locators come first because they survive layout churn; the positional
//! ancestor chain is the last resort and is only as stable as the page
//! structure itself.

use scraper::ElementRef;

/// Attributes that identify an element across page revisions, tried in order.
const IDENTITY_ATTRS: [&str; 3] = ["data-testid", "data-test", "data-qa"];

/// Synthesize a locator for an element
///
/// Preference order: `id`, test-id attributes, anchor `href`, `name`, a
/// class token, then the positional ancestor chain.
#[must_use]
pub fn synthesize_xpath(element: &ElementRef<'_>) -> String {
    let value = element.value();
    let tag = value.name();

    if let Some(id) = non_empty(value.attr("id")) {
        return format!("//*[@id=\"{id}\"]");
    }

    for attr in IDENTITY_ATTRS {
        if let Some(found) = non_empty(value.attr(attr)) {
            return format!("//{tag}[@{attr}=\"{found}\"]");
        }
    }

    if tag == "a" {
        if let Some(href) = non_empty(value.attr("href")) {
            if !href.starts_with("javascript:") && href != "#" {
                return format!("//a[@href=\"{href}\"]");
            }
        }
    }

    if let Some(name) = non_empty(value.attr("name")) {
        return format!("//{tag}[@name=\"{name}\"]");
    }

    if let Some(class) = value.attr("class") {
        if let Some(token) = class.split_whitespace().next() {
            return format!("//{tag}[contains(@class, \"{token}\")]");
        }
    }

    positional_path(element)
}

fn non_empty(attr: Option<&str>) -> Option<&str> {
    attr.filter(|v| !v.trim().is_empty())
}

/// `tag[sibling-index]` segments from the root down to the element.
fn positional_path(element: &ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    let mut node = **element;

    loop {
        let Some(current) = ElementRef::wrap(node) else {
            break;
        };
        let tag = current.value().name();

        let mut index = 1;
        let mut sibling = node.prev_sibling();
        while let Some(prev) = sibling {
            if let Some(prev_el) = ElementRef::wrap(prev) {
                if prev_el.value().name() == tag {
                    index += 1;
                }
            }
            sibling = prev.prev_sibling();
        }

        segments.push(format!("{tag}[{index}]"));
        match node.parent() {
            Some(parent) => node = parent,
            None => break,
        }
    }

    segments.reverse();
    format!("/{}", segments.join("/"))
}
