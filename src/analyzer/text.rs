use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

/// Elements whose text content is never rendered
const NON_VISIBLE: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Strips an HTML document down to its visible text
///
/// Text nodes under `<script>`, `<style>`, `<noscript>`, `<template>`, and
/// `<head>` are dropped; everything else is concatenated with single-space
/// separators. Plain text passes through unchanged (the parser wraps it in
/// an implicit `<body>`).
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    push_visible(document.tree.root(), &mut out);
    out
}

fn push_visible(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Element(element) => {
                if NON_VISIBLE.contains(&element.name()) {
                    continue;
                }
                push_visible(child, out);
            }
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(trimmed);
                }
            }
            _ => {}
        }
    }
}
