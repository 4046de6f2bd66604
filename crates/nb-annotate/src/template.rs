//! Template-component annotation.
//!
//! Single-file template components keep their markup inside a
//! `<template>` section. The section is located textually (the body between
//! the opening marker and the last closing marker) and the attribute is
//! spliced into the first top-level opening tag of the trimmed content.
//! This path is a textual splice, so no source map is produced.

use crate::COMPONENT_PATH_ATTR;
use memchr::memmem;
use regex::Regex;
use std::sync::LazyLock;

static OPENING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    // First top-level opening tag at the very start of the trimmed template
    // body: tag name, raw attribute text, optional self-closing slash.
    Regex::new(r"^<([A-Za-z][A-Za-z0-9-]*)([^>]*?)(/?)>").expect("valid opening-tag pattern")
});

/// Annotate a template component, returning the full updated source.
///
/// `value` must already be attribute-escaped. Returns `None` when the file
/// has no template section, no leading opening tag, or is already annotated.
pub(crate) fn annotate_template(source: &str, value: &str) -> Option<String> {
    let bytes = source.as_bytes();

    let open_start = memmem::find(bytes, b"<template")?;
    let open_end = memchr::memchr(b'>', &bytes[open_start..]).map(|i| open_start + i)?;
    let body_start = open_end + 1;

    let close_start = memmem::rfind(bytes, b"</template>")?;
    if close_start < body_start {
        return None;
    }

    let content = &source[body_start..close_start];
    let trimmed = content.trim();

    let captures = OPENING_TAG.captures(trimmed)?;
    let tag = captures.get(1).expect("tag group").as_str();
    let attrs = captures.get(2).expect("attrs group").as_str();
    let slash = captures.get(3).expect("slash group").as_str();

    if attrs.contains(COMPONENT_PATH_ATTR) {
        return None;
    }

    let matched_len = captures.get(0).expect("whole match").len();
    let rest = &trimmed[matched_len..];

    let lead = &content[..content.len() - content.trim_start().len()];
    let trail = &content[content.trim_end().len()..];

    let mut updated = String::with_capacity(source.len() + COMPONENT_PATH_ATTR.len() + value.len() + 4);
    updated.push_str(&source[..body_start]);
    updated.push_str(lead);
    updated.push_str(&format!(
        "<{tag} {COMPONENT_PATH_ATTR}=\"{value}\"{attrs}{slash}>"
    ));
    updated.push_str(rest);
    updated.push_str(trail);
    updated.push_str(&source[close_start..]);
    Some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUE: &str = "js/pages/Profile.vue";

    #[test]
    fn annotates_the_first_top_level_tag() {
        let source = "<template>\n  <div class=\"page\">\n    <p>hi</p>\n  </div>\n</template>\n<script setup>\nconst x = 1\n</script>\n";
        let out = annotate_template(source, VALUE).expect("annotated");
        assert!(out.contains(
            r#"<div data-nb-component="js/pages/Profile.vue" class="page">"#
        ));
        assert!(out.contains("</template>"));
        assert!(out.contains("<script setup>"));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let source = "<template>\n  <div class=\"page\"/>\n</template>\n";
        let once = annotate_template(source, VALUE).expect("annotated");
        assert!(annotate_template(&once, VALUE).is_none());
    }

    #[test]
    fn preserves_self_closing_tags() {
        let source = "<template>\n  <AppShell/>\n</template>\n";
        let out = annotate_template(source, VALUE).expect("annotated");
        assert!(out.contains(r#"<AppShell data-nb-component="js/pages/Profile.vue"/>"#));
    }

    #[test]
    fn no_template_section_means_unchanged() {
        assert!(annotate_template("<script>export default {}</script>", VALUE).is_none());
    }

    #[test]
    fn unclosed_template_means_unchanged() {
        assert!(annotate_template("<template><div>hi</div>", VALUE).is_none());
    }

    #[test]
    fn non_tag_content_means_unchanged() {
        assert!(annotate_template("<template>just text</template>", VALUE).is_none());
    }

    #[test]
    fn template_tag_attributes_are_tolerated() {
        let source = "<template lang=\"html\">\n  <div>hi</div>\n</template>\n";
        let out = annotate_template(source, VALUE).expect("annotated");
        assert!(out.contains("data-nb-component"));
        assert!(out.contains("<template lang=\"html\">"));
    }

    #[test]
    fn escaped_quotes_sit_inside_the_attribute() {
        let source = "<template>\n  <div>hi</div>\n</template>\n";
        let out = annotate_template(source, "js/pages/A&quot;B.vue").expect("annotated");
        assert!(out.contains(r#"data-nb-component="js/pages/A&quot;B.vue""#));
    }
}
