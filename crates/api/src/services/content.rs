//! Markdown rendering for content pages.

use comrak::{Options, markdown_to_html};

use crate::models::{Page, RenderedPage};

/// Render GitHub Flavored Markdown to HTML.
///
/// Raw HTML in the source is escaped.
#[must_use]
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;

    markdown_to_html(content, &options)
}

/// Attach the rendered HTML to a page.
#[must_use]
pub fn render_page(page: Page) -> RenderedPage {
    let content_html = render_markdown(&page.content);
    RenderedPage { page, content_html }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown() {
        let html = render_markdown("# Доставка\n\n~~3 дня~~ **1 день**");
        assert!(html.contains("<h1>Доставка</h1>"));
        assert!(html.contains("<del>3 дня</del>"));
        assert!(html.contains("<strong>1 день</strong>"));
    }

    #[test]
    fn test_raw_html_is_not_passed_through() {
        let html = render_markdown("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_tables() {
        let html = render_markdown("| Город | Срок |\n|---|---|\n| Москва | 1 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Москва</td>"));
    }
}
