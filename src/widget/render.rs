use std::fmt::Write as _;

use super::view::{ResultsView, Section, SectionView, NO_RESULTS_MESSAGE};
use crate::search::models::{ProductResult, SearchResponse, TermResult};
use crate::search::sanitize::escape_html;

/// Per-widget display toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub show_price: bool,
    pub show_image: bool,
}

/// A result kind that knows how to draw its own row.
///
/// Text fields are escaped; URLs and price markup come from the backend and
/// are inserted verbatim.
pub trait RenderRow {
    fn render_row(&self, opts: &RenderOptions) -> String;
}

impl RenderRow for TermResult {
    fn render_row(&self, _opts: &RenderOptions) -> String {
        let badge = if self.count != 0 {
            self.count.to_string()
        } else {
            String::new()
        };

        format!(
            r#"<a class="wcls-row wcls-term" role="option" href="{}"><span class="wcls-title">{}</span><span class="wcls-badge">{}</span></a>"#,
            self.url,
            escape_html(&self.name),
            badge
        )
    }
}

impl RenderRow for ProductResult {
    fn render_row(&self, opts: &RenderOptions) -> String {
        let mut row = String::new();
        let _ = write!(
            row,
            r#"<a class="wcls-row wcls-product" role="option" href="{}">"#,
            self.url
        );

        if let Some(thumbnail) = self.thumbnail.as_deref().filter(|t| opts.show_image && !t.is_empty()) {
            let _ = write!(row, r#"<img class="wcls-thumb" src="{}" alt="">"#, thumbnail);
        }

        let _ = write!(row, r#"<div class="wcls-title">{}</div>"#, escape_html(&self.title));

        if let Some(price) = self.price_html.as_deref().filter(|p| opts.show_price && !p.is_empty()) {
            let _ = write!(row, r#"<div class="wcls-price">{}</div>"#, price);
        }

        row.push_str("</a>");
        row
    }
}

/// Fill one section from `items`, hiding it when there is nothing to show.
/// Returns the number of rows rendered.
pub fn render_section<R: RenderRow>(section: &mut SectionView, items: &[R], opts: &RenderOptions) -> usize {
    if items.is_empty() {
        section.hidden = true;
        section.clear();
        return 0;
    }

    section.hidden = false;
    section.html = items.iter().map(|item| item.render_row(opts)).collect();
    section.rows = items.len();
    items.len()
}

/// Render a whole payload into the view and open it
pub fn render_all(view: &mut ResultsView, payload: &SearchResponse, opts: &RenderOptions) {
    let watches = &payload.watches;

    let total = render_section(view.section_mut(Section::Collections), &watches.collections, opts)
        + render_section(view.section_mut(Section::Brands), &watches.brands, opts)
        + render_section(view.section_mut(Section::References), &watches.references, opts)
        + render_section(view.section_mut(Section::Products), &watches.products, opts);

    view.message = NO_RESULTS_MESSAGE.to_string();
    view.message_visible = total == 0;

    view.expanded = true;
}
