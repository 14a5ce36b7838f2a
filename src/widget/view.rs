//! Headless state of one widget's results region.
//!
//! `ResultsView` stands in for the document fragment the widget owns: one
//! list slot per category, the tab/panel pair, the aggregate empty-state
//! message and the expanded/loading flags. `markup()` renders it back to the
//! HTML contract the stylesheet and templates expect.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::search::sanitize::escape_html;

pub const NO_RESULTS_MESSAGE: &str = "No results found";
pub const FAILURE_MESSAGE: &str = "Something went wrong";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Watches,
    Jewelry,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Watches, Tab::Jewelry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Watches => "watches",
            Tab::Jewelry => "jewelry",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Tab::Watches => "Watches",
            Tab::Jewelry => "Jewelry",
        }
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "watches" => Ok(Tab::Watches),
            "jewelry" => Ok(Tab::Jewelry),
            other => Err(format!("unknown tab {:?}, expected watches or jewelry", other)),
        }
    }
}

/// Result categories of the watches panel, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Collections,
    Brands,
    References,
    Products,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Collections,
        Section::Brands,
        Section::References,
        Section::Products,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Collections => "collections",
            Section::Brands => "brands",
            Section::References => "references",
            Section::Products => "products",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Section::Collections => "Collections",
            Section::Brands => "Brands",
            Section::References => "Reference numbers",
            Section::Products => "Products",
        }
    }
}

/// One category section: its visibility and the rows in its list slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionView {
    pub hidden: bool,
    pub html: String,
    pub rows: usize,
}

impl SectionView {
    /// Empty the list slot, leaving visibility alone
    pub fn clear(&mut self) {
        self.html.clear();
        self.rows = 0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub collections: SectionView,
    pub brands: SectionView,
    pub references: SectionView,
    pub products: SectionView,
    /// Text of the aggregate empty/error message
    pub message: String,
    pub message_visible: bool,
    pub expanded: bool,
    pub loading: bool,
    pub active_tab: Tab,
}

impl Default for ResultsView {
    fn default() -> Self {
        Self {
            collections: SectionView::default(),
            brands: SectionView::default(),
            references: SectionView::default(),
            products: SectionView::default(),
            message: NO_RESULTS_MESSAGE.to_string(),
            message_visible: false,
            expanded: false,
            loading: false,
            active_tab: Tab::Watches,
        }
    }
}

impl ResultsView {
    pub fn section(&self, section: Section) -> &SectionView {
        match section {
            Section::Collections => &self.collections,
            Section::Brands => &self.brands,
            Section::References => &self.references,
            Section::Products => &self.products,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut SectionView {
        match section {
            Section::Collections => &mut self.collections,
            Section::Brands => &mut self.brands,
            Section::References => &mut self.references,
            Section::Products => &mut self.products,
        }
    }

    /// Rendered rows across every section
    pub fn row_count(&self) -> usize {
        Section::ALL.iter().map(|s| self.section(*s).rows).sum()
    }

    /// Collapse the region and empty every list; the input is not touched
    pub fn hide(&mut self) {
        self.expanded = false;
        for section in Section::ALL {
            self.section_mut(section).clear();
        }
        self.message_visible = false;
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    /// Show `message` in the empty-state slot and keep the region open
    pub fn show_error(&mut self, message: &str) {
        self.message = message.to_string();
        self.message_visible = true;
        self.expanded = true;
    }

    /// Markup of the whole results region
    pub fn markup(&self) -> String {
        let mut out = String::new();

        let mut classes = String::from("wcls-results");
        if self.expanded {
            classes.push_str(" wcls-show");
        }
        if self.loading {
            classes.push_str(" wcls-loading");
        }
        let _ = write!(
            out,
            r#"<div class="{}" role="region" aria-live="polite" aria-expanded="{}">"#,
            classes, self.expanded
        );

        out.push_str(r#"<div class="wcls-tabs" role="tablist" aria-label="Search result categories">"#);
        for tab in Tab::ALL {
            let active = tab == self.active_tab;
            let _ = write!(
                out,
                r#"<button type="button" class="wcls-tab{}" role="tab" aria-selected="{}" data-tab="{}">{}</button>"#,
                if active { " is-active" } else { "" },
                active,
                tab.as_str(),
                tab.label()
            );
        }
        out.push_str("</div>");

        out.push_str(r#"<div class="wcls-panels">"#);
        let _ = write!(
            out,
            r#"<div class="wcls-panel{}" role="tabpanel" data-panel="watches">"#,
            if self.active_tab == Tab::Watches { " is-active" } else { "" }
        );
        for section in Section::ALL {
            let view = self.section(section);
            let _ = write!(
                out,
                r#"<div class="wcls-section{}" data-section="{}"><div class="wcls-section-title">{}</div><div class="wcls-section-list" data-target="{}">{}</div></div>"#,
                if view.hidden { " wcls-hidden" } else { "" },
                section.as_str(),
                section.title(),
                section.as_str(),
                view.html
            );
        }
        let _ = write!(
            out,
            r#"<div class="wcls-empty-all" style="display:{};">{}</div>"#,
            if self.message_visible { "block" } else { "none" },
            escape_html(&self.message)
        );
        out.push_str("</div>");

        let _ = write!(
            out,
            r#"<div class="wcls-panel{}" role="tabpanel" data-panel="jewelry"><div class="wcls-empty">Jewelry results are not available yet.</div></div>"#,
            if self.active_tab == Tab::Jewelry { " is-active" } else { "" }
        );
        out.push_str("</div></div>");

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hide_clears_lists_and_message() {
        let mut view = ResultsView::default();
        view.brands.html = "<a>row</a>".to_string();
        view.brands.rows = 1;
        view.message_visible = true;
        view.expanded = true;

        view.hide();

        assert!(!view.expanded);
        assert!(!view.message_visible);
        assert_eq!(view.row_count(), 0);
        assert!(view.brands.html.is_empty());
    }

    #[test]
    fn test_switch_tab_marks_tab_and_panel() {
        let mut view = ResultsView::default();
        view.switch_tab(Tab::Jewelry);

        let markup = view.markup();
        assert!(markup.contains(r#"class="wcls-tab is-active" role="tab" aria-selected="true" data-tab="jewelry""#));
        assert!(markup.contains(r#"class="wcls-tab" role="tab" aria-selected="false" data-tab="watches""#));
        assert!(markup.contains(r#"class="wcls-panel is-active" role="tabpanel" data-panel="jewelry""#));
    }

    #[test]
    fn test_markup_exposes_slots() {
        let view = ResultsView::default();
        let markup = view.markup();

        for section in Section::ALL {
            assert!(markup.contains(&format!(r#"data-target="{}""#, section.as_str())));
        }
        assert!(markup.contains(r#"aria-expanded="false""#));
        assert!(markup.contains(r#"<div class="wcls-empty-all" style="display:none;">No results found</div>"#));
    }

    #[test]
    fn test_show_error_opens_region() {
        let mut view = ResultsView::default();
        view.show_error(NETWORK_ERROR_MESSAGE);

        assert!(view.expanded);
        assert!(view.message_visible);
        assert_eq!(view.message, "Network error");
    }

    #[test]
    fn test_tab_parse() {
        assert_eq!("watches".parse::<Tab>(), Ok(Tab::Watches));
        assert_eq!(" Jewelry ".parse::<Tab>(), Ok(Tab::Jewelry));
        assert!("rings".parse::<Tab>().unwrap_err().contains("unknown tab"));
    }
}
