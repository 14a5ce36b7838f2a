//! Line-driven front end for a page of widgets.
//!
//! Every input line is one user interaction. Widgets are numbered from 1 in
//! the order they were initialized.
//!
//! ```text
//! type <n> <text>   type into widget n, then print its region once it settles
//! esc <n>           press Escape in widget n
//! click <n>         click inside widget n; every other widget closes
//! click             click outside every widget
//! tab <n> <tab>     switch widget n to `watches` or `jewelry`
//! show <n>          print widget n's region
//! status            one line per widget
//! help
//! quit
//! ```

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, Duration};
use tracing::debug;

use super::controller::{SearchController, DEBOUNCE};
use super::view::{ResultsView, Tab};
use super::WidgetSet;

/// Extra wait after the quiet period before looking for a settled view
const SETTLE_GRACE: Duration = Duration::from_millis(50);

/// Longest wait for a request or an event to show up in a view
const SETTLE_TIMEOUT: Duration = Duration::from_secs(35);

const HELP: &str = "commands: type <n> <text> | esc <n> | click [<n>] | tab <n> <watches|jewelry> | show <n> | status | help | quit";

/// One parsed input line; widget indexes are zero-based
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Type(usize, String),
    Escape(usize),
    Click(Option<usize>),
    Tab(usize, Tab),
    Show(usize),
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = split_word(line);

        match verb {
            "type" => {
                let (index, text) = split_word(rest);
                Ok(ShellCommand::Type(parse_index(index)?, text.to_string()))
            }
            "esc" => Ok(ShellCommand::Escape(parse_index(rest)?)),
            "click" if rest.is_empty() => Ok(ShellCommand::Click(None)),
            "click" => Ok(ShellCommand::Click(Some(parse_index(rest)?))),
            "tab" => {
                let (index, tab) = split_word(rest);
                Ok(ShellCommand::Tab(parse_index(index)?, tab.parse()?))
            }
            "show" => Ok(ShellCommand::Show(parse_index(rest)?)),
            "status" => Ok(ShellCommand::Status),
            "help" => Ok(ShellCommand::Help),
            "quit" | "exit" => Ok(ShellCommand::Quit),
            other => Err(format!("unknown command {:?}", other)),
        }
    }
}

fn split_word(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("widget numbers start at 1".to_string()),
        Ok(n) => Ok(n - 1),
        Err(_) => Err(format!("expected a widget number, got {:?}", raw.trim())),
    }
}

/// Read commands from `input` until it ends or `quit`, writing replies to `output`
pub async fn run<R, W>(widgets: &WidgetSet, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if widgets.is_empty() {
        anyhow::bail!("no widgets to drive");
    }

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match ShellCommand::parse(&line) {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => {
                debug!("Shell command {:?}", command);
                execute(widgets, command)
                    .await
                    .unwrap_or_else(|e| format!("error: {}", e))
            }
            Err(e) => format!("error: {}", e),
        };

        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    Ok(())
}

async fn execute(widgets: &WidgetSet, command: ShellCommand) -> Result<String> {
    match command {
        ShellCommand::Type(index, text) => {
            let controller = widget(widgets, index)?;
            controller.input(text);
            sleep(DEBOUNCE + SETTLE_GRACE).await;
            let view = controller
                .wait_until_within(SETTLE_TIMEOUT, |v| !v.loading)
                .await?;
            Ok(view.markup())
        }
        ShellCommand::Escape(index) => {
            let controller = widget(widgets, index)?;
            controller.escape();
            let view = controller
                .wait_until_within(SETTLE_TIMEOUT, |v| !v.expanded)
                .await?;
            Ok(view.markup())
        }
        ShellCommand::Click(inside) => {
            let inside_id = match inside {
                Some(index) => Some(widget(widgets, index)?.id()),
                None => None,
            };
            widgets.click(inside_id);
            for controller in widgets.iter().filter(|c| Some(c.id()) != inside_id) {
                controller
                    .wait_until_within(SETTLE_TIMEOUT, |v| !v.expanded)
                    .await?;
            }
            Ok(status(widgets))
        }
        ShellCommand::Tab(index, tab) => {
            let controller = widget(widgets, index)?;
            controller.switch_tab(tab);
            let view = controller
                .wait_until_within(SETTLE_TIMEOUT, |v| v.active_tab == tab)
                .await?;
            Ok(view.markup())
        }
        ShellCommand::Show(index) => Ok(widget(widgets, index)?.view().markup()),
        ShellCommand::Status => Ok(status(widgets)),
        ShellCommand::Help => Ok(HELP.to_string()),
        ShellCommand::Quit => Ok(String::new()),
    }
}

fn widget(widgets: &WidgetSet, index: usize) -> Result<&SearchController> {
    widgets
        .get(index)
        .with_context(|| format!("no widget {} (page has {})", index + 1, widgets.len()))
}

fn status(widgets: &WidgetSet) -> String {
    widgets
        .iter()
        .enumerate()
        .map(|(i, controller)| status_line(i + 1, &controller.view()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_line(number: usize, view: &ResultsView) -> String {
    let mut line = format!(
        "[{}] {}, {} row(s), tab {}",
        number,
        if view.expanded { "open" } else { "closed" },
        view.row_count(),
        view.active_tab.as_str()
    );
    if view.loading {
        line.push_str(", loading");
    }
    if view.message_visible {
        line.push_str(&format!(", \"{}\"", view.message));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::models::{SearchQuery, SearchResponse, TermResult, WatchResults};
    use crate::widget::transport::{SearchOutcome, SearchTransport, TransportError};
    use crate::widget::WidgetConfig;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EchoTransport;

    #[async_trait]
    impl SearchTransport for EchoTransport {
        async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, TransportError> {
            Ok(SearchOutcome::Results(SearchResponse {
                watches: WatchResults {
                    brands: vec![TermResult {
                        id: 1,
                        name: query.text.clone(),
                        slug: query.text.clone(),
                        url: format!("/brand/{}/", query.text),
                        count: 2,
                    }],
                    ..Default::default()
                },
                ..Default::default()
            }))
        }
    }

    fn page(count: usize) -> WidgetSet {
        WidgetSet::init(vec![WidgetConfig::default(); count], Arc::new(EchoTransport))
    }

    async fn exec(widgets: &WidgetSet, script: &str) -> String {
        let mut out = Vec::new();
        run(widgets, script.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ShellCommand::parse("type 1 rolex sub"),
            Ok(ShellCommand::Type(0, "rolex sub".to_string()))
        );
        assert_eq!(ShellCommand::parse("type 2"), Ok(ShellCommand::Type(1, String::new())));
        assert_eq!(ShellCommand::parse(" esc 3 "), Ok(ShellCommand::Escape(2)));
        assert_eq!(ShellCommand::parse("click"), Ok(ShellCommand::Click(None)));
        assert_eq!(ShellCommand::parse("click 1"), Ok(ShellCommand::Click(Some(0))));
        assert_eq!(ShellCommand::parse("tab 1 jewelry"), Ok(ShellCommand::Tab(0, Tab::Jewelry)));
        assert_eq!(ShellCommand::parse("exit"), Ok(ShellCommand::Quit));

        assert!(ShellCommand::parse("type 0 rolex").unwrap_err().contains("start at 1"));
        assert!(ShellCommand::parse("esc one").is_err());
        assert!(ShellCommand::parse("tab 1 rings").unwrap_err().contains("unknown tab"));
        assert!(ShellCommand::parse("dance").unwrap_err().contains("unknown command"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_prints_settled_region() {
        let widgets = page(1);

        let out = exec(&widgets, "type 1 rolex\n").await;
        assert!(out.contains(r#"aria-expanded="true""#));
        assert!(out.contains(r#"<span class="wcls-title">rolex</span>"#));
        assert!(!out.contains("wcls-loading"));

        // Below the threshold the region collapses
        let out = exec(&widgets, "type 1 r\n").await;
        assert!(out.contains(r#"aria-expanded="false""#));

        widgets.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_and_escape() {
        let widgets = page(1);
        exec(&widgets, "type 1 rolex\n").await;

        let out = exec(&widgets, "tab 1 jewelry\n").await;
        assert!(out.contains(r#"class="wcls-panel is-active" role="tabpanel" data-panel="jewelry""#));
        assert_eq!(widgets.get(0).unwrap().view().active_tab, Tab::Jewelry);

        let out = exec(&widgets, "esc 1\n").await;
        assert!(out.contains(r#"aria-expanded="false""#));
        assert_eq!(widgets.get(0).unwrap().view().row_count(), 0);

        widgets.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_closes_other_widgets() {
        let widgets = page(2);
        exec(&widgets, "type 1 rolex\ntype 2 omega\n").await;

        let out = exec(&widgets, "status\n").await;
        assert!(out.contains("[1] open, 1 row(s), tab watches"));
        assert!(out.contains("[2] open, 1 row(s), tab watches"));

        let out = exec(&widgets, "click 1\n").await;
        assert!(out.contains("[1] open, 1 row(s)"));
        assert!(out.contains("[2] closed, 0 row(s)"));

        let out = exec(&widgets, "click\n").await;
        assert!(out.contains("[1] closed, 0 row(s)"));

        widgets.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_reported_and_quit_stops() {
        let widgets = page(2);

        let out = exec(&widgets, "dance\nshow 3\ntab 1 rings\nquit\ntype 1 rolex\n").await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("error: unknown command"));
        assert_eq!(lines[1], "error: no widget 3 (page has 2)");
        assert!(lines[2].starts_with("error: unknown tab"));

        // Nothing after quit ran
        sleep(Duration::from_millis(500)).await;
        assert!(!widgets.get(0).unwrap().view().expanded);

        widgets.shutdown().await;
    }
}
