use std::path::Path;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

use crate::html;
use crate::i18n::{self, Language};
use crate::playback::{self, Toggle};
use crate::post::Post;
use crate::selection::ArchiveGrouping;

const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_SELECTED: Color = Color::Rgb(249, 226, 175);

/// Rows of the pinned post header, including the blank separator row.
pub const POST_HEADER_ROWS: u16 = 5;
/// Header row holding the narration control.
pub const NARRATION_CONTROL_ROW: u16 = 3;

enum View {
    Hidden,
    Post { post: Post, body: Text<'static> },
    Archive {
        grouping: ArchiveGrouping,
        selected: usize,
    },
}

/// Shared overlay showing one post or the archive index.
pub struct Modal {
    view: View,
    playback: playback::Handle,
    renderer: html::Renderer,
    scroll: u16,
}

impl Modal {
    pub fn new(playback: playback::Handle) -> Self {
        Self {
            view: View::Hidden,
            playback,
            renderer: html::Renderer::new(),
            scroll: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.view, View::Hidden)
    }

    pub fn current_post(&self) -> Option<&Post> {
        match &self.view {
            View::Post { post, .. } => Some(post),
            _ => None,
        }
    }

    pub fn showing_archive(&self) -> bool {
        matches!(self.view, View::Archive { .. })
    }

    pub fn scroll_offset(&self) -> u16 {
        self.scroll
    }

    /// Replaces the overlay with `post`. Any active stream is stopped before
    /// the new content is rendered.
    pub fn open_post(&mut self, post: &Post) {
        if let Some(owner) = self.playback.lock().stop_active() {
            log::debug!("modal: stopped playback for {owner} before opening {}", post.id);
        }
        let body = self.renderer.render(&post.content);
        log::debug!(
            "modal: opened {} (content length {})",
            post.id,
            post.content.len()
        );
        self.view = View::Post {
            post: post.clone(),
            body,
        };
        self.scroll = 0;
    }

    pub fn open_archive_index(&mut self, grouping: &ArchiveGrouping) {
        self.playback.lock().stop_active();
        self.view = View::Archive {
            grouping: grouping.clone(),
            selected: 0,
        };
        self.scroll = 0;
    }

    /// Hides the overlay and stops playback. Returns false when nothing was
    /// open.
    pub fn dismiss(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.playback.lock().stop_active();
        self.view = View::Hidden;
        self.scroll = 0;
        true
    }

    /// Toggles playback for the open post. `None` when no post is open.
    pub fn toggle_narration(&mut self, audio: &Path) -> Option<Toggle> {
        let View::Post { post, .. } = &self.view else {
            return None;
        };
        Some(self.playback.lock().toggle(post, audio))
    }

    pub fn is_narrating(&self) -> bool {
        self.current_post()
            .map(|post| self.playback.lock().is_playing(&post.id))
            .unwrap_or(false)
    }

    pub fn control_label(&self, lang: Language) -> &'static str {
        if self.is_narrating() {
            i18n::text(lang, "stop")
        } else {
            i18n::text(lang, "listen")
        }
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let next = i32::from(self.scroll).saturating_add(delta).max(0);
        self.scroll = u16::try_from(next).unwrap_or(u16::MAX);
    }

    pub fn archive_move(&mut self, delta: i32) {
        if let View::Archive { grouping, selected } = &mut self.view {
            let count = grouping.post_count();
            if count == 0 {
                return;
            }
            let next = (*selected as i64 + i64::from(delta)).clamp(0, count as i64 - 1);
            *selected = next as usize;
        }
    }

    pub fn archive_selected(&self) -> Option<&Post> {
        match &self.view {
            View::Archive { grouping, selected } => grouping.entries().nth(*selected),
            _ => None,
        }
    }

    /// Post listed on rendered line `line` of the archive index.
    pub fn archive_post_at(&self, line: usize) -> Option<&Post> {
        let View::Archive { grouping, .. } = &self.view else {
            return None;
        };
        let mut row = 0;
        for (idx, group) in grouping.groups().iter().enumerate() {
            if idx > 0 {
                row += 1;
            }
            row += 1;
            if line < row {
                return None;
            }
            if line < row + group.posts.len() {
                return group.posts.get(line - row);
            }
            row += group.posts.len();
        }
        None
    }

    /// Header pinned above the post body: category, title, byline and the
    /// narration control. Each entry is one row and is clipped, never
    /// wrapped, so the control stays on `NARRATION_CONTROL_ROW`.
    pub fn header(&self, lang: Language) -> Option<Text<'static>> {
        let post = self.current_post()?;
        Some(Text::from(vec![
            Line::from(Span::styled(
                post.category.clone(),
                Style::default().fg(COLOR_ACCENT),
            )),
            Line::from(Span::styled(
                post.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(
                    format!("📅 {}", post.date),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
                Span::raw("   "),
                Span::styled(
                    format!("👤 {}", post.author),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
            ]),
            Line::from(Span::styled(
                self.control_text(lang),
                Style::default().fg(COLOR_SELECTED),
            )),
        ]))
    }

    pub fn control_text(&self, lang: Language) -> String {
        format!("[ {} ]", self.control_label(lang))
    }

    pub fn title(&self, lang: Language) -> String {
        match &self.view {
            View::Hidden => String::new(),
            View::Post { post, .. } => post.category.clone(),
            View::Archive { .. } => i18n::text(lang, "archive_title").to_string(),
        }
    }

    /// Scrollable overlay content: the post body, or the archive index.
    pub fn render(&self, lang: Language) -> Text<'static> {
        match &self.view {
            View::Hidden => Text::default(),
            View::Post { body, .. } => body.clone(),
            View::Archive { grouping, selected } => render_archive(grouping, *selected, lang),
        }
    }
}

fn render_archive(grouping: &ArchiveGrouping, selected: usize, lang: Language) -> Text<'static> {
    if grouping.is_empty() {
        return Text::from(Line::from(i18n::text(lang, "archive_empty").to_string()));
    }

    let mut lines = Vec::new();
    let mut index = 0;
    for group in grouping.groups() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            group.category.clone(),
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        )));
        for post in &group.posts {
            let is_selected = index == selected;
            let marker = if is_selected { "▶ " } else { "  " };
            let style = if is_selected {
                Style::default().fg(COLOR_SELECTED)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::styled(marker.to_string(), style),
                Span::styled(
                    format!("{} ", post.date),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
                Span::styled(post.title.clone(), style),
            ]));
            index += 1;
        }
    }
    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::mock::MockBackend;
    use crate::playback::{Backend, Controller};
    use crate::selection::group;
    use std::sync::Arc;

    fn post(id: &str, category: &str) -> Post {
        Post {
            id: id.into(),
            title: format!("Title {id}"),
            category: category.into(),
            date: "December 8, 2024".into(),
            author: "VitaInspire AI".into(),
            excerpt: String::new(),
            content: format!("<h3>Heading {id}</h3><p>Body {id}</p>"),
        }
    }

    fn modal_with(backend: &Arc<MockBackend>) -> Modal {
        let backend: Arc<dyn Backend> = backend.clone();
        Modal::new(Controller::shared(Some(backend)))
    }

    fn lines(text: &Text<'_>) -> Vec<String> {
        text.lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn open_post_renders_header_and_body() {
        let backend = Arc::new(MockBackend::default());
        let mut modal = modal_with(&backend);
        modal.open_post(&post("x", "Health"));
        let header = lines(&modal.header(Language::En).unwrap());
        assert_eq!(header.len(), usize::from(NARRATION_CONTROL_ROW) + 1);
        assert_eq!(header[0], "Health");
        assert_eq!(header[1], "Title x");
        assert!(header[2].contains("December 8, 2024"));
        assert!(header[2].contains("VitaInspire AI"));
        assert_eq!(header[usize::from(NARRATION_CONTROL_ROW)], "[ 🔊 Listen ]");

        let rendered = lines(&modal.render(Language::En));
        assert!(rendered.contains(&"Heading x".to_string()));
        assert!(rendered.contains(&"Body x".to_string()));
    }

    #[test]
    fn opening_another_post_stops_active_narration_first() {
        let backend = Arc::new(MockBackend::default());
        let mut modal = modal_with(&backend);
        modal.open_post(&post("y", "Health"));
        modal.toggle_narration(Path::new("/missing/y.mp3"));
        assert!(modal.is_narrating());

        modal.open_post(&post("x", "Agri"));
        assert_eq!(
            backend.entries(),
            [
                "speak:Title y. Heading y Body y",
                "stop:speech:Title y. Heading y Body y",
            ]
        );
        assert_eq!(modal.current_post().unwrap().id, "x");
        assert!(!modal.is_narrating());
        assert_eq!(modal.control_label(Language::En), "🔊 Listen");
    }

    #[test]
    fn toggle_updates_control_label() {
        let backend = Arc::new(MockBackend::default());
        let mut modal = modal_with(&backend);
        modal.open_post(&post("x", "Health"));
        modal.toggle_narration(Path::new("/missing/x.mp3"));
        assert_eq!(modal.control_label(Language::En), "⏹ Stop");
        modal.toggle_narration(Path::new("/missing/x.mp3"));
        assert_eq!(modal.control_label(Language::En), "🔊 Listen");
    }

    #[test]
    fn dismiss_hides_and_stops() {
        let backend = Arc::new(MockBackend::default());
        let mut modal = modal_with(&backend);
        modal.open_post(&post("x", "Health"));
        modal.toggle_narration(Path::new("/missing/x.mp3"));
        assert!(modal.dismiss());
        assert!(!modal.is_open());
        assert_eq!(backend.entries().len(), 2);
        assert!(!modal.dismiss());
    }

    #[test]
    fn toggle_without_post_is_none() {
        let backend = Arc::new(MockBackend::default());
        let mut modal = modal_with(&backend);
        assert!(modal.toggle_narration(Path::new("/a.mp3")).is_none());
        modal.open_archive_index(&ArchiveGrouping::default());
        assert!(modal.toggle_narration(Path::new("/a.mp3")).is_none());
    }

    #[test]
    fn archive_index_lists_groups_and_selects_by_id() {
        let backend = Arc::new(MockBackend::default());
        let mut modal = modal_with(&backend);
        let grouping = group(&[post("1", "A"), post("2", "B"), post("3", "A")]);
        modal.open_archive_index(&grouping);
        assert!(modal.showing_archive());

        let rendered = lines(&modal.render(Language::En));
        assert_eq!(rendered[0], "A");
        assert_eq!(rendered[1], "▶ December 8, 2024 Title 1");
        assert_eq!(rendered[2], "  December 8, 2024 Title 3");
        assert_eq!(rendered[4], "B");

        modal.archive_move(1);
        assert_eq!(modal.archive_selected().unwrap().id, "3");
        modal.archive_move(10);
        assert_eq!(modal.archive_selected().unwrap().id, "2");
        modal.archive_move(-10);
        assert_eq!(modal.archive_selected().unwrap().id, "1");

        assert!(modal.archive_post_at(0).is_none());
        assert_eq!(modal.archive_post_at(1).unwrap().id, "1");
        assert_eq!(modal.archive_post_at(2).unwrap().id, "3");
        assert!(modal.archive_post_at(3).is_none());
        assert!(modal.archive_post_at(4).is_none());
        assert_eq!(modal.archive_post_at(5).unwrap().id, "2");
        assert!(modal.archive_post_at(6).is_none());
    }

    #[test]
    fn empty_archive_shows_placeholder() {
        let backend = Arc::new(MockBackend::default());
        let mut modal = modal_with(&backend);
        modal.open_archive_index(&ArchiveGrouping::default());
        assert_eq!(
            lines(&modal.render(Language::En)),
            ["No archived articles yet."]
        );
        assert!(modal.archive_selected().is_none());
    }

    #[test]
    fn scroll_never_goes_negative() {
        let backend = Arc::new(MockBackend::default());
        let mut modal = modal_with(&backend);
        modal.open_post(&post("x", "Health"));
        modal.scroll_by(-3);
        assert_eq!(modal.scroll_offset(), 0);
        modal.scroll_by(5);
        assert_eq!(modal.scroll_offset(), 5);
    }
}
