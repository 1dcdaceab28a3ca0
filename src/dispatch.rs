//! Maps raw UI events to actions. Keeps key and mouse wiring out of the
//! selection, grouping and rendering logic.

use ratatui::layout::Rect;

/// Something the user activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Card(String),
    ArchiveEntry,
    ArchiveItem(String),
    NarrationToggle(String),
    CloseControl,
    Backdrop,
    ModalContent,
    BannerClose,
    LanguageToggle,
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    OpenPost(String),
    OpenArchiveIndex,
    ToggleNarration(String),
    CloseOverlay,
    DismissBanner,
    ToggleLanguage,
    None,
}

pub fn on_click(target: &Target) -> Action {
    match target {
        Target::Card(id) | Target::ArchiveItem(id) => Action::OpenPost(id.clone()),
        Target::ArchiveEntry => Action::OpenArchiveIndex,
        Target::NarrationToggle(id) => Action::ToggleNarration(id.clone()),
        Target::CloseControl | Target::Backdrop => Action::CloseOverlay,
        Target::BannerClose => Action::DismissBanner,
        Target::LanguageToggle => Action::ToggleLanguage,
        Target::ModalContent | Target::Nothing => Action::None,
    }
}

/// Escape closes the overlay; with no overlay open it does nothing.
pub fn on_escape(overlay_open: bool) -> Action {
    if overlay_open {
        Action::CloseOverlay
    } else {
        Action::None
    }
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

/// Classifies a click while the overlay is open: inside the content area it
/// belongs to the modal, anywhere else it hits the backdrop.
pub fn overlay_hit(content: Rect, close_control: Option<Rect>, column: u16, row: u16) -> Target {
    if let Some(close) = close_control {
        if contains(close, column, row) {
            return Target::CloseControl;
        }
    }
    if contains(content, column, row) {
        Target::ModalContent
    } else {
        Target::Backdrop
    }
}

/// Finds the grid target under a click. `cells` pairs each laid out card
/// (and the archive entry) with its target.
pub fn grid_hit(cells: &[(Rect, Target)], column: u16, row: u16) -> Target {
    cells
        .iter()
        .find(|(rect, _)| contains(*rect, column, row))
        .map(|(_, target)| target.clone())
        .unwrap_or(Target::Nothing)
}
