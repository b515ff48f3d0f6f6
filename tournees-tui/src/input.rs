use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen, TABLE_PAGE, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
    /// Run `service.refresh`(...) for the selected source
    Refresh,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{BackTab, Char, Down, Enter, Esc, Left, PageDown, PageUp, Tab, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if key.code == Char('q') && key.modifiers.is_empty() {
        return Action::Quit;
    }

    let mut action = Action::None;

    match app.screen {
        Screen::SourceSelect => match key.code {
            Up | Char('k') => {
                app.source_list_index = app.source_list_index.saturating_sub(1);
            }
            Down | Char('j') => {
                if app.source_list_index + 1 < app.sources.len() {
                    app.source_list_index += 1;
                }
            }
            Enter | Char(' ') => {
                if app.select_current_source().is_some() {
                    action = Action::Refresh;
                }
            }
            _ => {}
        },

        Screen::Dashboard => match key.code {
            Char('k') if app.view == View::Table => app.scroll_table(-1),
            Char('j') if app.view == View::Table => app.scroll_table(1),
            PageUp => app.scroll_table(-TABLE_PAGE),
            PageDown => app.scroll_table(TABLE_PAGE),
            Up | Char('k') => app.move_cursor_up(),
            Down | Char('j') => app.move_cursor_down(),
            Tab | BackTab => app.focus = app.focus.next(),
            Char(' ') | Enter => app.toggle_focused(),
            Char('a') => app.select_all_focused(),
            Char('v') => app.view = app.view.next(),
            Char('r') => action = Action::Refresh,
            Left | Esc | Char('b') => app.back_to_sources(),
            _ => {}
        },
    }
    action
}
