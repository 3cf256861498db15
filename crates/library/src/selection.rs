//! Selection state for the on-device file list.
//!
//! [`reduce`] is the whole state machine: a pure function from the current
//! state and an action to the next state plus an optional side effect.
//! [`SelectionMachine`] applies it atomically to the published state, so
//! actions and list regenerations never interleave.

use crate::outputs::{Outputs, SideEffect};
use shelf_catalog::BookOnDisk;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    Normal,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelectAction {
    /// The user tapped a book.
    Navigate(BookOnDisk),
    /// The user tapped a book while selecting.
    Select(BookOnDisk),
    /// The user long-pressed a book.
    StartMultiSelect(BookOnDisk),
    RequestDeleteSelection,
    RequestShareSelection,
    ExitMultiSelect,
    /// Re-create the selection UI after the presentation layer was rebuilt.
    RestartMultiSelectMode,
    RequestDownloadsScreen,
}

/// The on-device books with their selection flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelectListState {
    pub items: Vec<BookOnDisk>,
    pub selected: HashSet<String>,
    pub mode: SelectionMode,
}

impl FileSelectListState {
    pub fn new(items: Vec<BookOnDisk>) -> Self {
        Self { items, ..Self::default() }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Selected books, in list order.
    pub fn selected_books(&self) -> Vec<BookOnDisk> {
        self.items.iter().filter(|item| self.is_selected(item.id())).cloned().collect()
    }

    /// Replaces the list, keeping selection flags for ids that survive.
    pub fn regenerate(&mut self, items: Vec<BookOnDisk>) {
        let ids: HashSet<&str> = items.iter().map(BookOnDisk::id).collect();
        self.selected.retain(|id| ids.contains(id.as_str()));
        self.items = items;
    }

    fn toggle(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }
}

/// Result of applying one action.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub changed: bool,
    pub effect: Option<SideEffect>,
}

impl Transition {
    fn changed() -> Self {
        Self { changed: true, effect: None }
    }

    fn effect(effect: SideEffect) -> Self {
        Self { changed: false, effect: Some(effect) }
    }
}

pub fn reduce(state: &mut FileSelectListState, action: FileSelectAction) -> Transition {
    match (state.mode, action) {
        (SelectionMode::Normal, FileSelectAction::Navigate(book)) => Transition::effect(SideEffect::OpenFile(book)),
        (SelectionMode::Multi, FileSelectAction::Navigate(book)) | (_, FileSelectAction::Select(book)) => {
            state.toggle(book.id());
            Transition::changed()
        },
        (SelectionMode::Normal, FileSelectAction::StartMultiSelect(book)) => {
            state.mode = SelectionMode::Multi;
            state.toggle(book.id());
            Transition { changed: true, effect: Some(SideEffect::StartMultiSelection) }
        },
        (SelectionMode::Multi, FileSelectAction::StartMultiSelect(_)) => Transition::default(),
        (_, FileSelectAction::RequestDeleteSelection) => {
            Transition::effect(SideEffect::DeleteFiles(state.selected_books()))
        },
        (_, FileSelectAction::RequestShareSelection) => Transition::effect(SideEffect::ShareFiles(state.selected_books())),
        (_, FileSelectAction::ExitMultiSelect) => {
            let changed = state.mode != SelectionMode::Normal || !state.selected.is_empty();
            state.mode = SelectionMode::Normal;
            state.selected.clear();
            Transition { changed, effect: None }
        },
        (_, FileSelectAction::RestartMultiSelectMode) => Transition::effect(SideEffect::StartMultiSelection),
        (_, FileSelectAction::RequestDownloadsScreen) => Transition::effect(SideEffect::NavigateToDownloads),
    }
}

/// Applies actions and list updates to the published selection state.
#[derive(Clone)]
pub(crate) struct SelectionMachine {
    outputs: Arc<Outputs>,
}

impl SelectionMachine {
    pub(crate) fn new(outputs: Arc<Outputs>) -> Self {
        Self { outputs }
    }

    pub(crate) fn dispatch(&self, action: FileSelectAction) {
        tracing::trace!(?action, "Selection action");
        let effect = self.outputs.modify_selection(|state| {
            let Transition { changed, effect } = reduce(state, action);
            (changed, effect)
        });
        if let Some(Some(effect)) = effect {
            self.outputs.side_effect(effect);
        }
    }

    pub(crate) fn current(&self) -> FileSelectListState {
        self.outputs.selection()
    }

    pub(crate) fn regenerate(&self, items: Vec<BookOnDisk>) {
        self.outputs.modify_selection(|state| {
            let before = state.selected.len();
            let changed = state.items != items;
            state.regenerate(items);
            (changed || state.selected.len() != before, ())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelf_catalog::Book;
    use tokio_util::sync::CancellationToken;

    fn book(id: &str) -> BookOnDisk {
        BookOnDisk::new(Book::new(id, id.to_uppercase()), format!("/books/{id}.zim"))
    }

    fn multi(selected: &[&str]) -> FileSelectListState {
        FileSelectListState {
            items: vec![book("a"), book("b"), book("c")],
            selected: selected.iter().map(|id| id.to_string()).collect(),
            mode: SelectionMode::Multi,
        }
    }

    #[test]
    fn test_navigate_in_normal_mode_opens_file() {
        let mut state = FileSelectListState::new(vec![book("a")]);
        let transition = reduce(&mut state, FileSelectAction::Navigate(book("a")));
        assert_eq!(transition, Transition::effect(SideEffect::OpenFile(book("a"))));
        assert_eq!(state, FileSelectListState::new(vec![book("a")]));
    }

    #[test]
    fn test_long_press_enters_multi_mode() {
        let mut state = FileSelectListState::new(vec![book("a"), book("b")]);
        let transition = reduce(&mut state, FileSelectAction::StartMultiSelect(book("b")));
        assert_eq!(transition.effect, Some(SideEffect::StartMultiSelection));
        assert_eq!(state.mode, SelectionMode::Multi);
        assert!(state.is_selected("b"));
        assert!(!state.is_selected("a"));
    }

    #[rstest]
    #[case(FileSelectAction::Navigate(book("a")))]
    #[case(FileSelectAction::Select(book("a")))]
    fn test_tap_in_multi_mode_toggles(#[case] action: FileSelectAction) {
        let mut state = multi(&["a", "b"]);
        let transition = reduce(&mut state, action.clone());
        assert_eq!(transition, Transition::changed());
        assert!(!state.is_selected("a"));
        reduce(&mut state, action);
        assert!(state.is_selected("a"));
    }

    #[test]
    fn test_deselecting_everything_stays_in_multi_mode() {
        let mut state = multi(&["a"]);
        reduce(&mut state, FileSelectAction::Select(book("a")));
        assert!(state.selected.is_empty());
        assert_eq!(state.mode, SelectionMode::Multi);
    }

    #[test]
    fn test_select_in_normal_mode_toggles_without_changing_mode() {
        let mut state = FileSelectListState::new(vec![book("a"), book("b")]);
        assert_eq!(reduce(&mut state, FileSelectAction::Select(book("a"))), Transition::changed());
        assert!(state.is_selected("a"));
        assert_eq!(state.mode, SelectionMode::Normal);

        reduce(&mut state, FileSelectAction::Select(book("a")));
        assert!(!state.is_selected("a"));
        assert_eq!(state.mode, SelectionMode::Normal);
    }

    #[test]
    fn test_delete_and_share_carry_selection_in_list_order() {
        let mut state = multi(&["c", "a"]);
        let delete = reduce(&mut state, FileSelectAction::RequestDeleteSelection);
        assert_eq!(delete.effect, Some(SideEffect::DeleteFiles(vec![book("a"), book("c")])));
        let share = reduce(&mut state, FileSelectAction::RequestShareSelection);
        assert_eq!(share.effect, Some(SideEffect::ShareFiles(vec![book("a"), book("c")])));
        assert_eq!(state, multi(&["c", "a"]));
    }

    #[test]
    fn test_exit_clears_selection() {
        let mut state = multi(&["a", "b"]);
        let transition = reduce(&mut state, FileSelectAction::ExitMultiSelect);
        assert!(transition.changed);
        assert_eq!(state.mode, SelectionMode::Normal);
        assert!(state.selected.is_empty());

        assert!(!reduce(&mut state, FileSelectAction::ExitMultiSelect).changed);
    }

    #[rstest]
    #[case(FileSelectAction::RestartMultiSelectMode, SideEffect::StartMultiSelection)]
    #[case(FileSelectAction::RequestDownloadsScreen, SideEffect::NavigateToDownloads)]
    fn test_effect_only_actions(#[case] action: FileSelectAction, #[case] expected: SideEffect) {
        let mut state = multi(&["a"]);
        assert_eq!(reduce(&mut state, action), Transition::effect(expected));
        assert_eq!(state, multi(&["a"]));
    }

    #[test]
    fn test_regenerate_keeps_surviving_selection() {
        let mut state = multi(&["a", "c"]);
        state.regenerate(vec![book("c"), book("d")]);
        assert_eq!(state.selected, HashSet::from(["c".to_string()]));
        assert_eq!(state.mode, SelectionMode::Multi);
        assert_eq!(state.items, vec![book("c"), book("d")]);
    }

    #[test]
    fn test_machine_publishes_state_and_effects() {
        let (outputs, mut view) = Outputs::new(CancellationToken::new());
        let machine = SelectionMachine::new(outputs);

        machine.regenerate(vec![book("a"), book("b")]);
        machine.dispatch(FileSelectAction::StartMultiSelect(book("a")));
        machine.regenerate(vec![book("a")]);
        machine.dispatch(FileSelectAction::RequestDeleteSelection);

        let state = view.file_select.borrow().clone();
        assert_eq!(state.items, vec![book("a")]);
        assert!(state.is_selected("a"));
        assert_eq!(view.side_effects.try_recv().unwrap(), SideEffect::StartMultiSelection);
        assert_eq!(view.side_effects.try_recv().unwrap(), SideEffect::DeleteFiles(vec![book("a")]));
    }
}
