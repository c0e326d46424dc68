/******************************************************************************
 *                                                                            *
 * Stash hide/surface control. Anyone nearby may surface a hidden stash; a   *
 * visible stash may only be hidden by whoever placed it or last surfaced    *
 * it. The server enforces both, the client only decides what to offer.      *
 *                                                                            *
 ******************************************************************************/

use crate::container_entities::StashRecord;
use crate::error::DispatchError;
use crate::models::ContainerType;
use crate::reducer_names::{OperationKind, ReducerTarget};
use crate::remote::ReducerCall;
use crate::transfer_dispatch::{ArgValues, TransferDispatcher};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisibilityAction {
    Surface,
    Hide,
}

impl VisibilityAction {
    pub fn label(&self) -> &'static str {
        match self {
            VisibilityAction::Surface => "Surface",
            VisibilityAction::Hide => "Hide",
        }
    }
}

/// What the toggle would do given the stash's current state.
pub fn visibility_action(stash: &StashRecord) -> VisibilityAction {
    if stash.is_hidden {
        VisibilityAction::Surface
    } else {
        VisibilityAction::Hide
    }
}

/// Whether `viewer` (hex identity) may use the toggle right now.
pub fn can_toggle_visibility(stash: &StashRecord, viewer: &str) -> bool {
    match visibility_action(stash) {
        // Surfacing is proximity-gated server-side only.
        VisibilityAction::Surface => true,
        VisibilityAction::Hide => {
            same_identity(&stash.placed_by, viewer)
                || stash
                    .last_surfaced_by
                    .as_deref()
                    .is_some_and(|surfacer| same_identity(surfacer, viewer))
        }
    }
}

fn same_identity(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.trim().trim_start_matches("0x").to_ascii_lowercase();
    strip(a) == strip(b)
}

pub fn toggle_visibility(
    dispatcher: &TransferDispatcher,
    stash: &StashRecord,
    viewer: &str,
) -> Result<ReducerCall, DispatchError> {
    if !can_toggle_visibility(stash, viewer) {
        return dispatcher.report(Err(DispatchError::NotPermitted(format!(
            "Only the owner or the last player to surface stash {} can hide it",
            stash.id
        ))));
    }
    log::debug!("[Stash] {} stash {}", visibility_action(stash).label(), stash.id);
    let values = ArgValues { container_id: Some(stash.id as u64), ..ArgValues::default() };
    dispatcher.dispatch_operation(ReducerTarget::Container(ContainerType::Stash), OperationKind::Toggle, &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container_entities::SlotFields;
    use crate::error::ErrorKind;
    use crate::test_support::RecordingInvoker;

    fn stash(is_hidden: bool, last_surfaced_by: Option<&str>) -> StashRecord {
        StashRecord {
            id: 12,
            pos_x: 0.0,
            pos_y: 0.0,
            placed_by: "0xAAAA".into(),
            is_hidden,
            last_surfaced_by: last_surfaced_by.map(str::to_string),
            slots: SlotFields::new(),
        }
    }

    #[test]
    fn anyone_can_surface_a_hidden_stash() {
        let hidden = stash(true, None);
        assert_eq!(visibility_action(&hidden), VisibilityAction::Surface);
        assert!(can_toggle_visibility(&hidden, "bbbb"));
    }

    #[test]
    fn only_placer_or_last_surfacer_can_hide() {
        let visible = stash(false, Some("cccc"));
        assert_eq!(visibility_action(&visible), VisibilityAction::Hide);
        assert!(can_toggle_visibility(&visible, "aaaa"));
        assert!(can_toggle_visibility(&visible, "0xCCCC"));
        assert!(!can_toggle_visibility(&visible, "bbbb"));
    }

    #[test]
    fn toggle_dispatches_or_refuses() {
        let invoker = RecordingInvoker::new();
        let d = TransferDispatcher::new(invoker.clone());
        let call = toggle_visibility(&d, &stash(true, None), "bbbb").unwrap();
        assert_eq!(call.reducer.as_str(), "toggleStashVisibility");

        let err = toggle_visibility(&d, &stash(false, None), "bbbb").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SemanticRejection);
        assert_eq!(invoker.calls().len(), 1);
    }
}
