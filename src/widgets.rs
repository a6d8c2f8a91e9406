use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::dom::{Dom, NodeId};
use crate::schedule::{Scheduler, TaskKind};
use crate::selector::{query_all, query_one};
use crate::Result;

const DEFAULT_DISMISS_TIMEOUT_MS: i64 = 5000;
const ALERT_REMOVE_DELAY_MS: i64 = 200;

/// Dropdown behavior is pluggable: pages running alongside a third-party
/// widget library register toggles with it and stay out of the way, while
/// bare pages get a minimal click-toggle with outside-click close.
pub(crate) trait DropdownStrategy: fmt::Debug {
    fn register(&mut self, dom: &Dom, toggle: NodeId) -> Result<()>;

    /// Reacts to a click on a registered toggle. Returns `true` when this
    /// strategy owns the toggle.
    fn on_toggle_click(&mut self, dom: &mut Dom, toggle: NodeId) -> Result<bool>;

    /// Reacts to any document click so open menus can close when the click
    /// landed outside both the toggle and the menu.
    fn on_document_click(&mut self, dom: &mut Dom, target: NodeId) -> Result<()>;
}

/// Records registrations and defers all behavior to the external library.
#[derive(Debug, Default)]
pub(crate) struct LibraryDropdowns {
    instances: HashSet<NodeId>,
}

impl DropdownStrategy for LibraryDropdowns {
    fn register(&mut self, _dom: &Dom, toggle: NodeId) -> Result<()> {
        self.instances.insert(toggle);
        Ok(())
    }

    fn on_toggle_click(&mut self, _dom: &mut Dom, toggle: NodeId) -> Result<bool> {
        Ok(self.instances.contains(&toggle))
    }

    fn on_document_click(&mut self, _dom: &mut Dom, _target: NodeId) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FallbackDropdowns {
    menus: HashMap<NodeId, NodeId>,
}

impl DropdownStrategy for FallbackDropdowns {
    fn register(&mut self, dom: &Dom, toggle: NodeId) -> Result<()> {
        if let Some(menu) = dom.next_element_sibling(toggle) {
            self.menus.insert(toggle, menu);
        }
        Ok(())
    }

    fn on_toggle_click(&mut self, dom: &mut Dom, toggle: NodeId) -> Result<bool> {
        let Some(&menu) = self.menus.get(&toggle) else {
            return Ok(false);
        };
        dom.toggle_class(menu, "show")?;
        Ok(true)
    }

    fn on_document_click(&mut self, dom: &mut Dom, target: NodeId) -> Result<()> {
        for (&toggle, &menu) in &self.menus {
            if !dom.has_class(menu, "show") {
                continue;
            }
            if dom.contains(toggle, target) || dom.contains(menu, target) {
                continue;
            }
            dom.remove_class(menu, "show")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct AlertController {
    initialized: HashSet<NodeId>,
    close_buttons: HashMap<NodeId, NodeId>,
}

impl AlertController {
    pub(crate) fn scan(
        &mut self,
        dom: &mut Dom,
        sched: &mut Scheduler,
        scope: NodeId,
    ) -> Result<()> {
        for alert in query_all(dom, scope, ".alert")? {
            if !self.initialized.insert(alert) {
                continue;
            }
            if let Some(button) = query_one(dom, alert, r#"[data-bs-dismiss="alert"]"#)? {
                self.close_buttons.insert(button, alert);
            }
            let timeout = dom
                .attr(alert, "data-dismiss-timeout")
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .unwrap_or(DEFAULT_DISMISS_TIMEOUT_MS);
            if timeout > 0 {
                sched.schedule(TaskKind::AlertDismiss(alert), timeout, None);
            }
        }
        Ok(())
    }

    /// Returns `true` when the click hit a close button (possibly through a
    /// descendant, e.g. an icon inside the button).
    pub(crate) fn handle_click(
        &mut self,
        dom: &mut Dom,
        sched: &mut Scheduler,
        target: NodeId,
    ) -> Result<bool> {
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if let Some(&alert) = self.close_buttons.get(&node) {
                dismiss_alert(dom, sched, alert)?;
                return Ok(true);
            }
            cursor = dom.parent(node);
        }
        Ok(false)
    }
}

pub(crate) fn dismiss_alert(dom: &mut Dom, sched: &mut Scheduler, alert: NodeId) -> Result<()> {
    if !dom.is_connected(alert) {
        return Ok(());
    }
    dom.remove_class(alert, "show")?;
    sched.schedule(TaskKind::AlertRemove(alert), ALERT_REMOVE_DELAY_MS, None);
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct FormLoadingState {
    was_disabled: HashMap<NodeId, bool>,
}

/// Marks the submit button of an in-flight partial-update form, remembering
/// whether it was disabled before so an already-disabled button is not
/// re-enabled when the request settles.
pub(crate) fn set_loading_state(
    dom: &mut Dom,
    state: &mut FormLoadingState,
    form: NodeId,
    is_loading: bool,
) -> Result<()> {
    let Some(button) = query_one(dom, form, "button")? else {
        return Ok(());
    };
    if is_loading {
        state.was_disabled.insert(button, dom.has_attr(button, "disabled"));
        dom.add_class(button, "is-loading")?;
        dom.set_attr(button, "disabled", "true")?;
    } else {
        dom.remove_class(button, "is-loading")?;
        if !state.was_disabled.remove(&button).unwrap_or(false) {
            dom.remove_attr(button, "disabled")?;
        }
    }
    Ok(())
}
