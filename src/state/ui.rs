//! Modal visibility flags for the tab screens.
//!
//! DESIGN
//! ======
//! Transient presentation state, never persisted and reset to defaults at
//! process start. Flags are independent except the share modal, whose
//! selected recipe id is set on open and cleared on close so a later open
//! can never reuse a stale id.

#[cfg(test)]
#[path = "ui_test.rs"]
mod tests;

/// Modal dialogs reachable from the tab screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Modal {
    Share,
    Settings,
    Friends,
    Followers,
    Notifications,
    SharedWithMe,
}

impl Modal {
    pub const ALL: [Modal; 6] = [
        Modal::Share,
        Modal::Settings,
        Modal::Friends,
        Modal::Followers,
        Modal::Notifications,
        Modal::SharedWithMe,
    ];
}

/// Modal flags plus the recipe targeted by the share modal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct UiState {
    pub share_modal_open: bool,
    pub settings_modal_open: bool,
    pub friends_modal_open: bool,
    pub followers_modal_open: bool,
    pub notifications_modal_open: bool,
    pub shared_with_me_modal_open: bool,
    pub selected_recipe_id: Option<String>,
}

impl UiState {
    #[must_use]
    pub fn is_open(&self, modal: Modal) -> bool {
        match modal {
            Modal::Share => self.share_modal_open,
            Modal::Settings => self.settings_modal_open,
            Modal::Friends => self.friends_modal_open,
            Modal::Followers => self.followers_modal_open,
            Modal::Notifications => self.notifications_modal_open,
            Modal::SharedWithMe => self.shared_with_me_modal_open,
        }
    }

    fn flag_mut(&mut self, modal: Modal) -> &mut bool {
        match modal {
            Modal::Share => &mut self.share_modal_open,
            Modal::Settings => &mut self.settings_modal_open,
            Modal::Friends => &mut self.friends_modal_open,
            Modal::Followers => &mut self.followers_modal_open,
            Modal::Notifications => &mut self.notifications_modal_open,
            Modal::SharedWithMe => &mut self.shared_with_me_modal_open,
        }
    }

    /// Open the share modal for `recipe_id`.
    pub fn open_share_modal(&mut self, recipe_id: impl Into<String>) {
        self.share_modal_open = true;
        self.selected_recipe_id = Some(recipe_id.into());
    }

    pub fn close_share_modal(&mut self) {
        self.share_modal_open = false;
        self.selected_recipe_id = None;
    }

    pub fn open_settings_modal(&mut self) {
        self.settings_modal_open = true;
    }

    pub fn close_settings_modal(&mut self) {
        self.settings_modal_open = false;
    }

    pub fn open_friends_modal(&mut self) {
        self.friends_modal_open = true;
    }

    pub fn close_friends_modal(&mut self) {
        self.friends_modal_open = false;
    }

    pub fn open_followers_modal(&mut self) {
        self.followers_modal_open = true;
    }

    pub fn close_followers_modal(&mut self) {
        self.followers_modal_open = false;
    }

    pub fn open_notifications_modal(&mut self) {
        self.notifications_modal_open = true;
    }

    pub fn close_notifications_modal(&mut self) {
        self.notifications_modal_open = false;
    }

    pub fn open_shared_with_me_modal(&mut self) {
        self.shared_with_me_modal_open = true;
    }

    pub fn close_shared_with_me_modal(&mut self) {
        self.shared_with_me_modal_open = false;
    }

    /// Open any modal except [`Modal::Share`], which needs a recipe id.
    /// Returns `false` (and changes nothing) for the share modal.
    pub fn open(&mut self, modal: Modal) -> bool {
        if modal == Modal::Share {
            return false;
        }
        *self.flag_mut(modal) = true;
        true
    }

    /// Close any modal. Closing the share modal clears the selected id.
    pub fn close(&mut self, modal: Modal) {
        if modal == Modal::Share {
            self.close_share_modal();
        } else {
            *self.flag_mut(modal) = false;
        }
    }
}
