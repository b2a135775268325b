use crate::transport::ReplyKeyboard;

/// Literal tokens the conversation controller treats specially.
pub const BACK: &str = "Indietro";
pub const CANCEL: &str = "Annulla";

/// Top-level menu labels.
pub const MENU_EVENTS: &str = "Eventi";
pub const MENU_MY_TICKETS: &str = "I tuoi biglietti";
pub const MENU_ADD_EVENT: &str = "Aggiungi Evento";
pub const MENU_REMOVE_EVENT: &str = "Rimuovi Evento";
pub const MENU_ADD_FROM_POST: &str = "Aggiungi Evento Da Post";

pub fn main_keyboard() -> ReplyKeyboard {
    vec![
        vec![MENU_EVENTS.to_string(), MENU_MY_TICKETS.to_string()],
        vec![MENU_ADD_EVENT.to_string(), MENU_REMOVE_EVENT.to_string()],
        vec![MENU_ADD_FROM_POST.to_string()],
    ]
}

pub fn wizard_keyboard() -> ReplyKeyboard {
    vec![vec![BACK.to_string(), CANCEL.to_string()]]
}

/// Entry states have nothing to go back to.
pub fn wizard_keyboard_no_back() -> ReplyKeyboard {
    vec![vec![CANCEL.to_string()]]
}
