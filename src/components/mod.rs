use crate::access::Identity;
use crate::db::Database;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;
use std::rc::Rc;

pub mod admin;
pub mod doctor;
pub mod login;
pub mod patient;
pub mod register;
pub mod visits;
pub mod widgets;

pub trait Component {
    /// `Some(SelectedApp::None)` hands control back to the login screen.
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<crate::app::SelectedApp>>;
    fn render(&self, frame: &mut Frame);
    /// Called on every idle tick.
    fn tick(&mut self) {}
}

/// The logged-in user and the store every portal screen talks to.
#[derive(Clone)]
pub struct Session {
    pub db: Rc<Database>,
    pub identity: Identity,
}
