//! Admin portal: a small menu over departments and other staff.

use crate::app::SelectedApp;
use crate::components::widgets::{self, Confirm};
use crate::components::{Component, Session};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

pub mod departments;
pub mod staff;

use departments::DepartmentsView;
use staff::StaffView;

const MENU: [&str; 3] = ["Departments & doctors", "Other staff", "Logout"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Back,
}

enum Screen {
    Menu,
    Departments(DepartmentsView),
    Staff(StaffView),
}

pub struct AdminPortal {
    session: Session,
    screen: Screen,
    selected: usize,
    logout_dialog: Confirm,
}

impl AdminPortal {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            screen: Screen::Menu,
            selected: 0,
            logout_dialog: Confirm::default(),
        }
    }

    fn handle_menu(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.selected = (self.selected + MENU.len() - 1) % MENU.len(),
            KeyCode::Down | KeyCode::Tab => self.selected = (self.selected + 1) % MENU.len(),
            KeyCode::Enter => match self.selected {
                0 => self.screen = Screen::Departments(DepartmentsView::new(self.session.clone())),
                1 => self.screen = Screen::Staff(StaffView::new(self.session.clone())),
                _ => self.logout_dialog.open(),
            },
            KeyCode::Esc => self.logout_dialog.open(),
            _ => {}
        }
    }

    fn render_menu(&self, frame: &mut Frame) {
        widgets::background(frame);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .split(frame.area());

        widgets::header(frame, layout[0], "Administration");

        let items: Vec<ListItem> = MENU
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let style = if i == self.selected {
                    Style::default()
                        .fg(widgets::FOCUS)
                        .add_modifier(Modifier::BOLD)
                } else if i == MENU.len() - 1 {
                    Style::default().fg(widgets::ERROR)
                } else {
                    Style::default().fg(widgets::TEXT)
                };
                let prefix = if i == self.selected { " ► " } else { "   " };
                ListItem::new(format!("{prefix}{item}")).style(style)
            })
            .collect();

        let area = widgets::centered_rect(40, 40, layout[1]);
        frame.render_widget(List::new(items).block(widgets::panel("Menu", true)), area);

        widgets::help(frame, layout[2], "↑↓: Navigate | Enter: Select | Esc: Logout");
    }
}

impl Component for AdminPortal {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        if self.logout_dialog.is_open() {
            if let Some(true) = self.logout_dialog.handle_input(event) {
                return Ok(Some(SelectedApp::None));
            }
            return Ok(None);
        }

        let action = match &mut self.screen {
            Screen::Menu => {
                self.handle_menu(event);
                None
            }
            Screen::Departments(view) => view.process_input(event)?,
            Screen::Staff(view) => view.process_input(event)?,
        };
        if let Some(AdminAction::Back) = action {
            self.screen = Screen::Menu;
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        match &self.screen {
            Screen::Menu => self.render_menu(frame),
            Screen::Departments(view) => view.render(frame),
            Screen::Staff(view) => view.render(frame),
        }
        self.logout_dialog
            .render(frame, "Confirm Logout", "Are you sure you want to log out?");
    }

    fn tick(&mut self) {
        match &mut self.screen {
            Screen::Menu => {}
            Screen::Departments(view) => view.tick(),
            Screen::Staff(view) => view.tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use crossterm::event::KeyModifiers;
    use std::rc::Rc;

    fn press(portal: &mut AdminPortal, code: KeyCode) -> Option<SelectedApp> {
        portal
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn menu_navigation() {
        let clinic = fixtures::clinic();
        let admin = clinic.admin();
        let mut portal = AdminPortal::new(Session {
            db: Rc::new(clinic.db),
            identity: admin,
        });

        press(&mut portal, KeyCode::Down);
        press(&mut portal, KeyCode::Enter);
        assert!(matches!(portal.screen, Screen::Staff(_)));
        press(&mut portal, KeyCode::Esc);
        assert!(matches!(portal.screen, Screen::Menu));

        press(&mut portal, KeyCode::Up);
        press(&mut portal, KeyCode::Up);
        assert_eq!(press(&mut portal, KeyCode::Enter), None);
        assert_eq!(press(&mut portal, KeyCode::Char('y')), Some(SelectedApp::None));
    }
}
