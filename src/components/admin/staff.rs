//! Non-medical staff: list, search, add and remove.

use super::AdminAction;
use crate::components::widgets::{self, select_next, select_previous, Confirm, Flash, Form, FormEvent};
use crate::components::Session;
use crate::models::OtherStaff;
use crate::services::admin::{self, StaffForm, StaffQuery};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

// Focus positions on the list screen.
const SEARCH_FIELD: usize = 0;
const STAFF_LIST: usize = 1;

const STAFF_FIELDS: [&str; 8] = [
    "Name",
    "Phone (optional)",
    "Address (optional)",
    "Designation",
    "Gender (M/F)",
    "Birth date (YYYY-MM-DD, optional)",
    "Highest qualification (optional)",
    "Salary (optional)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchBy {
    Name,
    Designation,
}

pub struct StaffView {
    session: Session,
    staff: Vec<OtherStaff>,
    state: TableState,
    search: String,
    search_by: SearchBy,
    focus: usize,
    /// Open while a new staff member is being entered.
    form: Option<Form>,
    delete_dialog: Confirm,
    flash: Flash,
}

impl StaffView {
    pub fn new(session: Session) -> Self {
        let mut view = Self {
            session,
            staff: Vec::new(),
            state: TableState::default(),
            search: String::new(),
            search_by: SearchBy::Name,
            focus: STAFF_LIST,
            form: None,
            delete_dialog: Confirm::default(),
            flash: Flash::default(),
        };
        view.refresh();
        view
    }

    pub fn tick(&mut self) {
        self.flash.expire();
    }

    fn refresh(&mut self) {
        let db = &self.session.db;
        let who = &self.session.identity;
        let query = self.search.trim();
        let result = if query.is_empty() {
            admin::list_staff(db, who)
        } else {
            let query = match self.search_by {
                SearchBy::Name => StaffQuery::Name(query.to_string()),
                SearchBy::Designation => StaffQuery::Designation(query.to_string()),
            };
            admin::search_staff(db, who, &query)
        };
        match result {
            Ok(staff) => {
                self.staff = staff;
                widgets::clamp_selection(&mut self.state, self.staff.len());
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn selected(&self) -> Option<&OtherStaff> {
        self.state.selected().and_then(|i| self.staff.get(i))
    }

    fn save(&mut self) {
        let Some(form) = &self.form else {
            return;
        };
        let member = StaffForm {
            name: form.value(0).to_string(),
            phone: form.value(1).to_string(),
            address: form.value(2).to_string(),
            designation: form.value(3).to_string(),
            gender: form.value(4).to_string(),
            birth_date: form.value(5).to_string(),
            highest_qualification: form.value(6).to_string(),
            salary: form.value(7).to_string(),
        };
        match admin::add_staff(&self.session.db, &self.session.identity, &member) {
            Ok(_) => {
                self.form = None;
                self.flash.success("Staff member added.");
                self.refresh();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected().map(|s| s.id) else {
            return;
        };
        match admin::remove_staff(&self.session.db, &self.session.identity, id) {
            Ok(()) => self.flash.success("Staff member removed."),
            Err(e) => self.flash.error(e.to_string()),
        }
        self.refresh();
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<AdminAction>> {
        if let Some(form) = &mut self.form {
            match form.handle_input(key) {
                Some(FormEvent::Submit) => self.save(),
                Some(FormEvent::Back) => self.form = None,
                Some(FormEvent::Edited) => self.flash.clear(),
                None => {}
            }
            return Ok(None);
        }
        if self.delete_dialog.is_open() {
            if let Some(true) = self.delete_dialog.handle_input(key) {
                self.delete_selected();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = if self.focus == SEARCH_FIELD {
                    STAFF_LIST
                } else {
                    SEARCH_FIELD
                };
            }
            KeyCode::Esc => return Ok(Some(AdminAction::Back)),
            _ if self.focus == SEARCH_FIELD => match key.code {
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.refresh();
                }
                KeyCode::Backspace => {
                    self.search.pop();
                    self.refresh();
                }
                KeyCode::Down | KeyCode::Enter => self.focus = STAFF_LIST,
                _ => {}
            },
            KeyCode::Down => select_next(&mut self.state, self.staff.len()),
            KeyCode::Up => select_previous(&mut self.state, self.staff.len()),
            KeyCode::Char('/') => self.focus = SEARCH_FIELD,
            KeyCode::Char('g') => {
                self.search_by = match self.search_by {
                    SearchBy::Name => SearchBy::Designation,
                    SearchBy::Designation => SearchBy::Name,
                };
                self.refresh();
            }
            KeyCode::Char('a') => self.form = Some(Form::new(&STAFF_FIELDS, "Add")),
            KeyCode::Char('d') => {
                if self.selected().is_some() {
                    self.delete_dialog.open();
                }
            }
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame) {
        widgets::background(frame);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let body = layout[1].inner(Margin {
            vertical: 1,
            horizontal: 2,
        });

        if let Some(form) = &self.form {
            widgets::header(frame, layout[0], "Add Staff Member");
            form.render(frame, widgets::centered_rect(60, 100, body));
            self.flash.render(frame, layout[2]);
            widgets::help(
                frame,
                layout[3],
                "Tab/↑↓: Move | Enter: Next or press button | Esc: Cancel",
            );
            return;
        }

        widgets::header(frame, layout[0], "Other Staff");

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(5)])
            .split(body);

        let search_title = match self.search_by {
            SearchBy::Name => "Search by name",
            SearchBy::Designation => "Search by designation",
        };
        frame.render_widget(
            Paragraph::new(self.search.as_str())
                .style(Style::default().fg(widgets::TEXT))
                .block(widgets::panel(search_title, self.focus == SEARCH_FIELD)),
            parts[0],
        );
        self.render_staff(frame, parts[1]);

        self.flash.render(frame, layout[2]);
        widgets::help(
            frame,
            layout[3],
            "Tab or /: Search | g: Name/designation | ↑↓: Navigate | a: Add | d: Delete | Esc: Back",
        );

        let name = self.selected().map(|s| s.name.as_str()).unwrap_or_default();
        self.delete_dialog.render(
            frame,
            "Remove Staff Member",
            &format!("Remove {name} from the staff list?"),
        );
    }

    fn render_staff(&self, frame: &mut Frame, area: Rect) {
        if self.staff.is_empty() {
            widgets::empty_notice(frame, area, "Staff", "No staff members found.");
            return;
        }
        let rows = self.staff.iter().map(|member| {
            Row::new(vec![
                Cell::from(member.id.to_string()),
                Cell::from(member.name.clone()),
                Cell::from(member.designation.clone()),
                Cell::from(member.gender.as_str()),
                Cell::from(member.phone.clone().unwrap_or_default()),
                Cell::from(member.highest_qualification.clone().unwrap_or_default()),
                Cell::from(member.salary.map(|s| format!("{s:.2}")).unwrap_or_default()),
            ])
            .style(Style::default().fg(widgets::TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Percentage(22),
                Constraint::Percentage(15),
                Constraint::Length(7),
                Constraint::Length(12),
                Constraint::Percentage(22),
                Constraint::Min(10),
            ],
        )
        .header(widgets::table_header(&[
            "ID",
            "Name",
            "Designation",
            "Gender",
            "Phone",
            "Qualification",
            "Salary",
        ]))
        .block(widgets::panel("Staff", self.focus == STAFF_LIST))
        .row_highlight_style(widgets::selected_row())
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, area, &mut self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repository;
    use crate::services::fixtures;
    use crossterm::event::KeyModifiers;
    use std::rc::Rc;

    fn press(view: &mut StaffView, code: KeyCode) {
        view.process_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    fn type_text(view: &mut StaffView, text: &str) {
        for c in text.chars() {
            press(view, KeyCode::Char(c));
        }
    }

    fn add(view: &mut StaffView, name: &str, designation: &str) {
        press(view, KeyCode::Char('a'));
        for value in [name, "", "", designation, "F", "", "", "2500"] {
            type_text(view, value);
            press(view, KeyCode::Tab);
        }
        press(view, KeyCode::Enter);
    }

    #[test]
    fn add_search_and_remove() {
        let clinic = fixtures::clinic();
        let admin = clinic.admin();
        let db = Rc::new(clinic.db);
        let mut view = StaffView::new(Session {
            db: db.clone(),
            identity: admin,
        });

        add(&mut view, "Amina", "Nurse");
        add(&mut view, "Bilal", "Cleaner");
        assert!(view.form.is_none());
        assert_eq!(view.staff.len(), 2);

        press(&mut view, KeyCode::Char('g'));
        press(&mut view, KeyCode::Tab);
        type_text(&mut view, "nurse");
        assert_eq!(view.staff.len(), 1);
        assert_eq!(view.staff[0].name, "Amina");

        press(&mut view, KeyCode::Enter);
        press(&mut view, KeyCode::Char('d'));
        press(&mut view, KeyCode::Char('y'));
        assert_eq!(db.staff().list().unwrap().len(), 1);
    }

    #[test]
    fn invalid_member_keeps_the_form_open() {
        let clinic = fixtures::clinic();
        let admin = clinic.admin();
        let mut view = StaffView::new(Session {
            db: Rc::new(clinic.db),
            identity: admin,
        });

        add(&mut view, "Amina", "");
        assert!(view.form.is_some());
        assert!(view.staff.is_empty());
    }
}
