//! Department management and the doctor directory.

use super::AdminAction;
use crate::components::widgets::{self, select_next, select_previous, Confirm, Flash, Form, FormEvent};
use crate::components::Session;
use crate::models::{DepartmentSummary, Doctor, DoctorStatus};
use crate::services::admin::{self, DepartmentForm};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

const NAME: usize = 0;
const DESCRIPTION: usize = 1;

enum Mode {
    List,
    /// `editing` is `None` for a new department.
    Edit { form: Form, editing: Option<i64> },
    Doctors {
        title: String,
        doctors: Vec<Doctor>,
        state: TableState,
    },
    Search {
        query: String,
        doctors: Vec<Doctor>,
        state: TableState,
    },
}

pub struct DepartmentsView {
    session: Session,
    departments: Vec<DepartmentSummary>,
    state: TableState,
    mode: Mode,
    delete_dialog: Confirm,
    flash: Flash,
}

impl DepartmentsView {
    pub fn new(session: Session) -> Self {
        let mut view = Self {
            session,
            departments: Vec::new(),
            state: TableState::default(),
            mode: Mode::List,
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
        match admin::list_departments(&self.session.db, &self.session.identity) {
            Ok(departments) => {
                self.departments = departments;
                widgets::clamp_selection(&mut self.state, self.departments.len());
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn selected(&self) -> Option<&DepartmentSummary> {
        self.state.selected().and_then(|i| self.departments.get(i))
    }

    fn department_form() -> Form {
        Form::new(&["Name", "Description (optional)"], "Save")
    }

    fn open_doctors(&mut self) {
        let Some(summary) = self.selected() else {
            return;
        };
        let dept_no = summary.department.dept_no;
        let title = format!("Doctors in {}", summary.department.name);
        match admin::doctors_in_department(&self.session.db, &self.session.identity, dept_no) {
            Ok(doctors) => {
                let mut state = TableState::default();
                widgets::clamp_selection(&mut state, doctors.len());
                self.mode = Mode::Doctors {
                    title,
                    doctors,
                    state,
                };
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn save(&mut self) {
        let Mode::Edit { form, editing } = &self.mode else {
            return;
        };
        let department = DepartmentForm {
            name: form.value(NAME).to_string(),
            description: form.value(DESCRIPTION).to_string(),
        };
        let editing = *editing;

        let db = &self.session.db;
        let who = &self.session.identity;
        let result = match editing {
            Some(dept_no) => admin::edit_department(db, who, dept_no, &department),
            None => admin::create_department(db, who, &department).map(|_| ()),
        };
        match result {
            Ok(()) => {
                self.mode = Mode::List;
                self.flash.success(if editing.is_some() {
                    "Department updated."
                } else {
                    "Department created."
                });
                self.refresh();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn delete_selected(&mut self) {
        let Some(dept_no) = self.selected().map(|s| s.department.dept_no) else {
            return;
        };
        match admin::delete_department(&self.session.db, &self.session.identity, dept_no) {
            Ok(()) => self.flash.success("Department deleted."),
            Err(e) => self.flash.error(e.to_string()),
        }
        self.refresh();
    }

    fn run_search(&mut self) {
        let Mode::Search { query, doctors, state } = &mut self.mode else {
            return;
        };
        match admin::search_doctors(&self.session.db, &self.session.identity, query.trim()) {
            Ok(found) => {
                *doctors = found;
                widgets::clamp_selection(state, doctors.len());
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<AdminAction>> {
        if self.delete_dialog.is_open() {
            if let Some(true) = self.delete_dialog.handle_input(key) {
                self.delete_selected();
            }
            return Ok(None);
        }

        match &mut self.mode {
            Mode::Edit { form, .. } => match form.handle_input(key) {
                Some(FormEvent::Submit) => self.save(),
                Some(FormEvent::Back) => self.mode = Mode::List,
                Some(FormEvent::Edited) => self.flash.clear(),
                None => {}
            },
            Mode::Doctors { doctors, state, .. } => match key.code {
                KeyCode::Down => select_next(state, doctors.len()),
                KeyCode::Up => select_previous(state, doctors.len()),
                KeyCode::Esc => self.mode = Mode::List,
                _ => {}
            },
            Mode::Search { query, doctors, state } => match key.code {
                KeyCode::Down => select_next(state, doctors.len()),
                KeyCode::Up => select_previous(state, doctors.len()),
                KeyCode::Esc => self.mode = Mode::List,
                KeyCode::Char(c) => {
                    query.push(c);
                    self.run_search();
                }
                KeyCode::Backspace => {
                    query.pop();
                    self.run_search();
                }
                _ => {}
            },
            Mode::List => match key.code {
                KeyCode::Down => select_next(&mut self.state, self.departments.len()),
                KeyCode::Up => select_previous(&mut self.state, self.departments.len()),
                KeyCode::Enter => self.open_doctors(),
                KeyCode::Char('n') => {
                    self.mode = Mode::Edit {
                        form: Self::department_form(),
                        editing: None,
                    };
                }
                KeyCode::Char('e') => {
                    if let Some(summary) = self.selected() {
                        let mut form = Self::department_form();
                        form.set(NAME, summary.department.name.clone());
                        form.set(
                            DESCRIPTION,
                            summary.department.description.clone().unwrap_or_default(),
                        );
                        let editing = Some(summary.department.dept_no);
                        self.mode = Mode::Edit { form, editing };
                    }
                }
                KeyCode::Char('d') => {
                    if self.selected().is_some() {
                        self.delete_dialog.open();
                    }
                }
                KeyCode::Char('s') => {
                    self.mode = Mode::Search {
                        query: String::new(),
                        doctors: Vec::new(),
                        state: TableState::default(),
                    };
                    self.run_search();
                }
                KeyCode::Esc => return Ok(Some(AdminAction::Back)),
                _ => {}
            },
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

        let help = match &self.mode {
            Mode::List => {
                widgets::header(frame, layout[0], "Departments");
                self.render_departments(frame, body);
                "↑↓: Navigate | Enter: Doctors | n: New | e: Edit | d: Delete | s: Search doctors | Esc: Back"
            }
            Mode::Edit { form, editing } => {
                let title = if editing.is_some() {
                    "Edit Department"
                } else {
                    "New Department"
                };
                widgets::header(frame, layout[0], title);
                form.render(frame, widgets::centered_rect(60, 100, body));
                "Tab/↑↓: Move | Enter: Next or press button | Esc: Cancel"
            }
            Mode::Doctors {
                title,
                doctors,
                state,
            } => {
                widgets::header(frame, layout[0], title);
                render_doctors(frame, body, "Doctors", doctors, state);
                "↑↓: Navigate | Esc: Back to departments"
            }
            Mode::Search {
                query,
                doctors,
                state,
            } => {
                widgets::header(frame, layout[0], "Find a Doctor");
                let parts = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(3), Constraint::Min(5)])
                    .split(body);
                frame.render_widget(
                    Paragraph::new(query.as_str())
                        .style(Style::default().fg(widgets::TEXT))
                        .block(widgets::panel("Name contains", true)),
                    parts[0],
                );
                render_doctors(frame, parts[1], "Results", doctors, state);
                "Type to search | ↑↓: Navigate | Esc: Back to departments"
            }
        };

        self.flash.render(frame, layout[2]);
        widgets::help(frame, layout[3], help);

        let name = self
            .selected()
            .map(|s| s.department.name.as_str())
            .unwrap_or_default();
        self.delete_dialog.render(
            frame,
            "Delete Department",
            &format!("Delete the {name} department?"),
        );
    }

    fn render_departments(&self, frame: &mut Frame, area: Rect) {
        if self.departments.is_empty() {
            widgets::empty_notice(frame, area, "Departments", "No departments yet. Press n to add one.");
            return;
        }
        let rows = self.departments.iter().map(|summary| {
            Row::new(vec![
                Cell::from(summary.department.dept_no.to_string()),
                Cell::from(summary.department.name.clone()),
                Cell::from(summary.department.description.clone().unwrap_or_default()),
                Cell::from(summary.doctor_count.to_string()),
            ])
            .style(Style::default().fg(widgets::TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Percentage(30),
                Constraint::Percentage(50),
                Constraint::Min(8),
            ],
        )
        .header(widgets::table_header(&["No.", "Name", "Description", "Doctors"]))
        .block(widgets::panel("Departments", true))
        .row_highlight_style(widgets::selected_row())
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, area, &mut self.state.clone());
    }
}

fn render_doctors(frame: &mut Frame, area: Rect, title: &str, doctors: &[Doctor], state: &TableState) {
    if doctors.is_empty() {
        widgets::empty_notice(frame, area, title, "No doctors found.");
        return;
    }
    let rows = doctors.iter().map(|doctor| {
        let (status, color) = match doctor.status {
            DoctorStatus::Active => ("Active", widgets::SUCCESS),
            DoctorStatus::Left => ("Left", widgets::ERROR),
        };
        Row::new(vec![
            Cell::from(doctor.name.clone()),
            Cell::from(doctor.qualification.clone()),
            Cell::from(doctor.specialization.clone().unwrap_or_default()),
            Cell::from(format!("{:.2}", doctor.charges_per_visit)),
            Cell::from(doctor.patients_treated.to_string()),
            Cell::from(status).style(Style::default().fg(color)),
        ])
        .style(Style::default().fg(widgets::TEXT))
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(22),
            Constraint::Percentage(18),
            Constraint::Percentage(22),
            Constraint::Percentage(12),
            Constraint::Percentage(12),
            Constraint::Min(8),
        ],
    )
    .header(widgets::table_header(&[
        "Name",
        "Qualification",
        "Specialization",
        "Fee",
        "Treated",
        "Status",
    ]))
    .block(widgets::panel(title, true))
    .row_highlight_style(widgets::selected_row())
    .highlight_symbol("► ");
    frame.render_stateful_widget(table, area, &mut state.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repository;
    use crate::services::fixtures;
    use crossterm::event::KeyModifiers;
    use std::rc::Rc;

    fn press(view: &mut DepartmentsView, code: KeyCode) -> Option<AdminAction> {
        view.process_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    fn admin_view() -> (Rc<crate::db::Database>, DepartmentsView) {
        let clinic = fixtures::clinic();
        let admin = clinic.admin();
        let db = Rc::new(clinic.db);
        let view = DepartmentsView::new(Session {
            db: db.clone(),
            identity: admin,
        });
        (db, view)
    }

    #[test]
    fn create_a_department() {
        let (db, mut view) = admin_view();
        press(&mut view, KeyCode::Char('n'));
        for c in "Cardiology".chars() {
            press(&mut view, KeyCode::Char(c));
        }
        press(&mut view, KeyCode::Tab);
        press(&mut view, KeyCode::Tab);
        press(&mut view, KeyCode::Enter);

        assert!(matches!(view.mode, Mode::List));
        assert!(db.departments().find_by_name("cardiology").unwrap().is_some());
        assert_eq!(view.departments.len(), 2);
    }

    #[test]
    fn department_with_doctors_survives_delete() {
        let (db, mut view) = admin_view();
        press(&mut view, KeyCode::Char('d'));
        press(&mut view, KeyCode::Char('y'));
        assert_eq!(db.departments().list().unwrap().len(), 1);
    }

    #[test]
    fn enter_lists_the_department_doctors() {
        let (_db, mut view) = admin_view();
        press(&mut view, KeyCode::Enter);
        let Mode::Doctors { doctors, .. } = &view.mode else {
            panic!("doctor list not shown");
        };
        assert_eq!(doctors.len(), 1);
        assert_eq!(press(&mut view, KeyCode::Esc), None);
        assert_eq!(press(&mut view, KeyCode::Esc), Some(AdminAction::Back));
    }

    #[test]
    fn search_filters_as_you_type() {
        let (_db, mut view) = admin_view();
        press(&mut view, KeyCode::Char('s'));
        for c in "zzz".chars() {
            press(&mut view, KeyCode::Char(c));
        }
        let Mode::Search { doctors, .. } = &view.mode else {
            panic!("search not shown");
        };
        assert!(doctors.is_empty());
    }
}
