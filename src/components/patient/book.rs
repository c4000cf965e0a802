//! Booking flow: department, doctor, day, then an hourly slot.

use super::PatientAction;
use crate::components::widgets::{self, select_next, select_previous, Confirm, Flash};
use crate::components::Session;
use crate::error::ServiceError;
use crate::models::{DepartmentSummary, Doctor, DoctorStatus};
use crate::services::{admin, patient};
use crate::slots;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::calendar::{CalendarEventStore, Monthly};
use ratatui::{prelude::*, widgets::*};
use time::{Date, PrimitiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Department,
    Doctor,
    Day,
    Slot,
}

pub struct BookAppointment {
    session: Session,
    step: Step,
    departments: Vec<DepartmentSummary>,
    department_state: TableState,
    doctors: Vec<Doctor>,
    doctor_state: TableState,
    /// Every free slot of the chosen doctor in the booking window.
    free: Vec<PrimitiveDateTime>,
    window: Vec<Date>,
    day: Date,
    day_slots: Vec<PrimitiveDateTime>,
    slot_state: TableState,
    confirm: Confirm,
    flash: Flash,
}

impl BookAppointment {
    pub fn new(session: Session) -> Self {
        let today = slots::local_now().date();
        let mut book = Self {
            session,
            step: Step::Department,
            departments: Vec::new(),
            department_state: TableState::default(),
            doctors: Vec::new(),
            doctor_state: TableState::default(),
            free: Vec::new(),
            window: slots::window(today).collect(),
            day: today,
            day_slots: Vec::new(),
            slot_state: TableState::default(),
            confirm: Confirm::default(),
            flash: Flash::default(),
        };
        book.load_departments();
        book
    }

    pub fn tick(&mut self) {
        self.flash.expire();
    }

    fn load_departments(&mut self) {
        match admin::list_departments(&self.session.db, &self.session.identity) {
            Ok(departments) => {
                self.departments = departments;
                widgets::clamp_selection(&mut self.department_state, self.departments.len());
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn load_doctors(&mut self) -> bool {
        let Some(summary) = self
            .department_state
            .selected()
            .and_then(|i| self.departments.get(i))
        else {
            return false;
        };
        let dept_no = summary.department.dept_no;

        match admin::doctors_in_department(&self.session.db, &self.session.identity, dept_no) {
            Ok(doctors) => {
                self.doctors = doctors
                    .into_iter()
                    .filter(|d| d.status == DoctorStatus::Active)
                    .collect();
                self.doctor_state = TableState::default();
                widgets::clamp_selection(&mut self.doctor_state, self.doctors.len());
                if self.doctors.is_empty() {
                    self.flash.error("No doctors are available in this department.");
                    return false;
                }
                true
            }
            Err(e) => {
                self.flash.error(e.to_string());
                false
            }
        }
    }

    fn selected_doctor(&self) -> Option<&Doctor> {
        self.doctor_state.selected().and_then(|i| self.doctors.get(i))
    }

    fn load_slots(&mut self) -> bool {
        let Some(doctor_id) = self.selected_doctor().map(|d| d.id) else {
            return false;
        };
        let now = slots::local_now();
        match patient::available_slots(&self.session.db, &self.session.identity, doctor_id, now) {
            Ok(free) => {
                self.window = slots::window(now.date()).collect();
                self.day = free.first().map_or(now.date(), |slot| slot.date());
                self.free = free;
                self.select_day(self.day);
                if self.free.is_empty() {
                    self.flash.error("This doctor has no free slots this week.");
                    return false;
                }
                true
            }
            Err(e) => {
                self.flash.error(e.to_string());
                false
            }
        }
    }

    fn select_day(&mut self, day: Date) {
        self.day = day;
        self.day_slots = slots::slots_on(&self.free, day);
        self.slot_state = TableState::default();
        widgets::clamp_selection(&mut self.slot_state, self.day_slots.len());
    }

    fn shift_day(&mut self, forward: bool) {
        let Some(position) = self.window.iter().position(|d| *d == self.day) else {
            return;
        };
        let target = if forward {
            self.window.get(position + 1)
        } else {
            position.checked_sub(1).and_then(|p| self.window.get(p))
        };
        if let Some(day) = target.copied() {
            self.select_day(day);
        }
    }

    fn book(&mut self) -> Option<PatientAction> {
        let doctor_id = self.selected_doctor()?.id;
        let at = *self.slot_state.selected().and_then(|i| self.day_slots.get(i))?;

        match patient::book_appointment(
            &self.session.db,
            &self.session.identity,
            doctor_id,
            at,
            slots::local_now(),
        ) {
            Ok(id) => Some(PatientAction::Booked(id)),
            Err(ServiceError::SlotTaken) => {
                self.flash.error(ServiceError::SlotTaken.to_string());
                self.load_slots();
                None
            }
            Err(e) => {
                self.flash.error(e.to_string());
                None
            }
        }
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<PatientAction>> {
        if self.confirm.is_open() {
            if let Some(true) = self.confirm.handle_input(key) {
                return Ok(self.book());
            }
            return Ok(None);
        }

        match (self.step, key.code) {
            (Step::Department, KeyCode::Esc) => return Ok(Some(PatientAction::Back)),
            (Step::Doctor, KeyCode::Esc) => self.step = Step::Department,
            (Step::Day, KeyCode::Esc) => self.step = Step::Doctor,
            (Step::Slot, KeyCode::Esc) => self.step = Step::Day,

            (Step::Department, KeyCode::Down) => {
                select_next(&mut self.department_state, self.departments.len())
            }
            (Step::Department, KeyCode::Up) => {
                select_previous(&mut self.department_state, self.departments.len())
            }
            (Step::Department, KeyCode::Enter) => {
                if self.load_doctors() {
                    self.step = Step::Doctor;
                }
            }

            (Step::Doctor, KeyCode::Down) => select_next(&mut self.doctor_state, self.doctors.len()),
            (Step::Doctor, KeyCode::Up) => {
                select_previous(&mut self.doctor_state, self.doctors.len())
            }
            (Step::Doctor, KeyCode::Enter) => {
                if self.load_slots() {
                    self.step = Step::Day;
                }
            }

            (Step::Day, KeyCode::Right) => self.shift_day(true),
            (Step::Day, KeyCode::Left) => self.shift_day(false),
            (Step::Day, KeyCode::Enter) => {
                if self.day_slots.is_empty() {
                    self.flash.error("No free slots on this day.");
                } else {
                    self.step = Step::Slot;
                }
            }

            (Step::Slot, KeyCode::Down) => select_next(&mut self.slot_state, self.day_slots.len()),
            (Step::Slot, KeyCode::Up) => {
                select_previous(&mut self.slot_state, self.day_slots.len())
            }
            (Step::Slot, KeyCode::Enter) => {
                if self.slot_state.selected().is_some() {
                    self.confirm.open();
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
                Constraint::Min(12),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let title = match self.step {
            Step::Department => "Book an Appointment: Choose a Department",
            Step::Doctor => "Book an Appointment: Choose a Doctor",
            Step::Day => "Book an Appointment: Choose a Day",
            Step::Slot => "Book an Appointment: Choose a Time",
        };
        widgets::header(frame, layout[0], title);

        let body = layout[1].inner(Margin {
            vertical: 1,
            horizontal: 2,
        });
        match self.step {
            Step::Department => self.render_departments(frame, body),
            Step::Doctor => self.render_doctors(frame, body),
            Step::Day | Step::Slot => self.render_schedule(frame, body),
        }

        self.flash.render(frame, layout[2]);
        let help = match self.step {
            Step::Day => "←→: Change day | Enter: Show times | Esc: Back",
            _ => "↑↓: Navigate | Enter: Select | Esc: Back",
        };
        widgets::help(frame, layout[3], help);

        if let Some(at) = self.slot_state.selected().and_then(|i| self.day_slots.get(i)) {
            let doctor = self.selected_doctor().map(|d| d.name.as_str()).unwrap_or_default();
            self.confirm.render(
                frame,
                "Confirm Booking",
                &format!("Request {} with Dr. {doctor}?", widgets::format_slot(*at)),
            );
        }
    }

    fn render_departments(&self, frame: &mut Frame, area: Rect) {
        if self.departments.is_empty() {
            widgets::empty_notice(frame, area, "Departments", "No departments yet.");
            return;
        }
        let rows = self.departments.iter().map(|summary| {
            Row::new(vec![
                Cell::from(summary.department.name.clone()),
                Cell::from(summary.department.description.clone().unwrap_or_default()),
                Cell::from(summary.doctor_count.to_string()),
            ])
            .style(Style::default().fg(widgets::TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(55),
                Constraint::Percentage(15),
            ],
        )
        .header(widgets::table_header(&["Department", "Description", "Doctors"]))
        .block(widgets::panel("Departments", true))
        .row_highlight_style(widgets::selected_row())
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, area, &mut self.department_state.clone());
    }

    fn render_doctors(&self, frame: &mut Frame, area: Rect) {
        let rows = self.doctors.iter().map(|doctor| {
            Row::new(vec![
                Cell::from(doctor.name.clone()),
                Cell::from(doctor.qualification.clone()),
                Cell::from(doctor.specialization.clone().unwrap_or_default()),
                Cell::from(
                    doctor
                        .work_experience
                        .map(|years| format!("{years} yrs"))
                        .unwrap_or_default(),
                ),
                Cell::from(format!("{:.2}", doctor.charges_per_visit)),
            ])
            .style(Style::default().fg(widgets::TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(25),
                Constraint::Percentage(20),
                Constraint::Percentage(25),
                Constraint::Percentage(12),
                Constraint::Percentage(18),
            ],
        )
        .header(widgets::table_header(&[
            "Doctor",
            "Qualification",
            "Specialization",
            "Experience",
            "Fee per visit",
        ]))
        .block(widgets::panel("Doctors", true))
        .row_highlight_style(widgets::selected_row())
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, area, &mut self.doctor_state.clone());
    }

    fn render_schedule(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(26), Constraint::Min(20)])
            .split(area);

        let mut events = CalendarEventStore::default();
        for day in &self.window {
            let style = if slots::slots_on(&self.free, *day).is_empty() {
                Style::default().fg(widgets::HELP)
            } else {
                Style::default()
                    .fg(widgets::TITLE)
                    .bg(Color::Rgb(40, 120, 50))
            };
            events.add(*day, style);
        }
        events.add(
            self.day,
            Style::default()
                .fg(Color::Rgb(20, 20, 50))
                .bg(widgets::FOCUS)
                .add_modifier(Modifier::BOLD),
        );

        let calendar = Monthly::new(self.day, events)
            .block(widgets::panel(
                &format!("{} {}", self.day.month(), self.day.year()),
                self.step == Step::Day,
            ))
            .show_month_header(
                Style::default()
                    .fg(widgets::TITLE)
                    .bg(Color::Rgb(60, 60, 100))
                    .add_modifier(Modifier::BOLD),
            )
            .show_weekdays_header(
                Style::default()
                    .fg(Color::Rgb(180, 180, 250))
                    .bg(widgets::SELECTED_ROW)
                    .add_modifier(Modifier::BOLD),
            )
            .default_style(Style::default().fg(Color::DarkGray).bg(widgets::PANEL));
        frame.render_widget(calendar, columns[0]);

        let title = format!("Free times on {}", self.day);
        if self.day_slots.is_empty() {
            widgets::empty_notice(frame, columns[1], &title, "No free slots on this day.");
            return;
        }
        let rows = self.day_slots.iter().map(|slot| {
            Row::new(vec![Cell::from(format!(
                "{:02}:00 - {:02}:00",
                slot.hour(),
                slot.hour() + 1
            ))])
            .style(Style::default().fg(widgets::TEXT))
        });
        let table = Table::new(rows, [Constraint::Percentage(100)])
            .block(widgets::panel(&title, self.step == Step::Slot))
            .row_highlight_style(widgets::selected_row())
            .highlight_symbol(if self.step == Step::Slot { "► " } else { "  " });
        frame.render_stateful_widget(table, columns[1], &mut self.slot_state.clone());
    }
}
