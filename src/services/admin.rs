//! Admin portal actions and the department/doctor directory.

use crate::access::{Context, Identity};
use crate::db::{Database, Repository};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Department, DepartmentSummary, Doctor, Gender, OtherStaff};
use crate::validation::{self, ValidationError};
use log::{info, warn};

const DEPARTMENT_NAME_MAX: usize = 30;
const DEPARTMENT_DESCRIPTION_MAX: usize = 1000;
const MAX_STAFF_SALARY: f64 = 1_000_000.0;

#[derive(Debug, Clone, Default)]
pub struct DepartmentForm {
    pub name: String,
    pub description: String,
}

impl DepartmentForm {
    fn validate(&self) -> ServiceResult<(String, Option<String>)> {
        let name = validation::required("Department name", &self.name, DEPARTMENT_NAME_MAX)?;
        let description =
            validation::optional("Description", &self.description, DEPARTMENT_DESCRIPTION_MAX)?;
        Ok((name, description))
    }
}

/// New staff member as typed into the admin form.
#[derive(Debug, Clone, Default)]
pub struct StaffForm {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub designation: String,
    pub gender: String,
    pub birth_date: String,
    pub highest_qualification: String,
    pub salary: String,
}

impl StaffForm {
    fn validate(&self) -> ServiceResult<OtherStaff> {
        let gender = Gender::from_label(&self.gender)
            .ok_or_else(|| ValidationError::new("Gender must be M or F."))?;
        let birth_date = match self.birth_date.trim() {
            "" => None,
            text => Some(validation::date("Birth date", text)?),
        };
        let salary = match self.salary.trim() {
            "" => None,
            text => Some(validation::amount("Salary", text, 0.0, MAX_STAFF_SALARY)?),
        };

        Ok(OtherStaff {
            id: 0,
            name: validation::required("Name", &self.name, 30)?,
            phone: validation::optional("Phone", &self.phone, 11)?,
            address: validation::optional("Address", &self.address, 30)?,
            designation: validation::required("Designation", &self.designation, 15)?,
            gender,
            birth_date,
            highest_qualification: validation::optional(
                "Qualification",
                &self.highest_qualification,
                50,
            )?,
            salary,
        })
    }
}

/// How to filter the staff list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffQuery {
    Name(String),
    Designation(String),
}

// --- Departments ---

pub fn list_departments(db: &Database, who: &Identity) -> ServiceResult<Vec<DepartmentSummary>> {
    Context::new(who).browse_departments()?;
    Ok(db.departments().list_with_counts()?)
}

pub fn create_department(db: &Database, who: &Identity, form: &DepartmentForm) -> ServiceResult<i64> {
    let (name, description) = form.validate()?;
    Context::new(who).manage_departments()?;

    let departments = db.departments();
    if departments.find_by_name(&name)?.is_some() {
        return Err(ServiceError::DuplicateDepartment(name));
    }

    let dept_no = departments.add(&Department {
        dept_no: 0,
        name,
        description,
    })?;
    info!("Department {dept_no} created by admin {}", who.user_id);
    Ok(dept_no)
}

pub fn edit_department(
    db: &Database,
    who: &Identity,
    dept_no: i64,
    form: &DepartmentForm,
) -> ServiceResult<()> {
    let (name, description) = form.validate()?;
    Context::new(who).manage_departments()?;

    let departments = db.departments();
    let mut department = departments
        .get(dept_no)?
        .ok_or(ServiceError::NotFound("Department"))?;
    if let Some(existing) = departments.find_by_name(&name)? {
        if existing.dept_no != dept_no {
            return Err(ServiceError::DuplicateDepartment(name));
        }
    }

    department.name = name;
    department.description = description;
    departments.update(&department)?;
    info!("Department {dept_no} edited by admin {}", who.user_id);
    Ok(())
}

/// Removes a department that has no doctors assigned.
pub fn delete_department(db: &Database, who: &Identity, dept_no: i64) -> ServiceResult<()> {
    Context::new(who).manage_departments()?;

    db.transaction(|work| {
        let departments = work.departments();
        if departments.get(dept_no)?.is_none() {
            return Err(ServiceError::NotFound("Department"));
        }

        let doctors = departments.doctor_count(dept_no)?;
        if doctors > 0 {
            warn!("Refusing to delete department {dept_no}: {doctors} doctor(s) assigned");
            return Err(ServiceError::DepartmentInUse(doctors));
        }

        departments.delete(dept_no)?;
        Ok(())
    })?;

    info!("Department {dept_no} deleted by admin {}", who.user_id);
    Ok(())
}

// --- Doctor directory ---

pub fn doctors_in_department(db: &Database, who: &Identity, dept_no: i64) -> ServiceResult<Vec<Doctor>> {
    Context::new(who).browse_doctors()?;
    if db.departments().get(dept_no)?.is_none() {
        return Err(ServiceError::NotFound("Department"));
    }
    Ok(db.doctors().by_department(dept_no)?)
}

pub fn search_doctors(db: &Database, who: &Identity, name: &str) -> ServiceResult<Vec<Doctor>> {
    Context::new(who).browse_doctors()?;
    Ok(db.doctors().search_by_name(name)?)
}

// --- Other staff ---

pub fn list_staff(db: &Database, who: &Identity) -> ServiceResult<Vec<OtherStaff>> {
    Context::new(who).browse_staff()?;
    Ok(db.staff().list()?)
}

pub fn search_staff(db: &Database, who: &Identity, query: &StaffQuery) -> ServiceResult<Vec<OtherStaff>> {
    Context::new(who).browse_staff()?;
    let staff = db.staff();
    Ok(match query {
        StaffQuery::Name(name) => staff.search_by_name(name)?,
        StaffQuery::Designation(designation) => staff.by_designation(designation)?,
    })
}

pub fn add_staff(db: &Database, who: &Identity, form: &StaffForm) -> ServiceResult<i64> {
    let member = form.validate()?;
    Context::new(who).manage_staff()?;

    let id = db.staff().add(&member)?;
    info!("Staff member {id} added by admin {}", who.user_id);
    Ok(id)
}

pub fn remove_staff(db: &Database, who: &Identity, staff_id: i64) -> ServiceResult<()> {
    Context::new(who).manage_staff()?;

    if !db.staff().delete(staff_id)? {
        return Err(ServiceError::NotFound("Staff member"));
    }
    info!("Staff member {staff_id} removed by admin {}", who.user_id);
    Ok(())
}
