use chrono::{NaiveDate, NaiveDateTime};
use hospital_core::{
    open_db_in_memory, Appointment, BloodGroup, Doctor, FetchMode, Insurance, Patient, RepoError,
    Repository, SqliteAppointmentRepository, SqliteDoctorRepository, SqliteInsuranceRepository,
    SqlitePatientRepository, ValidationError,
};
use rusqlite::Connection;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    date(year, month, day).and_hms_opt(hour, 0, 0).unwrap()
}

fn create_doctor(conn: &Connection) -> i64 {
    let repo = SqliteDoctorRepository::try_new(conn).unwrap();
    repo.create(&Doctor::new("Meera Iyer", "Cardiology", "meera@x.com"))
        .unwrap()
        .id
        .unwrap()
}

fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_then_fetch_returns_same_fields_with_assigned_identity() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let mut patient = Patient::new("Asha Rao", "asha@x.com").with_birth_date(date(1990, 4, 2));
    patient.gender = Some("female".to_string());
    patient.blood_group = Some(BloodGroup::ONegative);

    let created = repo.create(&patient).unwrap();
    let id = created.id.unwrap();
    assert!(id > 0);

    let loaded = repo.get_by_id(id).unwrap();
    assert_eq!(loaded, created);

    let mut expected = patient;
    expected.id = Some(id);
    expected.appointments = Some(Vec::new());
    assert_eq!(loaded, expected);
}

#[test]
fn asha_rao_scenario_deletes_owned_insurance() {
    let conn = open_db_in_memory().unwrap();
    let patients = SqlitePatientRepository::try_new(&conn).unwrap();
    let insurances = SqliteInsuranceRepository::try_new(&conn).unwrap();

    let patient = Patient::new("Asha Rao", "asha@x.com")
        .with_birth_date(date(1990, 4, 2))
        .with_insurance(Insurance::new("POL-1", "Acme", date(2030, 1, 1)));
    let id = patients.create(&patient).unwrap().id.unwrap();

    let fetched = patients.get_by_id(id).unwrap();
    let insurance = fetched.insurance.as_ref().unwrap();
    let insurance_id = insurance.id.unwrap();
    assert!(insurance.created_at.is_some());
    assert_eq!(insurance.policy_number, "POL-1");
    assert_eq!(insurance.patient_id, Some(id));

    patients.delete(id).unwrap();

    assert!(matches!(
        insurances.get_by_id(insurance_id),
        Err(RepoError::NotFound {
            entity: "insurance",
            ..
        })
    ));
    assert!(matches!(
        patients.get_by_id(id),
        Err(RepoError::NotFound {
            entity: "patient",
            ..
        })
    ));
}

#[test]
fn duplicate_name_and_birth_date_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    repo.create(&Patient::new("Asha Rao", "asha@x.com").with_birth_date(date(1990, 4, 2)))
        .unwrap();
    let err = repo
        .create(&Patient::new("Asha Rao", "asha.rao@y.com").with_birth_date(date(1990, 4, 2)))
        .unwrap_err();

    match err {
        RepoError::UniquenessViolation {
            entity,
            fields,
            value,
        } => {
            assert_eq!(entity, "patient");
            assert_eq!(fields, vec!["name".to_string(), "birth_date".to_string()]);
            assert_eq!(value, "Asha Rao, 1990-04-02");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn same_name_without_birth_date_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    repo.create(&Patient::new("Asha Rao", "asha@x.com")).unwrap();
    repo.create(&Patient::new("Asha Rao", "asha.rao@y.com"))
        .unwrap();

    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn duplicate_email_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    repo.create(&Patient::new("Asha Rao", "asha@x.com")).unwrap();
    let err = repo
        .create(&Patient::new("Ravi Rao", "asha@x.com"))
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::UniquenessViolation { ref fields, ref value, .. }
            if fields == &["email".to_string()] && value == "asha@x.com"
    ));
}

#[test]
fn padded_email_cannot_bypass_email_uniqueness() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    repo.create(&Patient::new("Asha Rao", "asha@x.com")).unwrap();
    let err = repo
        .create(&Patient::new("Asha Two", " asha@x.com "))
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidEmail { entity: "patient" })
    ));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn blank_required_field_is_rejected_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let err = repo.create(&Patient::new("   ", "asha@x.com")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::RequiredFieldMissing { entity: "patient", ref field } if field == "name"
    ));

    let err = repo.create(&Patient::new("Asha Rao", "not-an-email")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidEmail { entity: "patient" })
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn create_rejects_client_supplied_identity() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let mut patient = Patient::new("Asha Rao", "asha@x.com");
    patient.id = Some(42);

    assert!(matches!(
        repo.create(&patient),
        Err(RepoError::Validation(ValidationError::IdentityAlreadyAssigned {
            id: 42,
            ..
        }))
    ));
}

#[test]
fn update_of_missing_patient_returns_not_found_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let mut ghost = Patient::new("Ghost", "ghost@x.com")
        .with_insurance(Insurance::new("POL-9", "Acme", date(2030, 1, 1)));
    ghost.id = Some(999);

    assert!(matches!(
        repo.update(&ghost),
        Err(RepoError::NotFound {
            entity: "patient",
            id: 999
        })
    ));
    assert_eq!(row_count(&conn, "patient"), 0);
    assert_eq!(row_count(&conn, "insurance"), 0);
}

#[test]
fn update_without_identity_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.update(&Patient::new("Asha Rao", "asha@x.com")),
        Err(RepoError::MissingIdentity("patient"))
    ));
}

#[test]
fn update_rewrites_fields_and_inline_insurance() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let created = repo
        .create(
            &Patient::new("Asha Rao", "asha@x.com")
                .with_insurance(Insurance::new("POL-1", "Acme", date(2030, 1, 1))),
        )
        .unwrap();
    let insurance_id = created.insurance.as_ref().unwrap().id;

    let mut changed = created.clone();
    changed.name = "Asha R. Rao".to_string();
    changed.blood_group = Some(BloodGroup::AbPositive);
    if let Some(insurance) = changed.insurance.as_mut() {
        insurance.provider = "Acme Health".to_string();
    }

    let updated = repo.update(&changed).unwrap();
    assert_eq!(updated.name, "Asha R. Rao");
    assert_eq!(updated.blood_group, Some(BloodGroup::AbPositive));
    let insurance = updated.insurance.as_ref().unwrap();
    assert_eq!(insurance.id, insurance_id);
    assert_eq!(insurance.provider, "Acme Health");
    assert_eq!(row_count(&conn, "insurance"), 1);
}

#[test]
fn eager_fetch_populates_appointments_and_lazy_fetch_defers_them() {
    let conn = open_db_in_memory().unwrap();
    let doctor_id = create_doctor(&conn);
    let patients = SqlitePatientRepository::try_new(&conn).unwrap();
    let appointments = SqliteAppointmentRepository::try_new(&conn).unwrap();

    let patient_id = patients
        .create(&Patient::new("Asha Rao", "asha@x.com"))
        .unwrap()
        .id
        .unwrap();
    let later = appointments
        .create(&Appointment::new(at(2026, 5, 2, 10), patient_id, doctor_id))
        .unwrap();
    let earlier = appointments
        .create(
            &Appointment::new(at(2026, 5, 1, 9), patient_id, doctor_id).with_reason("checkup"),
        )
        .unwrap();

    assert_eq!(patients.fetch_mode(), FetchMode::Eager);
    let eager = patients.get_by_id(patient_id).unwrap();
    assert_eq!(eager.appointments(), &[earlier.clone(), later.clone()]);

    let lazy_repo = SqlitePatientRepository::try_new(&conn)
        .unwrap()
        .with_fetch_mode(FetchMode::Lazy);
    let mut lazy = lazy_repo.get_by_id(patient_id).unwrap();
    assert!(lazy.appointments.is_none());

    lazy_repo.load_appointments(&mut lazy).unwrap();
    assert_eq!(lazy.appointments, Some(vec![earlier, later]));
}

#[test]
fn lookups_find_patients_by_unique_keys() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    let asha = repo
        .create(&Patient::new("Asha Rao", "asha@x.com").with_birth_date(date(1990, 4, 2)))
        .unwrap();

    assert_eq!(repo.find_by_email("asha@x.com").unwrap(), Some(asha.clone()));
    assert_eq!(repo.find_by_email("nobody@x.com").unwrap(), None);
    assert_eq!(
        repo.find_by_name_and_birth_date("Asha Rao", date(1990, 4, 2))
            .unwrap(),
        Some(asha)
    );
    assert_eq!(
        repo.find_by_name_and_birth_date("Asha Rao", date(1991, 4, 2))
            .unwrap(),
        None
    );
    assert!(repo.exists(1).unwrap());
    assert!(!repo.exists(2).unwrap());
    assert_eq!(repo.find_by_id(2).unwrap(), None);
}

#[test]
fn find_born_between_is_inclusive_and_ordered() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePatientRepository::try_new(&conn).unwrap();

    for (name, email, birth_date) in [
        ("Cara", "cara@x.com", date(1995, 12, 31)),
        ("Asha", "asha@x.com", date(1990, 1, 1)),
        ("Bela", "bela@x.com", date(1992, 6, 15)),
        ("Dev", "dev@x.com", date(2001, 3, 3)),
    ] {
        repo.create(&Patient::new(name, email).with_birth_date(birth_date))
            .unwrap();
    }
    repo.create(&Patient::new("Eshan", "eshan@x.com")).unwrap();

    let found = repo
        .find_born_between(date(1990, 1, 1), date(1995, 12, 31))
        .unwrap();
    let names: Vec<&str> = found.iter().map(|patient| patient.name.as_str()).collect();
    assert_eq!(names, vec!["Asha", "Bela", "Cara"]);

    assert!(matches!(
        repo.find_born_between(date(2000, 1, 1), date(1990, 1, 1)),
        Err(RepoError::InvalidQuery(_))
    ));
}

#[test]
fn patient_serializes_with_iso_dates() {
    let patient = Patient::new("Asha Rao", "asha@x.com").with_birth_date(date(1990, 4, 2));
    let value = serde_json::to_value(&patient).unwrap();

    assert_eq!(value["birth_date"], "1990-04-02");
    assert_eq!(value["email"], "asha@x.com");

    let back: Patient = serde_json::from_value(value).unwrap();
    assert_eq!(back, patient);
}
