use chrono::{NaiveDate, NaiveDateTime};
use hospital_core::{
    open_db_in_memory, Appointment, Doctor, DoctorId, Patient, PatientId, RepoError, Repository,
    SqliteAppointmentRepository, SqliteDoctorRepository, SqlitePatientRepository,
    ValidationError,
};
use rusqlite::Connection;

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 5, day)
        .unwrap()
        .and_hms_milli_opt(hour, minute, 0, 250)
        .unwrap()
}

fn seed(conn: &Connection) -> (PatientId, PatientId, DoctorId, DoctorId) {
    let patients = SqlitePatientRepository::try_new(conn).unwrap();
    let doctors = SqliteDoctorRepository::try_new(conn).unwrap();

    let asha = patients
        .create(&Patient::new("Asha Rao", "asha@x.com"))
        .unwrap();
    let ravi = patients
        .create(&Patient::new("Ravi Rao", "ravi@x.com"))
        .unwrap();
    let meera = doctors
        .create(&Doctor::new("Meera Iyer", "Cardiology", "meera@x.com"))
        .unwrap();
    let kabir = doctors
        .create(&Doctor::new("Kabir Shah", "Neurology", "kabir@x.com"))
        .unwrap();

    (
        asha.id.unwrap(),
        ravi.id.unwrap(),
        meera.id.unwrap(),
        kabir.id.unwrap(),
    )
}

#[test]
fn create_preserves_time_with_milliseconds() {
    let conn = open_db_in_memory().unwrap();
    let (asha, _, meera, _) = seed(&conn);
    let repo = SqliteAppointmentRepository::try_new(&conn).unwrap();

    let appointment = Appointment::new(at(3, 14, 30), asha, meera).with_reason("follow-up");
    let created = repo.create(&appointment).unwrap();

    let mut expected = appointment;
    expected.id = created.id;
    assert_eq!(created, expected);
    assert_eq!(repo.get_by_id(created.id.unwrap()).unwrap(), expected);
}

#[test]
fn lists_are_ordered_by_time_then_id() {
    let conn = open_db_in_memory().unwrap();
    let (asha, ravi, meera, kabir) = seed(&conn);
    let repo = SqliteAppointmentRepository::try_new(&conn).unwrap();

    let third = repo.create(&Appointment::new(at(5, 9, 0), asha, meera)).unwrap();
    let first = repo.create(&Appointment::new(at(1, 9, 0), asha, kabir)).unwrap();
    let second = repo.create(&Appointment::new(at(1, 9, 0), ravi, meera)).unwrap();

    assert_eq!(
        repo.list_for_patient(asha).unwrap(),
        vec![first.clone(), third.clone()]
    );
    assert_eq!(repo.list_for_doctor(meera).unwrap(), vec![second, third]);
    assert_eq!(repo.list_for_doctor(kabir).unwrap(), vec![first]);
}

#[test]
fn moving_appointment_to_another_patient_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let (asha, ravi, meera, _) = seed(&conn);
    let repo = SqliteAppointmentRepository::try_new(&conn).unwrap();

    let created = repo.create(&Appointment::new(at(1, 9, 0), asha, meera)).unwrap();
    let mut moved = created.clone();
    moved.patient_id = ravi;

    match repo.update(&moved).unwrap_err() {
        RepoError::OwnerReassignment {
            entity,
            id,
            from_owner,
            to_owner,
        } => {
            assert_eq!(entity, "appointment");
            assert_eq!(Some(id), created.id);
            assert_eq!(from_owner, asha);
            assert_eq!(to_owner, ravi);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.get_by_id(created.id.unwrap()).unwrap(), created);
}

#[test]
fn update_can_change_doctor_time_and_reason() {
    let conn = open_db_in_memory().unwrap();
    let (asha, _, meera, kabir) = seed(&conn);
    let repo = SqliteAppointmentRepository::try_new(&conn).unwrap();

    let mut appointment = repo.create(&Appointment::new(at(1, 9, 0), asha, meera)).unwrap();
    appointment.doctor_id = kabir;
    appointment.appointment_time = at(2, 11, 15);
    appointment.reason = Some("second opinion".to_string());

    let updated = repo.update(&appointment).unwrap();
    assert_eq!(updated, appointment);
}

#[test]
fn unknown_doctor_is_a_reference_violation() {
    let conn = open_db_in_memory().unwrap();
    let (asha, _, _, _) = seed(&conn);
    let repo = SqliteAppointmentRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.create(&Appointment::new(at(1, 9, 0), asha, 404)),
        Err(RepoError::ReferenceViolation {
            entity: "appointment",
            ..
        })
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn invalid_fields_are_rejected_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let (asha, _, meera, _) = seed(&conn);
    let repo = SqliteAppointmentRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.create(&Appointment::new(at(1, 9, 0), 0, meera)),
        Err(RepoError::Validation(ValidationError::InvalidReference {
            field: "patient_id",
            ..
        }))
    ));
    assert!(matches!(
        repo.create(&Appointment::new(at(1, 9, 0), asha, meera).with_reason("x".repeat(501))),
        Err(RepoError::Validation(ValidationError::FieldTooLong {
            field: "reason",
            max: 500,
            ..
        }))
    ));
}

#[test]
fn deleting_appointment_keeps_patient() {
    let conn = open_db_in_memory().unwrap();
    let (asha, _, meera, _) = seed(&conn);
    let appointments = SqliteAppointmentRepository::try_new(&conn).unwrap();
    let patients = SqlitePatientRepository::try_new(&conn).unwrap();

    let created = appointments
        .create(&Appointment::new(at(1, 9, 0), asha, meera))
        .unwrap();
    appointments.delete(created.id.unwrap()).unwrap();

    assert!(patients.get_by_id(asha).unwrap().appointments().is_empty());
    assert!(matches!(
        appointments.delete(created.id.unwrap()),
        Err(RepoError::NotFound { .. })
    ));
}
