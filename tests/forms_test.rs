//! Saves against a real database: constraint violations must come back as
//! field errors, everything else as application errors.

mod common;

use aula::auth::password;
use aula::forms::errors::{ErrorCode, FieldError};
use aula::forms::{FormData, SaveError};
use aula::handlers::resource::ResourceHandler;
use aula::handlers::resource::coursework::{Exams, Results};
use aula::handlers::resource::people::Students;
use aula::models::account;
use aula::models::attendance::{self, AttendanceInput};
use aula::models::class::{self, ClassInput};
use aula::models::grade;
use aula::models::parent::{self, ParentInput};
use aula::models::result::{self, ResultInput};
use common::*;

async fn scalar(db: &TestDb, sql: &str) -> i64 {
    let (id,): (i64,) = sqlx::query_as(sql).fetch_one(&db.pool).await.expect("Query failed");
    id
}

fn invalid(err: SaveError) -> Vec<FieldError> {
    match err {
        SaveError::Invalid(errors) => errors,
        SaveError::App(e) => panic!("expected field errors, got {e}"),
    }
}

#[tokio::test]
async fn test_class_crud_round_trip() {
    let Some(db) = TestDb::new().await else { return };
    let grades = grade::find_all(&db.pool).await.unwrap();
    assert_eq!(grades.iter().map(|g| g.level).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    let grade_id = grade::find_by_level(&db.pool, 5).await.unwrap().unwrap().id;

    let input = ClassInput { name: "5A".into(), capacity: 25, supervisor_id: None, grade_id };
    let id = class::create(&db.pool, &input).await.unwrap();
    let stored = class::find_by_id(&db.pool, id).await.unwrap().unwrap();
    assert_eq!(stored.name, "5A");
    assert_eq!(stored.capacity, 25);

    let changed = ClassInput { capacity: 30, ..input };
    class::update(&db.pool, id, &changed).await.unwrap();
    assert_eq!(class::find_by_id(&db.pool, id).await.unwrap().unwrap().capacity, 30);

    class::delete(&db.pool, id).await.unwrap();
    assert!(class::find_by_id(&db.pool, id).await.unwrap().is_none());
    assert!(matches!(class::delete(&db.pool, id).await, Err(sqlx::Error::RowNotFound)));

    db.cleanup().await;
}

#[tokio::test]
async fn test_duplicate_class_name_is_a_field_error() {
    let Some(db) = TestDb::seeded().await else { return };
    let grade_id = grade::find_by_level(&db.pool, 1).await.unwrap().unwrap().id;

    let input = ClassInput { name: "1A".into(), capacity: 10, supervisor_id: None, grade_id };
    let err = class::create(&db.pool, &input).await.unwrap_err();
    assert_eq!(invalid(SaveError::from(err)), vec![FieldError::new("name", ErrorCode::Duplicate)]);

    db.cleanup().await;
}

#[tokio::test]
async fn test_unknown_reference_is_a_field_error() {
    let Some(db) = TestDb::new().await else { return };

    let input = ClassInput { name: "9Z".into(), capacity: 10, supervisor_id: None, grade_id: 9999 };
    let err = class::create(&db.pool, &input).await.unwrap_err();
    assert_eq!(
        invalid(SaveError::from(err)),
        vec![FieldError::new("grade_id", ErrorCode::MissingReference)]
    );

    db.cleanup().await;
}

#[tokio::test]
async fn test_deleting_a_class_with_students_is_refused() {
    let Some(db) = TestDb::seeded().await else { return };
    let class_id = scalar(&db, "SELECT id FROM classes WHERE name = '1A'").await;

    let err = class::delete(&db.pool, class_id).await.unwrap_err();
    assert_eq!(invalid(SaveError::from_delete(err)), vec![FieldError::form(ErrorCode::InUse)]);
    assert!(class::find_by_id(&db.pool, class_id).await.unwrap().is_some());

    db.cleanup().await;
}

#[tokio::test]
async fn test_result_needs_exactly_one_source() {
    let Some(db) = TestDb::seeded().await else { return };
    let student_id = scalar(&db, "SELECT id FROM accounts WHERE username = 'student1'").await;

    let input = ResultInput { score: 80, exam_id: None, assignment_id: None, student_id };
    let err = result::create(&db.pool, &input).await.unwrap_err();
    assert_eq!(
        invalid(SaveError::from(err)),
        vec![FieldError::new("exam_id", ErrorCode::ExactlyOneOf("exam_id", "assignment_id"))]
    );

    db.cleanup().await;
}

#[tokio::test]
async fn test_attendance_is_recorded_once_per_day() {
    let Some(db) = TestDb::seeded().await else { return };
    let student_id = scalar(&db, "SELECT id FROM accounts WHERE username = 'student1'").await;
    let lesson_id = scalar(
        &db,
        "SELECT l.id FROM lessons l JOIN students s ON s.class_id = l.class_id \
         JOIN accounts a ON a.id = s.id WHERE a.username = 'student1' ORDER BY l.id LIMIT 1",
    )
    .await;

    let input = AttendanceInput {
        date: chrono::NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
        present: true,
        student_id,
        lesson_id,
    };
    attendance::create(&db.pool, &input).await.unwrap();
    let err = attendance::create(&db.pool, &input).await.unwrap_err();
    assert_eq!(invalid(SaveError::from(err)), vec![FieldError::new("date", ErrorCode::Duplicate)]);

    db.cleanup().await;
}

#[tokio::test]
async fn test_parent_account_lifecycle() {
    let Some(db) = TestDb::new().await else { return };
    let hash = password::hash_password("secret-pass").unwrap();
    let input = ParentInput {
        username: "ana_parent".into(),
        name: "Ana".into(),
        surname: "López".into(),
        email: None,
        phone: "699000111".into(),
        address: "Calle Sol 3".into(),
    };

    let id = parent::create(&db.pool, &input, &hash).await.unwrap();
    let acc = account::find_by_username(&db.pool, "ana_parent").await.unwrap().unwrap();
    assert_eq!(acc.id, id);
    assert_eq!(acc.role, "parent");
    assert!(password::verify_password("secret-pass", &acc.password_hash).unwrap());

    let again = ParentInput { username: "other_parent".into(), ..input.clone() };
    let err = parent::create(&db.pool, &again, &hash).await.unwrap_err();
    assert_eq!(invalid(SaveError::from(err)), vec![FieldError::new("phone", ErrorCode::Duplicate)]);
    assert!(account::find_by_username(&db.pool, "other_parent").await.unwrap().is_none());

    account::delete(&db.pool, id).await.unwrap();
    assert!(parent::find_by_id(&db.pool, id).await.unwrap().is_none());

    db.cleanup().await;
}

fn student_form(username: &str, parent_id: i64, class_id: i64, grade_id: i64) -> FormData {
    FormData::default()
        .with("username", username)
        .with("password", "secret123")
        .with("name", "Nora")
        .with("surname", "Vidal")
        .with("address", "Calle Luna 4")
        .with("blood_type", "A+")
        .with("sex", "FEMALE")
        .with("birthday", "2017-05-09")
        .with("parent_id", parent_id)
        .with("class_id", class_id)
        .with("grade_id", grade_id)
}

async fn one_seat_class(db: &TestDb) -> (i64, i64) {
    let grade_id = grade::find_by_level(&db.pool, 5).await.unwrap().unwrap().id;
    let input = ClassInput { name: "5A".into(), capacity: 1, supervisor_id: None, grade_id };
    (class::create(&db.pool, &input).await.unwrap(), grade_id)
}

#[tokio::test]
async fn test_student_grade_must_match_class() {
    let Some(db) = TestDb::seeded().await else { return };
    let admin = db.viewer(ADMIN_USER).await;
    let parent_id = db.viewer("parent1").await.user_id;
    let class_id = scalar(&db, "SELECT id FROM classes WHERE name = '1A'").await;
    let wrong_grade = grade::find_by_level(&db.pool, 2).await.unwrap().unwrap().id;

    let data = student_form("nora_vidal", parent_id, class_id, wrong_grade);
    let err = Students::create(&db.pool, &admin, &data).await.unwrap_err();
    assert_eq!(invalid(err), vec![FieldError::new("grade_id", ErrorCode::GradeMismatch)]);
    assert!(account::find_by_username(&db.pool, "nora_vidal").await.unwrap().is_none());

    db.cleanup().await;
}

#[tokio::test]
async fn test_concurrent_students_cannot_overfill_a_class() {
    let Some(db) = TestDb::seeded().await else { return };
    let admin = db.viewer(ADMIN_USER).await;
    let parent_id = db.viewer("parent1").await.user_id;
    let (class_id, grade_id) = one_seat_class(&db).await;

    let first = student_form("nora_vidal", parent_id, class_id, grade_id);
    let second = student_form("olga_vidal", parent_id, class_id, grade_id);
    let (a, b) = tokio::join!(
        Students::create(&db.pool, &admin, &first),
        Students::create(&db.pool, &admin, &second),
    );

    let (seated, refused): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(Result::is_ok);
    assert_eq!(seated.len(), 1);
    let refused = refused.into_iter().next().unwrap().unwrap_err();
    assert_eq!(invalid(refused), vec![FieldError::new("class_id", ErrorCode::ClassFull)]);

    let in_class = format!("SELECT COUNT(*) FROM students WHERE class_id = {class_id}");
    assert_eq!(scalar(&db, &in_class).await, 1);

    db.cleanup().await;
}

#[tokio::test]
async fn test_moving_into_a_full_class_is_refused_but_staying_is_not() {
    let Some(db) = TestDb::seeded().await else { return };
    let admin = db.viewer(ADMIN_USER).await;
    let parent_id = db.viewer("parent1").await.user_id;
    let (class_id, grade_id) = one_seat_class(&db).await;

    let data = student_form("nora_vidal", parent_id, class_id, grade_id);
    let nora = Students::create(&db.pool, &admin, &data).await.unwrap();
    // Saving the only student of a full class keeps her seat.
    let renamed = data.clone().with("name", "Noelia").with("password", "");
    Students::update(&db.pool, &admin, nora, &renamed).await.unwrap();

    let hugo = db.viewer("student1").await.user_id;
    let moved = student_form("student1", parent_id, class_id, grade_id).with("password", "");
    let err = Students::update(&db.pool, &admin, hugo, &moved).await.unwrap_err();
    assert_eq!(invalid(err), vec![FieldError::new("class_id", ErrorCode::ClassFull)]);
    let still_in_1a = format!("SELECT COUNT(*) FROM students s JOIN classes c ON c.id = s.class_id \
                               WHERE s.id = {hugo} AND c.name = '1A'");
    assert_eq!(scalar(&db, &still_in_1a).await, 1);

    db.cleanup().await;
}

#[tokio::test]
async fn test_teacher_writes_only_to_own_lessons() {
    let Some(db) = TestDb::seeded().await else { return };
    let teacher = db.viewer("teacher1").await;
    let own_lesson = scalar(
        &db,
        &format!("SELECT id FROM lessons WHERE teacher_id = {} ORDER BY id LIMIT 1", teacher.user_id),
    )
    .await;
    let other_lesson = scalar(
        &db,
        &format!("SELECT id FROM lessons WHERE teacher_id <> {} ORDER BY id LIMIT 1", teacher.user_id),
    )
    .await;
    let exam = |lesson_id: i64| {
        FormData::default()
            .with("title", "Control")
            .with("start_time", "2030-03-04T09:00")
            .with("end_time", "2030-03-04T10:00")
            .with("lesson_id", lesson_id)
    };

    let err = Exams::create(&db.pool, &teacher, &exam(other_lesson)).await.unwrap_err();
    assert_eq!(invalid(err), vec![FieldError::new("lesson_id", ErrorCode::NotAllowed)]);
    assert!(Exams::create(&db.pool, &teacher, &exam(own_lesson)).await.is_ok());

    db.cleanup().await;
}

#[tokio::test]
async fn test_teacher_cannot_grade_another_teachers_exam() {
    let Some(db) = TestDb::seeded().await else { return };
    let teacher = db.viewer("teacher1").await;
    let (foreign_exam, student_id): (i64, i64) = sqlx::query_as(
        "SELECT e.id, s.id FROM exams e JOIN lessons l ON l.id = e.lesson_id \
         JOIN students s ON s.class_id = l.class_id \
         WHERE l.teacher_id <> $1 \
           AND s.class_id IN (SELECT class_id FROM lessons WHERE teacher_id = $1) \
         ORDER BY e.id, s.id LIMIT 1",
    )
    .bind(teacher.user_id)
    .fetch_one(&db.pool)
    .await
    .unwrap();

    let data = FormData::default()
        .with("score", 70)
        .with("exam_id", foreign_exam)
        .with("student_id", student_id);
    let err = Results::create(&db.pool, &teacher, &data).await.unwrap_err();
    assert_eq!(invalid(err), vec![FieldError::new("exam_id", ErrorCode::NotAllowed)]);

    db.cleanup().await;
}
