//! Students, teachers and parents: account-backed resources.

use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::auth::password::hash_password_blocking;
use crate::auth::role::Viewer;
use crate::errors::AppError;
use crate::forms::{ErrorCode, FieldKind, FieldSpec, FormData, FormReader, SaveError};
use crate::i18n::Locale;
use crate::models::listing::ListSpec;
use crate::models::parent::{self, ParentInput, ParentRow};
use crate::models::person::{Profile, BLOOD_TYPES, SEXES};
use crate::models::student::{self, StudentInput, StudentRow};
use crate::models::teacher::{self, TeacherInput, TeacherRow};
use crate::models::{account, class, lookup, ResourceKind};
use crate::templates_structs::Cell;
use super::{col, sorted, ColumnDef, FilterSelect, FormMode, ResourceHandler};

// ---------- Shared person fields ----------

fn account_fields(mode: FormMode) -> Vec<FieldSpec> {
    let password = FieldSpec::new("password", FieldKind::Password);
    vec![
        FieldSpec::text("username").required(),
        if mode.is_create() { password.required() } else { password.hint("keep_password") },
    ]
}

fn profile_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("name").required(),
        FieldSpec::text("surname").required(),
        FieldSpec::new("email", FieldKind::Email),
        FieldSpec::text("phone"),
        FieldSpec::text("address").required(),
        FieldSpec::new("img", FieldKind::Url),
        FieldSpec::choice("blood_type", BLOOD_TYPES).required(),
        FieldSpec::choice("sex", SEXES).required(),
        FieldSpec::new("birthday", FieldKind::Date).required(),
    ]
}

fn read_profile(r: &mut FormReader<'_>) -> Profile {
    Profile {
        name: r.text("name", 50),
        surname: r.text("surname", 50),
        email: r.optional_email("email"),
        phone: r.optional_text("phone", 20),
        address: r.text("address", 200),
        img: r.optional_text("img", 500),
        blood_type: r.choice("blood_type", BLOOD_TYPES),
        sex: r.choice("sex", SEXES),
        birthday: r.date("birthday"),
    }
}

fn profile_data(username: &str, p: &Profile) -> FormData {
    FormData::default()
        .with("username", username)
        .with("name", &p.name)
        .with("surname", &p.surname)
        .with_opt("email", p.email.as_ref())
        .with_opt("phone", p.phone.as_ref())
        .with("address", &p.address)
        .with_opt("img", p.img.as_ref())
        .with("blood_type", &p.blood_type)
        .with("sex", &p.sex)
        .with("birthday", p.birthday.format("%Y-%m-%d"))
}

/// Hash the submitted password, if any.
async fn hash_optional(password: Option<String>) -> Result<Option<String>, SaveError> {
    match password {
        Some(p) => Ok(Some(hash_password_blocking(p).await?)),
        None => Ok(None),
    }
}

/// The password hash a new account needs.
async fn hash_required(password: Option<String>) -> Result<String, SaveError> {
    match password {
        Some(p) if !p.is_empty() => Ok(hash_password_blocking(p).await?),
        _ => Err(SaveError::field("password", ErrorCode::Required)),
    }
}

async fn person_name(pool: &PgPool, id: i64) -> Result<String, AppError> {
    account::display_name(pool, id).await?.ok_or(AppError::NotFound)
}

fn delete_account(result: Result<(), sqlx::Error>) -> Result<(), SaveError> {
    result.map_err(SaveError::from_delete)
}

// ---------- Students ----------

pub struct Students;

impl From<student::WriteError> for SaveError {
    fn from(e: student::WriteError) -> Self {
        match e {
            student::WriteError::ClassFull => SaveError::field("class_id", ErrorCode::ClassFull),
            student::WriteError::Db(e) => SaveError::from(e),
        }
    }
}

/// Read and validate a student form. The grade must equal the class grade;
/// seats are checked when the write locks the class.
async fn read_student(
    pool: &PgPool,
    data: &FormData,
    mode: FormMode,
) -> Result<(StudentInput, Option<String>), SaveError> {
    let mut r = FormReader::new(data);
    let username = r.username("username");
    let password = r.password("password", mode.is_create());
    let profile = read_profile(&mut r);
    let parent_id = r.id("parent_id");
    let class_id = r.id("class_id");
    let grade_id = r.id("grade_id");

    if !r.has_error("class_id") {
        match class::grade_of(pool, class_id).await? {
            None => r.error("class_id", ErrorCode::MissingReference),
            Some(class_grade) if !r.has_error("grade_id") && class_grade != grade_id => {
                r.error("grade_id", ErrorCode::GradeMismatch)
            }
            Some(_) => {}
        }
    }
    r.finish()?;
    Ok((StudentInput { username, profile, parent_id, class_id, grade_id }, password))
}

impl ResourceHandler for Students {
    const KIND: ResourceKind = ResourceKind::Students;
    type Row = StudentRow;

    fn spec() -> &'static ListSpec {
        &student::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("full_name", "name"),
            sorted("username", "username"),
            sorted("class", "class"),
            sorted("grade", "grade"),
            col("phone"),
            col("address"),
        ]
    }

    fn cells(row: &StudentRow, _locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        vec![
            Cell::link(format!("{} {}", row.name, row.surname), format!("/list/students/{}", row.id)),
            Cell::text(&row.username),
            Cell::text(&row.class_name),
            Cell::text(row.grade_level.to_string()),
            Cell::opt(row.phone.as_deref()),
            Cell::text(&row.address),
        ]
    }

    fn row_id(row: &StudentRow) -> i64 {
        row.id
    }

    fn detail_href(id: i64) -> Option<String> {
        Some(format!("/list/students/{id}"))
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![
            FilterSelect::new("class_id", lookup::classes(pool, viewer).await?),
            FilterSelect::new("grade_id", lookup::grades(pool).await?),
            FilterSelect::choice("sex", SEXES),
        ])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        let mut fields = account_fields(mode);
        fields.extend(profile_fields());
        fields.push(FieldSpec::select("parent_id", lookup::parents(pool, viewer).await?).required());
        fields.push(FieldSpec::select("class_id", lookup::classes(pool, viewer).await?).required());
        fields.push(FieldSpec::select("grade_id", lookup::grades(pool).await?).required());
        Ok(fields)
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let s = student::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(profile_data(&s.username, &s.profile())
            .with("parent_id", s.parent_id)
            .with("class_id", s.class_id)
            .with("grade_id", s.grade_id))
    }

    async fn create(pool: &PgPool, _viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let (input, password) = read_student(pool, data, FormMode::Create).await?;
        let hash = hash_required(password).await?;
        Ok(student::create(pool, &input, &hash).await?)
    }

    async fn update(pool: &PgPool, _viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let (input, password) = read_student(pool, data, FormMode::Edit).await?;
        let hash = hash_optional(password).await?;
        Ok(student::update(pool, id, &input, hash.as_deref()).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        delete_account(account::delete(pool, id).await)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        person_name(pool, id).await
    }
}

// ---------- Teachers ----------

pub struct Teachers;

fn read_teacher(data: &FormData, mode: FormMode) -> Result<(TeacherInput, Option<String>), SaveError> {
    let mut r = FormReader::new(data);
    let username = r.username("username");
    let password = r.password("password", mode.is_create());
    let profile = read_profile(&mut r);
    let subject_ids = r.ids("subject_ids");
    r.finish()?;
    Ok((TeacherInput { username, profile, subject_ids }, password))
}

impl ResourceHandler for Teachers {
    const KIND: ResourceKind = ResourceKind::Teachers;
    type Row = TeacherRow;

    fn spec() -> &'static ListSpec {
        &teacher::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("full_name", "name"),
            sorted("username", "username"),
            col("subjects"),
            col("classes"),
            col("phone"),
            col("address"),
        ]
    }

    fn cells(row: &TeacherRow, _locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        vec![
            Cell::link(format!("{} {}", row.name, row.surname), format!("/list/teachers/{}", row.id)),
            Cell::text(&row.username),
            Cell::opt(row.subjects.as_deref()),
            Cell::opt(row.classes.as_deref()),
            Cell::opt(row.phone.as_deref()),
            Cell::text(&row.address),
        ]
    }

    fn row_id(row: &TeacherRow) -> i64 {
        row.id
    }

    fn detail_href(id: i64) -> Option<String> {
        Some(format!("/list/teachers/{id}"))
    }

    async fn filter_bar(pool: &PgPool, viewer: &Viewer) -> Result<Vec<FilterSelect>, AppError> {
        Ok(vec![
            FilterSelect::new("class_id", lookup::classes(pool, viewer).await?),
            FilterSelect::new("subject_id", lookup::subjects(pool, viewer).await?),
        ])
    }

    async fn fields(pool: &PgPool, viewer: &Viewer, mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        let mut fields = account_fields(mode);
        fields.extend(profile_fields());
        fields.push(FieldSpec::multi("subject_ids", lookup::subjects(pool, viewer).await?));
        Ok(fields)
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let t = teacher::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        let mut data = profile_data(&t.username, &t.profile());
        for subject_id in teacher::subject_ids(pool, id).await? {
            data.push("subject_ids", subject_id.to_string());
        }
        Ok(data)
    }

    async fn create(pool: &PgPool, _viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let (input, password) = read_teacher(data, FormMode::Create)?;
        let hash = hash_required(password).await?;
        Ok(teacher::create(pool, &input, &hash).await?)
    }

    async fn update(pool: &PgPool, _viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let (input, password) = read_teacher(data, FormMode::Edit)?;
        let hash = hash_optional(password).await?;
        Ok(teacher::update(pool, id, &input, hash.as_deref()).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        delete_account(account::delete(pool, id).await)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        person_name(pool, id).await
    }
}

// ---------- Parents ----------

pub struct Parents;

fn read_parent(data: &FormData, mode: FormMode) -> Result<(ParentInput, Option<String>), SaveError> {
    let mut r = FormReader::new(data);
    let input = ParentInput {
        username: r.username("username"),
        name: r.text("name", 50),
        surname: r.text("surname", 50),
        email: r.optional_email("email"),
        phone: r.text("phone", 20),
        address: r.text("address", 200),
    };
    let password = r.password("password", mode.is_create());
    r.finish()?;
    Ok((input, password))
}

impl ResourceHandler for Parents {
    const KIND: ResourceKind = ResourceKind::Parents;
    type Row = ParentRow;

    fn spec() -> &'static ListSpec {
        &parent::LIST
    }

    fn columns() -> Vec<ColumnDef> {
        vec![
            sorted("full_name", "name"),
            sorted("username", "username"),
            col("children"),
            col("phone"),
            col("address"),
        ]
    }

    fn cells(row: &ParentRow, _locale: Locale, _now: NaiveDateTime) -> Vec<Cell> {
        vec![
            Cell::text(format!("{} {}", row.name, row.surname)),
            Cell::text(&row.username),
            Cell::opt(row.children.as_deref()),
            Cell::text(&row.phone),
            Cell::text(&row.address),
        ]
    }

    fn row_id(row: &ParentRow) -> i64 {
        row.id
    }

    async fn fields(_pool: &PgPool, _viewer: &Viewer, mode: FormMode) -> Result<Vec<FieldSpec>, AppError> {
        let mut fields = account_fields(mode);
        fields.extend([
            FieldSpec::text("name").required(),
            FieldSpec::text("surname").required(),
            FieldSpec::new("email", FieldKind::Email),
            FieldSpec::text("phone").required(),
            FieldSpec::text("address").required(),
        ]);
        Ok(fields)
    }

    async fn load(pool: &PgPool, id: i64) -> Result<FormData, AppError> {
        let p = parent::find_by_id(pool, id).await?.ok_or(AppError::NotFound)?;
        Ok(FormData::default()
            .with("username", &p.username)
            .with("name", &p.name)
            .with("surname", &p.surname)
            .with_opt("email", p.email.as_ref())
            .with("phone", &p.phone)
            .with("address", &p.address))
    }

    async fn create(pool: &PgPool, _viewer: &Viewer, data: &FormData) -> Result<i64, SaveError> {
        let (input, password) = read_parent(data, FormMode::Create)?;
        let hash = hash_required(password).await?;
        Ok(parent::create(pool, &input, &hash).await?)
    }

    async fn update(pool: &PgPool, _viewer: &Viewer, id: i64, data: &FormData) -> Result<(), SaveError> {
        let (input, password) = read_parent(data, FormMode::Edit)?;
        let hash = hash_optional(password).await?;
        Ok(parent::update(pool, id, &input, hash.as_deref()).await?)
    }

    async fn delete(pool: &PgPool, id: i64) -> Result<(), SaveError> {
        delete_account(account::delete(pool, id).await)
    }

    async fn describe(pool: &PgPool, id: i64) -> Result<String, AppError> {
        person_name(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::errors::FieldError;
    use chrono::NaiveDate;

    fn errors(result: Result<(TeacherInput, Option<String>), SaveError>) -> Vec<FieldError> {
        match result {
            Err(SaveError::Invalid(errs)) => errs,
            Err(SaveError::App(e)) => panic!("unexpected app error {e}"),
            Ok(_) => vec![],
        }
    }

    fn teacher_form() -> FormData {
        FormData::default()
            .with("username", "ana_ruiz")
            .with("password", "secret123")
            .with("name", "Ana")
            .with("surname", "Ruiz")
            .with("address", "Calle Mayor 1")
            .with("blood_type", "O+")
            .with("sex", "FEMALE")
            .with("birthday", "1985-03-02")
    }

    #[test]
    fn profile_fields_round_trip_through_form_data() {
        let profile = Profile {
            name: "Ana".into(),
            surname: "Ruiz".into(),
            email: None,
            phone: Some("600111222".into()),
            address: "Calle Mayor 1".into(),
            img: None,
            blood_type: "A-".into(),
            sex: "FEMALE".into(),
            birthday: NaiveDate::from_ymd_opt(1985, 3, 2).unwrap(),
        };
        let data = profile_data("ana", &profile);
        assert_eq!(data.get("birthday"), Some("1985-03-02"));
        assert_eq!(data.get("email"), None);
        let mut r = FormReader::new(&data);
        assert_eq!(read_profile(&mut r), profile);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn teacher_form_reads_subjects() {
        let mut data = teacher_form();
        data.push("subject_ids", "3");
        data.push("subject_ids", "1");
        let (input, password) = read_teacher(&data, FormMode::Create).unwrap();
        assert_eq!(input.subject_ids, vec![3, 1]);
        assert_eq!(input.profile.full_name(), "Ana Ruiz");
        assert_eq!(password.as_deref(), Some("secret123"));
    }

    #[test]
    fn password_required_only_on_create() {
        let mut data = teacher_form();
        data.set("password", "");
        let errs = errors(read_teacher(&data, FormMode::Create));
        assert_eq!(errs, vec![FieldError::new("password", ErrorCode::Required)]);
        let (_, password) = read_teacher(&data, FormMode::Edit).unwrap();
        assert_eq!(password, None);
    }

    #[test]
    fn invalid_profile_values_are_reported() {
        let data = teacher_form().with("sex", "OTHER").with("blood_type", "Z").with("username", "a b");
        let fields: Vec<String> = errors(read_teacher(&data, FormMode::Edit))
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["username", "blood_type", "sex"]);
    }

    #[test]
    fn parent_phone_is_required() {
        let data = FormData::default()
            .with("username", "pepe")
            .with("name", "Pepe")
            .with("surname", "Gil")
            .with("address", "Calle Sol 3");
        match read_parent(&data, FormMode::Edit) {
            Err(SaveError::Invalid(errs)) => {
                assert_eq!(errs, vec![FieldError::new("phone", ErrorCode::Required)]);
            }
            _ => panic!("expected a phone error"),
        }
    }

    #[test]
    fn edit_form_hints_at_keeping_the_password() {
        let fields = account_fields(FormMode::Edit);
        assert!(!fields[1].required);
        assert_eq!(fields[1].hint, Some("keep_password"));
        assert!(account_fields(FormMode::Create)[1].required);
    }
}
