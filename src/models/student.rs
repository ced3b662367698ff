use chrono::NaiveDate;
use sqlx::PgPool;

use crate::auth::role::Role;
use super::account;
use super::class;
use super::listing::ListSpec;
use super::person::Profile;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Students,
    select: "SELECT s.id, a.username, s.name, s.surname, s.email, s.phone, s.address, s.img, \
                    c.name AS class_name, g.level AS grade_level \
             FROM students s \
             JOIN accounts a ON a.id = s.id \
             JOIN classes c ON c.id = s.class_id \
             JOIN grades g ON g.id = s.grade_id",
    id_col: "s.id",
    fields: &[
        FilterField::id("class_id", "s.class_id"),
        FilterField::id("grade_id", "s.grade_id"),
        FilterField::id("parent_id", "s.parent_id"),
        FilterField::id_set(
            "teacher_id",
            "SELECT fl.teacher_id FROM lessons fl WHERE fl.class_id = s.class_id",
        ),
        FilterField::text("sex", "s.sex"),
    ],
    search: &["s.name", "s.surname", "a.username"],
    sorts: &[
        ("name", "s.surname || ' ' || s.name"),
        ("username", "a.username"),
        ("class", "c.name"),
        ("grade", "g.level"),
    ],
    default_sort: "name",
    default_desc: false,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentRow {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub img: Option<String>,
    pub class_name: String,
    pub grade_level: i32,
}

/// Everything the edit form shows.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentRecord {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub img: Option<String>,
    pub blood_type: String,
    pub sex: String,
    pub birthday: NaiveDate,
    pub parent_id: i64,
    pub class_id: i64,
    pub grade_id: i64,
}

impl StudentRecord {
    pub fn profile(&self) -> Profile {
        Profile {
            name: self.name.clone(),
            surname: self.surname.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            img: self.img.clone(),
            blood_type: self.blood_type.clone(),
            sex: self.sex.clone(),
            birthday: self.birthday,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentDetail {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub img: Option<String>,
    pub blood_type: String,
    pub sex: String,
    pub birthday: NaiveDate,
    pub class_id: i64,
    pub class_name: String,
    pub grade_level: i32,
    pub parent_name: String,
    pub parent_phone: String,
    pub lessons: i64,
    pub attended: i64,
    pub attendance_total: i64,
}

impl StudentDetail {
    /// Percentage of attended lessons, `None` without any records.
    pub fn attendance_rate(&self) -> Option<i64> {
        if self.attendance_total == 0 {
            None
        } else {
            Some(self.attended * 100 / self.attendance_total)
        }
    }
}

#[derive(Debug, Clone)]
pub struct StudentInput {
    pub username: String,
    pub profile: Profile,
    pub parent_id: i64,
    pub class_id: i64,
    pub grade_id: i64,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<StudentRecord>, sqlx::Error> {
    sqlx::query_as::<_, StudentRecord>(
        "SELECT s.id, a.username, s.name, s.surname, s.email, s.phone, s.address, s.img, \
                s.blood_type, s.sex, s.birthday, s.parent_id, s.class_id, s.grade_id \
         FROM students s JOIN accounts a ON a.id = s.id \
         WHERE s.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_detail(pool: &PgPool, id: i64) -> Result<Option<StudentDetail>, sqlx::Error> {
    sqlx::query_as::<_, StudentDetail>(
        "SELECT s.id, a.username, s.name, s.surname, s.email, s.phone, s.address, s.img, \
                s.blood_type, s.sex, s.birthday, s.class_id, c.name AS class_name, \
                g.level AS grade_level, p.name || ' ' || p.surname AS parent_name, \
                p.phone AS parent_phone, \
                (SELECT COUNT(*) FROM lessons l WHERE l.class_id = s.class_id) AS lessons, \
                (SELECT COUNT(*) FROM attendances ad WHERE ad.student_id = s.id AND ad.present) AS attended, \
                (SELECT COUNT(*) FROM attendances ad WHERE ad.student_id = s.id) AS attendance_total \
         FROM students s \
         JOIN accounts a ON a.id = s.id \
         JOIN classes c ON c.id = s.class_id \
         JOIN grades g ON g.id = s.grade_id \
         JOIN parents p ON p.id = s.parent_id \
         WHERE s.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// A student write that could not go through.
#[derive(Debug)]
pub enum WriteError {
    /// The target class has no free seat.
    ClassFull,
    Db(sqlx::Error),
}

impl From<sqlx::Error> for WriteError {
    fn from(e: sqlx::Error) -> Self {
        WriteError::Db(e)
    }
}

/// Create account and profile in one transaction, holding the class lock
/// until the student is seated.
pub async fn create(pool: &PgPool, input: &StudentInput, password_hash: &str) -> Result<i64, WriteError> {
    let mut tx = pool.begin().await?;
    if !class::lock_free_seat(&mut *tx, input.class_id).await? {
        return Err(WriteError::ClassFull);
    }
    let id = account::insert(&mut *tx, &input.username, password_hash, Role::Student).await?;
    let p = &input.profile;
    sqlx::query(
        "INSERT INTO students (id, name, surname, email, phone, address, img, blood_type, sex, \
                               birthday, parent_id, class_id, grade_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(id)
    .bind(&p.name)
    .bind(&p.surname)
    .bind(&p.email)
    .bind(&p.phone)
    .bind(&p.address)
    .bind(&p.img)
    .bind(&p.blood_type)
    .bind(&p.sex)
    .bind(p.birthday)
    .bind(input.parent_id)
    .bind(input.class_id)
    .bind(input.grade_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(id)
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    input: &StudentInput,
    password_hash: Option<&str>,
) -> Result<(), WriteError> {
    let mut tx = pool.begin().await?;
    let current: Option<(i64,)> = sqlx::query_as("SELECT class_id FROM students WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some((current_class,)) = current else {
        return Err(sqlx::Error::RowNotFound.into());
    };
    // Staying in the same class never needs a seat.
    if current_class != input.class_id && !class::lock_free_seat(&mut *tx, input.class_id).await? {
        return Err(WriteError::ClassFull);
    }
    account::update_credentials(&mut *tx, id, &input.username, password_hash).await?;
    let p = &input.profile;
    let result = sqlx::query(
        "UPDATE students SET name = $1, surname = $2, email = $3, phone = $4, address = $5, \
                img = $6, blood_type = $7, sex = $8, birthday = $9, parent_id = $10, \
                class_id = $11, grade_id = $12 \
         WHERE id = $13",
    )
    .bind(&p.name)
    .bind(&p.surname)
    .bind(&p.email)
    .bind(&p.phone)
    .bind(&p.address)
    .bind(&p.img)
    .bind(&p.blood_type)
    .bind(&p.sex)
    .bind(p.birthday)
    .bind(input.parent_id)
    .bind(input.class_id)
    .bind(input.grade_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound.into());
    }
    tx.commit().await?;
    Ok(())
}

pub async fn count_by_sex(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*) FILTER (WHERE sex = 'MALE'), COUNT(*) FILTER (WHERE sex = 'FEMALE') \
         FROM students",
    )
    .fetch_one(pool)
    .await
}

/// A parent's children, ordered by name.
pub async fn children_of(pool: &PgPool, parent_id: i64) -> Result<Vec<(i64, String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (i64, String, i64)>(
        "SELECT id, name || ' ' || surname, class_id FROM students \
         WHERE parent_id = $1 ORDER BY name, surname",
    )
    .bind(parent_id)
    .fetch_all(pool)
    .await
}

pub async fn class_of(pool: &PgPool, student_id: i64) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT class_id FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(c,)| c))
}
