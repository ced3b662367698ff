use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use crate::auth::role::Role;
use super::account;
use super::listing::ListSpec;
use super::person::Profile;
use super::table_filter::FilterField;
use super::ResourceKind;

pub const LIST: ListSpec = ListSpec {
    kind: ResourceKind::Teachers,
    select: "SELECT t.id, a.username, t.name, t.surname, t.email, t.phone, t.address, t.img, \
                    (SELECT string_agg(sub.name, ', ' ORDER BY sub.name) \
                       FROM subject_teachers st JOIN subjects sub ON sub.id = st.subject_id \
                      WHERE st.teacher_id = t.id) AS subjects, \
                    (SELECT string_agg(DISTINCT tc.name, ', ') \
                       FROM lessons tl JOIN classes tc ON tc.id = tl.class_id \
                      WHERE tl.teacher_id = t.id) AS classes \
             FROM teachers t \
             JOIN accounts a ON a.id = t.id",
    id_col: "t.id",
    fields: &[
        FilterField::id_set(
            "class_id",
            "SELECT fl.class_id FROM lessons fl WHERE fl.teacher_id = t.id",
        ),
        FilterField::id_set(
            "subject_id",
            "SELECT fst.subject_id FROM subject_teachers fst WHERE fst.teacher_id = t.id",
        ),
        FilterField::text("sex", "t.sex"),
    ],
    search: &["t.name", "t.surname", "a.username"],
    sorts: &[
        ("name", "t.surname || ' ' || t.name"),
        ("username", "a.username"),
    ],
    default_sort: "name",
    default_desc: false,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeacherRow {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub img: Option<String>,
    pub subjects: Option<String>,
    pub classes: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeacherRecord {
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
}

impl TeacherRecord {
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
pub struct TeacherDetail {
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
    pub subjects: Option<String>,
    pub lessons: i64,
    pub classes: i64,
    pub subject_count: i64,
    pub supervised: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TeacherInput {
    pub username: String,
    pub profile: Profile,
    pub subject_ids: Vec<i64>,
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<TeacherRecord>, sqlx::Error> {
    sqlx::query_as::<_, TeacherRecord>(
        "SELECT t.id, a.username, t.name, t.surname, t.email, t.phone, t.address, t.img, \
                t.blood_type, t.sex, t.birthday \
         FROM teachers t JOIN accounts a ON a.id = t.id \
         WHERE t.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn subject_ids(pool: &PgPool, id: i64) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT subject_id FROM subject_teachers WHERE teacher_id = $1 ORDER BY subject_id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(s,)| s).collect())
}

pub async fn find_detail(pool: &PgPool, id: i64) -> Result<Option<TeacherDetail>, sqlx::Error> {
    sqlx::query_as::<_, TeacherDetail>(
        "SELECT t.id, a.username, t.name, t.surname, t.email, t.phone, t.address, t.img, \
                t.blood_type, t.sex, t.birthday, \
                (SELECT string_agg(sub.name, ', ' ORDER BY sub.name) \
                   FROM subject_teachers st JOIN subjects sub ON sub.id = st.subject_id \
                  WHERE st.teacher_id = t.id) AS subjects, \
                (SELECT COUNT(*) FROM lessons l WHERE l.teacher_id = t.id) AS lessons, \
                (SELECT COUNT(DISTINCT l.class_id) FROM lessons l WHERE l.teacher_id = t.id) AS classes, \
                (SELECT COUNT(*) FROM subject_teachers st WHERE st.teacher_id = t.id) AS subject_count, \
                (SELECT string_agg(c.name, ', ' ORDER BY c.name) FROM classes c \
                  WHERE c.supervisor_id = t.id) AS supervised \
         FROM teachers t JOIN accounts a ON a.id = t.id \
         WHERE t.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

async fn replace_subjects(conn: &mut PgConnection, id: i64, subject_ids: &[i64]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM subject_teachers WHERE teacher_id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    for subject_id in subject_ids {
        sqlx::query("INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2)")
            .bind(subject_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn create(pool: &PgPool, input: &TeacherInput, password_hash: &str) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let id = account::insert(&mut *tx, &input.username, password_hash, Role::Teacher).await?;
    let p = &input.profile;
    sqlx::query(
        "INSERT INTO teachers (id, name, surname, email, phone, address, img, blood_type, sex, birthday) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
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
    .execute(&mut *tx)
    .await?;
    replace_subjects(&mut *tx, id, &input.subject_ids).await?;
    tx.commit().await?;
    Ok(id)
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    input: &TeacherInput,
    password_hash: Option<&str>,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    account::update_credentials(&mut *tx, id, &input.username, password_hash).await?;
    let p = &input.profile;
    let result = sqlx::query(
        "UPDATE teachers SET name = $1, surname = $2, email = $3, phone = $4, address = $5, \
                img = $6, blood_type = $7, sex = $8, birthday = $9 \
         WHERE id = $10",
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
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    replace_subjects(&mut *tx, id, &input.subject_ids).await?;
    tx.commit().await?;
    Ok(())
}
