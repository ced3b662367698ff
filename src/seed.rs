//! Demo data for a fresh database. Every demo account shares the admin
//! password; usernames are `teacher1..`, `parent1..`, `student1..`.

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use sqlx::{PgConnection, PgPool};

use crate::auth::role::Role;
use crate::models::account;
use crate::models::lesson::DAYS;
use crate::models::schedule::week_start;

const SUBJECTS: &[&str] = &["Matemáticas", "Lengua", "Ciencias", "Historia", "Inglés", "Música"];

const TEACHERS: &[(&str, &str, &str)] = &[
    ("Lucía", "Fernández", "FEMALE"),
    ("Javier", "Moreno", "MALE"),
    ("Carmen", "Ruiz", "FEMALE"),
    ("Andrés", "Navarro", "MALE"),
    ("Elena", "Castro", "FEMALE"),
    ("Pablo", "Ortega", "MALE"),
];

const PARENT_SURNAMES: &[&str] = &[
    "García", "López", "Martínez", "Sánchez", "Pérez", "Gómez", "Díaz", "Romero",
];

const CHILD_NAMES: &[(&str, &str)] = &[
    ("Hugo", "MALE"), ("Martina", "FEMALE"), ("Mateo", "MALE"), ("Sofía", "FEMALE"),
    ("Leo", "MALE"), ("Lucía", "FEMALE"), ("Daniel", "MALE"), ("Valeria", "FEMALE"),
    ("Álvaro", "MALE"), ("Paula", "FEMALE"), ("Manuel", "MALE"), ("Julia", "FEMALE"),
    ("Marco", "MALE"), ("Emma", "FEMALE"), ("Adrián", "MALE"), ("Irene", "FEMALE"),
];

const CLASSES: &[(&str, i32)] = &[("1A", 1), ("2A", 2), ("3A", 3), ("4A", 4)];

/// Seed demo data unless teachers already exist.
pub async fn seed_demo(pool: &PgPool, password_hash: &str) -> Result<(), sqlx::Error> {
    let (teachers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM teachers")
        .fetch_one(pool)
        .await?;
    if teachers > 0 {
        log::info!("Demo data already present, skipping");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    let conn: &mut PgConnection = &mut tx;

    let mut subject_ids = vec![];
    for name in SUBJECTS {
        let (id,): (i64,) = sqlx::query_as("INSERT INTO subjects (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
        subject_ids.push(id);
    }

    let mut teacher_ids = vec![];
    for (i, (name, surname, sex)) in TEACHERS.iter().enumerate() {
        let n = i + 1;
        let id = account::insert(&mut *conn, &format!("teacher{n}"), password_hash, Role::Teacher).await?;
        sqlx::query(
            "INSERT INTO teachers (id, name, surname, email, phone, address, blood_type, sex, birthday) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id)
        .bind(name)
        .bind(surname)
        .bind(format!("teacher{n}@aula.test"))
        .bind(format!("600000{n:03}"))
        .bind(format!("Calle Mayor {n}"))
        .bind(if i % 2 == 0 { "A+" } else { "O+" })
        .bind(sex)
        .bind(chrono::NaiveDate::from_ymd_opt(1980 + i as i32, 3, 10 + i as u32))
        .execute(&mut *conn)
        .await?;
        // Each teacher teaches their own subject.
        sqlx::query("INSERT INTO subject_teachers (subject_id, teacher_id) VALUES ($1, $2)")
            .bind(subject_ids[i % subject_ids.len()])
            .bind(id)
            .execute(&mut *conn)
            .await?;
        teacher_ids.push(id);
    }

    let mut class_ids = vec![];
    for (i, (name, level)) in CLASSES.iter().enumerate() {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO classes (name, capacity, supervisor_id, grade_id) \
             VALUES ($1, 20, $2, (SELECT id FROM grades WHERE level = $3)) RETURNING id",
        )
        .bind(name)
        .bind(teacher_ids[i])
        .bind(level)
        .fetch_one(&mut *conn)
        .await?;
        class_ids.push(id);
    }

    let mut parent_ids = vec![];
    for (i, surname) in PARENT_SURNAMES.iter().enumerate() {
        let n = i + 1;
        let id = account::insert(&mut *conn, &format!("parent{n}"), password_hash, Role::Parent).await?;
        sqlx::query(
            "INSERT INTO parents (id, name, surname, email, phone, address) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(if i % 2 == 0 { "María" } else { "José" })
        .bind(surname)
        .bind(format!("parent{n}@aula.test"))
        .bind(format!("610000{n:03}"))
        .bind(format!("Avenida del Parque {n}"))
        .execute(&mut *conn)
        .await?;
        parent_ids.push(id);
    }

    let mut students = vec![];
    for (i, (name, sex)) in CHILD_NAMES.iter().enumerate() {
        let n = i + 1;
        let class_index = i % CLASSES.len();
        let parent_index = i / 2;
        let id = account::insert(&mut *conn, &format!("student{n}"), password_hash, Role::Student).await?;
        sqlx::query(
            "INSERT INTO students (id, name, surname, address, blood_type, sex, birthday, \
                                   parent_id, class_id, grade_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, (SELECT grade_id FROM classes WHERE id = $9))",
        )
        .bind(id)
        .bind(name)
        .bind(PARENT_SURNAMES[parent_index])
        .bind(format!("Avenida del Parque {}", parent_index + 1))
        .bind(if i % 3 == 0 { "B+" } else { "A-" })
        .bind(sex)
        .bind(chrono::NaiveDate::from_ymd_opt(2019 - CLASSES[class_index].1, 1 + (i % 12) as u32, 5))
        .bind(parent_ids[parent_index])
        .bind(class_ids[class_index])
        .execute(&mut *conn)
        .await?;
        students.push((id, class_index));
    }

    // Two lessons per class and weekday; subjects and teachers rotate.
    let mut lessons: Vec<(i64, usize, &str, usize)> = vec![];
    let slots = [(9, 10), (10, 11)];
    for (c, class_id) in class_ids.iter().enumerate() {
        for (d, day) in DAYS.iter().copied().enumerate() {
            for (s, (start, end)) in slots.iter().enumerate() {
                let k = (c + d * 2 + s) % TEACHERS.len();
                let (id,): (i64,) = sqlx::query_as(
                    "INSERT INTO lessons (name, day, start_time, end_time, subject_id, class_id, teacher_id) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
                )
                .bind(format!("{} {}", SUBJECTS[k % SUBJECTS.len()], CLASSES[c].0))
                .bind(day)
                .bind(NaiveTime::from_hms_opt(*start, 0, 0))
                .bind(NaiveTime::from_hms_opt(*end, 0, 0))
                .bind(subject_ids[k % subject_ids.len()])
                .bind(class_id)
                .bind(teacher_ids[k])
                .fetch_one(&mut *conn)
                .await?;
                lessons.push((id, c, day, s));
            }
        }
    }

    let now = Local::now().naive_local();
    let today = now.date();
    let at = |days: i64, hour: u32| -> NaiveDateTime {
        (today + Duration::days(days)).and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default())
    };

    // One past and one upcoming exam plus one assignment per class.
    let mut exams = vec![];
    let mut assignments = vec![];
    for c in 0..class_ids.len() {
        let first = lessons.iter().filter(|l| l.1 == c).map(|l| l.0).collect::<Vec<_>>();
        for (offset, lesson_id) in [(-7, first[0]), (5, first[1])] {
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO exams (title, start_time, end_time, lesson_id) VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(format!("Examen {} {}", CLASSES[c].0, if offset < 0 { "1" } else { "2" }))
            .bind(at(offset, 9))
            .bind(at(offset, 10))
            .bind(lesson_id)
            .fetch_one(&mut *conn)
            .await?;
            if offset < 0 {
                exams.push((id, c));
            }
        }
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO assignments (title, start_date, due_date, lesson_id) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(format!("Trabajo {}", CLASSES[c].0))
        .bind(at(-10, 9))
        .bind(at(-2, 23))
        .bind(first[2])
        .fetch_one(&mut *conn)
        .await?;
        assignments.push((id, c));
    }

    for (i, (student_id, c)) in students.iter().enumerate() {
        for (exam_id, _) in exams.iter().filter(|e| e.1 == *c) {
            sqlx::query("INSERT INTO results (score, exam_id, student_id) VALUES ($1, $2, $3)")
                .bind(55 + ((i * 7) % 45) as i32)
                .bind(exam_id)
                .bind(student_id)
                .execute(&mut *conn)
                .await?;
        }
        for (assignment_id, _) in assignments.iter().filter(|a| a.1 == *c) {
            sqlx::query("INSERT INTO results (score, assignment_id, student_id) VALUES ($1, $2, $3)")
                .bind(60 + ((i * 11) % 40) as i32)
                .bind(assignment_id)
                .bind(student_id)
                .execute(&mut *conn)
                .await?;
        }
    }

    // Attendance for this week's first lesson of each day, up to today.
    let monday = week_start(today);
    for (d, day) in DAYS.iter().copied().enumerate() {
        let date = monday + Duration::days(d as i64);
        if date > today {
            break;
        }
        for (i, (student_id, c)) in students.iter().enumerate() {
            let lesson = lessons.iter().find(|l| l.1 == *c && l.2 == day && l.3 == 0);
            if let Some((lesson_id, ..)) = lesson {
                sqlx::query(
                    "INSERT INTO attendances (date, present, student_id, lesson_id) VALUES ($1, $2, $3, $4)",
                )
                .bind(date)
                .bind((i + d) % 6 != 0)
                .bind(student_id)
                .bind(lesson_id)
                .execute(&mut *conn)
                .await?;
            }
        }
    }

    sqlx::query(
        "INSERT INTO events (title, description, start_time, end_time, class_id) VALUES \
         ('Jornada de puertas abiertas', 'Visita de familias al centro', $1, $2, NULL), \
         ('Excursión al museo', 'Salida al museo de ciencias', $3, $4, $5)",
    )
    .bind(at(0, 10))
    .bind(at(0, 13))
    .bind(at(3, 9))
    .bind(at(3, 14))
    .bind(class_ids[0])
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "INSERT INTO announcements (title, description, date, class_id) VALUES \
         ('Inicio del trimestre', 'Bienvenidos al nuevo trimestre', $1, NULL), \
         ('Material de música', 'Traed la flauta el viernes', $2, $3)",
    )
    .bind(today - Duration::days(3))
    .bind(today)
    .bind(class_ids[1])
    .execute(&mut *conn)
    .await?;

    tx.commit().await?;
    log::info!(
        "Demo data seeded: {} teachers, {} parents, {} students, {} lessons",
        TEACHERS.len(),
        PARENT_SURNAMES.len(),
        CHILD_NAMES.len(),
        lessons.len()
    );
    Ok(())
}
