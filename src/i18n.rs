//! Message catalog for the two supported locales.
//!
//! Labels are looked up by key (`Locale::t`); unknown keys render as the
//! key itself so a missing translation is visible but never fatal.
//! Field errors are rendered from their [`ErrorCode`] by `Locale::error`.

use crate::forms::errors::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "es" => Some(Locale::Es),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }

    /// Translate a UI or field label key.
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        let found = match self {
            Locale::Es => es(key),
            Locale::En => en(key),
        };
        found.unwrap_or(key)
    }

    /// Localized message for a field error.
    pub fn error(&self, code: &ErrorCode) -> String {
        match self {
            Locale::Es => match code {
                ErrorCode::Required => "Este campo es obligatorio".to_string(),
                ErrorCode::TooShort(min) => format!("Debe tener al menos {min} caracteres"),
                ErrorCode::TooLong(max) => format!("Debe tener como máximo {max} caracteres"),
                ErrorCode::InvalidEmail => "Correo electrónico no válido".to_string(),
                ErrorCode::InvalidDate => "Fecha no válida".to_string(),
                ErrorCode::InvalidTime => "Hora no válida".to_string(),
                ErrorCode::InvalidNumber => "Número no válido".to_string(),
                ErrorCode::OutOfRange(min, max) => format!("Debe estar entre {min} y {max}"),
                ErrorCode::InvalidChoice => "Selecciona una opción válida".to_string(),
                ErrorCode::EndBeforeStart => "La fecha de fin debe ser posterior al inicio".to_string(),
                ErrorCode::Duplicate => "Este valor ya está registrado".to_string(),
                ErrorCode::MissingReference => "El registro seleccionado no existe".to_string(),
                ErrorCode::InUse => "No se puede eliminar: hay registros que dependen de este".to_string(),
                ErrorCode::NotAllowed => "No tienes permiso para usar este valor".to_string(),
                ErrorCode::PasswordTooShort(min) => format!("La contraseña debe tener al menos {min} caracteres"),
                ErrorCode::InvalidUsername => "Solo letras, números y guiones bajos".to_string(),
                ErrorCode::ExactlyOneOf(a, b) => {
                    format!("Indica exactamente uno: {} o {}", self.t(a), self.t(b))
                }
                ErrorCode::GradeMismatch => "El grado no coincide con el de la clase".to_string(),
                ErrorCode::ClassFull => "La clase ha alcanzado su capacidad".to_string(),
                ErrorCode::WrongPassword => "La contraseña actual no es correcta".to_string(),
                ErrorCode::PasswordMismatch => "Las contraseñas no coinciden".to_string(),
                ErrorCode::TooManyAttempts => "Demasiados intentos fallidos. Inténtalo más tarde.".to_string(),
                ErrorCode::Unknown => "Ha ocurrido un error inesperado".to_string(),
            },
            Locale::En => match code {
                ErrorCode::Required => "This field is required".to_string(),
                ErrorCode::TooShort(min) => format!("Must be at least {min} characters"),
                ErrorCode::TooLong(max) => format!("Must be at most {max} characters"),
                ErrorCode::InvalidEmail => "Invalid email address".to_string(),
                ErrorCode::InvalidDate => "Invalid date".to_string(),
                ErrorCode::InvalidTime => "Invalid time".to_string(),
                ErrorCode::InvalidNumber => "Invalid number".to_string(),
                ErrorCode::OutOfRange(min, max) => format!("Must be between {min} and {max}"),
                ErrorCode::InvalidChoice => "Choose a valid option".to_string(),
                ErrorCode::EndBeforeStart => "End must be after start".to_string(),
                ErrorCode::Duplicate => "This value is already taken".to_string(),
                ErrorCode::MissingReference => "The selected record does not exist".to_string(),
                ErrorCode::InUse => "Cannot delete: other records depend on this one".to_string(),
                ErrorCode::NotAllowed => "You are not allowed to use this value".to_string(),
                ErrorCode::PasswordTooShort(min) => format!("Password must be at least {min} characters"),
                ErrorCode::InvalidUsername => "Only letters, numbers and underscores".to_string(),
                ErrorCode::ExactlyOneOf(a, b) => {
                    format!("Provide exactly one of {} or {}", self.t(a), self.t(b))
                }
                ErrorCode::GradeMismatch => "Grade does not match the class grade".to_string(),
                ErrorCode::ClassFull => "The class is at full capacity".to_string(),
                ErrorCode::WrongPassword => "Current password is incorrect".to_string(),
                ErrorCode::PasswordMismatch => "New passwords do not match".to_string(),
                ErrorCode::TooManyAttempts => "Too many failed attempts. Please try again later.".to_string(),
                ErrorCode::Unknown => "Something went wrong".to_string(),
            },
        }
    }
}

fn es(key: &str) -> Option<&'static str> {
    Some(match key {
        // navigation
        "dashboard" => "Inicio",
        "students" => "Alumnos",
        "teachers" => "Profesores",
        "parents" => "Padres",
        "classes" => "Clases",
        "subjects" => "Asignaturas",
        "lessons" => "Lecciones",
        "exams" => "Exámenes",
        "assignments" => "Tareas",
        "results" => "Resultados",
        "attendance" => "Asistencia",
        "events" => "Eventos",
        "announcements" => "Anuncios",
        "account" => "Mi cuenta",
        "logout" => "Cerrar sesión",
        "menu" => "Menú",
        // auth
        "sign_in" => "Iniciar sesión",
        "sign_in_title" => "Accede a tu cuenta",
        "login_failed" => "Usuario o contraseña incorrectos",
        "rate_limited" => "Demasiados intentos fallidos. Inténtalo más tarde.",
        "change_password" => "Cambiar contraseña",
        "current_password" => "Contraseña actual",
        "new_password" => "Nueva contraseña",
        "confirm_password" => "Confirmar contraseña",
        "password_changed" => "Contraseña actualizada",
        // list / form chrome
        "search" => "Buscar...",
        "filter" => "Filtrar",
        "clear" => "Limpiar",
        "create" => "Crear",
        "edit" => "Editar",
        "view" => "Ver",
        "delete" => "Eliminar",
        "save" => "Guardar",
        "cancel" => "Cancelar",
        "actions" => "Acciones",
        "no_results" => "No hay registros",
        "previous" => "Anterior",
        "next" => "Siguiente",
        "page" => "Página",
        "of" => "de",
        "total" => "Total",
        "create_title" => "Crear registro",
        "edit_title" => "Editar registro",
        "delete_title" => "Eliminar registro",
        "delete_question" => "Se perderán todos los datos. ¿Seguro que quieres eliminar este registro?",
        "form_invalid" => "Revisa los campos marcados",
        "created" => "Registro creado",
        "updated" => "Registro actualizado",
        "deleted" => "Registro eliminado",
        "keep_password" => "Déjalo en blanco para mantener la actual",
        "none" => "Ninguno",
        "all_classes" => "Todas las clases",
        "choose" => "Selecciona...",
        // fields
        "username" => "Usuario",
        "password" => "Contraseña",
        "name" => "Nombre",
        "surname" => "Apellidos",
        "full_name" => "Nombre completo",
        "email" => "Correo electrónico",
        "phone" => "Teléfono",
        "address" => "Dirección",
        "img" => "URL de la foto",
        "blood_type" => "Grupo sanguíneo",
        "sex" => "Sexo",
        "birthday" => "Fecha de nacimiento",
        "parent_id" => "Padre/Madre",
        "class_id" => "Clase",
        "grade_id" => "Curso",
        "capacity" => "Capacidad",
        "supervisor_id" => "Tutor",
        "subject_ids" => "Asignaturas",
        "teacher_ids" => "Profesores",
        "day" => "Día",
        "start_time" => "Inicio",
        "end_time" => "Fin",
        "subject_id" => "Asignatura",
        "teacher_id" => "Profesor",
        "title" => "Título",
        "lesson_id" => "Lección",
        "start_date" => "Fecha de inicio",
        "due_date" => "Fecha de entrega",
        "score" => "Nota",
        "exam_id" => "Examen",
        "assignment_id" => "Tarea",
        "student_id" => "Alumno",
        "date" => "Fecha",
        "present" => "Presente",
        "absent" => "Ausente",
        "description" => "Descripción",
        "status" => "Estado",
        "info" => "Información",
        "level" => "Nivel",
        "grade" => "Curso",
        "class" => "Clase",
        "lesson" => "Lección",
        "student" => "Alumno",
        "teacher" => "Profesor",
        "subject" => "Asignatura",
        "parent" => "Padre/Madre",
        "source" => "Origen",
        "student_count" => "Alumnos",
        // values
        "MALE" => "Masculino",
        "FEMALE" => "Femenino",
        "MONDAY" => "Lunes",
        "TUESDAY" => "Martes",
        "WEDNESDAY" => "Miércoles",
        "THURSDAY" => "Jueves",
        "FRIDAY" => "Viernes",
        "admin" => "Administrador",
        "role_teacher" => "Profesor",
        "role_student" => "Alumno",
        "role_parent" => "Padre/Madre",
        "yes" => "Sí",
        "no" => "No",
        // status labels
        "overdue" => "Vencida",
        "pending" => "Pendiente",
        "finished" => "Finalizado",
        "in_progress" => "En curso",
        "upcoming" => "Próximo",
        // dashboard
        "admins" => "Administradores",
        "boys" => "Chicos",
        "girls" => "Chicas",
        "students_by_sex" => "Alumnos por sexo",
        "attendance_week" => "Asistencia de la semana",
        "events_on" => "Eventos del día",
        "latest_announcements" => "Últimos anuncios",
        "no_events" => "No hay eventos",
        "no_announcements" => "No hay anuncios",
        "schedule" => "Horario",
        "no_lessons" => "No hay lecciones",
        "children" => "Hijos",
        "attendance_rate" => "Asistencia",
        "lessons_count" => "Lecciones",
        "classes_count" => "Clases",
        "subjects_count" => "Asignaturas",
        "shortcuts" => "Accesos directos",
        "greeting" => "Hola",
        "exam" => "Examen",
        "assignment" => "Tarea",
        "result" => "Resultado",
        "attendance_record" => "Registro de asistencia",
        "event" => "Evento",
        "announcement" => "Anuncio",
        "exam_or_assignment" => "Indica un examen o una tarea, no ambos",
        "all_classes_hint" => "Déjalo vacío para toda la escuela",
        "SATURDAY" => "Sábado",
        "SUNDAY" => "Domingo",
        "back" => "Volver",
        "today" => "Hoy",
        "no_permission" => "No tienes permiso para ver esta página",
        "not_found" => "Página no encontrada",
        "profile" => "Perfil",
        _ => return None,
    })
}

fn en(key: &str) -> Option<&'static str> {
    Some(match key {
        "dashboard" => "Home",
        "students" => "Students",
        "teachers" => "Teachers",
        "parents" => "Parents",
        "classes" => "Classes",
        "subjects" => "Subjects",
        "lessons" => "Lessons",
        "exams" => "Exams",
        "assignments" => "Assignments",
        "results" => "Results",
        "attendance" => "Attendance",
        "events" => "Events",
        "announcements" => "Announcements",
        "account" => "Account",
        "logout" => "Logout",
        "menu" => "Menu",
        "sign_in" => "Sign in",
        "sign_in_title" => "Sign in to your account",
        "login_failed" => "Invalid username or password",
        "rate_limited" => "Too many failed login attempts. Please try again later.",
        "change_password" => "Change password",
        "current_password" => "Current password",
        "new_password" => "New password",
        "confirm_password" => "Confirm password",
        "password_changed" => "Password changed",
        "search" => "Search...",
        "filter" => "Filter",
        "clear" => "Clear",
        "create" => "Create",
        "edit" => "Edit",
        "view" => "View",
        "delete" => "Delete",
        "save" => "Save",
        "cancel" => "Cancel",
        "actions" => "Actions",
        "no_results" => "No records",
        "previous" => "Previous",
        "next" => "Next",
        "page" => "Page",
        "of" => "of",
        "total" => "Total",
        "create_title" => "Create record",
        "edit_title" => "Edit record",
        "delete_title" => "Delete record",
        "delete_question" => "All data will be lost. Are you sure you want to delete this record?",
        "form_invalid" => "Please fix the highlighted fields",
        "created" => "Record created",
        "updated" => "Record updated",
        "deleted" => "Record deleted",
        "keep_password" => "Leave blank to keep the current one",
        "none" => "None",
        "all_classes" => "All classes",
        "choose" => "Choose...",
        "username" => "Username",
        "password" => "Password",
        "name" => "First name",
        "surname" => "Last name",
        "full_name" => "Name",
        "email" => "Email",
        "phone" => "Phone",
        "address" => "Address",
        "img" => "Photo URL",
        "blood_type" => "Blood type",
        "sex" => "Sex",
        "birthday" => "Birthday",
        "parent_id" => "Parent",
        "class_id" => "Class",
        "grade_id" => "Grade",
        "capacity" => "Capacity",
        "supervisor_id" => "Supervisor",
        "subject_ids" => "Subjects",
        "teacher_ids" => "Teachers",
        "day" => "Day",
        "start_time" => "Start",
        "end_time" => "End",
        "subject_id" => "Subject",
        "teacher_id" => "Teacher",
        "title" => "Title",
        "lesson_id" => "Lesson",
        "start_date" => "Start date",
        "due_date" => "Due date",
        "score" => "Score",
        "exam_id" => "Exam",
        "assignment_id" => "Assignment",
        "student_id" => "Student",
        "date" => "Date",
        "present" => "Present",
        "absent" => "Absent",
        "description" => "Description",
        "status" => "Status",
        "info" => "Info",
        "level" => "Level",
        "grade" => "Grade",
        "class" => "Class",
        "lesson" => "Lesson",
        "student" => "Student",
        "teacher" => "Teacher",
        "subject" => "Subject",
        "parent" => "Parent",
        "source" => "Source",
        "student_count" => "Students",
        "MALE" => "Male",
        "FEMALE" => "Female",
        "MONDAY" => "Monday",
        "TUESDAY" => "Tuesday",
        "WEDNESDAY" => "Wednesday",
        "THURSDAY" => "Thursday",
        "FRIDAY" => "Friday",
        "admin" => "Admin",
        "role_teacher" => "Teacher",
        "role_student" => "Student",
        "role_parent" => "Parent",
        "yes" => "Yes",
        "no" => "No",
        "overdue" => "Overdue",
        "pending" => "Pending",
        "finished" => "Finished",
        "in_progress" => "In progress",
        "upcoming" => "Upcoming",
        "admins" => "Admins",
        "boys" => "Boys",
        "girls" => "Girls",
        "students_by_sex" => "Students by sex",
        "attendance_week" => "Attendance this week",
        "events_on" => "Events of the day",
        "latest_announcements" => "Latest announcements",
        "no_events" => "No events",
        "no_announcements" => "No announcements",
        "schedule" => "Schedule",
        "no_lessons" => "No lessons",
        "children" => "Children",
        "attendance_rate" => "Attendance",
        "lessons_count" => "Lessons",
        "classes_count" => "Classes",
        "subjects_count" => "Subjects",
        "shortcuts" => "Shortcuts",
        "greeting" => "Hello",
        "exam" => "Exam",
        "assignment" => "Assignment",
        "result" => "Result",
        "attendance_record" => "Attendance record",
        "event" => "Event",
        "announcement" => "Announcement",
        "exam_or_assignment" => "Pick an exam or an assignment, not both",
        "all_classes_hint" => "Leave empty for the whole school",
        "SATURDAY" => "Saturday",
        "SUNDAY" => "Sunday",
        "back" => "Back",
        "today" => "Today",
        "no_permission" => "You are not allowed to see this page",
        "not_found" => "Page not found",
        "profile" => "Profile",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_is_case_insensitive() {
        assert_eq!(Locale::from_code("ES"), Some(Locale::Es));
        assert_eq!(Locale::from_code(" en "), Some(Locale::En));
        assert_eq!(Locale::from_code("de"), None);
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(Locale::Es.t("no_such_key"), "no_such_key");
    }

    #[test]
    fn status_labels_are_localized() {
        assert_eq!(Locale::Es.t("overdue"), "Vencida");
        assert_eq!(Locale::Es.t("pending"), "Pendiente");
        assert_eq!(Locale::En.t("overdue"), "Overdue");
    }

    #[test]
    fn every_spanish_key_has_an_english_twin() {
        let keys = [
            "students", "teachers", "save", "delete_question", "class_id", "blood_type",
            "MONDAY", "FEMALE", "in_progress", "attendance_week", "keep_password",
        ];
        for key in keys {
            assert!(es(key).is_some(), "missing es: {key}");
            assert!(en(key).is_some(), "missing en: {key}");
        }
    }

    #[test]
    fn error_messages_interpolate() {
        assert_eq!(Locale::En.error(&ErrorCode::TooLong(20)), "Must be at most 20 characters");
        assert_eq!(Locale::Es.error(&ErrorCode::OutOfRange(0, 100)), "Debe estar entre 0 y 100");
        assert_eq!(
            Locale::En.error(&ErrorCode::ExactlyOneOf("exam_id", "assignment_id")),
            "Provide exactly one of Exam or Assignment"
        );
    }
}
