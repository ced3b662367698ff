use chrono::NaiveDate;

pub const SEXES: &[&str] = &["MALE", "FEMALE"];
pub const BLOOD_TYPES: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// Profile columns shared by the `students` and `teachers` tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
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

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}
