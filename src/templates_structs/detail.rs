use askama::Template;

use super::dashboard::ScheduleBlock;
use super::PageContext;

pub struct StatTile {
    pub label: String,
    pub value: String,
}

/// Profile page shared by students and teachers.
#[derive(Template)]
#[template(path = "profile_detail.html")]
pub struct ProfileDetailTemplate {
    pub ctx: PageContext,
    pub full_name: String,
    pub role_label: String,
    pub img: String,
    pub facts: Vec<(String, String)>,
    pub stats: Vec<StatTile>,
    /// Always one block; a list so the shared schedule partial can iterate.
    pub schedules: Vec<ScheduleBlock>,
    /// Links into lists pre-filtered on this person.
    pub shortcuts: Vec<(String, String)>,
    pub edit_href: String,
    pub back_href: String,
}
