//! Data model shared by the store, the managers and the scheduler.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conventional workflow labels, in pipeline order. Status is an open string:
/// any label is accepted and stored as-is.
pub mod status {
    pub const PREPARING: &str = "preparing";
    pub const APPLIED: &str = "applied";
    pub const WRITTEN_TEST: &str = "written-test";
    pub const INTERVIEW_1: &str = "interview-1";
    pub const INTERVIEW_2: &str = "interview-2";
    pub const INTERVIEW_3: &str = "interview-3";
    pub const HR_INTERVIEW: &str = "hr-interview";
    pub const OFFER: &str = "offer";
    pub const REJECTED: &str = "rejected";

    pub const KNOWN: [&str; 9] = [
        PREPARING,
        APPLIED,
        WRITTEN_TEST,
        INTERVIEW_1,
        INTERVIEW_2,
        INTERVIEW_3,
        HR_INTERVIEW,
        OFFER,
        REJECTED,
    ];

    /// Status given to records created without one.
    pub const DEFAULT: &str = APPLIED;

    pub fn is_known(label: &str) -> bool {
        KNOWN.contains(&label)
    }
}

/// Application priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::error::JobTrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(crate::error::JobTrackError::validation(
                "priority",
                format!("unknown priority '{other}' (expected HIGH, MEDIUM or LOW)"),
            )),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub target_position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub active: bool,
}

impl User {
    /// Name used when addressing the user.
    pub fn greeting_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Registration input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub target_position: Option<String>,
}

/// One job application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    /// Owner. Never changes after creation.
    pub user_id: String,
    pub company_name: String,
    pub position_name: String,
    pub apply_date: NaiveDate,
    pub status: String,
    pub notes: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub work_location: Option<String>,
    pub apply_channel: Option<String>,
    pub referrer: Option<String>,
    pub interview_time: Option<DateTime<Utc>>,
    pub company_website: Option<String>,
    pub hr_contact: Option<String>,
    pub hr_phone: Option<String>,
    pub priority: Priority,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Strictly inside the open interval `(start, end)`.
    pub fn interview_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match self.interview_time {
            Some(at) => start < at && at < end,
            None => false,
        }
    }

    /// Overwrite every mutable field. Owner and `created_at` stay untouched.
    pub fn apply_fields(&mut self, fields: ApplicationFields, apply_date: NaiveDate) {
        self.status = fields.status_or_default();
        self.company_name = fields.company_name;
        self.position_name = fields.position_name;
        self.apply_date = apply_date;
        self.notes = fields.notes;
        self.salary_min = fields.salary_min;
        self.salary_max = fields.salary_max;
        self.work_location = fields.work_location;
        self.apply_channel = fields.apply_channel;
        self.referrer = fields.referrer;
        self.interview_time = fields.interview_time;
        self.company_website = fields.company_website;
        self.hr_contact = fields.hr_contact;
        self.hr_phone = fields.hr_phone;
        self.priority = fields.priority.unwrap_or_default();
        self.starred = fields.starred.unwrap_or(false);
    }

    /// Current values as update input, for read-modify-write callers.
    pub fn fields(&self) -> ApplicationFields {
        ApplicationFields {
            company_name: self.company_name.clone(),
            position_name: self.position_name.clone(),
            apply_date: Some(self.apply_date),
            status: Some(self.status.clone()),
            notes: self.notes.clone(),
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            work_location: self.work_location.clone(),
            apply_channel: self.apply_channel.clone(),
            referrer: self.referrer.clone(),
            interview_time: self.interview_time,
            company_website: self.company_website.clone(),
            hr_contact: self.hr_contact.clone(),
            hr_phone: self.hr_phone.clone(),
            priority: Some(self.priority),
            starred: Some(self.starred),
        }
    }
}

/// Caller-supplied values for create and update (full replace).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationFields {
    pub company_name: String,
    pub position_name: String,
    pub apply_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub work_location: Option<String>,
    pub apply_channel: Option<String>,
    pub referrer: Option<String>,
    pub interview_time: Option<DateTime<Utc>>,
    pub company_website: Option<String>,
    pub hr_contact: Option<String>,
    pub hr_phone: Option<String>,
    pub priority: Option<Priority>,
    pub starred: Option<bool>,
}

impl ApplicationFields {
    pub fn new(company_name: &str, position_name: &str, apply_date: NaiveDate) -> Self {
        Self {
            company_name: company_name.to_string(),
            position_name: position_name.to_string(),
            apply_date: Some(apply_date),
            ..Default::default()
        }
    }

    pub fn status_or_default(&self) -> String {
        match self.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => status::DEFAULT.to_string(),
        }
    }
}

/// List filter. A keyword wins over a status when both are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<String>,
    pub keyword: Option<String>,
}

/// The single criterion a listing applies.
#[derive(Debug, Clone, PartialEq)]
pub enum ListCriterion<'a> {
    All,
    Status(&'a str),
    Keyword(&'a str),
}

impl ApplicationFilter {
    pub fn by_status(status: &str) -> Self {
        Self { status: Some(status.to_string()), keyword: None }
    }

    pub fn by_keyword(keyword: &str) -> Self {
        Self { status: None, keyword: Some(keyword.to_string()) }
    }

    /// Empty strings count as absent.
    pub fn criterion(&self) -> ListCriterion<'_> {
        if let Some(keyword) = non_empty(&self.keyword) {
            ListCriterion::Keyword(keyword)
        } else if let Some(status) = non_empty(&self.status) {
            ListCriterion::Status(status)
        } else {
            ListCriterion::All
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub const MAX_PAGE_SIZE: u32 = 200;

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    /// Sort by `created_at` descending (the default) or ascending.
    pub newest_first: bool,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size, newest_first: true }
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 10)
    }
}

/// One page of results plus the total for pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size as u64)
        }
    }
}

/// Point-in-time statistics for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: u64,
    /// Only statuses that occur; no zero entries.
    pub by_status: BTreeMap<String, u64>,
    pub starred: Vec<Application>,
}

/// Applications per apply-date month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: u64,
}

/// Uploaded resume metadata. The file itself lives with the upload collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewResume {
    pub name: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
}

/// Reusable prefill for new applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub company_name: Option<String>,
    pub position_name: Option<String>,
    pub work_location: Option<String>,
    pub apply_channel: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub company_website: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Template {
    /// Prefilled fields for a new application on `apply_date`.
    pub fn to_fields(&self, apply_date: NaiveDate) -> ApplicationFields {
        ApplicationFields {
            company_name: self.company_name.clone().unwrap_or_default(),
            position_name: self.position_name.clone().unwrap_or_default(),
            apply_date: Some(apply_date),
            work_location: self.work_location.clone(),
            apply_channel: self.apply_channel.clone(),
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            company_website: self.company_website.clone(),
            notes: self.notes.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub company_name: Option<String>,
    pub position_name: Option<String>,
    pub work_location: Option<String>,
    pub apply_channel: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub company_website: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(interview: Option<DateTime<Utc>>) -> Application {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Application {
            id: "a1".into(),
            user_id: "u1".into(),
            company_name: "Acme".into(),
            position_name: "Engineer".into(),
            apply_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            status: status::APPLIED.into(),
            notes: None,
            salary_min: None,
            salary_max: None,
            work_location: None,
            apply_channel: None,
            referrer: None,
            interview_time: interview,
            company_website: None,
            hr_contact: None,
            hr_phone: None,
            priority: Priority::Medium,
            starred: false,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn test_priority_parse_and_display() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" LOW ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::default().to_string(), "MEDIUM");
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"HIGH\"");
    }

    #[test]
    fn test_interview_window_is_open_on_both_ends() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let end = now + chrono::Duration::hours(24);
        assert!(sample(Some(now + chrono::Duration::hours(1))).interview_within(now, end));
        assert!(!sample(Some(now)).interview_within(now, end));
        assert!(!sample(Some(end)).interview_within(now, end));
        assert!(!sample(Some(now - chrono::Duration::minutes(1))).interview_within(now, end));
        assert!(!sample(None).interview_within(now, end));
    }

    #[test]
    fn test_fields_reapply_unchanged() {
        let before = sample(Some(Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap()));
        let mut copy = before.clone();
        copy.apply_fields(before.fields(), before.apply_date);
        assert_eq!(copy, before);
    }

    #[test]
    fn test_filter_keyword_takes_precedence() {
        let filter = ApplicationFilter {
            status: Some("offer".into()),
            keyword: Some("acme".into()),
        };
        assert_eq!(filter.criterion(), ListCriterion::Keyword("acme"));
        assert_eq!(ApplicationFilter::by_status("offer").criterion(), ListCriterion::Status("offer"));
        let blank = ApplicationFilter { status: Some(" ".into()), keyword: Some(String::new()) };
        assert_eq!(blank.criterion(), ListCriterion::All);
    }

    #[test]
    fn test_status_default_and_known_labels() {
        let fields = ApplicationFields::new("Acme", "Engineer", NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(fields.status_or_default(), "applied");
        assert!(status::is_known("hr-interview"));
        assert!(!status::is_known("ghosted"));
    }

    #[test]
    fn test_page_total_pages() {
        let page: Page<u8> = Page { items: vec![], total: 21, page: 0, page_size: 10 };
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn test_template_prefill() {
        let template = Template {
            id: "t1".into(),
            user_id: "u1".into(),
            name: "Backend roles".into(),
            company_name: None,
            position_name: Some("Backend Engineer".into()),
            work_location: Some("Remote".into()),
            apply_channel: Some("referral".into()),
            salary_min: Some(20),
            salary_max: Some(30),
            company_website: None,
            notes: None,
            created_at: Utc::now(),
        };
        let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let fields = template.to_fields(date);
        assert_eq!(fields.position_name, "Backend Engineer");
        assert_eq!(fields.company_name, "");
        assert_eq!(fields.apply_date, Some(date));
        assert_eq!(fields.salary_max, Some(30));
    }
}
