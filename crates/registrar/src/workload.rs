/*
 * Copyright 2026 EntDB Authors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! The registrar operation set: ten reports, one enrollment insert and one
//! address update, each a SQL template with bound values.

use crate::error::Result;
use crate::probe::KeyColumn;
use crate::query::Query;
use rust_decimal::Decimal;
use time::{Date, Month};

pub const DEFAULT_STUDENT_ID: &str = "888-88-8888";
pub const DEFAULT_FALLBACK_STUDENT_ID: &str = "999-99-9999";
pub const STUDENT_TABLE: &str = "Student";
pub const STUDENT_KEY_COLUMN: &str = "StdNo";

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub std_no: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub state: String,
    pub major: String,
    pub class: String,
    pub gpa: Decimal,
    pub zip: String,
}

impl Student {
    /// The junior CS student from Topeka enrolled by operation 11.
    pub fn alice_smith(std_no: impl Into<String>) -> Self {
        Self {
            std_no: std_no.into(),
            first_name: "ALICE".to_string(),
            last_name: "SMITH".to_string(),
            city: "TOPEKA".to_string(),
            state: "KS".to_string(),
            major: "CS".to_string(),
            class: "JR".to_string(),
            gpa: Decimal::new(385, 2),
            zip: "66610".to_string(),
        }
    }

    pub fn insert_query(&self, std_no: &str) -> Query {
        Query::new(
            format!("Insert student {}", std_no),
            "INSERT INTO Student (StdNo, StdFirstName, StdLastName, StdCity, \
             StdState, StdMajor, StdClass, StdGPA, StdZip) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(std_no)
        .bind(self.first_name.as_str())
        .bind(self.last_name.as_str())
        .bind(self.city.as_str())
        .bind(self.state.as_str())
        .bind(self.major.as_str())
        .bind(self.class.as_str())
        .bind(self.gpa)
        .bind(self.zip.as_str())
    }

    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            title_case(&self.first_name),
            title_case(&self.last_name)
        )
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn student_lookup(label: impl Into<String>, std_no: &str) -> Query {
    Query::new(label, "SELECT * FROM Student WHERE StdNo = $1").bind(std_no)
}

pub fn student_key() -> Result<KeyColumn> {
    KeyColumn::new(STUDENT_TABLE, STUDENT_KEY_COLUMN)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// A read-only report.
    Report(Query),
    /// Insert under a free identifier, then show the inserted row.
    InsertStudent {
        label: String,
        student: Student,
        fallback_id: String,
    },
    /// Apply a change, then show the affected row.
    Update { change: Query, verify: Query },
}

impl Operation {
    pub fn label(&self) -> &str {
        match self {
            Self::Report(q) => q.label(),
            Self::InsertStudent { label, .. } => label,
            Self::Update { verify, .. } => verify.label(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkloadOptions {
    pub today: Date,
    pub student_id: String,
    pub fallback_student_id: String,
}

impl WorkloadOptions {
    pub fn new(today: Date) -> Self {
        Self {
            today,
            student_id: DEFAULT_STUDENT_ID.to_string(),
            fallback_student_id: DEFAULT_FALLBACK_STUDENT_ID.to_string(),
        }
    }
}

/// First day of the year `years` before `today`'s year. A hire date before it
/// means more than `years` full calendar years of service.
pub fn hire_cutoff(today: Date, years: i32) -> Date {
    Date::from_calendar_date(today.year() - years, Month::January, 1).unwrap_or(Date::MIN)
}

pub fn registrar_workload(opts: &WorkloadOptions) -> Vec<Operation> {
    vec![
        Operation::Report(
            Query::new(
                "Students majoring in IS",
                "SELECT * FROM Student WHERE StdMajor = $1",
            )
            .bind("IS"),
        ),
        Operation::Report(
            Query::new(
                "Students enrolled in more than two courses",
                "SELECT s.StdFirstName, s.StdLastName, COUNT(e.OfferNo) AS CourseCount \
                 FROM Student s \
                 JOIN Enrollment e ON s.StdNo = e.StdNo \
                 GROUP BY s.StdNo, s.StdFirstName, s.StdLastName \
                 HAVING COUNT(e.OfferNo) > $1",
            )
            .bind(2_i64),
        ),
        Operation::Report(
            Query::new(
                "Professors teaching for more than 5 years in MS department",
                "SELECT FacFirstName, FacLastName, FacDept, FacHireDate \
                 FROM Faculty \
                 WHERE FacDept = $1 AND FacHireDate < $2",
            )
            .bind("MS")
            .bind(hire_cutoff(opts.today, 5)),
        ),
        Operation::Report(
            Query::new(
                "Departments with more than 2 students",
                "SELECT StdMajor AS Department, COUNT(*) AS StudentCount \
                 FROM Student \
                 GROUP BY StdMajor \
                 HAVING COUNT(*) > $1",
            )
            .bind(2_i64),
        ),
        Operation::Report(
            Query::new(
                "Data courses taught by Prof. FIBON",
                "SELECT c.CourseNo, c.CrsDesc \
                 FROM Course c \
                 JOIN Offering o ON c.CourseNo = o.CourseNo \
                 JOIN Faculty f ON o.FacNo = f.FacNo \
                 WHERE c.CrsDesc LIKE $1 AND f.FacLastName = $2",
            )
            .bind("%DATA%")
            .bind("FIBON"),
        ),
        Operation::Report(Query::new(
            "Students not enrolled in any courses",
            "SELECT s.StdNo, s.StdFirstName, s.StdLastName \
             FROM Student s \
             WHERE s.StdNo NOT IN (SELECT e.StdNo FROM Enrollment e)",
        )),
        Operation::Report(Query::new(
            "Student with second-highest GPA",
            "SELECT StdNo, StdFirstName, StdLastName, StdGPA \
             FROM Student \
             ORDER BY StdGPA DESC \
             LIMIT 1 OFFSET 1",
        )),
        Operation::Report(
            Query::new(
                "Student TAs with GPA above 3.5",
                "SELECT s.StdNo, s.StdFirstName, s.StdLastName, s.StdGPA \
                 FROM Student s \
                 JOIN Faculty f ON s.StdNo = f.FacNo \
                 WHERE s.StdGPA > $1",
            )
            .bind(Decimal::new(35, 1)),
        ),
        Operation::Report(
            Query::new(
                "Students with courses enrolled after or in 2020",
                "SELECT s.StdFirstName, s.StdLastName, c.CrsDesc, o.OffTerm, o.OffYear \
                 FROM Student s \
                 JOIN Enrollment e ON s.StdNo = e.StdNo \
                 JOIN Offering o ON e.OfferNo = o.OfferNo \
                 JOIN Course c ON o.CourseNo = c.CourseNo \
                 WHERE o.OffYear >= $1",
            )
            .bind(2020_i64),
        ),
        Operation::Report(
            Query::new(
                "Top three highest-paid professors",
                "SELECT FacFirstName, FacLastName, FacSalary \
                 FROM Faculty \
                 ORDER BY FacSalary DESC \
                 LIMIT $1",
            )
            .bind(3_i64),
        ),
        Operation::InsertStudent {
            label: "Inserted student Alice Smith".to_string(),
            student: Student::alice_smith(opts.student_id.as_str()),
            fallback_id: opts.fallback_student_id.clone(),
        },
        Operation::Update {
            change: Query::new(
                "Update student 124-56-7890",
                "UPDATE Student SET StdCity = $1, StdZip = $2 WHERE StdNo = $3",
            )
            .bind("OVERLAND PARK")
            .bind("66210")
            .bind("124-56-7890"),
            verify: student_lookup("Updated student Bob Norbert", "124-56-7890"),
        },
    ]
}
