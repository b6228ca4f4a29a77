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

use crate::error::{RegistrarError, Result};
use crate::executor::{DbResult, StatementExecutor};
use crate::query::Query;
use tracing::{debug, info};

/// Highest counter tried before giving up.
pub const MAX_ALTERNATES: u32 = 999;
/// Characters of the base identifier kept in every alternate.
pub const KEPT_PREFIX_CHARS: usize = 8;

/// The table and column an identifier must be unique in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    table: String,
    column: String,
}

impl KeyColumn {
    /// Both names end up in SQL text, so they must be plain identifiers.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let column = column.into();
        for name in [&table, &column] {
            if !is_plain_identifier(name) {
                return Err(RegistrarError::Config(format!(
                    "invalid SQL identifier {name:?}"
                )));
            }
        }
        Ok(Self { table, column })
    }

    pub fn exists_query(&self, key: &str) -> Query {
        Query::new(
            format!("{}.{} existence check", self.table, self.column),
            format!(
                "SELECT COUNT(*) FROM {} WHERE {} = $1",
                self.table, self.column
            ),
        )
        .bind(key)
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The `counter`-th alternate: the first eight characters of `base`, then the
/// ones, tens and hundreds digits of `counter` in that order.
pub fn alternate_id(base: &str, counter: u32) -> String {
    let prefix: String = base.chars().take(KEPT_PREFIX_CHARS).collect();
    format!(
        "{prefix}{}{}{}",
        counter % 10,
        (counter / 10) % 10,
        (counter / 100) % 10
    )
}

/// Every alternate in probe order.
pub fn alternates(base: &str) -> impl Iterator<Item = String> + '_ {
    (1..=MAX_ALTERNATES).map(move |counter| alternate_id(base, counter))
}

pub async fn key_exists<E>(executor: &mut E, key_column: &KeyColumn, key: &str) -> DbResult<bool>
where
    E: StatementExecutor + ?Sized,
{
    let rs = executor.query(&key_column.exists_query(key)).await?;
    Ok(rs.scalar_i64()? > 0)
}

/// Returns `base` if it is unused, otherwise the first unused alternate.
/// `Ok(None)` means all alternates are taken.
pub async fn find_unique_id<E>(
    executor: &mut E,
    key_column: &KeyColumn,
    base: &str,
) -> DbResult<Option<String>>
where
    E: StatementExecutor + ?Sized,
{
    if !key_exists(executor, key_column, base).await? {
        return Ok(Some(base.to_string()));
    }
    for candidate in alternates(base) {
        if !key_exists(executor, key_column, &candidate).await? {
            info!(base, candidate = %candidate, "base identifier taken, using alternate");
            return Ok(Some(candidate));
        }
        debug!(candidate = %candidate, "alternate identifier taken");
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_alternate_for_student_number() {
        assert_eq!(alternate_id("888-88-8888", 1), "888-88-8100");
        assert_eq!(alternate_id("888-88-8888", 10), "888-88-8010");
        assert_eq!(alternate_id("888-88-8888", 999), "888-88-8999");
        assert_eq!(alternate_id("888-88-8888", 123), "888-88-8321");
    }

    #[test]
    fn short_base_keeps_whole_prefix() {
        assert_eq!(alternate_id("AB", 7), "AB700");
    }

    #[test]
    fn alternates_are_bounded_and_distinct() {
        let all: Vec<String> = alternates("123-45-6789").collect();
        assert_eq!(all.len(), MAX_ALTERNATES as usize);
        let unique: std::collections::HashSet<&String> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn key_column_rejects_non_identifiers() {
        assert!(KeyColumn::new("Student", "StdNo").is_ok());
        assert!(KeyColumn::new("Student; DROP TABLE x", "StdNo").is_err());
        assert!(KeyColumn::new("Student", "1col").is_err());
        assert!(KeyColumn::new("", "StdNo").is_err());
    }

    #[test]
    fn exists_query_binds_the_key() {
        let q = KeyColumn::new("Student", "StdNo")
            .expect("key column")
            .exists_query("888-88-8888");
        assert_eq!(q.sql(), "SELECT COUNT(*) FROM Student WHERE StdNo = $1");
        assert_eq!(q.params().len(), 1);
    }

    proptest! {
        #[test]
        fn alternates_keep_the_first_eight_chars(base in "[0-9]{3}-[0-9]{2}-[0-9]{4}", counter in 1u32..=999) {
            let alt = alternate_id(&base, counter);
            prop_assert_eq!(&alt[..8], &base[..8]);
            prop_assert_eq!(alt.len(), base.len());
            prop_assert!(alt[8..].chars().all(|c| c.is_ascii_digit()));
        }
    }
}
