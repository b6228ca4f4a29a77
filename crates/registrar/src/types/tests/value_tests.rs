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

use crate::types::value::{format_date, parse_date};
use crate::types::Value;
use rust_decimal::Decimal;
use std::str::FromStr;
use time::macros::{date, datetime};

#[test]
fn null_renders_as_empty_text() {
    assert_eq!(Value::Null.to_text(), "");
    assert!(Value::Null.is_null());
}

#[test]
fn scalar_values_render_with_display() {
    assert_eq!(Value::Int64(-42).to_text(), "-42");
    assert_eq!(Value::Float64(3.85).to_text(), "3.85");
    assert_eq!(Value::Boolean(true).to_text(), "true");
    assert_eq!(Value::text("TOPEKA").to_text(), "TOPEKA");
    assert_eq!(
        Value::Decimal(Decimal::from_str("3.50").expect("decimal")).to_text(),
        "3.50"
    );
}

#[test]
fn temporal_values_render_in_iso_form() {
    assert_eq!(Value::Date(date!(2019 - 07 - 01)).to_text(), "2019-07-01");
    assert_eq!(
        Value::Timestamp(datetime!(2020-01-15 9:05:00)).to_text(),
        "2020-01-15 09:05:00"
    );
}

#[test]
fn bytes_render_as_hex_escape() {
    assert_eq!(Value::Bytes(vec![0x00, 0xab, 0x10]).to_text(), "\\x00ab10");
}

#[test]
fn date_text_parses_back() {
    let d = date!(2016 - 03 - 15);
    assert_eq!(parse_date(&format_date(d)), Some(d));
    assert_eq!(parse_date("15/03/2016"), None);
}

#[test]
fn option_conversion_maps_none_to_null() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("IS")), Value::text("IS"));
    assert_eq!(Value::from(2_i32), Value::Int64(2));
}
