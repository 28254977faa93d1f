//! Request-body validation and the field-error body returned on failure.
//!
//! Payloads are read field by field from a JSON object so every bad field
//! is reported at once as `{"field": ["message", ...]}`.

use chrono::{NaiveDate, Utc};
use cinema_core::show::{PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS, TEXT_MAX_LEN};
use cinema_core::{
    EventSource, EventType, MovieCatalog, ReservationEvent, ReservationInput, ReservationStatus,
    ShowInput, ShowRepository,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::AppError;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";
const NOT_A_NUMBER: &str = "A valid number is required.";
const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
const BAD_DOCUMENT_ID: &str = "Ensure this value contains only letters, digits, '-' and '_' (at most 64 characters).";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

/// How strictly a payload is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Required fields must be present; omitted optional fields take defaults.
    Create,
    /// PUT: required fields must be present; omitted optional fields keep their value.
    Replace,
    /// PATCH: nothing is required.
    Partial,
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[derive(Debug, Clone, Copy)]
struct Text {
    required: bool,
    allow_blank: bool,
    max_len: Option<usize>,
}

impl Text {
    /// Model text column: optional, may be blank, bounded.
    const COLUMN: Text = Text {
        required: false,
        allow_blank: true,
        max_len: Some(TEXT_MAX_LEN),
    };
    /// Document text field: required, non-blank, bounded.
    const BOUNDED: Text = Text {
        required: true,
        allow_blank: false,
        max_len: Some(TEXT_MAX_LEN),
    };
    const FREE: Text = Text {
        required: true,
        allow_blank: false,
        max_len: None,
    };
}

/// Field reader over one JSON object that accumulates errors.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    mode: WriteMode,
    errors: FieldErrors,
}

impl<'a> Fields<'a> {
    fn new(body: &'a Value, mode: WriteMode) -> Result<Self, FieldErrors> {
        match body {
            Value::Object(map) => Ok(Self {
                map,
                mode,
                errors: FieldErrors::new(),
            }),
            other => Err(FieldErrors::single(
                "non_field_errors",
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_type_name(other)
                ),
            )),
        }
    }

    /// Present, non-null value; records required/null errors otherwise.
    fn lookup(&mut self, name: &str, required: bool) -> Option<&'a Value> {
        match self.map.get(name) {
            None => {
                if required && self.mode != WriteMode::Partial {
                    self.errors.add(name, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                self.errors.add(name, NOT_NULL);
                None
            }
            Some(value) => Some(value),
        }
    }

    fn string(&mut self, name: &str, rules: Text) -> Option<String> {
        let text = match self.lookup(name, rules.required)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.errors.add(name, NOT_A_STRING);
                return None;
            }
        };

        if text.is_empty() && !rules.allow_blank {
            self.errors.add(name, NOT_BLANK);
            return None;
        }
        if let Some(max) = rules.max_len {
            if text.chars().count() > max {
                self.errors
                    .add(name, format!("Ensure this field has no more than {max} characters."));
                return None;
            }
        }
        Some(text)
    }

    fn integer(&mut self, name: &str, required: bool) -> Option<i32> {
        let value = self.lookup(name, required)?;
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => parse_integer(s.trim()),
            _ => None,
        };

        let Some(parsed) = parsed else {
            self.errors.add(name, NOT_AN_INTEGER);
            return None;
        };
        if parsed > i64::from(i32::MAX) {
            self.errors.add(
                name,
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            return None;
        }
        if parsed < i64::from(i32::MIN) {
            self.errors.add(
                name,
                format!("Ensure this value is greater than or equal to {}.", i32::MIN),
            );
            return None;
        }
        Some(parsed as i32)
    }

    fn decimal(&mut self, name: &str, required: bool, max_digits: u32, places: u32) -> Option<Decimal> {
        let value = self.lookup(name, required)?;
        let parsed = match value {
            Value::String(s) => parse_decimal(s.trim()),
            Value::Number(n) => parse_decimal(&n.to_string()),
            _ => None,
        };
        let Some(parsed) = parsed else {
            self.errors.add(name, NOT_A_NUMBER);
            return None;
        };

        match decimal_precision_error(parsed, max_digits, places) {
            Some(message) => {
                self.errors.add(name, message);
                None
            }
            None => Some(parsed),
        }
    }

    fn boolean(&mut self, name: &str, required: bool) -> Option<bool> {
        let value = self.lookup(name, required)?;
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "t" | "y" | "yes" | "true" | "on" | "1" => Some(true),
                "f" | "n" | "no" | "false" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(name, NOT_A_BOOLEAN);
        }
        parsed
    }

    fn choice<T: FromStr>(&mut self, name: &str, required: bool) -> Option<T> {
        let value = self.lookup(name, required)?;
        let raw = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match raw.parse::<T>() {
            Ok(choice) => Some(choice),
            Err(_) => {
                self.errors.add(name, format!("\"{raw}\" is not a valid choice."));
                None
            }
        }
    }

    fn date(&mut self, name: &str, required: bool) -> Option<NaiveDate> {
        let value = self.lookup(name, required)?;
        let parsed = value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        if parsed.is_none() {
            self.errors.add(name, BAD_DATE);
        }
        parsed
    }

    /// Shape check for a related row's id; existence is checked separately.
    fn primary_key(&mut self, name: &str, required: bool) -> Option<i64> {
        let value = self.lookup(name, required)?;
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(
                name,
                format!(
                    "Incorrect type. Expected pk value, received {}.",
                    json_type_name(value)
                ),
            );
        }
        parsed
    }

    fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Accepts `"12"` and `"12.0"` but not `"12.5"`.
fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let (whole, fraction) = raw.split_once('.')?;
    if fraction.chars().all(|c| c == '0') {
        whole.parse::<i64>().ok()
    } else {
        None
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Checks digits the way a `NUMERIC(max_digits, places)` column would.
fn decimal_precision_error(value: Decimal, max_digits: u32, places: u32) -> Option<String> {
    let scale = value.scale();
    let digits = value.mantissa().unsigned_abs().to_string().len() as u32;
    let (total, whole) = if digits > scale {
        (digits, digits - scale)
    } else {
        (scale, 0)
    };

    if total > max_digits {
        Some(format!(
            "Ensure that there are no more than {max_digits} digits in total."
        ))
    } else if scale > places {
        Some(format!(
            "Ensure that there are no more than {places} decimal places."
        ))
    } else if whole > max_digits - places {
        Some(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            max_digits - places
        ))
    } else {
        None
    }
}

/// Show fields supplied by a request; `None` means "not sent".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ShowChanges {
    pub movie_title: Option<String>,
    pub room: Option<String>,
    pub price: Option<Decimal>,
    pub available_seats: Option<i32>,
}

impl ShowChanges {
    pub fn apply(self, base: ShowInput) -> ShowInput {
        ShowInput {
            movie_title: self.movie_title.unwrap_or(base.movie_title),
            room: self.room.unwrap_or(base.room),
            price: self
                .price
                .map(cinema_core::show::normalize_price)
                .unwrap_or(base.price),
            available_seats: self.available_seats.unwrap_or(base.available_seats),
        }
    }
}

/// Column defaults for a new show.
pub fn new_show() -> ShowInput {
    ShowInput {
        movie_title: String::new(),
        room: String::new(),
        price: Decimal::ZERO,
        available_seats: 0,
    }
}

pub fn parse_show(body: &Value, mode: WriteMode) -> Result<ShowChanges, FieldErrors> {
    let mut fields = Fields::new(body, mode)?;
    let changes = ShowChanges {
        movie_title: fields.string("movie_title", Text::COLUMN),
        room: fields.string("room", Text::COLUMN),
        price: fields.decimal("price", true, PRICE_MAX_DIGITS, PRICE_DECIMAL_PLACES),
        available_seats: fields.integer("available_seats", false),
    };
    fields.finish()?;
    Ok(changes)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReservationChanges {
    pub show_id: Option<i64>,
    pub customer_name: Option<String>,
    pub seats: Option<i32>,
    pub status: Option<ReservationStatus>,
}

impl ReservationChanges {
    pub fn apply(self, base: ReservationInput) -> ReservationInput {
        ReservationInput {
            show_id: self.show_id.unwrap_or(base.show_id),
            customer_name: self.customer_name.unwrap_or(base.customer_name),
            seats: self.seats.unwrap_or(base.seats),
            status: self.status.unwrap_or(base.status),
        }
    }
}

/// Column defaults for a new reservation; `show_id` is always supplied.
pub fn new_reservation() -> ReservationInput {
    ReservationInput {
        show_id: 0,
        customer_name: String::new(),
        seats: 0,
        status: ReservationStatus::default(),
    }
}

/// Validates a reservation payload, including that `show_id` names a show.
pub async fn parse_reservation(
    body: &Value,
    mode: WriteMode,
    shows: &dyn ShowRepository,
) -> Result<ReservationChanges, AppError> {
    let mut fields = Fields::new(body, mode)?;
    let changes = ReservationChanges {
        show_id: fields.primary_key("show_id", true),
        customer_name: fields.string("customer_name", Text::COLUMN),
        seats: fields.integer("seats", false),
        status: fields.choice("status", false),
    };

    if let Some(show_id) = changes.show_id {
        if shows.get_show(show_id).await?.is_none() {
            fields.errors.add(
                "show_id",
                format!("Invalid pk \"{show_id}\" - object does not exist."),
            );
        }
    }
    fields.finish()?;
    Ok(changes)
}

/// Caller-chosen document id from `id` or `_id`, if any.
pub fn document_id(body: &Value) -> Result<Option<String>, FieldErrors> {
    let Some(map) = body.as_object() else {
        return Ok(None);
    };
    let (field, raw) = match (map.get("id"), map.get("_id")) {
        (Some(v), _) if !v.is_null() => ("id", v),
        (_, Some(v)) if !v.is_null() => ("_id", v),
        _ => return Ok(None),
    };

    let id = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(FieldErrors::single(field, NOT_A_STRING)),
    };
    if id.is_empty() {
        return Ok(None);
    }
    let valid = id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(FieldErrors::single(field, BAD_DOCUMENT_ID));
    }
    Ok(Some(id))
}

/// `stored` is the document being replaced; its optional fields survive
/// when the body omits them.
pub fn parse_movie_catalog(
    id: String,
    body: &Value,
    stored: Option<&MovieCatalog>,
) -> Result<MovieCatalog, FieldErrors> {
    let mode = if stored.is_some() { WriteMode::Replace } else { WriteMode::Create };
    let mut fields = Fields::new(body, mode)?;
    let movie_title = fields.string("movie_title", Text::BOUNDED);
    let genre = fields.string("genre", Text::BOUNDED);
    let duration_min = fields.integer("duration_min", true);
    let rating = fields.string("rating", Text::BOUNDED);
    let is_active = fields.boolean("is_active", false);
    fields.finish()?;

    match (movie_title, genre, duration_min, rating) {
        (Some(movie_title), Some(genre), Some(duration_min), Some(rating)) => Ok(MovieCatalog {
            id,
            movie_title,
            genre,
            duration_min,
            rating,
            is_active: is_active
                .or(stored.map(|entry| entry.is_active))
                .unwrap_or(true),
        }),
        // finish() already reported every missing field
        _ => Err(FieldErrors::single("non_field_errors", "Incomplete movie catalog entry.")),
    }
}

pub fn parse_reservation_event(
    id: String,
    body: &Value,
    stored: Option<&ReservationEvent>,
) -> Result<ReservationEvent, FieldErrors> {
    let mode = if stored.is_some() { WriteMode::Replace } else { WriteMode::Create };
    let mut fields = Fields::new(body, mode)?;
    let reservation_id = fields.string("reservation_id", Text::FREE);
    let event_type = fields.choice::<EventType>("event_type", false);
    let source = fields.choice::<EventSource>("source", false);
    let note = fields.string("note", Text::FREE);
    let created_at = fields.date("created_at", false);
    fields.finish()?;

    match (reservation_id, note) {
        (Some(reservation_id), Some(note)) => Ok(ReservationEvent {
            id,
            reservation_id,
            event_type: event_type
                .or(stored.map(|event| event.event_type))
                .unwrap_or_default(),
            source: source.or(stored.map(|event| event.source)).unwrap_or_default(),
            note,
            created_at: created_at
                .or(stored.map(|event| event.created_at))
                .unwrap_or_else(|| Utc::now().date_naive()),
        }),
        _ => Err(FieldErrors::single("non_field_errors", "Incomplete reservation event.")),
    }
}
