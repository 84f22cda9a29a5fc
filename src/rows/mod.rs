//! The `bonus_registry` row and its column contract.
//!
//! [`COLUMNS`] is the single description of the table: DDL type, whether the
//! column is required, the probability a generated value is NULL and the
//! domain values are drawn from. The client-side [`RowGenerator`], the
//! server-side generation expressions and the DDL are all derived from it.

mod generator;
mod overlay;

pub use generator::{RowGenerator, FUTURE_SPAN_DAYS};
pub use overlay::{coerce, OverlayReport};

use crate::sql::SqlValue;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const REGISTRAR_TYPE_IDS: &[&str] = &[
    "bsBonusReceiveForTrip",
    "bsRecoveryRequestDoc",
    "bsTripForBonusDoc",
    "bsBonusDocument",
    "bsCustomTransaction",
    "bsCharityDocument",
    "bsExpirationDocument",
    "bsReturnDocument",
    "bsSurveyDoc",
    "bsCompensationDoc",
    "bsSouvenirRequest",
    "bsAdvanceDoc",
    "bsReturnAdvanceDoc",
];
pub const BONUS_TYPE_IDS: &[&str] = &["premial", "qualification"];
pub const ACTION_SOURCE_IDS: &[&str] = &["operator", "auto"];
pub const CARRIER_IDS: &[&str] = &["fpk", "tver", "rzd"];
pub const OPERATION_DOC_TYPE_IDS: &[&str] = &[
    "operation_transfer",
    "operation_status_assignment",
    "operation_manual_bonus",
];

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Int,
    Bool,
    Date,
    Timestamp,
}

impl SqlType {
    pub fn ddl(&self) -> &'static str {
        match self {
            SqlType::Text => "VARCHAR(255)",
            SqlType::Int => "INTEGER",
            SqlType::Bool => "BOOLEAN",
            SqlType::Date => "DATE",
            SqlType::Timestamp => "TIMESTAMP",
        }
    }
}

/// Time window a generated date or timestamp falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// Between 2020-01-01 and now
    Past,
    /// Between now and two years from now
    Future,
}

/// Where generated values come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    Uuid,
    Choice(&'static [&'static str]),
    Text { min: usize, max: usize },
    Int { min: i32, max: i32 },
    Bool,
    Date(Span),
    Timestamp(Span),
    /// Insertion time
    Now,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub required: bool,
    pub null_probability: f64,
    pub domain: Domain,
}

const fn required(name: &'static str, sql_type: SqlType, domain: Domain) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        required: true,
        null_probability: 0.0,
        domain,
    }
}

const fn nullable(
    name: &'static str,
    sql_type: SqlType,
    null_probability: f64,
    domain: Domain,
) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        required: false,
        null_probability,
        domain,
    }
}

use Domain::{Choice, Int, Text, Uuid};
use SqlType as T;

const NAME: Domain = Text { min: 10, max: 20 };

/// Column contract in insert order.
pub const COLUMNS: [ColumnDef; 52] = [
    required("id", T::Text, Uuid),
    nullable("date", T::Timestamp, 0.2, Domain::Timestamp(Span::Past)),
    nullable("registrar_type_id", T::Text, 0.2, Choice(REGISTRAR_TYPE_IDS)),
    nullable("registrar_id", T::Text, 0.2, Uuid),
    nullable("row", T::Int, 0.2, Int { min: 1, max: 10 }),
    nullable("manager_id", T::Int, 0.3, Int { min: 1, max: 1000 }),
    required("bs_profile_id", T::Text, Uuid),
    required("accounted_for_bs_profile_id", T::Text, Uuid),
    nullable("first_name", T::Text, 0.4, NAME),
    nullable("first_name_latin", T::Text, 0.4, NAME),
    nullable("last_name", T::Text, 0.4, NAME),
    nullable("last_name_latin", T::Text, 0.4, NAME),
    nullable("departure_id", T::Int, 0.5, Int { min: 1, max: 100 }),
    nullable("arrival_id", T::Int, 0.5, Int { min: 1, max: 100 }),
    nullable("departure_date", T::Date, 0.5, Domain::Date(Span::Past)),
    nullable("currency_entry_id", T::Int, 0.5, Int { min: 1, max: 10 }),
    required("bonus_type_id", T::Text, Choice(BONUS_TYPE_IDS)),
    required("action_source_id", T::Text, Choice(ACTION_SOURCE_IDS)),
    nullable("bs_bonus_ticket_id", T::Text, 0.8, Uuid),
    nullable("validity_time", T::Int, 0.6, Int { min: 30, max: 365 }),
    nullable("date_of_expire", T::Date, 0.6, Domain::Date(Span::Future)),
    nullable("car_type_id", T::Text, 0.8, Text { min: 5, max: 10 }),
    nullable("express_carrier_id", T::Int, 0.7, Int { min: 1, max: 50 }),
    nullable("carrier_id", T::Text, 0.6, Choice(CARRIER_IDS)),
    nullable("bs_partner_id", T::Int, 0.7, Int { min: 1, max: 20 }),
    nullable("bs_train_number_id", T::Text, 0.8, Text { min: 5, max: 15 }),
    nullable("bs_tourism_train_id", T::Text, 0.8, Text { min: 5, max: 15 }),
    nullable("accounted_in_calculation", T::Bool, 0.0, Domain::Bool),
    nullable("cancelled", T::Bool, 0.0, Domain::Bool),
    nullable("bs_quota_id", T::Int, 0.8, Int { min: 1, max: 100 }),
    required("doc_to_track_type_id", T::Text, Choice(REGISTRAR_TYPE_IDS)),
    required("doc_to_track_id", T::Text, Uuid),
    nullable("doc_to_track_date", T::Date, 0.5, Domain::Date(Span::Past)),
    nullable("active_date", T::Date, 0.7, Domain::Date(Span::Past)),
    nullable("trip_for_another_person", T::Bool, 0.0, Domain::Bool),
    nullable("ticket_number", T::Text, 0.8, Text { min: 10, max: 20 }),
    nullable("currency_amount", T::Int, 0.8, Int { min: 100, max: 10000 }),
    required("amount", T::Int, Int { min: -1000, max: 10000 }),
    nullable("bs_partner_bonus_type_id", T::Text, 0.8, Text { min: 5, max: 15 }),
    nullable("express_service_class_id", T::Int, 0.8, Int { min: 1, max: 5 }),
    nullable("date_to_cancelled", T::Timestamp, 0.9, Domain::Timestamp(Span::Future)),
    nullable("prolongable", T::Bool, 0.0, Domain::Bool),
    nullable("active_by_trips", T::Bool, 0.0, Domain::Bool),
    nullable("is_empty", T::Bool, 0.0, Domain::Bool),
    nullable("amount_calculation", T::Text, 0.7, Uuid),
    nullable("distance", T::Int, 0.7, Int { min: 100, max: 5000 }),
    nullable("addition_amount", T::Int, 0.8, Int { min: 10, max: 500 }),
    nullable("operation_doc_type_id", T::Text, 0.3, Choice(OPERATION_DOC_TYPE_IDS)),
    nullable("is_merged", T::Bool, 0.0, Domain::Bool),
    nullable("merged_date", T::Date, 0.9, Domain::Date(Span::Past)),
    nullable("created_at", T::Timestamp, 0.0, Domain::Timestamp(Span::Past)),
    nullable("ingested_at", T::Timestamp, 0.0, Domain::Now),
];

pub fn column(name: &str) -> Option<&'static ColumnDef> {
    COLUMNS.iter().find(|c| c.name == name)
}

/// Comma-separated, quoted column list in insert order.
pub fn column_list() -> String {
    COLUMNS
        .iter()
        .map(|c| crate::sql::quote_ident(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    pub id: String,
    pub date: Option<NaiveDateTime>,
    pub registrar_type_id: Option<String>,
    pub registrar_id: Option<String>,
    pub row: Option<i32>,
    pub manager_id: Option<i32>,
    pub bs_profile_id: String,
    pub accounted_for_bs_profile_id: String,
    pub first_name: Option<String>,
    pub first_name_latin: Option<String>,
    pub last_name: Option<String>,
    pub last_name_latin: Option<String>,
    pub departure_id: Option<i32>,
    pub arrival_id: Option<i32>,
    pub departure_date: Option<NaiveDate>,
    pub currency_entry_id: Option<i32>,
    pub bonus_type_id: String,
    pub action_source_id: String,
    pub bs_bonus_ticket_id: Option<String>,
    pub validity_time: Option<i32>,
    pub date_of_expire: Option<NaiveDate>,
    pub car_type_id: Option<String>,
    pub express_carrier_id: Option<i32>,
    pub carrier_id: Option<String>,
    pub bs_partner_id: Option<i32>,
    pub bs_train_number_id: Option<String>,
    pub bs_tourism_train_id: Option<String>,
    pub accounted_in_calculation: Option<bool>,
    pub cancelled: Option<bool>,
    pub bs_quota_id: Option<i32>,
    pub doc_to_track_type_id: String,
    pub doc_to_track_id: String,
    pub doc_to_track_date: Option<NaiveDate>,
    pub active_date: Option<NaiveDate>,
    pub trip_for_another_person: Option<bool>,
    pub ticket_number: Option<String>,
    pub currency_amount: Option<i32>,
    pub amount: i32,
    pub bs_partner_bonus_type_id: Option<String>,
    pub express_service_class_id: Option<i32>,
    pub date_to_cancelled: Option<NaiveDateTime>,
    pub prolongable: Option<bool>,
    pub active_by_trips: Option<bool>,
    pub is_empty: Option<bool>,
    pub amount_calculation: Option<String>,
    pub distance: Option<i32>,
    pub addition_amount: Option<i32>,
    pub operation_doc_type_id: Option<String>,
    pub is_merged: Option<bool>,
    pub merged_date: Option<NaiveDate>,
    pub created_at: Option<NaiveDateTime>,
    pub ingested_at: Option<NaiveDateTime>,
}

impl Row {
    /// Values in [`COLUMNS`] order.
    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.date.into(),
            self.registrar_type_id.clone().into(),
            self.registrar_id.clone().into(),
            self.row.into(),
            self.manager_id.into(),
            self.bs_profile_id.clone().into(),
            self.accounted_for_bs_profile_id.clone().into(),
            self.first_name.clone().into(),
            self.first_name_latin.clone().into(),
            self.last_name.clone().into(),
            self.last_name_latin.clone().into(),
            self.departure_id.into(),
            self.arrival_id.into(),
            self.departure_date.into(),
            self.currency_entry_id.into(),
            self.bonus_type_id.clone().into(),
            self.action_source_id.clone().into(),
            self.bs_bonus_ticket_id.clone().into(),
            self.validity_time.into(),
            self.date_of_expire.into(),
            self.car_type_id.clone().into(),
            self.express_carrier_id.into(),
            self.carrier_id.clone().into(),
            self.bs_partner_id.into(),
            self.bs_train_number_id.clone().into(),
            self.bs_tourism_train_id.clone().into(),
            self.accounted_in_calculation.into(),
            self.cancelled.into(),
            self.bs_quota_id.into(),
            self.doc_to_track_type_id.clone().into(),
            self.doc_to_track_id.clone().into(),
            self.doc_to_track_date.into(),
            self.active_date.into(),
            self.trip_for_another_person.into(),
            self.ticket_number.clone().into(),
            self.currency_amount.into(),
            self.amount.into(),
            self.bs_partner_bonus_type_id.clone().into(),
            self.express_service_class_id.into(),
            self.date_to_cancelled.into(),
            self.prolongable.into(),
            self.active_by_trips.into(),
            self.is_empty.into(),
            self.amount_calculation.clone().into(),
            self.distance.into(),
            self.addition_amount.into(),
            self.operation_doc_type_id.clone().into(),
            self.is_merged.into(),
            self.merged_date.into(),
            self.created_at.into(),
            self.ingested_at.into(),
        ]
    }

    /// Assign one column from a value already coerced to the column's type.
    ///
    /// A value of the wrong type, or NULL for a required column, leaves the
    /// field unchanged and returns false.
    pub fn set(&mut self, column: &str, value: SqlValue) -> bool {
        match column {
            "id" => put_required(&mut self.id, text(value)),
            "date" => put(&mut self.date, timestamp(value)),
            "registrar_type_id" => put(&mut self.registrar_type_id, text(value)),
            "registrar_id" => put(&mut self.registrar_id, text(value)),
            "row" => put(&mut self.row, int(value)),
            "manager_id" => put(&mut self.manager_id, int(value)),
            "bs_profile_id" => put_required(&mut self.bs_profile_id, text(value)),
            "accounted_for_bs_profile_id" => {
                put_required(&mut self.accounted_for_bs_profile_id, text(value))
            }
            "first_name" => put(&mut self.first_name, text(value)),
            "first_name_latin" => put(&mut self.first_name_latin, text(value)),
            "last_name" => put(&mut self.last_name, text(value)),
            "last_name_latin" => put(&mut self.last_name_latin, text(value)),
            "departure_id" => put(&mut self.departure_id, int(value)),
            "arrival_id" => put(&mut self.arrival_id, int(value)),
            "departure_date" => put(&mut self.departure_date, date(value)),
            "currency_entry_id" => put(&mut self.currency_entry_id, int(value)),
            "bonus_type_id" => put_required(&mut self.bonus_type_id, text(value)),
            "action_source_id" => put_required(&mut self.action_source_id, text(value)),
            "bs_bonus_ticket_id" => put(&mut self.bs_bonus_ticket_id, text(value)),
            "validity_time" => put(&mut self.validity_time, int(value)),
            "date_of_expire" => put(&mut self.date_of_expire, date(value)),
            "car_type_id" => put(&mut self.car_type_id, text(value)),
            "express_carrier_id" => put(&mut self.express_carrier_id, int(value)),
            "carrier_id" => put(&mut self.carrier_id, text(value)),
            "bs_partner_id" => put(&mut self.bs_partner_id, int(value)),
            "bs_train_number_id" => put(&mut self.bs_train_number_id, text(value)),
            "bs_tourism_train_id" => put(&mut self.bs_tourism_train_id, text(value)),
            "accounted_in_calculation" => put(&mut self.accounted_in_calculation, boolean(value)),
            "cancelled" => put(&mut self.cancelled, boolean(value)),
            "bs_quota_id" => put(&mut self.bs_quota_id, int(value)),
            "doc_to_track_type_id" => put_required(&mut self.doc_to_track_type_id, text(value)),
            "doc_to_track_id" => put_required(&mut self.doc_to_track_id, text(value)),
            "doc_to_track_date" => put(&mut self.doc_to_track_date, date(value)),
            "active_date" => put(&mut self.active_date, date(value)),
            "trip_for_another_person" => put(&mut self.trip_for_another_person, boolean(value)),
            "ticket_number" => put(&mut self.ticket_number, text(value)),
            "currency_amount" => put(&mut self.currency_amount, int(value)),
            "amount" => put_required(&mut self.amount, int(value)),
            "bs_partner_bonus_type_id" => put(&mut self.bs_partner_bonus_type_id, text(value)),
            "express_service_class_id" => put(&mut self.express_service_class_id, int(value)),
            "date_to_cancelled" => put(&mut self.date_to_cancelled, timestamp(value)),
            "prolongable" => put(&mut self.prolongable, boolean(value)),
            "active_by_trips" => put(&mut self.active_by_trips, boolean(value)),
            "is_empty" => put(&mut self.is_empty, boolean(value)),
            "amount_calculation" => put(&mut self.amount_calculation, text(value)),
            "distance" => put(&mut self.distance, int(value)),
            "addition_amount" => put(&mut self.addition_amount, int(value)),
            "operation_doc_type_id" => put(&mut self.operation_doc_type_id, text(value)),
            "is_merged" => put(&mut self.is_merged, boolean(value)),
            "merged_date" => put(&mut self.merged_date, date(value)),
            "created_at" => put(&mut self.created_at, timestamp(value)),
            "ingested_at" => put(&mut self.ingested_at, timestamp(value)),
            _ => false,
        }
    }
}

/// `Some(None)` means an explicit NULL, `None` a type mismatch.
type Coerced<T> = Option<Option<T>>;

fn put<T>(field: &mut Option<T>, value: Coerced<T>) -> bool {
    match value {
        Some(v) => {
            *field = v;
            true
        }
        None => false,
    }
}

fn put_required<T>(field: &mut T, value: Coerced<T>) -> bool {
    match value {
        Some(Some(v)) => {
            *field = v;
            true
        }
        _ => false,
    }
}

fn text(value: SqlValue) -> Coerced<String> {
    match value {
        SqlValue::Null => Some(None),
        SqlValue::Text(s) => Some(Some(s)),
        _ => None,
    }
}

fn int(value: SqlValue) -> Coerced<i32> {
    match value {
        SqlValue::Null => Some(None),
        SqlValue::Int(i) => i32::try_from(i).ok().map(Some),
        _ => None,
    }
}

fn boolean(value: SqlValue) -> Coerced<bool> {
    match value {
        SqlValue::Null => Some(None),
        SqlValue::Bool(b) => Some(Some(b)),
        _ => None,
    }
}

fn date(value: SqlValue) -> Coerced<NaiveDate> {
    match value {
        SqlValue::Null => Some(None),
        SqlValue::Date(d) => Some(Some(d)),
        SqlValue::Timestamp(ts) => Some(Some(ts.date())),
        _ => None,
    }
}

fn timestamp(value: SqlValue) -> Coerced<NaiveDateTime> {
    match value {
        SqlValue::Null => Some(None),
        SqlValue::Timestamp(ts) => Some(Some(ts)),
        SqlValue::Date(d) => Some(d.and_hms_opt(0, 0, 0)),
        _ => None,
    }
}
