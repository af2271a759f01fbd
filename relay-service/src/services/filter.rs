//! Transfer list filtering.
//!
//! A filter selects transfers along exactly one dimension: status, a date
//! range over `created_at`/`updated_at`, or one recipient attribute. Filtering
//! is stable and never touches the input slice.

use crate::models::TransferRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid filter: {0}")]
    Validation(String),

    #[error("Unparseable date: {value:?}")]
    Parse { value: String },
}

/// Which timestamp a date range applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Created,
    Updated,
}

impl FromStr for DateKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            other => Err(FilterError::Validation(format!(
                "unknown date_kind {other:?}, expected \"created\" or \"updated\""
            ))),
        }
    }
}

/// Which recipient attribute a recipient filter compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    Code,
    Name,
    Account,
}

impl FromStr for RecipientKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recipient_code" => Ok(Self::Code),
            "recipient_name" => Ok(Self::Name),
            "recipient_account" => Ok(Self::Account),
            other => Err(FilterError::Validation(format!(
                "unknown r_kind {other:?}, expected recipient_code, recipient_name \
                 or recipient_account"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// Keep every record.
    All,
    ByStatus(String),
    /// Inclusive on both ends, compared at day precision.
    ByDateRange {
        kind: DateKind,
        from: String,
        to: String,
    },
    ByRecipient {
        kind: RecipientKind,
        value: String,
    },
}

/// Loose key/value form of a filter as it arrives in a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    pub status: Option<String>,
    pub date_kind: Option<String>,
    #[serde(rename = "_from")]
    pub from: Option<String>,
    pub to: Option<String>,
    pub r_kind: Option<String>,
    pub recipient: Option<String>,
}

// Blank form fields count as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<FilterQuery> for FilterSpec {
    type Error = FilterError;

    fn try_from(query: FilterQuery) -> Result<Self, Self::Error> {
        let status = present(query.status);
        let date_kind = present(query.date_kind);
        let from = present(query.from);
        let to = present(query.to);
        let r_kind = present(query.r_kind);
        let recipient = present(query.recipient);

        let by_status = status.is_some();
        let by_date = date_kind.is_some() || from.is_some() || to.is_some();
        let by_recipient = r_kind.is_some() || recipient.is_some();

        if [by_status, by_date, by_recipient].iter().filter(|d| **d).count() > 1 {
            return Err(FilterError::Validation(
                "only one filter dimension may be given per request".to_string(),
            ));
        }

        if let Some(status) = status {
            return Ok(Self::ByStatus(status));
        }

        if by_date {
            let kind = date_kind
                .ok_or_else(|| {
                    FilterError::Validation("_from/to given without date_kind".to_string())
                })?
                .parse()?;
            return match (from, to) {
                (Some(from), Some(to)) => Ok(Self::ByDateRange { kind, from, to }),
                _ => Err(FilterError::Validation(
                    "date range needs both _from and to".to_string(),
                )),
            };
        }

        if by_recipient {
            return match (r_kind, recipient) {
                (Some(kind), Some(value)) => Ok(Self::ByRecipient {
                    kind: kind.parse()?,
                    value,
                }),
                (Some(_), None) => Err(FilterError::Validation(
                    "r_kind given without recipient".to_string(),
                )),
                _ => Err(FilterError::Validation(
                    "recipient given without r_kind".to_string(),
                )),
            };
        }

        Ok(Self::All)
    }
}

/// Return the records matching `spec`, in their original order.
pub fn filter_transfers(
    records: &[TransferRecord],
    spec: &FilterSpec,
) -> Result<Vec<TransferRecord>, FilterError> {
    match spec {
        FilterSpec::All => Ok(records.to_vec()),
        FilterSpec::ByStatus(status) => Ok(records
            .iter()
            .filter(|r| r.status == *status)
            .cloned()
            .collect()),
        FilterSpec::ByDateRange { kind, from, to } => {
            let from = parse_day(from)?;
            let to = parse_day(to)?;

            let mut matched = Vec::new();
            for record in records {
                let stamp = match kind {
                    DateKind::Created => &record.created_at,
                    DateKind::Updated => &record.updated_at,
                };
                let day = parse_day(stamp)?;
                if from <= day && day <= to {
                    matched.push(record.clone());
                }
            }
            Ok(matched)
        }
        FilterSpec::ByRecipient { kind, value } => Ok(records
            .iter()
            .filter(|r| {
                let field = match kind {
                    RecipientKind::Code => Some(r.recipient.recipient_code.as_str()),
                    RecipientKind::Name => Some(r.recipient.name.as_str()),
                    RecipientKind::Account => r.recipient.account_number.as_deref(),
                };
                field == Some(value.as_str())
            })
            .cloned()
            .collect()),
    }
}

/// Calendar day of a timestamp or date string. Offset-bearing timestamps keep
/// the day as written, not converted to UTC.
fn parse_day(value: &str) -> Result<NaiveDate, FilterError> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.date_naive());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(ts.date());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| FilterError::Parse {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer(
        status: &str,
        created_at: &str,
        updated_at: &str,
        code: &str,
        name: &str,
        account: &str,
    ) -> TransferRecord {
        serde_json::from_value(json!({
            "status": status,
            "createdAt": created_at,
            "updatedAt": updated_at,
            "amount": 50000,
            "currency": "NGN",
            "recipient": {
                "recipient_code": code,
                "name": name,
                "details": { "account_number": account, "bank_code": "044" }
            }
        }))
        .unwrap()
    }

    fn fixture() -> Vec<TransferRecord> {
        vec![
            transfer(
                "success",
                "2019-03-01T09:12:00.000Z",
                "2019-03-01T09:15:00.000Z",
                "RCP_1a2b3c4d5e6f7g8",
                "Chinedu Okafor",
                "0123456789",
            ),
            transfer(
                "failed",
                "2019-03-03T13:40:10.000Z",
                "2019-03-03T13:41:00.000Z",
                "RCP_rvqc1kyc3isc4ys",
                "Amarachi Olusina",
                "0108996727",
            ),
            transfer(
                "failed",
                "2019-03-05T23:59:59.000Z",
                "2019-03-05T23:59:59.000Z",
                "RCP_9z8y7x6w5v4u3t2",
                "Tunde Bakare",
                "0234567890",
            ),
            transfer(
                "pending",
                "2019-02-20T08:00:00.000Z",
                "2019-03-07T10:00:00.000Z",
                "RCP_k1l2m3n4o5p6q7r",
                "Ngozi Eze",
                "0345678901",
            ),
        ]
    }

    fn codes(records: &[TransferRecord]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.recipient.recipient_code.as_str())
            .collect()
    }

    fn date_range(kind: DateKind, from: &str, to: &str) -> FilterSpec {
        FilterSpec::ByDateRange {
            kind,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn status_filter_keeps_matching_records_in_order() {
        let records = fixture();
        let result =
            filter_transfers(&records, &FilterSpec::ByStatus("failed".to_string())).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(codes(&result), ["RCP_rvqc1kyc3isc4ys", "RCP_9z8y7x6w5v4u3t2"]);
    }

    #[test]
    fn status_filter_is_case_sensitive() {
        let records = fixture();
        let result =
            filter_transfers(&records, &FilterSpec::ByStatus("Failed".to_string())).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn status_filter_returns_exactly_the_matching_subset() {
        let records = fixture();
        for status in ["success", "failed", "pending", "otp"] {
            let result =
                filter_transfers(&records, &FilterSpec::ByStatus(status.to_string())).unwrap();
            let expected: Vec<_> = records
                .iter()
                .filter(|r| r.status == status)
                .cloned()
                .collect();
            assert_eq!(result, expected, "status {status}");
        }
    }

    #[test]
    fn created_range_accepts_unpadded_bounds() {
        let records = fixture();
        let result =
            filter_transfers(&records, &date_range(DateKind::Created, "2019-03-2", "2019-03-4"))
                .unwrap();

        assert_eq!(codes(&result), ["RCP_rvqc1kyc3isc4ys"]);
    }

    #[test]
    fn updated_range_uses_updated_at() {
        let records = fixture();
        let result =
            filter_transfers(&records, &date_range(DateKind::Updated, "2019-03-2", "2019-03-6"))
                .unwrap();

        assert_eq!(result.len(), 2);
    }

    #[test]
    fn date_range_is_inclusive_at_both_bounds() {
        let records = fixture();
        let result = filter_transfers(
            &records,
            &date_range(DateKind::Created, "2019-03-01", "2019-03-05"),
        )
        .unwrap();

        assert_eq!(
            codes(&result),
            ["RCP_1a2b3c4d5e6f7g8", "RCP_rvqc1kyc3isc4ys", "RCP_9z8y7x6w5v4u3t2"]
        );
    }

    #[test]
    fn single_day_range_ignores_time_of_day() {
        let records = fixture();
        let result = filter_transfers(
            &records,
            &date_range(DateKind::Created, "2019-03-05", "2019-03-05"),
        )
        .unwrap();

        assert_eq!(codes(&result), ["RCP_9z8y7x6w5v4u3t2"]);
    }

    #[test]
    fn inverted_range_matches_nothing() {
        let records = fixture();
        let result = filter_transfers(
            &records,
            &date_range(DateKind::Created, "2019-03-05", "2019-03-01"),
        )
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn offset_timestamps_keep_their_local_day() {
        let records = vec![transfer(
            "success",
            "2019-03-03T23:30:00+01:00",
            "2019-03-03T23:30:00+01:00",
            "RCP_a",
            "A",
            "1",
        )];
        let result = filter_transfers(
            &records,
            &date_range(DateKind::Created, "2019-03-03", "2019-03-03"),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn malformed_bound_is_a_parse_error() {
        let records = fixture();
        let err = filter_transfers(
            &records,
            &date_range(DateKind::Created, "March 2nd", "2019-03-04"),
        )
        .unwrap_err();

        assert_eq!(
            err,
            FilterError::Parse {
                value: "March 2nd".to_string()
            }
        );
    }

    #[test]
    fn malformed_record_timestamp_is_a_parse_error() {
        let mut records = fixture();
        records[2].created_at = "yesterday".to_string();

        let err = filter_transfers(
            &records,
            &date_range(DateKind::Created, "2019-01-01", "2019-12-31"),
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::Parse { .. }));
    }

    #[test]
    fn recipient_filters_match_exactly() {
        let records = fixture();
        let cases = [
            (RecipientKind::Code, "RCP_rvqc1kyc3isc4ys"),
            (RecipientKind::Name, "Amarachi Olusina"),
            (RecipientKind::Account, "0108996727"),
        ];

        for (kind, value) in cases {
            let spec = FilterSpec::ByRecipient {
                kind,
                value: value.to_string(),
            };
            let result = filter_transfers(&records, &spec).unwrap();
            assert_eq!(codes(&result), ["RCP_rvqc1kyc3isc4ys"], "{kind:?}");
        }
    }

    #[test]
    fn recipient_near_miss_is_excluded() {
        let records = fixture();
        for (kind, value) in [
            (RecipientKind::Account, "0108996728"),
            (RecipientKind::Name, "amarachi olusina"),
            (RecipientKind::Code, "RCP_rvqc1kyc3isc4y"),
        ] {
            let spec = FilterSpec::ByRecipient {
                kind,
                value: value.to_string(),
            };
            assert!(filter_transfers(&records, &spec).unwrap().is_empty());
        }
    }

    #[test]
    fn missing_account_only_matters_to_account_filter() {
        let mut records = fixture();
        records[1].recipient.account_number = None;

        let failed = filter_transfers(&records, &FilterSpec::ByStatus("failed".to_string()))
            .unwrap();
        assert_eq!(failed.len(), 2);

        let spec = FilterSpec::ByRecipient {
            kind: RecipientKind::Account,
            value: "0108996727".to_string(),
        };
        assert!(filter_transfers(&records, &spec).unwrap().is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let specs = [
            FilterSpec::All,
            FilterSpec::ByStatus("failed".to_string()),
            date_range(DateKind::Updated, "2019-03-01", "2019-03-31"),
            FilterSpec::ByRecipient {
                kind: RecipientKind::Name,
                value: "Ngozi Eze".to_string(),
            },
        ];
        for spec in specs {
            assert!(filter_transfers(&[], &spec).unwrap().is_empty());
        }
    }

    #[test]
    fn pass_through_returns_input_unchanged() {
        let records = fixture();
        assert_eq!(filter_transfers(&records, &FilterSpec::All).unwrap(), records);
    }

    #[test]
    fn filtering_does_not_touch_input() {
        let records = fixture();
        let before = records.clone();
        filter_transfers(&records, &FilterSpec::ByStatus("failed".to_string())).unwrap();
        filter_transfers(&records, &date_range(DateKind::Created, "2019-03-02", "2019-03-04"))
            .unwrap();
        assert_eq!(records, before);
    }

    #[test]
    fn survivors_keep_passthrough_fields() {
        let records = fixture();
        let result =
            filter_transfers(&records, &FilterSpec::ByStatus("pending".to_string())).unwrap();
        assert_eq!(result[0].extra["amount"], 50000);
        assert_eq!(result[0].recipient.extra["details"]["bank_code"], "044");
    }

    fn query(pairs: &[(&str, &str)]) -> FilterQuery {
        let encoded = serde_urlencoded::to_string(pairs).unwrap();
        serde_urlencoded::from_str(&encoded).unwrap()
    }

    #[test]
    fn empty_query_is_pass_through() {
        assert_eq!(FilterSpec::try_from(query(&[])).unwrap(), FilterSpec::All);
        assert_eq!(
            FilterSpec::try_from(query(&[("status", ""), ("recipient", " ")])).unwrap(),
            FilterSpec::All
        );
    }

    #[test]
    fn query_shapes_convert_to_specs() {
        assert_eq!(
            FilterSpec::try_from(query(&[("status", "failed")])).unwrap(),
            FilterSpec::ByStatus("failed".to_string())
        );
        assert_eq!(
            FilterSpec::try_from(query(&[
                ("date_kind", "updated"),
                ("_from", "2019-03-2"),
                ("to", "2019-03-6"),
            ]))
            .unwrap(),
            date_range(DateKind::Updated, "2019-03-2", "2019-03-6")
        );
        assert_eq!(
            FilterSpec::try_from(query(&[
                ("r_kind", "recipient_account"),
                ("recipient", "0108996727"),
            ]))
            .unwrap(),
            FilterSpec::ByRecipient {
                kind: RecipientKind::Account,
                value: "0108996727".to_string()
            }
        );
    }

    #[test]
    fn invalid_queries_are_validation_errors() {
        let cases: &[&[(&str, &str)]] = &[
            &[("date_kind", "deleted"), ("_from", "2019-03-01"), ("to", "2019-03-02")],
            &[("r_kind", "recipient_email"), ("recipient", "x@y.z")],
            &[("date_kind", "created"), ("_from", "2019-03-01")],
            &[("_from", "2019-03-01"), ("to", "2019-03-02")],
            &[("r_kind", "recipient_code")],
            &[("recipient", "RCP_rvqc1kyc3isc4ys")],
            &[("status", "failed"), ("r_kind", "recipient_code"), ("recipient", "RCP_x")],
            &[("status", "failed"), ("date_kind", "created")],
        ];

        for pairs in cases {
            let err = FilterSpec::try_from(query(pairs)).unwrap_err();
            assert!(matches!(err, FilterError::Validation(_)), "{pairs:?}");
        }
    }
}
