//! Exit codes for zenithctl
//!
//! One code per error kind, taken from sysexits.h where one fits.

use zenith_common::report::ErrorReport;
use zenith_common::ZenithErrorKind;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Telemetry was incomplete or malformed (EX_USAGE)
pub const EXIT_VALIDATION: i32 = 64;

/// The reasoning service answered with unusable data (EX_DATAERR)
pub const EXIT_DATA_PARSING: i32 = 65;

/// The reasoning service could not be reached or answered empty (EX_UNAVAILABLE)
pub const EXIT_EXTERNAL_SERVICE: i32 = 69;

/// Anything outside the domain taxonomy (EX_SOFTWARE)
pub const EXIT_UNHANDLED: i32 = 70;

/// API key missing or config file invalid (EX_CONFIG)
pub const EXIT_CONFIGURATION: i32 = 78;

pub fn exit_code_for_kind(kind: ZenithErrorKind) -> i32 {
    match kind {
        ZenithErrorKind::Configuration => EXIT_CONFIGURATION,
        ZenithErrorKind::Validation => EXIT_VALIDATION,
        ZenithErrorKind::ExternalService => EXIT_EXTERNAL_SERVICE,
        ZenithErrorKind::DataParsing => EXIT_DATA_PARSING,
    }
}

pub fn exit_code(report: &ErrorReport) -> i32 {
    ZenithErrorKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == report.code)
        .map(exit_code_for_kind)
        .unwrap_or(EXIT_UNHANDLED)
}
