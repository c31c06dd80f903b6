//! HIPAA Safe Harbor age aggregation

/// Ages at or above this are aggregated into a single category
pub const SAFE_HARBOR_AGE_CEILING: i32 = 90;

/// Year literal used for the aggregated 90+ category
pub const AGGREGATED_BIRTH_YEAR: &str = "1900";

/// Bin a birth year for Safe Harbor output
///
/// Returns [`AGGREGATED_BIRTH_YEAR`] when `reference_year - birth_year` is 90
/// or more, `None` when the year may be released as-is.
///
/// # Examples
///
/// ```
/// use fhir_deid::deidentify::compliance::hipaa::bin_birth_year;
///
/// assert_eq!(bin_birth_year(1920, 2025), Some("1900"));
/// assert_eq!(bin_birth_year(1985, 2025), None);
/// ```
pub fn bin_birth_year(birth_year: i32, reference_year: i32) -> Option<&'static str> {
    (reference_year - birth_year >= SAFE_HARBOR_AGE_CEILING).then_some(AGGREGATED_BIRTH_YEAR)
}

/// Bin the leading year of an already-collapsed date string
///
/// Strings whose first four characters aren't a year are left to the caller.
pub fn bin_birth_date(value: &str, reference_year: i32) -> Option<&'static str> {
    let year: i32 = value.get(..4)?.parse().ok()?;
    bin_birth_year(year, reference_year)
}
