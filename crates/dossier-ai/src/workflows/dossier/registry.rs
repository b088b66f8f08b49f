//! Static synonym registry mapping canonical field keys to the alternate keys
//! that extraction strategies and questionnaire authors invented over time.
//!
//! Loaded once per process and read-only afterwards. Matching is
//! case-insensitive exact after trimming and whitespace collapse.

use std::collections::HashMap;
use std::sync::OnceLock;

static KEY_MAP: OnceLock<HashMap<String, &'static str>> = OnceLock::new();

/// canonical key → ordered alternates, oldest producer names last.
const SYNONYMS: &[(&str, &[&str])] = &[
    (
        "full_name",
        &["applicant_name", "name", "holder_name", "given_names"],
    ),
    ("birth_date", &["date_of_birth", "dob", "birthdate"]),
    ("nationality", &["citizenship", "country_of_nationality"]),
    (
        "passport_number",
        &["document_number", "passport_no", "travel_document_number"],
    ),
    ("passport_issue_date", &["issue_date", "date_of_issue"]),
    (
        "passport_expiry_date",
        &["expiry_date", "date_of_expiry", "expiration_date"],
    ),
    (
        "national_id_number",
        &["id_number", "national_id", "identity_number"],
    ),
    ("tax_id_number", &["tax_number", "tin", "taxpayer_id"]),
    (
        "phone",
        &["phone_number", "mobile", "contact_phone", "telephone"],
    ),
    ("email", &["email_address", "contact_email", "e_mail"]),
    (
        "home_address",
        &["address", "residential_address", "street_address"],
    ),
    ("occupation", &["job_title", "profession", "position"]),
    ("employer_name", &["employer", "company", "company_name"]),
    (
        "monthly_income",
        &["income", "salary", "monthly_salary", "net_monthly_income"],
    ),
    (
        "bank_balance",
        &["balance", "closing_balance", "account_balance"],
    ),
    ("trip_purpose", &["purpose_of_visit", "travel_purpose"]),
    ("bank_accounts", &["accounts", "bank_account_list"]),
    ("prior_trips", &["previous_trips", "travel_history"]),
    ("owned_assets", &["assets", "property_list"]),
    ("yearly_incomes", &["annual_incomes", "income_history"]),
];

pub(crate) fn normalize_key(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_ascii_lowercase()
}

fn key_map() -> &'static HashMap<String, &'static str> {
    KEY_MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for (canonical, alternates) in SYNONYMS {
            map.insert(normalize_key(canonical), *canonical);
            for alternate in *alternates {
                map.insert(normalize_key(alternate), *canonical);
            }
        }
        map
    })
}

/// Resolve any historical key spelling to its canonical key, if registered.
pub fn canonical_key_for(raw: &str) -> Option<&'static str> {
    key_map().get(&normalize_key(raw)).copied()
}

/// Ordered alternates registered for a canonical key.
pub fn alternates_for(canonical: &str) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == canonical)
        .map(|(_, alternates)| *alternates)
        .unwrap_or(&[])
}

/// True when two raw keys refer to the same canonical field.
pub fn keys_match(candidate: &str, canonical: &str) -> bool {
    match canonical_key_for(candidate) {
        Some(resolved) => resolved == canonical,
        None => normalize_key(candidate) == normalize_key(canonical),
    }
}
