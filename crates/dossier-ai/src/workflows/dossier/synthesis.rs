//! Synthetic auto-fill for fields the resolution layer could not settle.
//!
//! Generation is a pure function of the application id: the id is folded into
//! a seed and every field of a full profile is derived in fixed catalog order,
//! so repeated runs for the same application agree regardless of which subset
//! of keys happens to be unresolved. Values are format-valid placeholders, not
//! truths, and money figures are kept internally consistent within one
//! profile.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::blueprint::{self, FieldShape, FieldSpec};
use super::domain::ApplicationId;
use super::resolution::{ResolvedFieldSet, ResolvedValue};

/// A generator violating its own format constraint is an implementation bug,
/// not a runtime condition; callers treat this as fatal.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("synthesized value for '{key}' failed its format check")]
    ConstraintViolated { key: String },
}

const FIRST_NAMES: &[&str] = &[
    "Arif", "Dewi", "Farhan", "Intan", "Joko", "Larasati", "Made", "Nadia", "Putra", "Sari",
];
const LAST_NAMES: &[&str] = &[
    "Nugraha", "Wijaya", "Santoso", "Pratama", "Hartono", "Kusuma", "Siregar", "Utami",
];
const STREETS: &[&str] = &[
    "Jalan Merdeka", "Jalan Sudirman", "Jalan Diponegoro", "Jalan Gatot Subroto",
];
const CITIES: &[&str] = &["Jakarta", "Bandung", "Surabaya", "Yogyakarta", "Medan"];
const OCCUPATIONS: &[&str] = &[
    "Software Engineer", "Accountant", "Graphic Designer", "Sales Manager", "Teacher",
];
const EMPLOYERS: &[&str] = &[
    "PT Cipta Solusi Digital", "PT Nusantara Logistik", "CV Karya Mandiri", "PT Bina Sejahtera",
];
const BANKS: &[&str] = &["Bank Central Asia", "Bank Mandiri", "Bank Negara Indonesia"];
const TRIP_COUNTRIES: &[&str] = &["Singapore", "Malaysia", "Thailand", "Japan"];
const TRIP_PURPOSES: &[&str] = &["Tourism", "Family visit", "Business meeting"];
const ASSETS: &[&str] = &["Residential house", "Motorcycle", "Family car", "Land parcel"];

/// Mobile carrier prefixes; synthesized phones stay locale-valid.
const PHONE_PREFIXES: &[&str] = &["812", "813", "821", "822", "852"];

fn seed_for(application_id: &ApplicationId) -> u64 {
    // FNV-1a over the id bytes; stable across runs and platforms.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in application_id.0.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

/// Complete synthesized profile, derived field-by-field in catalog order.
fn synthesized_profile(application_id: &ApplicationId) -> BTreeMap<&'static str, ResolvedValue> {
    let mut rng = StdRng::seed_from_u64(seed_for(application_id));
    let mut profile = BTreeMap::new();

    let full_name = format!("{} {}", pick(&mut rng, FIRST_NAMES), pick(&mut rng, LAST_NAMES));
    let birth_year = rng.gen_range(1968..=1997);
    let birth_date = NaiveDate::from_ymd_opt(
        birth_year,
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
    );
    let issue_year = rng.gen_range(2019..=2023);
    let issue_date = NaiveDate::from_ymd_opt(issue_year, rng.gen_range(1..=12), rng.gen_range(1..=28));
    let expiry_date = issue_date.and_then(|date| date.with_year(issue_year + 10));

    // Balance stays a 6-10x multiple of income so the two never contradict.
    let monthly_income = rng.gen_range(56..=160) * 50_000u64;
    let balance_multiplier = rng.gen_range(6..=10);
    let bank_balance = monthly_income * balance_multiplier;

    let occupation = pick(&mut rng, OCCUPATIONS);
    let employer = pick(&mut rng, EMPLOYERS);
    let phone = format!(
        "+62{}{:04}{:04}",
        pick(&mut rng, PHONE_PREFIXES),
        rng.gen_range(0..10_000),
        rng.gen_range(0..10_000)
    );
    let email = format!(
        "{}.{}@example.com",
        full_name
            .split_whitespace()
            .next()
            .unwrap_or("applicant")
            .to_ascii_lowercase(),
        rng.gen_range(10..100)
    );
    let address = format!(
        "{} No. {}, {}",
        pick(&mut rng, STREETS),
        rng.gen_range(1..200),
        pick(&mut rng, CITIES)
    );

    profile.insert("full_name", ResolvedValue::Text(full_name.clone()));
    profile.insert("birth_date", ResolvedValue::Text(format_date(birth_date)));
    profile.insert("nationality", ResolvedValue::Text("Indonesian".to_string()));
    profile.insert(
        "passport_number",
        ResolvedValue::Text(format!("C{:07}", rng.gen_range(1_000_000..10_000_000u32))),
    );
    profile.insert(
        "passport_issue_date",
        ResolvedValue::Text(format_date(issue_date)),
    );
    profile.insert(
        "passport_expiry_date",
        ResolvedValue::Text(format_date(expiry_date)),
    );
    profile.insert(
        "national_id_number",
        ResolvedValue::Text(format!(
            "31{:014}",
            rng.gen_range(0..100_000_000_000_000u64)
        )),
    );
    profile.insert(
        "tax_id_number",
        ResolvedValue::Text(format!("{:015}", rng.gen_range(0..1_000_000_000_000_000u64))),
    );
    profile.insert("phone", ResolvedValue::Text(phone));
    profile.insert("email", ResolvedValue::Text(email));
    profile.insert("home_address", ResolvedValue::Text(address));
    profile.insert("occupation", ResolvedValue::Text(occupation.to_string()));
    profile.insert("employer_name", ResolvedValue::Text(employer.to_string()));
    profile.insert(
        "monthly_income",
        ResolvedValue::Text(monthly_income.to_string()),
    );
    profile.insert("bank_balance", ResolvedValue::Text(bank_balance.to_string()));
    profile.insert(
        "trip_purpose",
        ResolvedValue::Text(pick(&mut rng, TRIP_PURPOSES).to_string()),
    );

    let account_count = rng.gen_range(1..=2);
    let mut accounts = Vec::with_capacity(account_count);
    for index in 0..account_count {
        let mut entry = BTreeMap::new();
        entry.insert("bank_name".to_string(), pick(&mut rng, BANKS).to_string());
        entry.insert(
            "account_number".to_string(),
            format!("{:012}", rng.gen_range(0..1_000_000_000_000u64)),
        );
        // First account holds the headline balance; extras hold a slice of it.
        let balance = if index == 0 {
            bank_balance
        } else {
            bank_balance / rng.gen_range(4..=8)
        };
        entry.insert("balance".to_string(), balance.to_string());
        accounts.push(entry);
    }
    profile.insert("bank_accounts", ResolvedValue::Entries(accounts));

    let mut incomes = Vec::new();
    for offset in 1..=2u64 {
        let mut entry = BTreeMap::new();
        let annual = monthly_income * 12 - offset * rng.gen_range(0..2_000_000);
        entry.insert("year".to_string(), (2025 - offset).to_string());
        entry.insert("amount".to_string(), annual.to_string());
        incomes.push(entry);
    }
    profile.insert("yearly_incomes", ResolvedValue::Entries(incomes));

    let trip_count = rng.gen_range(1..=2);
    let mut trips = Vec::with_capacity(trip_count);
    for _ in 0..trip_count {
        let mut entry = BTreeMap::new();
        entry.insert("country".to_string(), pick(&mut rng, TRIP_COUNTRIES).to_string());
        entry.insert("year".to_string(), rng.gen_range(2018..=2024).to_string());
        entry.insert("purpose".to_string(), pick(&mut rng, TRIP_PURPOSES).to_string());
        trips.push(entry);
    }
    profile.insert("prior_trips", ResolvedValue::Entries(trips));

    let mut assets = Vec::new();
    let mut asset_entry = BTreeMap::new();
    asset_entry.insert("asset".to_string(), pick(&mut rng, ASSETS).to_string());
    asset_entry.insert(
        "estimated_value".to_string(),
        (bank_balance * rng.gen_range(2..=5)).to_string(),
    );
    assets.push(asset_entry);
    profile.insert("owned_assets", ResolvedValue::Entries(assets));

    profile
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1990-01-01".to_string())
}

/// Produce format-valid placeholders for the given unresolved keys.
///
/// Only the requested keys are returned; values come from the deterministic
/// full profile so different unresolved sets stay mutually consistent.
pub fn synthesize(
    application_id: &ApplicationId,
    unresolved_keys: &[&'static str],
) -> Result<BTreeMap<&'static str, ResolvedValue>, SynthesisError> {
    let profile = synthesized_profile(application_id);
    let mut additions = BTreeMap::new();

    for key in unresolved_keys {
        let Some(spec) = blueprint::field_spec(key) else {
            continue;
        };
        let Some(value) = profile.get(key) else {
            continue;
        };

        validate_against(spec, value)?;
        additions.insert(*key, value.clone());
    }

    Ok(additions)
}

/// Fill every missing field in place, never touching resolved values. Returns
/// the keys that were synthesized.
pub fn fill_unresolved(
    application_id: &ApplicationId,
    fields: &mut ResolvedFieldSet,
) -> Result<Vec<&'static str>, SynthesisError> {
    let unresolved: Vec<&'static str> = fields
        .iter()
        .filter(|(key, value)| needs_synthesis(key, value))
        .map(|(key, _)| *key)
        .collect();

    let additions = synthesize(application_id, &unresolved)?;
    let mut filled = Vec::with_capacity(additions.len());
    for (key, value) in additions {
        fields.insert(key, value);
        filled.push(key);
    }

    Ok(filled)
}

fn needs_synthesis(key: &str, value: &ResolvedValue) -> bool {
    match value {
        ResolvedValue::Missing => true,
        ResolvedValue::Text(text) => text.trim().is_empty(),
        ResolvedValue::Entries(entries) => {
            let minimum = blueprint::field_spec(key)
                .map(|spec| spec.min_entries)
                .unwrap_or(0);
            entries.is_empty() && minimum > 0
        }
    }
}

fn validate_against(spec: &FieldSpec, value: &ResolvedValue) -> Result<(), SynthesisError> {
    let valid = match (spec.shape, value) {
        (FieldShape::Scalar, ResolvedValue::Text(text)) => {
            blueprint::validate_format(spec.format, text)
        }
        (FieldShape::List, ResolvedValue::Entries(entries)) => {
            entries.len() >= spec.min_entries.max(1)
                && entries
                    .iter()
                    .all(|entry| entry.values().all(|value| !value.trim().is_empty()))
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(SynthesisError::ConstraintViolated {
            key: spec.key.to_string(),
        })
    }
}
