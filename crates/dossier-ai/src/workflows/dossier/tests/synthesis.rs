use crate::workflows::dossier::blueprint::{self, FieldShape};
use crate::workflows::dossier::domain::ApplicationId;
use crate::workflows::dossier::resolution::{ResolvedFieldSet, ResolvedValue};
use crate::workflows::dossier::synthesis;

fn app_id(suffix: &str) -> ApplicationId {
    ApplicationId(format!("app-synthesis-{suffix}"))
}

fn all_keys() -> Vec<&'static str> {
    blueprint::field_catalog()
        .iter()
        .map(|spec| spec.key)
        .collect()
}

#[test]
fn same_application_always_gets_the_same_values() {
    let id = app_id("a");
    let keys = all_keys();
    let first = synthesis::synthesize(&id, &keys).expect("synthesis succeeds");
    let second = synthesis::synthesize(&id, &keys).expect("synthesis succeeds");
    assert_eq!(first, second);
}

#[test]
fn subset_requests_agree_with_the_full_profile() {
    let id = app_id("b");
    let full = synthesis::synthesize(&id, &all_keys()).expect("full profile");
    let subset = synthesis::synthesize(&id, &["phone", "passport_number", "bank_accounts"])
        .expect("subset");

    assert_eq!(subset.len(), 3);
    for (key, value) in &subset {
        assert_eq!(full.get(key), Some(value), "divergent value for {key}");
    }
}

#[test]
fn different_applications_get_different_profiles() {
    let first = synthesis::synthesize(&app_id("c"), &all_keys()).expect("profile");
    let second = synthesis::synthesize(&app_id("d"), &all_keys()).expect("profile");
    assert_ne!(first, second);
}

#[test]
fn every_synthesized_scalar_passes_its_format_check() {
    let profile = synthesis::synthesize(&app_id("e"), &all_keys()).expect("profile");
    for spec in blueprint::field_catalog() {
        let value = profile.get(spec.key).expect("catalog key synthesized");
        if spec.shape == FieldShape::Scalar {
            let text = value.as_text().expect("scalar value");
            assert!(
                blueprint::validate_format(spec.format, text),
                "{} failed format check: {text}",
                spec.key
            );
        }
    }
}

#[test]
fn mandatory_lists_meet_their_minimum_entry_count() {
    let profile = synthesis::synthesize(&app_id("f"), &all_keys()).expect("profile");
    for spec in blueprint::field_catalog() {
        if spec.shape == FieldShape::List && spec.min_entries > 0 {
            let entries = profile
                .get(spec.key)
                .and_then(ResolvedValue::as_entries)
                .expect("list synthesized");
            assert!(entries.len() >= spec.min_entries, "{} too short", spec.key);
        }
    }
}

#[test]
fn bank_balance_is_a_multiple_of_monthly_income() {
    let profile = synthesis::synthesize(&app_id("g"), &["monthly_income", "bank_balance"])
        .expect("profile");
    let income: u64 = profile["monthly_income"]
        .as_text()
        .expect("income text")
        .parse()
        .expect("income parses");
    let balance: u64 = profile["bank_balance"]
        .as_text()
        .expect("balance text")
        .parse()
        .expect("balance parses");

    assert_eq!(balance % income, 0);
    let multiplier = balance / income;
    assert!((6..=10).contains(&multiplier));
}

#[test]
fn fill_unresolved_never_touches_resolved_values() {
    let id = app_id("h");
    let mut fields: ResolvedFieldSet = blueprint::field_catalog()
        .iter()
        .map(|spec| {
            let value = match spec.shape {
                FieldShape::Scalar => ResolvedValue::Missing,
                FieldShape::List => ResolvedValue::Entries(Vec::new()),
            };
            (spec.key, value)
        })
        .collect();
    fields.insert("full_name", ResolvedValue::Text("Resolved Name".to_string()));

    let filled = synthesis::fill_unresolved(&id, &mut fields).expect("fill succeeds");

    assert_eq!(
        fields["full_name"],
        ResolvedValue::Text("Resolved Name".to_string())
    );
    assert!(!filled.contains(&"full_name"));
    assert!(!fields["phone"].is_missing());
    assert!(filled.contains(&"phone"));
}

#[test]
fn optional_empty_lists_stay_empty() {
    let id = app_id("i");
    let mut fields: ResolvedFieldSet = blueprint::field_catalog()
        .iter()
        .map(|spec| {
            let value = match spec.shape {
                FieldShape::Scalar => ResolvedValue::Missing,
                FieldShape::List => ResolvedValue::Entries(Vec::new()),
            };
            (spec.key, value)
        })
        .collect();

    let filled = synthesis::fill_unresolved(&id, &mut fields).expect("fill succeeds");

    // prior_trips and owned_assets have no minimum; an empty list is a valid
    // resolved state and must survive.
    assert_eq!(fields["prior_trips"], ResolvedValue::Entries(Vec::new()));
    assert_eq!(fields["owned_assets"], ResolvedValue::Entries(Vec::new()));
    assert!(!filled.contains(&"prior_trips"));

    // bank_accounts requires one entry, so it gets synthesized.
    let accounts = fields["bank_accounts"].as_entries().expect("accounts");
    assert!(!accounts.is_empty());
}

#[test]
fn synthesized_names_and_ids_are_internally_consistent() {
    let id = app_id("j");
    let profile = synthesis::synthesize(&id, &all_keys()).expect("profile");
    let name = profile["full_name"].as_text().expect("name");
    let email = profile["email"].as_text().expect("email");

    let first = name
        .split_whitespace()
        .next()
        .expect("first name")
        .to_ascii_lowercase();
    assert!(email.starts_with(&first), "email {email} does not match {name}");
}
