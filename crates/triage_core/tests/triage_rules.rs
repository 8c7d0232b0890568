use pretty_assertions::assert_eq;
use time::macros::{date, datetime};
use time::Duration;

use triage_core::classify::{classify, classify_with_rule};
use triage_core::domain::{Priority, WarrantyClass};
use triage_core::sla::{compute_deadlines, SlaPolicy};
use triage_core::warranty::{warranty_class_for, WarrantyDurations, WarrantyResolver};

#[test]
fn gas_smell_in_plumbing_report_is_high() {
    assert_eq!(
        classify_with_rule("plomería", "Se siente olor a gas en la cocina"),
        (Priority::Alta, "danger_override")
    );
}

#[test]
fn electrical_reports_split_on_hazard_terms() {
    assert_eq!(
        classify("eléctrico", "Hay un corto circuito en el enchufe"),
        Priority::Alta
    );
    assert_eq!(
        classify_with_rule("eléctrico", "Olor a quemado en el tablero"),
        (Priority::Alta, "electrical")
    );
    assert_eq!(
        classify_with_rule("eléctrico", "La luz parpadea"),
        (Priority::Media, "electrical")
    );
}

#[test]
fn hazard_terms_override_every_category() {
    for category in ["terminaciones", "estructura", "puertas", "plomería", "", "otros"] {
        assert_eq!(
            classify_with_rule(category, "sale humo del enchufe del dormitorio"),
            (Priority::Alta, "danger_override"),
            "category {category:?}"
        );
    }
}

#[test]
fn water_branch() {
    let cases = [
        ("", "El patio está inundado", Priority::Alta),
        ("agua", "Casa sin agua desde ayer", Priority::Alta),
        ("", "El inodoro rebalsa aguas servidas", Priority::Alta),
        ("plomería", "Ruido en la llave del baño", Priority::Media),
        ("", "Gotea la llave del lavaplatos", Priority::Media),
    ];
    for (category, description, expected) in cases {
        assert_eq!(
            classify_with_rule(category, description),
            (expected, "water"),
            "{category:?} / {description:?}"
        );
    }
}

#[test]
fn structural_branch_always_resolves() {
    assert_eq!(
        classify_with_rule("estructura", "Grieta diagonal en el muro"),
        (Priority::Alta, "structural")
    );
    assert_eq!(
        classify_with_rule("", "Humedad en el techo de la cocina"),
        (Priority::Media, "structural")
    );
    // Cosmetic terms would say baja, but the structural branch was entered first.
    assert_eq!(
        classify_with_rule("estructura", "Revisar la pintura de la ventana"),
        (Priority::Media, "structural")
    );
}

#[test]
fn broken_bathroom_is_high() {
    assert_eq!(
        classify_with_rule("", "El inodoro no funciona"),
        (Priority::Alta, "sanitary_critical")
    );
    assert_eq!(
        classify_with_rule("", "La ducha está bien pero el baño no tiene luz"),
        (Priority::Alta, "sanitary_critical")
    );
}

#[test]
fn cosmetic_and_default() {
    assert_eq!(
        classify_with_rule("terminaciones", "Pintura descascarada en el pasillo"),
        (Priority::Baja, "cosmetic")
    );
    assert_eq!(
        classify_with_rule("", "La bisagra de la puerta está suelta"),
        (Priority::Baja, "cosmetic")
    );
    assert_eq!(
        classify_with_rule("otros", "Consulta general"),
        (Priority::Media, "default")
    );
    assert_eq!(classify_with_rule("", ""), (Priority::Media, "default"));
}

#[test]
fn calling_someone_is_not_a_flame() {
    assert_eq!(
        classify_with_rule("terminaciones", "El vecino llama al técnico por la pintura"),
        (Priority::Baja, "cosmetic")
    );
    assert_eq!(
        classify_with_rule("", "Se ven llamas en la cocina"),
        (Priority::Alta, "danger_override")
    );
    assert_eq!(
        classify_with_rule("eléctrico", "Del enchufe sale llama"),
        (Priority::Alta, "danger_override")
    );
}

#[test]
fn substrings_inside_other_words_do_not_trigger() {
    assert_eq!(
        classify_with_rule("", "Llamé al gasfiter por la cañería"),
        (Priority::Media, "default")
    );
}

#[test]
fn classification_is_case_insensitive_and_deterministic() {
    let inputs = [
        ("PLOMERÍA", "OLOR A GAS"),
        ("Eléctrico", "La Luz Parpadea"),
        ("Terminaciones", "PINTURA rayada"),
    ];
    for (category, description) in inputs {
        let lower = classify(&category.to_lowercase(), &description.to_lowercase());
        assert_eq!(classify(category, description), lower);
        assert_eq!(classify(category, description), classify(category, description));
    }
}

#[test]
fn deadlines_are_exact_day_offsets() {
    let reported = datetime!(2026-03-07 15:45:10 UTC);
    for (priority, days) in [
        (Some(Priority::Alta), 7),
        (Some(Priority::Media), 15),
        (Some(Priority::Baja), 30),
        (None, 15),
    ] {
        let d = compute_deadlines(priority, reported);
        assert_eq!(d.attention - reported, Duration::days(days), "{priority:?}");
        assert_eq!(d.closure - reported, Duration::days(120));
    }
}

#[test]
fn deadlines_near_the_end_of_the_calendar_saturate() {
    let reported = datetime!(9999-12-01 00:00:00 UTC);
    let latest = datetime!(9999-12-31 23:59:59.999999999 UTC);

    let d = compute_deadlines(Some(Priority::Alta), reported);
    assert_eq!(d.attention, datetime!(9999-12-08 00:00:00 UTC));
    assert_eq!(d.closure, latest);

    let d = compute_deadlines(Some(Priority::Baja), reported);
    assert_eq!(d.attention, datetime!(9999-12-31 00:00:00 UTC));
    assert_eq!(d.closure, latest);
    assert!(d.attention >= reported && d.closure >= d.attention);
}

#[test]
fn stored_priority_text_outside_vocabulary_uses_fallback() {
    let reported = datetime!(2026-03-07 00:00:00 UTC);
    let d = SlaPolicy::default().deadlines_for_raw("urgente", reported);
    assert_eq!(d.attention, datetime!(2026-03-22 00:00:00 UTC));
    let d = SlaPolicy::default().deadlines_for_raw(" ALTA ", reported);
    assert_eq!(d.attention, datetime!(2026-03-14 00:00:00 UTC));
}

#[test]
fn custom_policy_changes_windows() {
    let policy = SlaPolicy {
        alta_days: 2,
        closure_days: 60,
        ..SlaPolicy::default()
    };
    let reported = datetime!(2026-01-01 00:00:00 UTC);
    let d = policy.deadlines(Some(Priority::Alta), reported);
    assert_eq!(d.attention, datetime!(2026-01-03 00:00:00 UTC));
    assert_eq!(d.closure, datetime!(2026-03-02 00:00:00 UTC));
}

fn resolver() -> WarrantyResolver {
    WarrantyResolver::new(WarrantyDurations {
        estructura_years: 10,
        instalaciones_years: 5,
        terminaciones_years: 3,
    })
    .expect("resolver")
}

#[test]
fn warranty_classes_follow_category() {
    assert_eq!(warranty_class_for("Estructura"), Some(WarrantyClass::Estructura));
    assert_eq!(warranty_class_for("eléctrico"), Some(WarrantyClass::Instalaciones));
    assert_eq!(warranty_class_for("plomería"), Some(WarrantyClass::Instalaciones));
    assert_eq!(warranty_class_for("pintura"), Some(WarrantyClass::Terminaciones));
    assert_eq!(warranty_class_for("ventanas"), Some(WarrantyClass::Terminaciones));
    assert_eq!(warranty_class_for("otros"), None);
    assert_eq!(warranty_class_for("  "), None);
}

#[test]
fn warranty_expiry_and_validity() {
    let r = resolver();
    let delivery = Some(date!(2020 - 01 - 15));

    assert_eq!(
        r.compute_expiry(delivery, Some(WarrantyClass::Estructura)),
        Some(date!(2030 - 01 - 15))
    );
    assert_eq!(
        r.compute_expiry(Some(date!(2020 - 02 - 29)), Some(WarrantyClass::Instalaciones)),
        Some(date!(2025 - 02 - 28))
    );

    let finishes = Some(WarrantyClass::Terminaciones);
    assert_eq!(
        r.is_currently_valid(delivery, finishes, date!(2023 - 01 - 15)),
        Some(true)
    );
    assert_eq!(
        r.is_currently_valid(delivery, finishes, date!(2023 - 01 - 16)),
        Some(false)
    );

    assert_eq!(r.compute_expiry(None, finishes), None);
    assert_eq!(r.compute_expiry(delivery, None), None);
    assert_eq!(r.is_currently_valid(None, finishes, date!(2023 - 01 - 01)), None);
}

#[test]
fn zero_year_warranty_is_rejected() {
    let err = WarrantyResolver::new(WarrantyDurations {
        estructura_years: 10,
        instalaciones_years: 0,
        terminaciones_years: 3,
    })
    .unwrap_err();
    assert_eq!(err.code, "CONFIG_WARRANTY_DURATION_INVALID");
}
