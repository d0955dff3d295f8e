//! The built-in professional onboarding wizard.
//!
//! Five steps; only "Professional Details" collects structured data today.
//! The others are placeholders a renderer fills in, so they carry no schema.

use crate::error::ConfigError;
use crate::schema::{CompiledSchema, FieldSpec, Rule};

use super::definition::{StepCatalog, StepDefinition};

/// Step keys, in wizard order.
pub mod step_keys {
    pub const BASIC_DETAILS: &str = "basic_details";
    pub const PROFESSIONAL_DETAILS: &str = "professional_details";
    pub const EXPERIENCE: &str = "experience";
    pub const IDENTITY_VERIFICATION: &str = "identity_verification";
    pub const VERIFICATION_STATUS: &str = "verification_status";
}

/// Degree types offered by the qualifications section.
pub const DEGREE_TYPES: &[&str] = &["bachelor", "master", "phd"];

/// Bar associations offered by the bar registration section.
pub const BAR_ASSOCIATIONS: &[&str] = &["ABA", "SBA"];

/// Fields of the "Professional Details" step.
pub fn professional_details_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::section(
            "qualifications",
            "Qualifications",
            vec![
                FieldSpec::text("degreeType", "Degree type")
                    .required()
                    .rule(Rule::one_of(DEGREE_TYPES)),
                FieldSpec::text("institutionName", "Institution name").required(),
                FieldSpec::text("graduationYear", "Graduation year")
                    .required()
                    .rule(Rule::YearFormat),
                FieldSpec::supporting_document("degreeDocument", "Degree document"),
            ],
        ),
        FieldSpec::group(
            "certifications",
            "Certifications",
            vec![
                FieldSpec::text("certificationName", "Certification name").required(),
                FieldSpec::text("issuingBody", "Issuing body").required(),
                FieldSpec::date("certificationDate", "Certification date")
                    .required()
                    .rule(Rule::DateParseable),
                FieldSpec::supporting_document("certificateDocument", "Certificate document"),
            ],
            1,
        ),
        FieldSpec::section(
            "barRegistrations",
            "Bar registration",
            vec![
                FieldSpec::text("barAssociation", "Bar Association")
                    .required()
                    .rule(Rule::one_of(BAR_ASSOCIATIONS)),
                FieldSpec::text("licenseNumber", "License number").required(),
                FieldSpec::text("jurisdiction", "Jurisdiction").required(),
                FieldSpec::text("completionYear", "Completion year")
                    .required()
                    .rule(Rule::YearFormat),
                FieldSpec::supporting_document("proofDocument", "Proof document"),
            ],
        ),
    ]
}

/// Build the onboarding catalog.
pub fn catalog() -> Result<StepCatalog, ConfigError> {
    use step_keys::*;

    let professional = CompiledSchema::compile(professional_details_fields())?;

    StepCatalog::new(vec![
        StepDefinition::new(BASIC_DETAILS, "Basic Details").skippable(true),
        StepDefinition::new(PROFESSIONAL_DETAILS, "Professional Details")
            .with_description(
                "Tell us about your qualifications so we can connect you with our clients.",
            )
            .with_schema(professional),
        StepDefinition::new(EXPERIENCE, "Experience").skippable(true),
        StepDefinition::new(IDENTITY_VERIFICATION, "Identity Verification").skippable(true),
        StepDefinition::new(VERIFICATION_STATUS, "Verification Status")
            .with_description("Review everything you entered before final submission."),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{DocumentAttachment, FieldValue, GroupEntry, Record, record};

    fn pdf() -> FieldValue {
        DocumentAttachment::from_bytes("doc.pdf", "application/pdf", vec![0; 1000]).into()
    }

    fn valid_bar() -> Record {
        record([
            ("barAssociation", FieldValue::from("SBA")),
            ("licenseNumber", "MAH/1234/2015".into()),
            ("jurisdiction", "Maharashtra".into()),
            ("completionYear", "2015".into()),
            ("proofDocument", pdf()),
        ])
    }

    #[test]
    fn catalog_shape() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.index_of(step_keys::PROFESSIONAL_DETAILS), Some(1));
        assert!(!catalog.get(1).unwrap().is_skippable);
        assert!(catalog.get(0).unwrap().is_skippable);
        assert_eq!(
            catalog.get(catalog.last_index()).unwrap().key,
            step_keys::VERIFICATION_STATUS
        );
    }

    #[test]
    fn qualifications_scenario_yields_single_error() {
        let catalog = catalog().unwrap();
        let payload = record([
            (
                "qualifications",
                FieldValue::Record(record([
                    ("degreeType", FieldValue::from("master")),
                    ("institutionName", "".into()),
                    ("graduationYear", "2020".into()),
                    ("degreeDocument", pdf()),
                ])),
            ),
            ("certifications", FieldValue::Group(vec![])),
            ("barRegistrations", FieldValue::Record(valid_bar())),
        ]);

        let result = catalog
            .validate(step_keys::PROFESSIONAL_DETAILS, &payload)
            .unwrap();
        assert_eq!(result.len(), 1, "unexpected errors: {result:?}");
        assert_eq!(
            result.get("qualifications.institutionName"),
            Some("Institution name is required")
        );
    }

    #[test]
    fn default_payload_fails_every_required_field() {
        let catalog = catalog().unwrap();
        let step = catalog.by_key(step_keys::PROFESSIONAL_DETAILS).unwrap();
        let payload = step.default_payload();

        let certs = payload["certifications"].as_group().unwrap();
        assert_eq!(certs.len(), 1);

        let result = step.validate(&payload);
        // 4 qualifications + 4 certification + 5 bar registration fields.
        assert_eq!(result.len(), 13);
        assert!(result.get("certifications[0].issuingBody").is_some());
        assert_eq!(
            result.get("barRegistrations.proofDocument"),
            Some("Proof document is required")
        );
    }

    #[test]
    fn unknown_degree_type_rejected() {
        let catalog = catalog().unwrap();
        let payload = record([
            (
                "qualifications",
                FieldValue::Record(record([
                    ("degreeType", FieldValue::from("diploma")),
                    ("institutionName", "NLSIU".into()),
                    ("graduationYear", "2019".into()),
                    ("degreeDocument", pdf()),
                ])),
            ),
            (
                "certifications",
                FieldValue::Group(vec![GroupEntry::new(record([
                    ("certificationName", FieldValue::from("CIPP/E")),
                    ("issuingBody", "IAPP".into()),
                    ("certificationDate", "2022-06-30".into()),
                    ("certificateDocument", pdf()),
                ]))]),
            ),
            ("barRegistrations", FieldValue::Record(valid_bar())),
        ]);
        let result = catalog
            .validate(step_keys::PROFESSIONAL_DETAILS, &payload)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(
            result.get("qualifications.degreeType"),
            Some("Degree type must be one of: bachelor, master, phd")
        );
    }
}
