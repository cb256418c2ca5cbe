//! The bundled National Address Register diagram.

use crate::diagram::Diagram;
use crate::parser::{ParseError, parse_diagram};

/// Source text of the National Address Register diagram.
pub const NATIONAL_ADDRESS_REGISTER_SOURCE: &str =
    include_str!("../schema/national_address_register.mmd");

/// Parse the bundled National Address Register diagram.
///
/// # Examples
/// ```
/// use nar_core::{lint_diagram, national_address_register};
///
/// # fn main() -> Result<(), nar_core::ParseError> {
/// let diagram = national_address_register()?;
/// assert_eq!(diagram.title.as_deref(), Some("National Address Register"));
/// assert!(lint_diagram(&diagram).is_clean());
/// # Ok(())
/// # }
/// ```
pub fn national_address_register() -> Result<Diagram, ParseError> {
    parse_diagram(NATIONAL_ADDRESS_REGISTER_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::Cardinality;
    use crate::lint::{ForeignKeyTarget, lint_diagram, resolve_foreign_key};
    use rstest::{fixture, rstest};

    #[fixture]
    fn register() -> Diagram {
        national_address_register().expect("bundled diagram parses")
    }

    #[rstest]
    fn declares_the_six_register_entities(register: Diagram) {
        let names: Vec<_> = register.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Province",
                "BuildingUsage",
                "CensusSubdivision",
                "PostalCode",
                "Location",
                "Address",
            ]
        );
        assert_eq!(register.relationships.len(), 7);
    }

    #[rstest]
    #[case("Province", "ProvinceCode")]
    #[case("BuildingUsage", "BU_USE")]
    #[case("CensusSubdivision", "CSD_ID")]
    #[case("PostalCode", "PostalCode")]
    #[case("Location", "LOC_GUID")]
    #[case("Address", "ADDR_GUID")]
    fn every_entity_has_its_documented_key(
        register: Diagram,
        #[case] entity: &str,
        #[case] key: &str,
    ) {
        let declared = register
            .entity(entity)
            .and_then(|e| e.single_primary_key())
            .map(|attribute| attribute.name.as_str());
        assert_eq!(declared, Some(key));
    }

    #[rstest]
    #[case("CensusSubdivision", "ProvinceCode", "Province")]
    #[case("PostalCode", "ProvinceCode", "Province")]
    #[case("Location", "CSD_ID", "CensusSubdivision")]
    #[case("Location", "ProvinceCode", "Province")]
    #[case("Location", "BU_USE", "BuildingUsage")]
    #[case("Address", "LOC_GUID", "Location")]
    #[case("Address", "PostalCode", "PostalCode")]
    fn foreign_keys_reference_their_parents(
        register: Diagram,
        #[case] child: &str,
        #[case] column: &str,
        #[case] parent: &str,
    ) {
        let entity = register.entity(child).expect("child declared");
        let attribute = entity.attribute(column).expect("column declared");
        assert!(attribute.is_foreign_key());
        match resolve_foreign_key(&register, child, attribute) {
            ForeignKeyTarget::Resolved { entity, .. } => assert_eq!(entity.name, parent),
            other => panic!("expected {parent}, found {other:?}"),
        }
    }

    #[rstest]
    fn only_usage_and_postal_code_are_optional(register: Diagram) {
        let optional: Vec<(&str, &str)> = register
            .entities
            .iter()
            .flat_map(|entity| {
                entity
                    .foreign_keys()
                    .filter(|attribute| attribute.is_marked_optional())
                    .map(move |attribute| (entity.name.as_str(), attribute.name.as_str()))
            })
            .collect();
        assert_eq!(optional, [("Location", "BU_USE"), ("Address", "PostalCode")]);
    }

    #[rstest]
    fn relationships_are_one_to_many(register: Diagram) {
        assert!(register.relationships.iter().all(|relationship| {
            relationship.left_cardinality == Cardinality::ExactlyOne
                && relationship.right_cardinality == Cardinality::ZeroOrMore
        }));
    }

    #[rstest]
    fn lints_clean(register: Diagram) {
        let report = lint_diagram(&register);
        assert!(report.is_clean(), "unexpected findings {:?}", report.findings);
    }
}
