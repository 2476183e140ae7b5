use wellhead::{AttributeRecord, LayerKind, WellAttributes, schema_for};
use wellhead_derive::AttributeRecord as AttributeRecordDerive;

#[derive(Debug, Default, AttributeRecordDerive)]
struct Pump {
    #[field("Label")]
    label: String,
    #[field("pump rate")]
    rate: String,
    layers: String,
}

#[derive(Debug, Default, AttributeRecordDerive)]
struct Empty;

#[test]
fn fields_follow_declaration_order() {
    assert_eq!(Pump::FIELDS, &["Label", "pump rate", "layers"]);
}

#[test]
fn renamed_fields_are_reached_by_their_field_name() {
    let mut pump = Pump::default();
    *pump.get_mut("pump rate").unwrap() = "12.5".to_string();
    assert_eq!(pump.rate, "12.5");
    assert_eq!(pump.get("pump rate"), Some("12.5"));
    assert_eq!(pump.get("rate"), None);
}

#[test]
fn unrenamed_fields_use_their_identifier() {
    let pump = Pump {
        label: "North".to_string(),
        rate: String::new(),
        layers: "0,1".to_string(),
    };
    assert_eq!(pump.get("layers"), Some("0,1"));
    assert_eq!(pump.get("Label"), Some("North"));
    assert_eq!(pump.get("label"), None);
}

#[test]
fn unit_structs_have_no_fields() {
    let mut empty = Empty;
    assert!(Empty::FIELDS.is_empty());
    assert_eq!(empty.get("anything"), None);
    assert!(empty.get_mut("anything").is_none());
}

#[test]
fn registry_schemas_come_from_the_derive() {
    assert_eq!(WellAttributes::FIELDS, schema_for(LayerKind::Wells));
    assert_eq!(
        schema_for(LayerKind::PolygonInhom).last(),
        Some(&"inhom side order")
    );
}
