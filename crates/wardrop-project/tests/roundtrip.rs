use wardrop_project::schema::*;
use wardrop_project::{load_json, load_yaml, save_json, save_yaml, validate_definition};

fn small_definition() -> NetworkDef {
    NetworkDef {
        version: LATEST_VERSION,
        description: Some("Two parallel links".to_string()),
        delay_type: DelayTypeDef::Affine,
        nodes: vec![
            NodeDef {
                id: 1,
                position: None,
            },
            NodeDef {
                id: 2,
                position: Some([3.0, 4.0]),
            },
        ],
        links: vec![
            LinkDef {
                start: 1,
                end: 2,
                route: 1,
                ffdelay: 1.0,
                slope: 1.0,
                coefs: vec![],
            },
            LinkDef {
                start: 1,
                end: 2,
                route: 2,
                ffdelay: 2.0,
                slope: 0.5,
                coefs: vec![],
            },
        ],
        ods: vec![OdDef {
            origin: 1,
            destination: 2,
            demand: 10.0,
        }],
        paths: vec![],
        solver: Some(SolverDef {
            objective: ObjectiveDef::SystemOptimum,
            observed: Some(ObservedDef {
                reconciliation: ReconciliationDef::Hard,
                flows: vec![ObservedLinkDef {
                    start: 1,
                    end: 2,
                    route: 1,
                    flow: 4.0,
                }],
            }),
            ..SolverDef::default()
        }),
    }
}

#[test]
fn roundtrip_yaml() {
    let definition = small_definition();
    validate_definition(&definition).unwrap();

    let path = std::env::temp_dir().join("wardrop_project_roundtrip.yaml");
    save_yaml(&path, &definition).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(definition, loaded);
}

#[test]
fn roundtrip_json() {
    let definition = small_definition();

    let path = std::env::temp_dir().join("wardrop_project_roundtrip.json");
    save_json(&path, &definition).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(definition, loaded);
}

#[test]
fn defaults_fill_missing_fields() {
    let yaml = r#"
version: 1
delay_type: Affine
nodes: [{ id: 1 }, { id: 2 }]
links: [{ start: 1, end: 2, ffdelay: 1.0 }]
"#;
    let definition: NetworkDef = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(definition.links[0].route, 1);
    assert_eq!(definition.links[0].slope, 0.0);
    assert!(definition.ods.is_empty());
    assert!(definition.solver.is_none());
    validate_definition(&definition).unwrap();
}

#[test]
fn invalid_definition_is_not_saved() {
    let mut definition = small_definition();
    definition.ods[0].destination = 1;

    let path = std::env::temp_dir().join("wardrop_project_invalid.yaml");
    let _ = std::fs::remove_file(&path);
    assert!(save_yaml(&path, &definition).is_err());
    assert!(!path.exists());
}
