//! Query assembly over the layers shipped in `config/layers.yaml`.

use serde::Deserialize;

use map_common::{Envelope, LayerDescriptor, TileCoord};
use spatial_query::{
    select_variant, setback_query, slice_query, tile_query, AttributeFilter, BindValue,
    ResolutionPolicy, SetbackRequest,
};

#[derive(Deserialize)]
struct Catalog {
    simplified_max_zoom: u32,
    layers: Vec<LayerDescriptor>,
}

fn catalog() -> Catalog {
    serde_yaml::from_str(include_str!("../../../config/layers.yaml")).unwrap()
}

fn layer(catalog: &Catalog, id: &str) -> LayerDescriptor {
    catalog
        .layers
        .iter()
        .find(|l| l.id == id)
        .cloned()
        .unwrap()
}

fn policy(catalog: &Catalog) -> ResolutionPolicy {
    ResolutionPolicy {
        simplified_max_zoom: catalog.simplified_max_zoom,
    }
}

fn daejeon() -> Envelope {
    Envelope::parse("127.30,36.30,127.45,36.40").unwrap()
}

#[test]
fn test_every_layer_selects_full_detail_above_cut_point() {
    let catalog = catalog();
    let policy = policy(&catalog);

    for layer in &catalog.layers {
        assert_eq!(select_variant(layer, Some(12), policy), &layer.full);
        assert_eq!(select_variant(layer, None, policy), &layer.full);

        let at_11 = select_variant(layer, Some(11), policy);
        match &layer.simplified {
            Some(simplified) => assert_eq!(at_11, simplified),
            None => assert_eq!(at_11, &layer.full),
        }
    }
}

#[test]
fn test_every_layer_builds_slice_and_tile() {
    let catalog = catalog();
    let policy = policy(&catalog);
    let tile = TileCoord::new(14, 13980, 6413);

    for layer in &catalog.layers {
        let full = select_variant(layer, None, policy);
        let slice = slice_query(layer, full, &daejeon().in_srid(full.srid), &AttributeFilter::none());
        assert!(slice.sql.contains("ORDER BY c.gid"), "{}", layer.id);
        assert_eq!(slice.binds.len(), 4);

        let variant = select_variant(layer, Some(tile.z), policy);
        let mvt = tile_query(layer, variant, tile, &AttributeFilter::none());
        assert!(mvt.sql.contains("ST_AsMVT(mvtgeom"), "{}", layer.id);
        assert_eq!(mvt.binds.last(), Some(&BindValue::Text(layer.id.clone())));
    }
}

#[test]
fn test_road_slice_exposes_gid() {
    let catalog = catalog();
    let road = layer(&catalog, "road");

    let q = slice_query(
        &road,
        &road.full,
        &daejeon().in_srid(road.full.srid),
        &AttributeFilter::none(),
    );
    assert!(q.sql.contains("'gid', t.\"gid\"::bigint"));
    // Line layers keep their line dimension through validity repair.
    assert!(q.sql.contains("ST_CollectionExtract(ST_MakeValid(t.\"geom\"), 2)"));
}

#[test]
fn test_owner_filters_are_conjunctive() {
    let catalog = catalog();
    let owner = layer(&catalog, "owner");
    let filter = AttributeFilter::from_params(
        &owner,
        [("jm", "08"), ("jm", " 09 "), ("own", "1"), ("bbox", "ignored")],
    );

    let q = slice_query(&owner, &owner.full, &daejeon().in_srid(5186), &filter);
    assert!(q.sql.contains("t.\"a20\"::text = ANY($5)"));
    assert!(q.sql.contains("t.\"a8\"::text = ANY($6)"));
    assert_eq!(
        q.binds[4],
        BindValue::TextArray(vec!["08".to_string(), "09".to_string()])
    );
    assert_eq!(q.binds[5], BindValue::TextArray(vec!["1".to_string()]));
}

#[test]
fn test_setbacks_use_metric_buffers() {
    let catalog = catalog();

    for id in ["road", "resi"] {
        let layer = layer(&catalog, id);
        let config = layer.setback.clone().unwrap();
        let request = SetbackRequest::from_param(None, &config).unwrap();
        assert_eq!(request.distance(), 50.0);

        let q = setback_query(
            &layer,
            &layer.full,
            &daejeon().in_srid(layer.full.srid),
            &request,
        )
        .unwrap();
        assert!(q.sql.contains("ST_Buffer(c.geom, $5)"), "{}", id);
        assert_eq!(q.binds[4], BindValue::Float(50.0));
    }

    // Layers without a setback definition cannot be buffered.
    let owner = layer(&catalog, "owner");
    assert!(setback_query(
        &owner,
        &owner.full,
        &daejeon().in_srid(5186),
        &SetbackRequest::new(10.0).unwrap(),
    )
    .is_err());
}

#[test]
fn test_identical_requests_give_identical_queries() {
    let catalog = catalog();
    let jimok = layer(&catalog, "jimok");
    let build = || {
        slice_query(
            &jimok,
            &jimok.full,
            &daejeon().in_srid(jimok.full.srid),
            &AttributeFilter::none(),
        )
    };
    assert_eq!(build(), build());
}
