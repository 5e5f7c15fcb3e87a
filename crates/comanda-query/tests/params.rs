use bson::{Bson, doc};
use comanda_query::*;

fn to_query(pairs: &[(&str, &str)]) -> Result<Query, QueryError> {
    QueryParams::partition(pairs.iter().copied()).into_query()
}

// ── Filters ─────────────────────────────────────────────────────

#[test]
fn unreserved_params_pass_through_unchanged() {
    let pairs = [
        ("nombre", "Ana"),
        ("apellido", "Pérez"),
        ("ubicacion.lat", "19.4"),
        ("correo", "ana@example.com"),
    ];
    let query = to_query(&pairs).unwrap();

    assert_eq!(query.filter.len(), pairs.len());
    for (key, value) in pairs {
        assert_eq!(query.filter.get(key), Some(&Bson::String(value.into())));
    }
    assert!(query.projection.is_none());
    assert!(query.sort.is_empty());
    assert_eq!(query.skip, None);
    assert_eq!(query.take, None);
}

#[test]
fn no_reserved_key_leaks_into_filter() {
    let query = to_query(&[
        ("sortField", "a"),
        ("sortOrder", "b"),
        ("skip", "0"),
        ("limit", "0"),
        ("fields", "c"),
    ])
    .unwrap();
    for key in RESERVED {
        assert!(!query.filter.contains_key(key), "{key} leaked into filter");
    }
    assert!(query.filter.is_empty());
}

// ── Projection ──────────────────────────────────────────────────

#[test]
fn fields_builds_inclusion_projection() {
    let query = to_query(&[("fields", "a,b,c")]).unwrap();
    assert_eq!(
        query.projection,
        Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    );
}

// ── Sort ────────────────────────────────────────────────────────

#[test]
fn anything_but_asc_sorts_descending() {
    for order in ["desc", "", "xyz", "Asc"] {
        let query = to_query(&[("sortField", "total"), ("sortOrder", order)]).unwrap();
        assert_eq!(
            query.sort,
            vec![Sort::new("total", SortDirection::Desc)],
            "sortOrder={order:?}"
        );
    }
}

#[test]
fn asc_sorts_ascending() {
    let query = to_query(&[("sortOrder", "asc"), ("sortField", "fecha_pedido")]).unwrap();
    assert_eq!(
        query.sort,
        vec![Sort::new("fecha_pedido", SortDirection::Asc)]
    );
}

// ── Pagination ──────────────────────────────────────────────────

#[test]
fn skip_and_limit_are_parsed() {
    let query = to_query(&[("skip", "2"), ("limit", "3")]).unwrap();
    assert_eq!(query.skip, Some(2));
    assert_eq!(query.take, Some(3));
}

#[test]
fn malformed_limit_is_a_client_error() {
    let err = to_query(&[("limit", "ten")]).unwrap_err();
    assert!(err.to_string().contains("'limit'"), "{err}");
}

#[test]
fn full_request_round_trip() {
    let query = to_query(&[
        ("estado", "pendiente"),
        ("fields", "total, estado"),
        ("sortField", "total"),
        ("sortOrder", "asc"),
        ("skip", "1"),
        ("limit", "5"),
    ])
    .unwrap();

    assert_eq!(
        query,
        Query {
            filter: doc! { "estado": "pendiente" },
            projection: Some(vec!["total".into(), "estado".into()]),
            sort: vec![Sort::new("total", SortDirection::Asc)],
            skip: Some(1),
            take: Some(5),
        }
    );
}
