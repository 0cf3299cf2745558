mod common;

use common::{RecordedRequest, StubResponse, StubServer};
use lm_access::services::paginator::{PageOptions, Paginator};
use lm_access::{AccessError, ListQuery, QueryParams};
use serde_json::{json, Value};

fn offset_of(request: &RecordedRequest) -> usize {
    request
        .query_param("offset")
        .and_then(|v| v.parse().ok())
        .expect("offset param")
}

fn size_of(request: &RecordedRequest) -> usize {
    request
        .query_param("size")
        .and_then(|v| v.parse().ok())
        .expect("size param")
}

/// Serves `total` numbered items, at most `max_page` per response.
fn numbered_items(total: usize, max_page: usize) -> impl Fn(&RecordedRequest) -> StubResponse {
    move |request| {
        let offset = offset_of(request);
        let size = size_of(request).min(max_page);
        let end = (offset + size).min(total);
        let items: Vec<Value> = (offset.min(end)..end).map(|i| json!({"id": i})).collect();
        StubResponse::json(200, json!({"total": total, "items": items, "searchId": null}))
    }
}

fn ids(items: &[Value]) -> Vec<u64> {
    items.iter().filter_map(|item| item["id"].as_u64()).collect()
}

#[tokio::test]
async fn collects_every_page_in_order() {
    let server = StubServer::start(numbered_items(130, 1000));
    let client = server.client();

    let all = client
        .list_all("/device/devices", &ListQuery::default().size(50))
        .await
        .expect("list all");

    assert_eq!(all.total, 130);
    assert_eq!(ids(&all.items), (0..130).collect::<Vec<u64>>());
    let offsets: Vec<usize> = server.requests().iter().map(offset_of).collect();
    assert_eq!(offsets, vec![0, 50, 100]);
    assert!(server.requests().iter().all(|r| size_of(r) == 50));
}

#[tokio::test]
async fn short_pages_advance_by_items_returned() {
    // Server caps pages at 30 no matter what size is asked for.
    let server = StubServer::start(numbered_items(70, 30));
    let client = server.client();

    let all = client
        .list_all("/website/websites", &ListQuery::default().size(50))
        .await
        .expect("list all");

    assert_eq!(ids(&all.items), (0..70).collect::<Vec<u64>>());
    let offsets: Vec<usize> = server.requests().iter().map(offset_of).collect();
    assert_eq!(offsets, vec![0, 30, 60]);
}

#[tokio::test]
async fn empty_first_page_returns_empty_result() {
    let server = StubServer::start(|_| StubResponse::json(200, json!({"total": 0, "items": []})));
    let client = server.client();

    let all = client
        .list_all("/alert/alerts", &ListQuery::default())
        .await
        .expect("list all");
    assert_eq!(all.total, 0);
    assert!(all.items.is_empty());
    assert_eq!(server.requests().len(), 1);
    assert_eq!(server.requests()[0].query_param("size"), Some("1000"));
}

#[tokio::test]
async fn stops_on_empty_page_even_if_total_is_larger() {
    let server = StubServer::start(|request| {
        let items: Vec<Value> = if offset_of(request) == 0 {
            (0..10).map(|i| json!({"id": i})).collect()
        } else {
            Vec::new()
        };
        StubResponse::json(200, json!({"total": 500, "items": items}))
    });
    let client = server.client();

    let all = client
        .list_all("/device/groups", &ListQuery::default().size(10))
        .await
        .expect("list all");
    assert_eq!(all.items.len(), 10);
    assert_eq!(all.total, 500);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn starting_offset_is_honored() {
    let server = StubServer::start(numbered_items(120, 1000));
    let client = server.client();

    let all = client
        .list_all("/device/devices", &ListQuery::default().size(50).offset(100))
        .await
        .expect("list all");
    assert_eq!(ids(&all.items), (100..120).collect::<Vec<u64>>());
    let offsets: Vec<usize> = server.requests().iter().map(offset_of).collect();
    assert_eq!(offsets, vec![100, 120]);
}

#[tokio::test]
async fn filter_and_fields_are_sent_on_every_page() {
    let server = StubServer::start(numbered_items(4, 2));
    let client = server.client();

    let query = ListQuery::default()
        .filter("displayName~prod (east),hostStatus:alive")
        .fields("id, displayName ,")
        .size(2);
    client
        .list_all("/device/devices", &query)
        .await
        .expect("list all");

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(
            request.query_param("filter"),
            Some("displayName~prod \\(east\\),hostStatus:alive")
        );
        assert_eq!(request.query_param("fields"), Some("id,displayName"));
    }
}

#[tokio::test]
async fn missing_items_names_the_path() {
    let server = StubServer::start(|_| StubResponse::json(200, json!({"total": 3, "data": []})));
    let client = server.client();

    let err = client
        .list_all("/dashboard/dashboards", &ListQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "response_shape");
    assert!(err.to_string().contains("/dashboard/dashboards"));
    assert!(err.to_string().contains("items"));
}

#[tokio::test]
async fn failed_later_page_fails_the_whole_walk() {
    let server = StubServer::start(|request| {
        if offset_of(request) == 0 {
            StubResponse::json(200, json!({"total": 4, "items": [{"id": 0}, {"id": 1}]}))
        } else {
            StubResponse::json(503, json!({"errorMessage": "maintenance"}))
        }
    });
    let client = server.client();

    let err = client
        .list_all("/device/devices", &ListQuery::default().size(2))
        .await
        .unwrap_err();
    assert_eq!(err.api().map(|api| api.http_status), Some(503));
}

#[tokio::test]
async fn item_cap_is_a_hard_failure() {
    let server = StubServer::start(numbered_items(10_000, 1000));
    let mut config = server.config();
    config.max_items = 250;
    let client = server.client_with(config, None);

    let err = client
        .list_all("/device/devices", &ListQuery::default().size(100))
        .await
        .unwrap_err();
    match err {
        AccessError::PaginationLimit {
            path,
            fetched,
            limit,
        } => {
            assert_eq!(path, "/device/devices");
            assert_eq!(limit, 250);
            assert_eq!(fetched, 300);
        }
        other => panic!("expected pagination limit, got {:?}", other),
    }
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn per_call_cap_overrides_client_cap() {
    let server = StubServer::start(numbered_items(30, 1000));
    let client = server.client();
    let paginator_params = QueryParams::new().with("filter", "name:\"web\"");

    let err = Paginator::new(
        client.executor().clone(),
        client.logger(),
        100_000,
    )
    .list_all(
        "/device/devices",
        &paginator_params,
        PageOptions {
            size: Some(10),
            offset: 0,
            max_items: Some(15),
            max_pages: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "pagination_limit");
    assert_eq!(server.requests()[0].query_param("filter"), Some("name:\"web\""));
}

#[tokio::test]
async fn single_page_uses_default_size() {
    let server = StubServer::start(numbered_items(130, 1000));
    let client = server.client();

    let page = client
        .list_page("/device/devices", &ListQuery::default().offset(50))
        .await
        .expect("page");
    assert_eq!(page.total, 130);
    assert_eq!(ids(&page.items), (50..100).collect::<Vec<u64>>());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn page_cap_reports_pages_not_items() {
    // A server that never runs out: one item per page, absurd total.
    let server = StubServer::start(|request| {
        let offset = offset_of(request);
        StubResponse::json(200, json!({"total": 1_000_000, "items": [{"id": offset}]}))
    });
    let client = server.client();

    let err = Paginator::new(client.executor().clone(), client.logger(), 100_000)
        .list_all(
            "/device/devices",
            &QueryParams::new(),
            PageOptions {
                size: Some(1),
                offset: 0,
                max_items: None,
                max_pages: Some(5),
            },
        )
        .await
        .unwrap_err();
    match &err {
        AccessError::PageLimit {
            path,
            pages,
            fetched,
            limit,
        } => {
            assert_eq!(path, "/device/devices");
            assert_eq!(*pages, 5);
            assert_eq!(*fetched, 5);
            assert_eq!(*limit, 5);
        }
        other => panic!("expected page limit, got {:?}", other),
    }
    assert_eq!(err.kind(), "page_limit");
    assert!(err.to_string().contains("page limit 5"));
    assert_eq!(server.requests().len(), 5);
}
